//! MIR Builder - Programmatic construction of MIR modules
//!
//! A builder API for constructing MIR programmatically, used by the
//! standard-library lowering and throughout the test suite.
//!
//! # Example
//!
//! ```rust,ignore
//! use vesper_compiler::ir::{IrBuilder, IrType};
//!
//! let mut builder = IrBuilder::new("demo");
//!
//! // fn double(x: Int32) -> Int32
//! let func = builder
//!     .begin_function("double")
//!     .param("x", IrType::I32)
//!     .returns(IrType::I32)
//!     .build();
//! builder.set_current_function(func);
//!
//! let entry = builder.create_block("entry");
//! builder.set_insert_point(entry);
//!
//! let x = builder.get_param(0);
//! let two = builder.integer_literal(IrType::I32, 2);
//! let f = builder.function_ref(func);
//! let doubled = builder.apply(f, vec![x, two]);
//! builder.ret(Some(doubled));
//!
//! let module = builder.finish();
//! ```

use super::{
    AccessEnforcement, AccessKind, FunctionRepresentation, IrBlockId, IrBlockParam, IrFunctionId,
    IrGlobalId, IrId, IrInstKind, IrInstruction, IrLocation, IrModule, IrParameter, IrScopeId,
    IrTermKind, IrTerminator, IrType, Linkage, MetatypeRepresentation, OwnershipKind,
    IrFunctionSignature,
};

/// Builder for programmatically constructing MIR modules
pub struct IrBuilder {
    /// Module being built
    module: IrModule,

    /// Current function being built
    current_function: Option<IrFunctionId>,

    /// Current block being built
    current_block: Option<IrBlockId>,

    /// Location attached to emitted instructions
    current_loc: IrLocation,

    /// Scope attached to emitted instructions
    current_scope: Option<IrScopeId>,
}

/// Builder for function signatures
pub struct FunctionBuilder<'a> {
    builder: &'a mut IrBuilder,
    name: String,
    params: Vec<IrParameter>,
    return_type: IrType,
    throws: bool,
    representation: FunctionRepresentation,
    linkage: Linkage,
}

impl IrBuilder {
    /// Create a new builder for a module
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: IrModule::new(module_name),
            current_function: None,
            current_block: None,
            current_loc: IrLocation::unknown(),
            current_scope: None,
        }
    }

    /// Begin defining a new function
    pub fn begin_function(&mut self, name: impl Into<String>) -> FunctionBuilder<'_> {
        FunctionBuilder {
            builder: self,
            name: name.into(),
            params: Vec::new(),
            return_type: IrType::Void,
            throws: false,
            representation: FunctionRepresentation::Native,
            linkage: Linkage::Public,
        }
    }

    /// Set the current function being built. Emitted instructions default
    /// to the function's root scope.
    pub fn set_current_function(&mut self, func_id: IrFunctionId) {
        self.current_function = Some(func_id);
        self.current_block = None;
        self.current_scope = Some(
            self.module
                .function(func_id)
                .expect("function not found")
                .scope,
        );
    }

    /// Create a new basic block in the current function.
    /// The first call labels and returns the existing entry block.
    pub fn create_block(&mut self, label: impl Into<String>) -> IrBlockId {
        let func = self.current_function_mut();

        if func.cfg.blocks.len() == 1 {
            let entry = func.cfg.entry_block;
            let block = func
                .cfg
                .get_block_mut(entry)
                .expect("cfg is missing its entry block");
            if block.label.is_none() && block.instructions.is_empty() && !block.is_terminated() {
                block.label = Some(label.into());
                return entry;
            }
        }

        let id = func.cfg.create_block();
        func.cfg
            .get_block_mut(id)
            .expect("freshly created block is missing")
            .label = Some(label.into());
        id
    }

    /// Append a parameter to a block, returning the introduced value.
    pub fn add_block_param(
        &mut self,
        block: IrBlockId,
        ty: IrType,
        ownership: OwnershipKind,
    ) -> IrId {
        let func = self.current_function_mut();
        let value = func.alloc_reg();
        func.cfg
            .get_block_mut(block)
            .expect("block not found")
            .params
            .push(IrBlockParam {
                value,
                ty,
                ownership,
            });
        value
    }

    /// Set the insertion point to a specific block
    pub fn set_insert_point(&mut self, block_id: IrBlockId) {
        self.current_block = Some(block_id);
    }

    /// Get an argument of the current function by index
    pub fn get_param(&self, index: usize) -> IrId {
        let func_id = self.current_function.expect("no current function");
        self.module
            .function(func_id)
            .expect("function not found")
            .param_value(index)
            .expect("parameter index out of range")
    }

    /// Set the location attached to subsequently emitted instructions
    pub fn set_loc(&mut self, loc: IrLocation) {
        self.current_loc = loc;
    }

    /// Set the scope attached to subsequently emitted instructions
    pub fn set_scope(&mut self, scope: IrScopeId) {
        self.current_scope = Some(scope);
    }

    fn current_function_mut(&mut self) -> &mut super::IrFunction {
        let func_id = self.current_function.expect("no current function");
        self.module.function_mut(func_id).expect("function not found")
    }

    fn alloc_reg(&mut self) -> IrId {
        self.current_function_mut().alloc_reg()
    }

    /// Emit an already-formed instruction at the insertion point.
    pub fn emit(&mut self, kind: IrInstKind) {
        let loc = self.current_loc;
        let scope = self.current_scope;
        let block_id = self.current_block.expect("no insertion point");
        let func = self.current_function_mut();
        func.cfg
            .get_block_mut(block_id)
            .expect("insertion point block not found")
            .add_instruction(IrInstruction {
                kind,
                loc,
                scope,
            });
    }

    fn emit_valued(&mut self, make: impl FnOnce(IrId) -> IrInstKind) -> IrId {
        let dest = self.alloc_reg();
        self.emit(make(dest));
        dest
    }

    // === Instruction emitters ===

    pub fn integer_literal(&mut self, ty: IrType, value: i64) -> IrId {
        self.emit_valued(|dest| IrInstKind::IntegerLiteral { dest, ty, value })
    }

    pub fn float_literal(&mut self, ty: IrType, bits: u64) -> IrId {
        self.emit_valued(|dest| IrInstKind::FloatLiteral { dest, ty, bits })
    }

    pub fn string_literal(&mut self, value: impl Into<String>) -> IrId {
        let value = value.into();
        self.emit_valued(|dest| IrInstKind::StringLiteral { dest, value })
    }

    pub fn function_ref(&mut self, function: IrFunctionId) -> IrId {
        self.emit_valued(|dest| IrInstKind::FunctionRef { dest, function })
    }

    pub fn global_addr(&mut self, global: IrGlobalId) -> IrId {
        self.emit_valued(|dest| IrInstKind::GlobalAddr { dest, global })
    }

    pub fn struct_extract(&mut self, operand: IrId, index: u32) -> IrId {
        self.emit_valued(|dest| IrInstKind::StructExtract {
            dest,
            operand,
            index,
        })
    }

    pub fn tuple(&mut self, ty: IrType, elements: Vec<IrId>) -> IrId {
        self.emit_valued(|dest| IrInstKind::Tuple { dest, ty, elements })
    }

    pub fn begin_borrow(&mut self, operand: IrId) -> IrId {
        self.emit_valued(|dest| IrInstKind::BeginBorrow { dest, operand })
    }

    pub fn end_borrow(&mut self, operand: IrId) {
        self.emit(IrInstKind::EndBorrow { operand });
    }

    pub fn debug_value(&mut self, operand: IrId, name: impl Into<String>) {
        let name = name.into();
        self.emit(IrInstKind::DebugValue { operand, name });
    }

    /// Non-throwing call producing a result
    pub fn apply(&mut self, callee: IrId, args: Vec<IrId>) -> IrId {
        self.emit_valued(|dest| IrInstKind::Apply {
            dest: Some(dest),
            callee,
            args,
        })
    }

    /// Non-throwing call with no result
    pub fn apply_no_result(&mut self, callee: IrId, args: Vec<IrId>) {
        self.emit(IrInstKind::Apply {
            dest: None,
            callee,
            args,
        });
    }

    pub fn builtin(&mut self, name: impl Into<String>, args: Vec<IrId>, ty: IrType) -> IrId {
        let name = name.into();
        self.emit_valued(|dest| IrInstKind::Builtin {
            dest,
            name,
            args,
            ty,
        })
    }

    pub fn alloc_stack(&mut self, ty: IrType) -> IrId {
        self.emit_valued(|dest| IrInstKind::AllocStack { dest, ty })
    }

    pub fn dealloc_stack(&mut self, operand: IrId) {
        self.emit(IrInstKind::DeallocStack { operand });
    }

    pub fn metatype(&mut self, instance: IrType, representation: MetatypeRepresentation) -> IrId {
        let ty = IrType::metatype(instance, representation);
        self.emit_valued(|dest| IrInstKind::Metatype { dest, ty })
    }

    pub fn begin_access(
        &mut self,
        operand: IrId,
        kind: AccessKind,
        enforcement: AccessEnforcement,
    ) -> IrId {
        self.emit_valued(|dest| IrInstKind::BeginAccess {
            dest,
            operand,
            kind,
            enforcement,
        })
    }

    pub fn end_access(&mut self, operand: IrId, enforcement: AccessEnforcement) {
        self.emit(IrInstKind::EndAccess {
            operand,
            enforcement,
        });
    }

    pub fn load(&mut self, operand: IrId, ty: IrType) -> IrId {
        self.emit_valued(|dest| IrInstKind::Load { dest, operand, ty })
    }

    pub fn store(&mut self, value: IrId, operand: IrId) {
        self.emit(IrInstKind::Store { value, operand });
    }

    // === Terminators ===

    fn terminate(&mut self, kind: IrTermKind) {
        let loc = self.current_loc;
        let scope = self.current_scope;
        let block_id = self.current_block.expect("no insertion point");
        let func = self.current_function_mut();
        func.cfg
            .get_block_mut(block_id)
            .expect("insertion point block not found")
            .set_terminator(IrTerminator { kind, loc, scope });
    }

    pub fn br(&mut self, target: IrBlockId, args: Vec<IrId>) {
        self.terminate(IrTermKind::Branch { target, args });
    }

    pub fn cond_br(
        &mut self,
        condition: IrId,
        true_target: IrBlockId,
        true_args: Vec<IrId>,
        false_target: IrBlockId,
        false_args: Vec<IrId>,
    ) {
        self.terminate(IrTermKind::CondBranch {
            condition,
            true_target,
            true_args,
            false_target,
            false_args,
        });
    }

    pub fn ret(&mut self, value: Option<IrId>) {
        self.terminate(IrTermKind::Return { value });
    }

    pub fn throw(&mut self, value: IrId) {
        self.terminate(IrTermKind::Throw { value });
    }

    pub fn unreachable(&mut self) {
        self.terminate(IrTermKind::Unreachable);
    }

    /// Throwing call with explicit successors
    pub fn try_apply(
        &mut self,
        callee: IrId,
        args: Vec<IrId>,
        normal: IrBlockId,
        error: IrBlockId,
    ) {
        self.terminate(IrTermKind::TryApply {
            callee,
            args,
            normal,
            error,
        });
    }

    // === Access to the module ===

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut IrModule {
        &mut self.module
    }

    /// Finish building and take the module
    pub fn finish(self) -> IrModule {
        self.module
    }
}

impl<'a> FunctionBuilder<'a> {
    /// Add a parameter; ownership defaults by triviality of the type.
    pub fn param(self, name: impl Into<String>, ty: IrType) -> Self {
        let ownership = if ty.is_trivial() {
            OwnershipKind::Trivial
        } else {
            OwnershipKind::Owned
        };
        self.param_with_ownership(name, ty, ownership)
    }

    pub fn param_with_ownership(
        mut self,
        name: impl Into<String>,
        ty: IrType,
        ownership: OwnershipKind,
    ) -> Self {
        self.params.push(IrParameter {
            name: name.into(),
            ty,
            ownership,
        });
        self
    }

    pub fn returns(mut self, ty: IrType) -> Self {
        self.return_type = ty;
        self
    }

    pub fn throws(mut self) -> Self {
        self.throws = true;
        self
    }

    pub fn representation(mut self, representation: FunctionRepresentation) -> Self {
        self.representation = representation;
        self
    }

    pub fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Register the function with the module and return its id
    pub fn build(self) -> IrFunctionId {
        let signature = IrFunctionSignature {
            parameters: self.params,
            return_type: self.return_type,
            throws: self.throws,
        };
        let id = self
            .builder
            .module
            .create_function(self.name, signature, IrLocation::unknown());
        let func = self
            .builder
            .module
            .function_mut(id)
            .expect("freshly created function is missing");
        func.representation = self.representation;
        func.linkage = self.linkage;
        id
    }
}
