//! IR Functions
//!
//! A function is a signature plus a control flow graph. There is no
//! separate argument mechanism: the entry block's parameters are the
//! function's arguments, allocated when the function is created from its
//! signature.

use super::{
    FunctionRepresentation, IrBlockId, IrBlockParam, IrControlFlowGraph, IrId, IrScopeId, IrType,
    Linkage, OwnershipKind,
};
use serde::{Deserialize, Serialize};

/// Unique identifier for functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrFunctionId(pub u32);

impl std::fmt::Display for IrFunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// Declared parameter of a function signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrParameter {
    /// Parameter name
    pub name: String,

    /// Parameter type
    pub ty: IrType,

    /// Ownership convention for the argument value
    pub ownership: OwnershipKind,
}

/// Function signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrFunctionSignature {
    /// Parameter declarations; mirrored by the entry block's parameters
    pub parameters: Vec<IrParameter>,

    /// Return type
    pub return_type: IrType,

    /// Whether this function can throw
    pub throws: bool,
}

/// IR function representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrFunction {
    /// Unique identifier for this function
    pub id: IrFunctionId,

    /// Function name (mangled if necessary)
    pub name: String,

    /// Function signature
    pub signature: IrFunctionSignature,

    /// Where the implementation comes from (native / foreign)
    pub representation: FunctionRepresentation,

    /// Linkage type
    pub linkage: Linkage,

    /// Root debug scope of this function
    pub scope: IrScopeId,

    /// Control flow graph (function body)
    pub cfg: IrControlFlowGraph,

    /// Next available value ID
    pub next_reg_id: u32,

    /// Set once this function's body has been inlined somewhere, so that
    /// later passes keep its debug metadata alive until emission.
    pub has_been_inlined: bool,
}

impl IrFunction {
    /// Create a new function. The entry block receives one parameter per
    /// signature parameter; those parameters are the function's arguments.
    pub fn new(
        id: IrFunctionId,
        name: String,
        signature: IrFunctionSignature,
        scope: IrScopeId,
    ) -> Self {
        let mut function = Self {
            id,
            name,
            signature,
            representation: FunctionRepresentation::Native,
            linkage: Linkage::Private,
            scope,
            cfg: IrControlFlowGraph::new(),
            next_reg_id: 0,
            has_been_inlined: false,
        };

        let entry = function.cfg.entry_block;
        for i in 0..function.signature.parameters.len() {
            let value = function.alloc_reg();
            let param = &function.signature.parameters[i];
            let block_param = IrBlockParam {
                value,
                ty: param.ty.clone(),
                ownership: param.ownership,
            };
            function
                .cfg
                .get_block_mut(entry)
                .expect("fresh cfg is missing its entry block")
                .params
                .push(block_param);
        }

        function
    }

    /// Allocate a new value ID
    pub fn alloc_reg(&mut self) -> IrId {
        let id = IrId::new(self.next_reg_id);
        self.next_reg_id += 1;
        id
    }

    /// Get the entry block
    pub fn entry_block(&self) -> IrBlockId {
        self.cfg.entry_block
    }

    /// The function's arguments: the entry block's parameters.
    pub fn entry_params(&self) -> &[IrBlockParam] {
        match self.cfg.get_block(self.cfg.entry_block) {
            Some(entry) => &entry.params,
            None => &[],
        }
    }

    /// Get the argument value at `index`, if present
    pub fn param_value(&self, index: usize) -> Option<IrId> {
        self.entry_params().get(index).map(|p| p.value)
    }

    /// Rewrite every use of `old` to `new` across the whole body; returns
    /// the number of operands rewritten. Definitions are untouched.
    pub fn replace_all_uses(&mut self, old: IrId, new: IrId) -> usize {
        let mut count = 0;
        for block in self.cfg.blocks.values_mut() {
            for inst in &mut block.instructions {
                inst.kind.for_each_operand_mut(&mut |v| {
                    if *v == old {
                        *v = new;
                        count += 1;
                    }
                });
            }
            if let Some(term) = &mut block.terminator {
                term.kind.for_each_operand_mut(&mut |v| {
                    if *v == old {
                        *v = new;
                        count += 1;
                    }
                });
            }
        }
        count
    }

    /// Total number of instructions, terminators included
    pub fn instruction_count(&self) -> usize {
        self.cfg
            .blocks
            .values()
            .map(|b| b.instructions.len() + usize::from(b.terminator.is_some()))
            .sum()
    }
}
