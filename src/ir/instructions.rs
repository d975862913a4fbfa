//! IR Instructions
//!
//! Defines the instruction set for the intermediate representation.
//! Non-terminator instructions ([`IrInstKind`]) and terminators
//! ([`IrTermKind`]) are separate sum types: a basic block holds a sequence
//! of the former and exactly one of the latter. Both are wrapped in a
//! carrier struct that attaches a source location and a debug scope.

use super::{
    AccessEnforcement, AccessKind, IrBlockId, IrFunctionId, IrGlobalId, IrId, IrLocation,
    IrScopeId, IrType, OwnershipKind,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A non-terminator instruction with its attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrInstruction {
    pub kind: IrInstKind,
    pub loc: IrLocation,
    pub scope: Option<IrScopeId>,
}

impl IrInstruction {
    pub fn new(kind: IrInstKind) -> Self {
        Self {
            kind,
            loc: IrLocation::unknown(),
            scope: None,
        }
    }

    pub fn with_loc(mut self, loc: IrLocation) -> Self {
        self.loc = loc;
        self
    }

    pub fn with_scope(mut self, scope: IrScopeId) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// A terminator with its attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrTerminator {
    pub kind: IrTermKind,
    pub loc: IrLocation,
    pub scope: Option<IrScopeId>,
}

impl IrTerminator {
    pub fn new(kind: IrTermKind) -> Self {
        Self {
            kind,
            loc: IrLocation::unknown(),
            scope: None,
        }
    }

    pub fn with_loc(mut self, loc: IrLocation) -> Self {
        self.loc = loc;
        self
    }

    pub fn with_scope(mut self, scope: IrScopeId) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Non-terminator IR instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IrInstKind {
    // === Literals ===
    IntegerLiteral {
        dest: IrId,
        ty: IrType,
        value: i64,
    },
    FloatLiteral {
        dest: IrId,
        ty: IrType,
        bits: u64,
    },
    StringLiteral {
        dest: IrId,
        value: String,
    },
    /// String literal without an ABI type; consumed by builtins only
    UntypedStringLiteral {
        dest: IrId,
        value: String,
    },

    // === Lifetime and borrow markers ===
    FixLifetime {
        operand: IrId,
    },
    BeginBorrow {
        dest: IrId,
        operand: IrId,
    },
    EndBorrow {
        operand: IrId,
    },
    EndBorrowArgument {
        operand: IrId,
    },
    /// Marks `operand` as dependent on `base` without a runtime effect
    MarkDependence {
        dest: IrId,
        operand: IrId,
        base: IrId,
    },
    EndLifetime {
        operand: IrId,
    },
    UncheckedOwnershipConversion {
        dest: IrId,
        operand: IrId,
        result_ownership: OwnershipKind,
    },

    // === Function and global references ===
    FunctionRef {
        dest: IrId,
        function: IrFunctionId,
    },
    GlobalAddr {
        dest: IrId,
        global: IrGlobalId,
    },
    /// Initializes the storage of a global; produces nothing
    AllocGlobal {
        global: IrGlobalId,
    },

    // === Typed address projections ===
    TupleElementAddr {
        dest: IrId,
        operand: IrId,
        index: u32,
    },
    StructElementAddr {
        dest: IrId,
        operand: IrId,
        index: u32,
    },
    ProjectBlockStorage {
        dest: IrId,
        operand: IrId,
    },

    // === Aggregate construction and extraction ===
    Tuple {
        dest: IrId,
        ty: IrType,
        elements: Vec<IrId>,
    },
    TupleExtract {
        dest: IrId,
        operand: IrId,
        index: u32,
    },
    Struct {
        dest: IrId,
        ty: IrType,
        elements: Vec<IrId>,
    },
    StructExtract {
        dest: IrId,
        operand: IrId,
        index: u32,
    },

    // === Unchecked bit-pattern casts ===
    Upcast {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    AddressToPointer {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    PointerToAddress {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    UncheckedRefCast {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    UncheckedAddrCast {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    UncheckedTrivialBitCast {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    UncheckedBitwiseCast {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    RefToRawPointer {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    RawPointerToRef {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    ConvertFunction {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    ThinFunctionToPointer {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    PointerToThinFunction {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    BridgeObjectToWord {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },

    // === Metatypes and foreign descriptors ===
    /// Reference to a foreign protocol descriptor
    ForeignProtocolRef {
        dest: IrId,
        protocol: String,
    },
    ExistentialMetatypeToObject {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    MetatypeToObject {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    /// Materializes the metatype named by `ty` (an `IrType::Metatype`)
    Metatype {
        dest: IrId,
        ty: IrType,
    },
    ThickToForeignMetatype {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    ForeignToThickMetatype {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },

    // === Formal memory access markers ===
    BeginAccess {
        dest: IrId,
        operand: IrId,
        kind: AccessKind,
        enforcement: AccessEnforcement,
    },
    EndAccess {
        operand: IrId,
        enforcement: AccessEnforcement,
    },
    BeginUnpairedAccess {
        operand: IrId,
        buffer: IrId,
        kind: AccessKind,
        enforcement: AccessEnforcement,
    },
    EndUnpairedAccess {
        enforcement: AccessEnforcement,
    },

    // === Builtins ===
    Builtin {
        dest: IrId,
        name: String,
        args: Vec<IrId>,
        ty: IrType,
    },

    // === Calls ===
    /// Non-throwing call of a function value
    Apply {
        dest: Option<IrId>,
        callee: IrId,
        args: Vec<IrId>,
    },
    PartialApply {
        dest: IrId,
        callee: IrId,
        args: Vec<IrId>,
    },

    // === Allocation and deallocation ===
    AllocStack {
        dest: IrId,
        ty: IrType,
    },
    AllocBox {
        dest: IrId,
        ty: IrType,
    },
    AllocRef {
        dest: IrId,
        ty: IrType,
    },
    AllocExistentialBox {
        dest: IrId,
        existential_ty: IrType,
        concrete_ty: IrType,
    },
    AllocValueBuffer {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    DeallocStack {
        operand: IrId,
    },
    DeallocBox {
        operand: IrId,
    },
    DeallocRef {
        operand: IrId,
    },
    DeallocExistentialBox {
        operand: IrId,
    },
    DeallocValueBuffer {
        operand: IrId,
        ty: IrType,
    },

    // === Reference counting ===
    StrongRetain {
        operand: IrId,
    },
    StrongRelease {
        operand: IrId,
    },
    RetainValue {
        operand: IrId,
    },
    ReleaseValue {
        operand: IrId,
    },
    UnownedRetain {
        operand: IrId,
    },
    UnownedRelease {
        operand: IrId,
    },

    // === Memory ===
    Load {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    Store {
        value: IrId,
        operand: IrId,
    },

    // === Enums ===
    Enum {
        dest: IrId,
        ty: IrType,
        case_index: u32,
        payload: Option<IrId>,
    },
    UncheckedEnumData {
        dest: IrId,
        operand: IrId,
        case_index: u32,
    },
    InitEnumDataAddr {
        dest: IrId,
        operand: IrId,
        case_index: u32,
    },
    InjectEnumAddr {
        operand: IrId,
        case_index: u32,
    },

    // === Dynamic casts ===
    UnconditionalCheckedCast {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },

    // === Method dispatch ===
    ClassMethod {
        dest: IrId,
        operand: IrId,
        method: String,
        ty: IrType,
    },
    SuperMethod {
        dest: IrId,
        operand: IrId,
        method: String,
        ty: IrType,
    },
    WitnessMethod {
        dest: IrId,
        lookup_ty: IrType,
        method: String,
        ty: IrType,
    },
    DynamicMethod {
        dest: IrId,
        operand: IrId,
        method: String,
        ty: IrType,
    },

    // === Key paths ===
    KeyPath {
        dest: IrId,
        ty: IrType,
        operands: Vec<IrId>,
    },

    // === Existentials ===
    OpenExistentialAddr {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    OpenExistentialRef {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },
    InitExistentialAddr {
        dest: IrId,
        operand: IrId,
        concrete_ty: IrType,
    },
    InitExistentialRef {
        dest: IrId,
        operand: IrId,
        concrete_ty: IrType,
        ty: IrType,
    },

    // === Bridge object conversions ===
    RefToBridgeObject {
        dest: IrId,
        operand: IrId,
        bits: IrId,
    },
    BridgeObjectToRef {
        dest: IrId,
        operand: IrId,
        ty: IrType,
    },

    // === Debug information ===
    /// Associates a value with a named source variable; no runtime effect
    DebugValue {
        operand: IrId,
        name: String,
    },

    // === Raw-form only ===
    /// Legal only before canonicalization; must not reach the cost model
    MarkUninitialized {
        dest: IrId,
        operand: IrId,
    },
}

/// Terminator instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IrTermKind {
    /// Unconditional branch, passing arguments to the target's parameters
    Branch {
        target: IrBlockId,
        args: Vec<IrId>,
    },

    /// Two-way branch on a boolean value
    CondBranch {
        condition: IrId,
        true_target: IrBlockId,
        true_args: Vec<IrId>,
        false_target: IrBlockId,
        false_args: Vec<IrId>,
    },

    /// Multi-way branch on an integer value
    SwitchValue {
        operand: IrId,
        cases: Vec<(i64, IrBlockId)>,
        default: Option<IrBlockId>,
    },

    /// Multi-way branch on an enum discriminant
    SwitchEnum {
        operand: IrId,
        cases: Vec<(u32, IrBlockId)>,
        default: Option<IrBlockId>,
    },

    /// Return from the function
    Return {
        value: Option<IrId>,
    },

    /// Propagate an error to the caller
    Throw {
        value: IrId,
    },

    /// Control cannot reach this point
    Unreachable,

    /// Throwing call with explicit normal and error successors; each
    /// successor takes one parameter (the result or the error value)
    TryApply {
        callee: IrId,
        args: Vec<IrId>,
        normal: IrBlockId,
        error: IrBlockId,
    },

    /// Conditional dynamic cast; the success block's parameter receives
    /// the cast value
    CheckedCastBranch {
        operand: IrId,
        target_ty: IrType,
        success: IrBlockId,
        failure: IrBlockId,
    },
}

impl IrInstKind {
    /// Textual name of the instruction, as used by the dump.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            IrInstKind::IntegerLiteral { .. } => "integer_literal",
            IrInstKind::FloatLiteral { .. } => "float_literal",
            IrInstKind::StringLiteral { .. } => "string_literal",
            IrInstKind::UntypedStringLiteral { .. } => "untyped_string_literal",
            IrInstKind::FixLifetime { .. } => "fix_lifetime",
            IrInstKind::BeginBorrow { .. } => "begin_borrow",
            IrInstKind::EndBorrow { .. } => "end_borrow",
            IrInstKind::EndBorrowArgument { .. } => "end_borrow_argument",
            IrInstKind::MarkDependence { .. } => "mark_dependence",
            IrInstKind::EndLifetime { .. } => "end_lifetime",
            IrInstKind::UncheckedOwnershipConversion { .. } => "unchecked_ownership_conversion",
            IrInstKind::FunctionRef { .. } => "function_ref",
            IrInstKind::GlobalAddr { .. } => "global_addr",
            IrInstKind::AllocGlobal { .. } => "alloc_global",
            IrInstKind::TupleElementAddr { .. } => "tuple_element_addr",
            IrInstKind::StructElementAddr { .. } => "struct_element_addr",
            IrInstKind::ProjectBlockStorage { .. } => "project_block_storage",
            IrInstKind::Tuple { .. } => "tuple",
            IrInstKind::TupleExtract { .. } => "tuple_extract",
            IrInstKind::Struct { .. } => "struct",
            IrInstKind::StructExtract { .. } => "struct_extract",
            IrInstKind::Upcast { .. } => "upcast",
            IrInstKind::AddressToPointer { .. } => "address_to_pointer",
            IrInstKind::PointerToAddress { .. } => "pointer_to_address",
            IrInstKind::UncheckedRefCast { .. } => "unchecked_ref_cast",
            IrInstKind::UncheckedAddrCast { .. } => "unchecked_addr_cast",
            IrInstKind::UncheckedTrivialBitCast { .. } => "unchecked_trivial_bit_cast",
            IrInstKind::UncheckedBitwiseCast { .. } => "unchecked_bitwise_cast",
            IrInstKind::RefToRawPointer { .. } => "ref_to_raw_pointer",
            IrInstKind::RawPointerToRef { .. } => "raw_pointer_to_ref",
            IrInstKind::ConvertFunction { .. } => "convert_function",
            IrInstKind::ThinFunctionToPointer { .. } => "thin_function_to_pointer",
            IrInstKind::PointerToThinFunction { .. } => "pointer_to_thin_function",
            IrInstKind::BridgeObjectToWord { .. } => "bridge_object_to_word",
            IrInstKind::ForeignProtocolRef { .. } => "foreign_protocol_ref",
            IrInstKind::ExistentialMetatypeToObject { .. } => "existential_metatype_to_object",
            IrInstKind::MetatypeToObject { .. } => "metatype_to_object",
            IrInstKind::Metatype { .. } => "metatype",
            IrInstKind::ThickToForeignMetatype { .. } => "thick_to_foreign_metatype",
            IrInstKind::ForeignToThickMetatype { .. } => "foreign_to_thick_metatype",
            IrInstKind::BeginAccess { .. } => "begin_access",
            IrInstKind::EndAccess { .. } => "end_access",
            IrInstKind::BeginUnpairedAccess { .. } => "begin_unpaired_access",
            IrInstKind::EndUnpairedAccess { .. } => "end_unpaired_access",
            IrInstKind::Builtin { .. } => "builtin",
            IrInstKind::Apply { .. } => "apply",
            IrInstKind::PartialApply { .. } => "partial_apply",
            IrInstKind::AllocStack { .. } => "alloc_stack",
            IrInstKind::AllocBox { .. } => "alloc_box",
            IrInstKind::AllocRef { .. } => "alloc_ref",
            IrInstKind::AllocExistentialBox { .. } => "alloc_existential_box",
            IrInstKind::AllocValueBuffer { .. } => "alloc_value_buffer",
            IrInstKind::DeallocStack { .. } => "dealloc_stack",
            IrInstKind::DeallocBox { .. } => "dealloc_box",
            IrInstKind::DeallocRef { .. } => "dealloc_ref",
            IrInstKind::DeallocExistentialBox { .. } => "dealloc_existential_box",
            IrInstKind::DeallocValueBuffer { .. } => "dealloc_value_buffer",
            IrInstKind::StrongRetain { .. } => "strong_retain",
            IrInstKind::StrongRelease { .. } => "strong_release",
            IrInstKind::RetainValue { .. } => "retain_value",
            IrInstKind::ReleaseValue { .. } => "release_value",
            IrInstKind::UnownedRetain { .. } => "unowned_retain",
            IrInstKind::UnownedRelease { .. } => "unowned_release",
            IrInstKind::Load { .. } => "load",
            IrInstKind::Store { .. } => "store",
            IrInstKind::Enum { .. } => "enum",
            IrInstKind::UncheckedEnumData { .. } => "unchecked_enum_data",
            IrInstKind::InitEnumDataAddr { .. } => "init_enum_data_addr",
            IrInstKind::InjectEnumAddr { .. } => "inject_enum_addr",
            IrInstKind::UnconditionalCheckedCast { .. } => "unconditional_checked_cast",
            IrInstKind::ClassMethod { .. } => "class_method",
            IrInstKind::SuperMethod { .. } => "super_method",
            IrInstKind::WitnessMethod { .. } => "witness_method",
            IrInstKind::DynamicMethod { .. } => "dynamic_method",
            IrInstKind::KeyPath { .. } => "keypath",
            IrInstKind::OpenExistentialAddr { .. } => "open_existential_addr",
            IrInstKind::OpenExistentialRef { .. } => "open_existential_ref",
            IrInstKind::InitExistentialAddr { .. } => "init_existential_addr",
            IrInstKind::InitExistentialRef { .. } => "init_existential_ref",
            IrInstKind::RefToBridgeObject { .. } => "ref_to_bridge_object",
            IrInstKind::BridgeObjectToRef { .. } => "bridge_object_to_ref",
            IrInstKind::DebugValue { .. } => "debug_value",
            IrInstKind::MarkUninitialized { .. } => "mark_uninitialized",
        }
    }

    /// Get the result value if this instruction produces one.
    pub fn dest(&self) -> Option<IrId> {
        match self {
            IrInstKind::IntegerLiteral { dest, .. }
            | IrInstKind::FloatLiteral { dest, .. }
            | IrInstKind::StringLiteral { dest, .. }
            | IrInstKind::UntypedStringLiteral { dest, .. }
            | IrInstKind::BeginBorrow { dest, .. }
            | IrInstKind::MarkDependence { dest, .. }
            | IrInstKind::UncheckedOwnershipConversion { dest, .. }
            | IrInstKind::FunctionRef { dest, .. }
            | IrInstKind::GlobalAddr { dest, .. }
            | IrInstKind::TupleElementAddr { dest, .. }
            | IrInstKind::StructElementAddr { dest, .. }
            | IrInstKind::ProjectBlockStorage { dest, .. }
            | IrInstKind::Tuple { dest, .. }
            | IrInstKind::TupleExtract { dest, .. }
            | IrInstKind::Struct { dest, .. }
            | IrInstKind::StructExtract { dest, .. }
            | IrInstKind::Upcast { dest, .. }
            | IrInstKind::AddressToPointer { dest, .. }
            | IrInstKind::PointerToAddress { dest, .. }
            | IrInstKind::UncheckedRefCast { dest, .. }
            | IrInstKind::UncheckedAddrCast { dest, .. }
            | IrInstKind::UncheckedTrivialBitCast { dest, .. }
            | IrInstKind::UncheckedBitwiseCast { dest, .. }
            | IrInstKind::RefToRawPointer { dest, .. }
            | IrInstKind::RawPointerToRef { dest, .. }
            | IrInstKind::ConvertFunction { dest, .. }
            | IrInstKind::ThinFunctionToPointer { dest, .. }
            | IrInstKind::PointerToThinFunction { dest, .. }
            | IrInstKind::BridgeObjectToWord { dest, .. }
            | IrInstKind::ForeignProtocolRef { dest, .. }
            | IrInstKind::ExistentialMetatypeToObject { dest, .. }
            | IrInstKind::MetatypeToObject { dest, .. }
            | IrInstKind::Metatype { dest, .. }
            | IrInstKind::ThickToForeignMetatype { dest, .. }
            | IrInstKind::ForeignToThickMetatype { dest, .. }
            | IrInstKind::BeginAccess { dest, .. }
            | IrInstKind::Builtin { dest, .. }
            | IrInstKind::PartialApply { dest, .. }
            | IrInstKind::AllocStack { dest, .. }
            | IrInstKind::AllocBox { dest, .. }
            | IrInstKind::AllocRef { dest, .. }
            | IrInstKind::AllocExistentialBox { dest, .. }
            | IrInstKind::AllocValueBuffer { dest, .. }
            | IrInstKind::Load { dest, .. }
            | IrInstKind::Enum { dest, .. }
            | IrInstKind::UncheckedEnumData { dest, .. }
            | IrInstKind::InitEnumDataAddr { dest, .. }
            | IrInstKind::UnconditionalCheckedCast { dest, .. }
            | IrInstKind::ClassMethod { dest, .. }
            | IrInstKind::SuperMethod { dest, .. }
            | IrInstKind::WitnessMethod { dest, .. }
            | IrInstKind::DynamicMethod { dest, .. }
            | IrInstKind::KeyPath { dest, .. }
            | IrInstKind::OpenExistentialAddr { dest, .. }
            | IrInstKind::OpenExistentialRef { dest, .. }
            | IrInstKind::InitExistentialAddr { dest, .. }
            | IrInstKind::InitExistentialRef { dest, .. }
            | IrInstKind::RefToBridgeObject { dest, .. }
            | IrInstKind::BridgeObjectToRef { dest, .. }
            | IrInstKind::MarkUninitialized { dest, .. } => Some(*dest),

            IrInstKind::Apply { dest, .. } => *dest,

            IrInstKind::FixLifetime { .. }
            | IrInstKind::EndBorrow { .. }
            | IrInstKind::EndBorrowArgument { .. }
            | IrInstKind::EndLifetime { .. }
            | IrInstKind::AllocGlobal { .. }
            | IrInstKind::EndAccess { .. }
            | IrInstKind::BeginUnpairedAccess { .. }
            | IrInstKind::EndUnpairedAccess { .. }
            | IrInstKind::DeallocStack { .. }
            | IrInstKind::DeallocBox { .. }
            | IrInstKind::DeallocRef { .. }
            | IrInstKind::DeallocExistentialBox { .. }
            | IrInstKind::DeallocValueBuffer { .. }
            | IrInstKind::StrongRetain { .. }
            | IrInstKind::StrongRelease { .. }
            | IrInstKind::RetainValue { .. }
            | IrInstKind::ReleaseValue { .. }
            | IrInstKind::UnownedRetain { .. }
            | IrInstKind::UnownedRelease { .. }
            | IrInstKind::Store { .. }
            | IrInstKind::InjectEnumAddr { .. }
            | IrInstKind::DebugValue { .. } => None,
        }
    }

    /// Overwrite the result value. Panics if the instruction produces none.
    pub fn set_dest(&mut self, value: IrId) {
        let name = self.mnemonic();
        match self {
            IrInstKind::IntegerLiteral { dest, .. }
            | IrInstKind::FloatLiteral { dest, .. }
            | IrInstKind::StringLiteral { dest, .. }
            | IrInstKind::UntypedStringLiteral { dest, .. }
            | IrInstKind::BeginBorrow { dest, .. }
            | IrInstKind::MarkDependence { dest, .. }
            | IrInstKind::UncheckedOwnershipConversion { dest, .. }
            | IrInstKind::FunctionRef { dest, .. }
            | IrInstKind::GlobalAddr { dest, .. }
            | IrInstKind::TupleElementAddr { dest, .. }
            | IrInstKind::StructElementAddr { dest, .. }
            | IrInstKind::ProjectBlockStorage { dest, .. }
            | IrInstKind::Tuple { dest, .. }
            | IrInstKind::TupleExtract { dest, .. }
            | IrInstKind::Struct { dest, .. }
            | IrInstKind::StructExtract { dest, .. }
            | IrInstKind::Upcast { dest, .. }
            | IrInstKind::AddressToPointer { dest, .. }
            | IrInstKind::PointerToAddress { dest, .. }
            | IrInstKind::UncheckedRefCast { dest, .. }
            | IrInstKind::UncheckedAddrCast { dest, .. }
            | IrInstKind::UncheckedTrivialBitCast { dest, .. }
            | IrInstKind::UncheckedBitwiseCast { dest, .. }
            | IrInstKind::RefToRawPointer { dest, .. }
            | IrInstKind::RawPointerToRef { dest, .. }
            | IrInstKind::ConvertFunction { dest, .. }
            | IrInstKind::ThinFunctionToPointer { dest, .. }
            | IrInstKind::PointerToThinFunction { dest, .. }
            | IrInstKind::BridgeObjectToWord { dest, .. }
            | IrInstKind::ForeignProtocolRef { dest, .. }
            | IrInstKind::ExistentialMetatypeToObject { dest, .. }
            | IrInstKind::MetatypeToObject { dest, .. }
            | IrInstKind::Metatype { dest, .. }
            | IrInstKind::ThickToForeignMetatype { dest, .. }
            | IrInstKind::ForeignToThickMetatype { dest, .. }
            | IrInstKind::BeginAccess { dest, .. }
            | IrInstKind::Builtin { dest, .. }
            | IrInstKind::PartialApply { dest, .. }
            | IrInstKind::AllocStack { dest, .. }
            | IrInstKind::AllocBox { dest, .. }
            | IrInstKind::AllocRef { dest, .. }
            | IrInstKind::AllocExistentialBox { dest, .. }
            | IrInstKind::AllocValueBuffer { dest, .. }
            | IrInstKind::Load { dest, .. }
            | IrInstKind::Enum { dest, .. }
            | IrInstKind::UncheckedEnumData { dest, .. }
            | IrInstKind::InitEnumDataAddr { dest, .. }
            | IrInstKind::UnconditionalCheckedCast { dest, .. }
            | IrInstKind::ClassMethod { dest, .. }
            | IrInstKind::SuperMethod { dest, .. }
            | IrInstKind::WitnessMethod { dest, .. }
            | IrInstKind::DynamicMethod { dest, .. }
            | IrInstKind::KeyPath { dest, .. }
            | IrInstKind::OpenExistentialAddr { dest, .. }
            | IrInstKind::OpenExistentialRef { dest, .. }
            | IrInstKind::InitExistentialAddr { dest, .. }
            | IrInstKind::InitExistentialRef { dest, .. }
            | IrInstKind::RefToBridgeObject { dest, .. }
            | IrInstKind::BridgeObjectToRef { dest, .. }
            | IrInstKind::MarkUninitialized { dest, .. } => *dest = value,

            IrInstKind::Apply { dest, .. } => *dest = Some(value),

            _ => panic!("{} produces no result", name),
        }
    }

    /// Apply `f` to every value operand. Results (`dest`) are not visited.
    pub fn for_each_operand_mut(&mut self, f: &mut dyn FnMut(&mut IrId)) {
        match self {
            // No value operands
            IrInstKind::IntegerLiteral { .. }
            | IrInstKind::FloatLiteral { .. }
            | IrInstKind::StringLiteral { .. }
            | IrInstKind::UntypedStringLiteral { .. }
            | IrInstKind::FunctionRef { .. }
            | IrInstKind::GlobalAddr { .. }
            | IrInstKind::AllocGlobal { .. }
            | IrInstKind::ForeignProtocolRef { .. }
            | IrInstKind::Metatype { .. }
            | IrInstKind::AllocStack { .. }
            | IrInstKind::AllocBox { .. }
            | IrInstKind::AllocRef { .. }
            | IrInstKind::AllocExistentialBox { .. }
            | IrInstKind::EndUnpairedAccess { .. }
            | IrInstKind::WitnessMethod { .. } => {}

            // Single operand
            IrInstKind::FixLifetime { operand }
            | IrInstKind::BeginBorrow { operand, .. }
            | IrInstKind::EndBorrow { operand }
            | IrInstKind::EndBorrowArgument { operand }
            | IrInstKind::EndLifetime { operand }
            | IrInstKind::UncheckedOwnershipConversion { operand, .. }
            | IrInstKind::TupleElementAddr { operand, .. }
            | IrInstKind::StructElementAddr { operand, .. }
            | IrInstKind::ProjectBlockStorage { operand, .. }
            | IrInstKind::TupleExtract { operand, .. }
            | IrInstKind::StructExtract { operand, .. }
            | IrInstKind::Upcast { operand, .. }
            | IrInstKind::AddressToPointer { operand, .. }
            | IrInstKind::PointerToAddress { operand, .. }
            | IrInstKind::UncheckedRefCast { operand, .. }
            | IrInstKind::UncheckedAddrCast { operand, .. }
            | IrInstKind::UncheckedTrivialBitCast { operand, .. }
            | IrInstKind::UncheckedBitwiseCast { operand, .. }
            | IrInstKind::RefToRawPointer { operand, .. }
            | IrInstKind::RawPointerToRef { operand, .. }
            | IrInstKind::ConvertFunction { operand, .. }
            | IrInstKind::ThinFunctionToPointer { operand, .. }
            | IrInstKind::PointerToThinFunction { operand, .. }
            | IrInstKind::BridgeObjectToWord { operand, .. }
            | IrInstKind::ExistentialMetatypeToObject { operand, .. }
            | IrInstKind::MetatypeToObject { operand, .. }
            | IrInstKind::ThickToForeignMetatype { operand, .. }
            | IrInstKind::ForeignToThickMetatype { operand, .. }
            | IrInstKind::BeginAccess { operand, .. }
            | IrInstKind::EndAccess { operand, .. }
            | IrInstKind::AllocValueBuffer { operand, .. }
            | IrInstKind::DeallocStack { operand }
            | IrInstKind::DeallocBox { operand }
            | IrInstKind::DeallocRef { operand }
            | IrInstKind::DeallocExistentialBox { operand }
            | IrInstKind::DeallocValueBuffer { operand, .. }
            | IrInstKind::StrongRetain { operand }
            | IrInstKind::StrongRelease { operand }
            | IrInstKind::RetainValue { operand }
            | IrInstKind::ReleaseValue { operand }
            | IrInstKind::UnownedRetain { operand }
            | IrInstKind::UnownedRelease { operand }
            | IrInstKind::Load { operand, .. }
            | IrInstKind::UncheckedEnumData { operand, .. }
            | IrInstKind::InitEnumDataAddr { operand, .. }
            | IrInstKind::InjectEnumAddr { operand, .. }
            | IrInstKind::UnconditionalCheckedCast { operand, .. }
            | IrInstKind::ClassMethod { operand, .. }
            | IrInstKind::SuperMethod { operand, .. }
            | IrInstKind::DynamicMethod { operand, .. }
            | IrInstKind::OpenExistentialAddr { operand, .. }
            | IrInstKind::OpenExistentialRef { operand, .. }
            | IrInstKind::InitExistentialAddr { operand, .. }
            | IrInstKind::InitExistentialRef { operand, .. }
            | IrInstKind::BridgeObjectToRef { operand, .. }
            | IrInstKind::DebugValue { operand, .. }
            | IrInstKind::MarkUninitialized { operand, .. } => f(operand),

            // Two operands
            IrInstKind::MarkDependence { operand, base, .. } => {
                f(operand);
                f(base);
            }
            IrInstKind::BeginUnpairedAccess {
                operand, buffer, ..
            } => {
                f(operand);
                f(buffer);
            }
            IrInstKind::Store { value, operand } => {
                f(value);
                f(operand);
            }
            IrInstKind::RefToBridgeObject { operand, bits, .. } => {
                f(operand);
                f(bits);
            }

            // Operand lists
            IrInstKind::Tuple { elements, .. } | IrInstKind::Struct { elements, .. } => {
                for e in elements {
                    f(e);
                }
            }
            IrInstKind::Builtin { args, .. } => {
                for a in args {
                    f(a);
                }
            }
            IrInstKind::Apply { callee, args, .. }
            | IrInstKind::PartialApply { callee, args, .. } => {
                f(callee);
                for a in args {
                    f(a);
                }
            }
            IrInstKind::KeyPath { operands, .. } => {
                for o in operands {
                    f(o);
                }
            }
            IrInstKind::Enum { payload, .. } => {
                if let Some(p) = payload {
                    f(p);
                }
            }
        }
    }

    /// Get all values used by this instruction.
    pub fn uses(&self) -> SmallVec<[IrId; 4]> {
        let mut out = SmallVec::new();
        let mut clone = self.clone();
        clone.for_each_operand_mut(&mut |v| out.push(*v));
        out
    }

    /// Pure debug annotation with no runtime effect.
    pub fn is_debug_annotation(&self) -> bool {
        matches!(self, IrInstKind::DebugValue { .. })
    }
}

impl IrTermKind {
    /// Textual name of the terminator, as used by the dump.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            IrTermKind::Branch { .. } => "br",
            IrTermKind::CondBranch { .. } => "cond_br",
            IrTermKind::SwitchValue { .. } => "switch_value",
            IrTermKind::SwitchEnum { .. } => "switch_enum",
            IrTermKind::Return { .. } => "return",
            IrTermKind::Throw { .. } => "throw",
            IrTermKind::Unreachable => "unreachable",
            IrTermKind::TryApply { .. } => "try_apply",
            IrTermKind::CheckedCastBranch { .. } => "checked_cast_br",
        }
    }

    /// Successor blocks, in branch order.
    pub fn successors(&self) -> SmallVec<[IrBlockId; 2]> {
        let mut out = SmallVec::new();
        match self {
            IrTermKind::Branch { target, .. } => out.push(*target),
            IrTermKind::CondBranch {
                true_target,
                false_target,
                ..
            } => {
                out.push(*true_target);
                out.push(*false_target);
            }
            IrTermKind::SwitchValue { cases, default, .. } => {
                out.extend(cases.iter().map(|(_, b)| *b));
                if let Some(d) = default {
                    out.push(*d);
                }
            }
            IrTermKind::SwitchEnum { cases, default, .. } => {
                out.extend(cases.iter().map(|(_, b)| *b));
                if let Some(d) = default {
                    out.push(*d);
                }
            }
            IrTermKind::Return { .. } | IrTermKind::Throw { .. } | IrTermKind::Unreachable => {}
            IrTermKind::TryApply { normal, error, .. } => {
                out.push(*normal);
                out.push(*error);
            }
            IrTermKind::CheckedCastBranch {
                success, failure, ..
            } => {
                out.push(*success);
                out.push(*failure);
            }
        }
        out
    }

    /// Apply `f` to every successor block reference.
    pub fn for_each_successor_mut(&mut self, f: &mut dyn FnMut(&mut IrBlockId)) {
        match self {
            IrTermKind::Branch { target, .. } => f(target),
            IrTermKind::CondBranch {
                true_target,
                false_target,
                ..
            } => {
                f(true_target);
                f(false_target);
            }
            IrTermKind::SwitchValue { cases, default, .. } => {
                for (_, b) in cases {
                    f(b);
                }
                if let Some(d) = default {
                    f(d);
                }
            }
            IrTermKind::SwitchEnum { cases, default, .. } => {
                for (_, b) in cases {
                    f(b);
                }
                if let Some(d) = default {
                    f(d);
                }
            }
            IrTermKind::Return { .. } | IrTermKind::Throw { .. } | IrTermKind::Unreachable => {}
            IrTermKind::TryApply { normal, error, .. } => {
                f(normal);
                f(error);
            }
            IrTermKind::CheckedCastBranch {
                success, failure, ..
            } => {
                f(success);
                f(failure);
            }
        }
    }

    /// Apply `f` to every value operand.
    pub fn for_each_operand_mut(&mut self, f: &mut dyn FnMut(&mut IrId)) {
        match self {
            IrTermKind::Branch { args, .. } => {
                for a in args {
                    f(a);
                }
            }
            IrTermKind::CondBranch {
                condition,
                true_args,
                false_args,
                ..
            } => {
                f(condition);
                for a in true_args {
                    f(a);
                }
                for a in false_args {
                    f(a);
                }
            }
            IrTermKind::SwitchValue { operand, .. } | IrTermKind::SwitchEnum { operand, .. } => {
                f(operand)
            }
            IrTermKind::Return { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }
            IrTermKind::Throw { value } => f(value),
            IrTermKind::Unreachable => {}
            IrTermKind::TryApply { callee, args, .. } => {
                f(callee);
                for a in args {
                    f(a);
                }
            }
            IrTermKind::CheckedCastBranch { operand, .. } => f(operand),
        }
    }

    /// Get all values used by this terminator.
    pub fn uses(&self) -> SmallVec<[IrId; 4]> {
        let mut out = SmallVec::new();
        let mut clone = self.clone();
        clone.for_each_operand_mut(&mut |v| out.push(*v));
        out
    }

    /// Whether this terminator leaves the function entirely.
    pub fn is_function_exit(&self) -> bool {
        matches!(
            self,
            IrTermKind::Return { .. } | IrTermKind::Throw { .. } | IrTermKind::Unreachable
        )
    }
}
