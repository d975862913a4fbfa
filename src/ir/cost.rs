//! Inlining cost classification.
//!
//! Assigns every canonical instruction a cost class: `Free` approximates
//! instructions that lower to nothing or to a single trivial machine op,
//! `Expensive` approximates everything with real code size or runtime
//! cost. Inlining policies sum the classes over a callee to estimate code
//! growth; the classification itself is pure and stateless.

use super::{AccessEnforcement, IrFunction, IrInstKind, IrTermKind, IrType, MetatypeRepresentation};
use serde::{Deserialize, Serialize};

/// Cost class of a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineCost {
    /// Lowers to zero or one trivial machine operation
    Free,
    /// Carries real code-size or runtime cost
    Expensive,
}

/// Builtin identifiers the code generator turns into pure branch hints.
const BRANCH_HINT_PREFIX: &str = "int_expect";
const FAST_PATH_HINT: &str = "onFastPath";

/// Classify a non-terminator instruction.
///
/// Total over canonical instructions. Panics on instructions that are only
/// legal in raw, pre-canonical MIR and on access markers whose enforcement
/// was never inferred; reaching either from a costing pass is a bug in the
/// caller.
pub fn instruction_inline_cost(inst: &IrInstKind) -> InlineCost {
    match inst {
        // Literals
        IrInstKind::IntegerLiteral { .. }
        | IrInstKind::FloatLiteral { .. }
        | IrInstKind::StringLiteral { .. }
        | IrInstKind::UntypedStringLiteral { .. } => InlineCost::Free,

        // Lifetime and borrow markers
        IrInstKind::FixLifetime { .. }
        | IrInstKind::BeginBorrow { .. }
        | IrInstKind::EndBorrow { .. }
        | IrInstKind::EndBorrowArgument { .. }
        | IrInstKind::MarkDependence { .. }
        | IrInstKind::EndLifetime { .. }
        | IrInstKind::UncheckedOwnershipConversion { .. } => InlineCost::Free,

        // Symbol references and global storage
        IrInstKind::FunctionRef { .. }
        | IrInstKind::GlobalAddr { .. }
        | IrInstKind::AllocGlobal { .. } => InlineCost::Free,

        // Typed address projections
        IrInstKind::TupleElementAddr { .. }
        | IrInstKind::StructElementAddr { .. }
        | IrInstKind::ProjectBlockStorage { .. } => InlineCost::Free,

        // Tuple and struct construction/extraction are no-ops after lowering
        IrInstKind::Tuple { .. }
        | IrInstKind::TupleExtract { .. }
        | IrInstKind::Struct { .. }
        | IrInstKind::StructExtract { .. } => InlineCost::Free,

        // Unchecked bit-pattern casts
        IrInstKind::Upcast { .. }
        | IrInstKind::AddressToPointer { .. }
        | IrInstKind::PointerToAddress { .. }
        | IrInstKind::UncheckedRefCast { .. }
        | IrInstKind::UncheckedAddrCast { .. }
        | IrInstKind::UncheckedTrivialBitCast { .. }
        | IrInstKind::UncheckedBitwiseCast { .. }
        | IrInstKind::RefToRawPointer { .. }
        | IrInstKind::RawPointerToRef { .. }
        | IrInstKind::ConvertFunction { .. }
        | IrInstKind::ThinFunctionToPointer { .. }
        | IrInstKind::PointerToThinFunction { .. }
        | IrInstKind::BridgeObjectToWord { .. } => InlineCost::Free,

        // Foreign descriptor references and metatype-to-object conversions
        IrInstKind::ForeignProtocolRef { .. }
        | IrInstKind::ExistentialMetatypeToObject { .. }
        | IrInstKind::MetatypeToObject { .. } => InlineCost::Free,

        // Thin metatypes are compile-time constants. Everything else is
        // conservatively expensive, including thick instantiation.
        IrInstKind::Metatype { ty, .. } => match ty {
            IrType::Metatype {
                representation: MetatypeRepresentation::Thin,
                ..
            } => InlineCost::Free,
            _ => InlineCost::Expensive,
        },

        // Access markers cost whatever their enforcement costs
        IrInstKind::BeginAccess { enforcement, .. }
        | IrInstKind::EndAccess { enforcement, .. }
        | IrInstKind::BeginUnpairedAccess { enforcement, .. }
        | IrInstKind::EndUnpairedAccess { enforcement, .. } => match enforcement {
            AccessEnforcement::Static | AccessEnforcement::Unsafe => InlineCost::Free,
            AccessEnforcement::Dynamic => InlineCost::Expensive,
            AccessEnforcement::Unknown => {
                panic!("access enforcement must be inferred before costing")
            }
        },

        // Branch-hint builtins vanish during lowering
        IrInstKind::Builtin { name, .. } => {
            if name.starts_with(BRANCH_HINT_PREFIX) || name == FAST_PATH_HINT {
                InlineCost::Free
            } else {
                InlineCost::Expensive
            }
        }

        // The free set is closed; annotations fall through to the
        // catch-all like every other omission
        IrInstKind::DebugValue { .. } => InlineCost::Expensive,

        // Calls and partial applications
        IrInstKind::Apply { .. } | IrInstKind::PartialApply { .. } => InlineCost::Expensive,

        // Allocation and deallocation, on every domain
        IrInstKind::AllocStack { .. }
        | IrInstKind::AllocBox { .. }
        | IrInstKind::AllocRef { .. }
        | IrInstKind::AllocExistentialBox { .. }
        | IrInstKind::AllocValueBuffer { .. }
        | IrInstKind::DeallocStack { .. }
        | IrInstKind::DeallocBox { .. }
        | IrInstKind::DeallocRef { .. }
        | IrInstKind::DeallocExistentialBox { .. }
        | IrInstKind::DeallocValueBuffer { .. } => InlineCost::Expensive,

        // Reference counting, on every ownership flavor
        IrInstKind::StrongRetain { .. }
        | IrInstKind::StrongRelease { .. }
        | IrInstKind::RetainValue { .. }
        | IrInstKind::ReleaseValue { .. }
        | IrInstKind::UnownedRetain { .. }
        | IrInstKind::UnownedRelease { .. } => InlineCost::Expensive,

        // Typed memory traffic
        IrInstKind::Load { .. } | IrInstKind::Store { .. } => InlineCost::Expensive,

        // Enum construction and projection
        IrInstKind::Enum { .. }
        | IrInstKind::UncheckedEnumData { .. }
        | IrInstKind::InitEnumDataAddr { .. }
        | IrInstKind::InjectEnumAddr { .. } => InlineCost::Expensive,

        // Dynamic casts and dispatch
        IrInstKind::UnconditionalCheckedCast { .. }
        | IrInstKind::ClassMethod { .. }
        | IrInstKind::SuperMethod { .. }
        | IrInstKind::WitnessMethod { .. }
        | IrInstKind::DynamicMethod { .. } => InlineCost::Expensive,

        // Key paths
        IrInstKind::KeyPath { .. } => InlineCost::Expensive,

        // Existential opens and inits
        IrInstKind::OpenExistentialAddr { .. }
        | IrInstKind::OpenExistentialRef { .. }
        | IrInstKind::InitExistentialAddr { .. }
        | IrInstKind::InitExistentialRef { .. } => InlineCost::Expensive,

        // Narrowing bridge conversions and metatype rebridging
        IrInstKind::RefToBridgeObject { .. }
        | IrInstKind::BridgeObjectToRef { .. }
        | IrInstKind::ThickToForeignMetatype { .. }
        | IrInstKind::ForeignToThickMetatype { .. } => InlineCost::Expensive,

        IrInstKind::MarkUninitialized { .. } => {
            panic!("cannot cost an instruction that is only legal in raw MIR")
        }
    }
}

/// Classify a terminator.
pub fn terminator_inline_cost(term: &IrTermKind) -> InlineCost {
    match term {
        IrTermKind::Return { .. } | IrTermKind::Throw { .. } | IrTermKind::Unreachable => {
            InlineCost::Free
        }
        IrTermKind::Branch { .. }
        | IrTermKind::CondBranch { .. }
        | IrTermKind::SwitchValue { .. }
        | IrTermKind::SwitchEnum { .. }
        | IrTermKind::TryApply { .. }
        | IrTermKind::CheckedCastBranch { .. } => InlineCost::Expensive,
    }
}

/// Number of Expensive instructions in `function`; the code-growth
/// estimate an inlining policy compares against its threshold.
pub fn function_code_growth(function: &IrFunction) -> usize {
    let mut growth = 0;
    for block in function.cfg.blocks.values() {
        for inst in &block.instructions {
            if instruction_inline_cost(&inst.kind) == InlineCost::Expensive {
                growth += 1;
            }
        }
        if let Some(term) = &block.terminator {
            if terminator_inline_cost(&term.kind) == InlineCost::Expensive {
                growth += 1;
            }
        }
    }
    growth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AccessKind, IrId, IrType};

    fn v(n: u32) -> IrId {
        IrId::new(n)
    }

    #[test]
    fn test_literals_are_free() {
        assert_eq!(
            instruction_inline_cost(&IrInstKind::IntegerLiteral {
                dest: v(0),
                ty: IrType::I32,
                value: 5,
            }),
            InlineCost::Free
        );
        assert_eq!(
            instruction_inline_cost(&IrInstKind::StringLiteral {
                dest: v(0),
                value: "hi".into(),
            }),
            InlineCost::Free
        );
    }

    #[test]
    fn test_allocations_are_expensive() {
        assert_eq!(
            instruction_inline_cost(&IrInstKind::AllocStack {
                dest: v(0),
                ty: IrType::I64,
            }),
            InlineCost::Expensive
        );
        assert_eq!(
            instruction_inline_cost(&IrInstKind::StrongRetain { operand: v(1) }),
            InlineCost::Expensive
        );
        assert_eq!(
            instruction_inline_cost(&IrInstKind::Load {
                dest: v(0),
                operand: v(1),
                ty: IrType::I32,
            }),
            InlineCost::Expensive
        );
    }

    #[test]
    fn test_access_enforcement_refinement() {
        let access = |enforcement| IrInstKind::BeginAccess {
            dest: v(0),
            operand: v(1),
            kind: AccessKind::Read,
            enforcement,
        };
        assert_eq!(
            instruction_inline_cost(&access(AccessEnforcement::Static)),
            InlineCost::Free
        );
        assert_eq!(
            instruction_inline_cost(&access(AccessEnforcement::Unsafe)),
            InlineCost::Free
        );
        assert_eq!(
            instruction_inline_cost(&access(AccessEnforcement::Dynamic)),
            InlineCost::Expensive
        );
    }

    #[test]
    #[should_panic(expected = "enforcement must be inferred")]
    fn test_unknown_enforcement_is_a_bug() {
        instruction_inline_cost(&IrInstKind::EndAccess {
            operand: v(0),
            enforcement: AccessEnforcement::Unknown,
        });
    }

    #[test]
    fn test_metatype_representation_refinement() {
        let metatype = |representation| IrInstKind::Metatype {
            dest: v(0),
            ty: IrType::metatype(IrType::I32, representation),
        };
        assert_eq!(
            instruction_inline_cost(&metatype(MetatypeRepresentation::Thin)),
            InlineCost::Free
        );
        assert_eq!(
            instruction_inline_cost(&metatype(MetatypeRepresentation::Thick)),
            InlineCost::Expensive
        );
        assert_eq!(
            instruction_inline_cost(&metatype(MetatypeRepresentation::Foreign)),
            InlineCost::Expensive
        );
    }

    #[test]
    fn test_builtin_hint_refinement() {
        let builtin = |name: &str| IrInstKind::Builtin {
            dest: v(0),
            name: name.to_string(),
            args: vec![v(1)],
            ty: IrType::I32,
        };
        assert_eq!(
            instruction_inline_cost(&builtin("int_expect_Int1")),
            InlineCost::Free
        );
        assert_eq!(
            instruction_inline_cost(&builtin("onFastPath")),
            InlineCost::Free
        );
        assert_eq!(
            instruction_inline_cost(&builtin("add_Int32")),
            InlineCost::Expensive
        );
    }

    #[test]
    fn test_debug_annotations_are_not_free() {
        assert_eq!(
            instruction_inline_cost(&IrInstKind::DebugValue {
                operand: v(0),
                name: "x".into(),
            }),
            InlineCost::Expensive
        );
    }

    #[test]
    #[should_panic(expected = "raw MIR")]
    fn test_raw_only_instruction_is_a_bug() {
        instruction_inline_cost(&IrInstKind::MarkUninitialized {
            dest: v(0),
            operand: v(1),
        });
    }

    #[test]
    fn test_terminator_costs() {
        assert_eq!(
            terminator_inline_cost(&IrTermKind::Return { value: None }),
            InlineCost::Free
        );
        assert_eq!(
            terminator_inline_cost(&IrTermKind::Throw { value: v(0) }),
            InlineCost::Free
        );
        assert_eq!(
            terminator_inline_cost(&IrTermKind::Unreachable),
            InlineCost::Free
        );
        assert_eq!(
            terminator_inline_cost(&IrTermKind::SwitchEnum {
                operand: v(0),
                cases: vec![],
                default: None,
            }),
            InlineCost::Expensive
        );
    }

    #[test]
    fn test_classification_is_stable() {
        let inst = IrInstKind::Upcast {
            dest: v(0),
            operand: v(1),
            ty: IrType::Class { name: "Base".into() },
        };
        let first = instruction_inline_cost(&inst);
        for _ in 0..10 {
            assert_eq!(instruction_inline_cost(&inst), first);
        }
    }
}
