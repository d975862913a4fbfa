//! MIR structural validation.
//!
//! Checks the invariants transformations must preserve: every block is
//! terminated and reachable successors exist, branch arguments match the
//! target's parameters, every value is defined exactly once, and every use
//! names a defined value or the undefined sentinel. The validator never
//! panics; it collects everything it finds so tests can assert precisely.

use super::{IrBlockId, IrFunction, IrId, IrTermKind};
use fxhash::FxHashSet;
use std::fmt;

/// A structural defect found in a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A block has no terminator
    MissingTerminator { block: IrBlockId },

    /// A terminator names a block that does not exist
    UnknownSuccessor { from: IrBlockId, to: IrBlockId },

    /// A branch passes a different number of arguments than the target
    /// declares parameters
    BranchArityMismatch {
        from: IrBlockId,
        to: IrBlockId,
        expected: usize,
        found: usize,
    },

    /// A value is used but never defined
    UseOfUndefinedValue { block: IrBlockId, value: IrId },

    /// A value is defined more than once
    MultipleDefinitions { value: IrId },

    /// Something branches back to the entry block
    EntryHasPredecessor { pred: IrBlockId },

    /// The block order list disagrees with the block set
    BlockOrderMismatch,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingTerminator { block } => {
                write!(f, "block {} has no terminator", block)
            }
            ValidationError::UnknownSuccessor { from, to } => {
                write!(f, "block {} branches to non-existent block {}", from, to)
            }
            ValidationError::BranchArityMismatch {
                from,
                to,
                expected,
                found,
            } => write!(
                f,
                "branch {} -> {} passes {} arguments, target declares {} parameters",
                from, to, found, expected
            ),
            ValidationError::UseOfUndefinedValue { block, value } => {
                write!(f, "block {} uses undefined value {}", block, value)
            }
            ValidationError::MultipleDefinitions { value } => {
                write!(f, "value {} is defined more than once", value)
            }
            ValidationError::EntryHasPredecessor { pred } => {
                write!(f, "entry block has predecessor {}", pred)
            }
            ValidationError::BlockOrderMismatch => {
                write!(f, "block order disagrees with the block set")
            }
        }
    }
}

/// Validate one function. Returns all defects found.
pub fn validate_function(func: &IrFunction) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Block order must be a permutation of the block set.
    let mut seen_order: FxHashSet<IrBlockId> = FxHashSet::default();
    for &b in &func.cfg.block_order {
        if !seen_order.insert(b) || !func.cfg.blocks.contains_key(&b) {
            errors.push(ValidationError::BlockOrderMismatch);
        }
    }
    if seen_order.len() != func.cfg.blocks.len() {
        errors.push(ValidationError::BlockOrderMismatch);
    }

    // Collect definitions: block parameters and instruction results.
    let mut defined: FxHashSet<IrId> = FxHashSet::default();
    let mut define = |value: IrId, errors: &mut Vec<ValidationError>| {
        if !defined.insert(value) {
            errors.push(ValidationError::MultipleDefinitions { value });
        }
    };
    for &block_id in &func.cfg.block_order {
        let Some(block) = func.cfg.get_block(block_id) else {
            continue;
        };
        for param in &block.params {
            define(param.value, &mut errors);
        }
        for inst in &block.instructions {
            if let Some(dest) = inst.kind.dest() {
                define(dest, &mut errors);
            }
        }
    }

    for &block_id in &func.cfg.block_order {
        let Some(block) = func.cfg.get_block(block_id) else {
            continue;
        };

        // Uses must name defined values (or the undefined sentinel).
        for inst in &block.instructions {
            for used in inst.kind.uses() {
                if used.is_valid() && !defined.contains(&used) {
                    errors.push(ValidationError::UseOfUndefinedValue {
                        block: block_id,
                        value: used,
                    });
                }
            }
        }

        let Some(term) = &block.terminator else {
            errors.push(ValidationError::MissingTerminator { block: block_id });
            continue;
        };
        for used in term.kind.uses() {
            if used.is_valid() && !defined.contains(&used) {
                errors.push(ValidationError::UseOfUndefinedValue {
                    block: block_id,
                    value: used,
                });
            }
        }

        // Successors must exist; the entry block has no predecessors.
        for succ in term.kind.successors() {
            if !func.cfg.blocks.contains_key(&succ) {
                errors.push(ValidationError::UnknownSuccessor {
                    from: block_id,
                    to: succ,
                });
                continue;
            }
            if succ == func.cfg.entry_block {
                errors.push(ValidationError::EntryHasPredecessor { pred: block_id });
            }
        }

        // Explicit branch arguments must match target parameters.
        let mut check_edge = |to: IrBlockId, found: usize, errors: &mut Vec<ValidationError>| {
            if let Some(target) = func.cfg.get_block(to) {
                if target.params.len() != found {
                    errors.push(ValidationError::BranchArityMismatch {
                        from: block_id,
                        to,
                        expected: target.params.len(),
                        found,
                    });
                }
            }
        };
        match &term.kind {
            IrTermKind::Branch { target, args } => check_edge(*target, args.len(), &mut errors),
            IrTermKind::CondBranch {
                true_target,
                true_args,
                false_target,
                false_args,
                ..
            } => {
                check_edge(*true_target, true_args.len(), &mut errors);
                check_edge(*false_target, false_args.len(), &mut errors);
            }
            // Switches and call/cast terminators pass their successor
            // values implicitly.
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, IrInstKind, IrInstruction, IrType};

    #[test]
    fn test_valid_function_passes() {
        let mut b = IrBuilder::new("m");
        let f = b
            .begin_function("ok")
            .param("x", IrType::I32)
            .returns(IrType::I32)
            .build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let x = b.get_param(0);
        b.ret(Some(x));

        let module = b.finish();
        assert!(validate_function(module.function(f).unwrap()).is_ok());
    }

    #[test]
    fn test_detects_missing_terminator() {
        let mut b = IrBuilder::new("m");
        let f = b.begin_function("open").build();
        b.set_current_function(f);
        let _entry = b.create_block("entry");

        let module = b.finish();
        let errors = validate_function(module.function(f).unwrap()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingTerminator { .. })));
    }

    #[test]
    fn test_detects_undefined_use() {
        let mut b = IrBuilder::new("m");
        let f = b.begin_function("bad").returns(IrType::I32).build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        b.ret(None);

        let mut module = b.finish();
        let func = module.function_mut(f).unwrap();
        let dangling = crate::ir::IrId::new(99);
        func.cfg
            .get_block_mut(entry)
            .unwrap()
            .instructions
            .push(IrInstruction::new(IrInstKind::StrongRetain {
                operand: dangling,
            }));

        let errors = validate_function(module.function(f).unwrap()).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::UseOfUndefinedValue { value, .. } if *value == dangling
        )));
    }

    #[test]
    fn test_detects_branch_arity_mismatch() {
        let mut b = IrBuilder::new("m");
        let f = b.begin_function("arity").build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        let exit = b.create_block("exit");
        let _p = b.add_block_param(exit, IrType::I32, crate::ir::OwnershipKind::Trivial);
        b.set_insert_point(entry);
        b.br(exit, vec![]); // exit expects one argument
        b.set_insert_point(exit);
        b.ret(None);

        let module = b.finish();
        let errors = validate_function(module.function(f).unwrap()).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::BranchArityMismatch {
                expected: 1,
                found: 0,
                ..
            }
        )));
    }

    #[test]
    fn test_detects_undefined_sentinel_is_allowed() {
        let mut b = IrBuilder::new("m");
        let f = b.begin_function("undef_ok").build();
        b.set_current_function(f);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        b.ret(None);

        let mut module = b.finish();
        let func = module.function_mut(f).unwrap();
        func.cfg
            .get_block_mut(entry)
            .unwrap()
            .instructions
            .push(IrInstruction::new(IrInstKind::FixLifetime {
                operand: crate::ir::IrId::invalid(),
            }));

        assert!(validate_function(module.function(f).unwrap()).is_ok());
    }
}
