//! MIR Dump Utility
//!
//! Pretty-prints MIR in a human-readable format. Blocks print in the
//! function's block order, so a dump taken after inlining shows the cloned
//! body contiguously, followed by the return block and the caller's tail.

use super::{
    AccessEnforcement, AccessKind, IrBasicBlock, IrFunction, IrInstKind, IrModule, IrTermKind,
    OwnershipKind,
};
use std::fmt::Write;

/// Dump an entire module to a string.
pub fn dump_module(module: &IrModule) -> String {
    let mut out = String::new();
    writeln!(out, "; Module: {}", module.name).unwrap();
    writeln!(out, "; Functions: {}", module.functions.len()).unwrap();
    writeln!(out).unwrap();

    for func in module.functions.values() {
        writeln!(out, "{}", dump_function(func)).unwrap();
    }

    out
}

/// Dump a single function to a string.
pub fn dump_function(func: &IrFunction) -> String {
    let mut out = String::new();

    let params: Vec<String> = func
        .entry_params()
        .iter()
        .map(|p| format!("{}: {}", p.value, p.ty))
        .collect();

    writeln!(
        out,
        "fn @{}({}) -> {}{} {{",
        func.name,
        params.join(", "),
        func.signature.return_type,
        if func.signature.throws { " throws" } else { "" }
    )
    .unwrap();

    for &block_id in &func.cfg.block_order {
        if let Some(block) = func.cfg.get_block(block_id) {
            write!(out, "{}", dump_block(block)).unwrap();
        }
    }

    writeln!(out, "}}").unwrap();
    out
}

/// Dump a basic block to a string.
pub fn dump_block(block: &IrBasicBlock) -> String {
    let mut out = String::new();

    let params: Vec<String> = block
        .params
        .iter()
        .map(|p| format!("{}: {}{}", p.value, p.ty, ownership_tag(p.ownership)))
        .collect();
    let label = match &block.label {
        Some(l) => format!("  ; {}", l),
        None => String::new(),
    };
    if params.is_empty() {
        writeln!(out, "{}:{}", block.id, label).unwrap();
    } else {
        writeln!(out, "{}({}):{}", block.id, params.join(", "), label).unwrap();
    }

    for inst in &block.instructions {
        writeln!(out, "  {}", dump_inst(&inst.kind)).unwrap();
    }

    match &block.terminator {
        Some(term) => writeln!(out, "  {}", dump_term(&term.kind)).unwrap(),
        None => writeln!(out, "  <open>").unwrap(),
    }

    out
}

fn ownership_tag(ownership: OwnershipKind) -> &'static str {
    match ownership {
        OwnershipKind::Owned => " @owned",
        OwnershipKind::Guaranteed => " @guaranteed",
        OwnershipKind::Unowned => " @unowned",
        OwnershipKind::Trivial => "",
    }
}

fn enforcement_tag(enforcement: AccessEnforcement) -> &'static str {
    match enforcement {
        AccessEnforcement::Static => "[static]",
        AccessEnforcement::Dynamic => "[dynamic]",
        AccessEnforcement::Unsafe => "[unsafe]",
        AccessEnforcement::Unknown => "[unknown]",
    }
}

fn access_tag(kind: AccessKind) -> &'static str {
    match kind {
        AccessKind::Read => "[read]",
        AccessKind::Modify => "[modify]",
    }
}

fn operand_list(kind: &IrInstKind) -> String {
    kind.uses()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render one instruction.
pub fn dump_inst(kind: &IrInstKind) -> String {
    let body = match kind {
        IrInstKind::IntegerLiteral { ty, value, .. } => {
            format!("integer_literal {} : {}", value, ty)
        }
        IrInstKind::FloatLiteral { ty, bits, .. } => {
            format!("float_literal 0x{:x} : {}", bits, ty)
        }
        IrInstKind::StringLiteral { value, .. } => format!("string_literal {:?}", value),
        IrInstKind::UntypedStringLiteral { value, .. } => {
            format!("untyped_string_literal {:?}", value)
        }
        IrInstKind::FunctionRef { function, .. } => format!("function_ref {}", function),
        IrInstKind::GlobalAddr { global, .. } => format!("global_addr {}", global),
        IrInstKind::AllocGlobal { global } => format!("alloc_global {}", global),
        IrInstKind::Metatype { ty, .. } => format!("metatype {}", ty),
        IrInstKind::ForeignProtocolRef { protocol, .. } => {
            format!("foreign_protocol_ref {}", protocol)
        }
        IrInstKind::Builtin { name, ty, .. } => {
            format!("builtin {:?}({}) : {}", name, operand_list(kind), ty)
        }
        IrInstKind::Apply { .. } | IrInstKind::PartialApply { .. } => {
            let uses = kind.uses();
            let callee = uses[0];
            let args: Vec<String> = uses[1..].iter().map(|v| v.to_string()).collect();
            format!("{} {}({})", kind.mnemonic(), callee, args.join(", "))
        }
        IrInstKind::BeginAccess {
            kind: access,
            enforcement,
            operand,
            ..
        } => format!(
            "begin_access {} {} {}",
            access_tag(*access),
            enforcement_tag(*enforcement),
            operand
        ),
        IrInstKind::EndAccess {
            enforcement,
            operand,
        } => format!("end_access {} {}", enforcement_tag(*enforcement), operand),
        IrInstKind::TupleElementAddr { operand, index, .. }
        | IrInstKind::StructElementAddr { operand, index, .. }
        | IrInstKind::TupleExtract { operand, index, .. }
        | IrInstKind::StructExtract { operand, index, .. } => {
            format!("{} {}, {}", kind.mnemonic(), operand, index)
        }
        IrInstKind::DebugValue { operand, name } => {
            format!("debug_value {}, name {:?}", operand, name)
        }
        IrInstKind::AllocStack { ty, .. }
        | IrInstKind::AllocBox { ty, .. }
        | IrInstKind::AllocRef { ty, .. } => format!("{} {}", kind.mnemonic(), ty),
        _ => {
            let operands = operand_list(kind);
            if operands.is_empty() {
                kind.mnemonic().to_string()
            } else {
                format!("{} {}", kind.mnemonic(), operands)
            }
        }
    };

    match kind.dest() {
        Some(dest) => format!("{} = {}", dest, body),
        None => body,
    }
}

/// Render one terminator.
pub fn dump_term(kind: &IrTermKind) -> String {
    match kind {
        IrTermKind::Branch { target, args } => {
            if args.is_empty() {
                format!("br {}", target)
            } else {
                let args: Vec<String> = args.iter().map(|v| v.to_string()).collect();
                format!("br {}({})", target, args.join(", "))
            }
        }
        IrTermKind::CondBranch {
            condition,
            true_target,
            true_args,
            false_target,
            false_args,
        } => {
            let fmt_edge = |target: &super::IrBlockId, args: &[super::IrId]| {
                if args.is_empty() {
                    format!("{}", target)
                } else {
                    let args: Vec<String> = args.iter().map(|v| v.to_string()).collect();
                    format!("{}({})", target, args.join(", "))
                }
            };
            format!(
                "cond_br {}, {}, {}",
                condition,
                fmt_edge(true_target, true_args),
                fmt_edge(false_target, false_args)
            )
        }
        IrTermKind::SwitchValue {
            operand,
            cases,
            default,
        } => {
            let mut s = format!("switch_value {}", operand);
            for (v, b) in cases {
                write!(s, ", case {}: {}", v, b).unwrap();
            }
            if let Some(d) = default {
                write!(s, ", default {}", d).unwrap();
            }
            s
        }
        IrTermKind::SwitchEnum {
            operand,
            cases,
            default,
        } => {
            let mut s = format!("switch_enum {}", operand);
            for (v, b) in cases {
                write!(s, ", case #{}: {}", v, b).unwrap();
            }
            if let Some(d) = default {
                write!(s, ", default {}", d).unwrap();
            }
            s
        }
        IrTermKind::Return { value } => match value {
            Some(v) => format!("return {}", v),
            None => "return".to_string(),
        },
        IrTermKind::Throw { value } => format!("throw {}", value),
        IrTermKind::Unreachable => "unreachable".to_string(),
        IrTermKind::TryApply {
            callee,
            args,
            normal,
            error,
        } => {
            let args: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            format!(
                "try_apply {}({}) normal {} error {}",
                callee,
                args.join(", "),
                normal,
                error
            )
        }
        IrTermKind::CheckedCastBranch {
            operand,
            target_ty,
            success,
            failure,
        } => format!(
            "checked_cast_br {} : {}, {}, {}",
            operand, target_ty, success, failure
        ),
    }
}
