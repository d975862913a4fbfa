//! Vesper compiler midend.
//!
//! This crate owns the mid-level SSA intermediate representation (MIR) of
//! the Vesper compiler and the transformations that run on it before code
//! generation. The centerpiece is the function-inlining core: single-site
//! call splicing with debug-scope reconstruction, plus the per-instruction
//! cost classification that inlining policies consume.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::type_complexity)]
#![allow(clippy::new_without_default)]

pub mod ir;
pub mod logging;

pub use ir::{
    instruction_inline_cost, terminator_inline_cost, ApplySite, InlineCost, InlineKind, Inliner,
    IrModule,
};
