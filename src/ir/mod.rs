//! Mid-level Intermediate Representation (MIR) for the Vesper compiler.
//!
//! This module defines a low-level, SSA-form intermediate representation:
//! functions are control-flow graphs of basic blocks, blocks carry typed
//! parameters instead of phi nodes, and values flow between blocks as
//! branch arguments. The IR is designed to be:
//! - Simple and explicit (no implicit operations)
//! - Strongly typed, with ownership kinds on values
//! - Easy to clone and transform (all cross-references are stable ids)
//! - Attributable: every instruction carries a location and a debug scope

pub mod blocks;
pub mod builder;
pub mod cost;
pub mod debug_info;
pub mod dump;
pub mod functions;
pub mod inlining; // Single-site function inlining core
pub mod instructions;
pub mod modules;
pub mod types;
pub mod validation;

pub use blocks::*;
pub use builder::*;
pub use cost::*;
pub use debug_info::*;
pub use functions::*;
pub use inlining::*;
pub use instructions::*;
pub use modules::*;
pub use types::*;
pub use validation::{validate_function, ValidationError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR version for compatibility checking
pub const IR_VERSION: u32 = 1;

/// Unique identifier for SSA values.
///
/// A value is produced by an instruction or introduced as a block
/// parameter; the entry block's parameters are the function's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrId(u32);

impl IrId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// The undefined sentinel value. It is a legal operand anywhere and is
    /// never remapped by transformations.
    pub fn invalid() -> Self {
        Self(u32::MAX)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Source position information for debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrSourceLocation {
    pub file_id: u32,
    pub line: u32,
    pub column: u32,
}

impl IrSourceLocation {
    pub fn unknown() -> Self {
        Self {
            file_id: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn new(file_id: u32, line: u32, column: u32) -> Self {
        Self {
            file_id,
            line,
            column,
        }
    }
}

/// Linkage type for symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Private to the module
    Private,
    /// Available within the package
    Internal,
    /// Publicly exported
    Public,
    /// External symbol (defined elsewhere)
    External,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ir_id() {
        let id = IrId::new(42);
        assert_eq!(format!("{}", id), "$42");
        assert!(id.is_valid());

        let invalid = IrId::invalid();
        assert!(!invalid.is_valid());
    }
}
