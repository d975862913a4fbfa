//! IR Type System
//!
//! Defines the type system for the intermediate representation, together
//! with the per-value ownership kinds and the representation tags that the
//! cost model and the inliner consult (metatype representation, function
//! representation, memory-access enforcement).

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    /// Void type (no value)
    Void,

    /// Boolean type
    Bool,

    /// Integer types
    I8,
    I16,
    I32,
    I64,

    /// Unsigned integer types
    U8,
    U16,
    U32,
    U64,

    /// Floating point types
    F32,
    F64,

    /// String type (UTF-8)
    String,

    /// Untyped raw pointer
    RawPointer,

    /// Word-compatible tagged reference used by bridging conversions
    BridgeObject,

    /// Address of an in-memory location holding a value of the given type
    Address(Box<IrType>),

    /// Managed reference to a heap object
    Ref(Box<IrType>),

    /// Tuple type
    Tuple(Vec<IrType>),

    /// Nominal struct type
    Struct { name: String },

    /// Nominal class type
    Class { name: String },

    /// Nominal enum (sum) type
    Enum { name: String },

    /// Existential (protocol) type
    Existential { name: String },

    /// Function type
    Function {
        params: Vec<IrType>,
        return_type: Box<IrType>,
    },

    /// Metatype of an instance type, with an explicit representation
    Metatype {
        instance: Box<IrType>,
        representation: MetatypeRepresentation,
    },
}

impl IrType {
    pub fn address_of(pointee: IrType) -> Self {
        IrType::Address(Box::new(pointee))
    }

    pub fn ref_to(pointee: IrType) -> Self {
        IrType::Ref(Box::new(pointee))
    }

    pub fn function(params: Vec<IrType>, return_type: IrType) -> Self {
        IrType::Function {
            params,
            return_type: Box::new(return_type),
        }
    }

    pub fn metatype(instance: IrType, representation: MetatypeRepresentation) -> Self {
        IrType::Metatype {
            instance: Box::new(instance),
            representation,
        }
    }

    /// Check if this is an address type
    pub fn is_address(&self) -> bool {
        matches!(self, IrType::Address(_))
    }

    /// Values of trivial types carry no ownership obligations.
    pub fn is_trivial(&self) -> bool {
        matches!(
            self,
            IrType::Void
                | IrType::Bool
                | IrType::I8
                | IrType::I16
                | IrType::I32
                | IrType::I64
                | IrType::U8
                | IrType::U16
                | IrType::U32
                | IrType::U64
                | IrType::F32
                | IrType::F64
                | IrType::RawPointer
                | IrType::Address(_)
                | IrType::Metatype { .. }
        )
    }
}

/// How a metatype value is represented at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetatypeRepresentation {
    /// Compile-time constant; the value occupies no storage
    Thin,
    /// Full runtime type descriptor pointer
    Thick,
    /// Foreign-runtime class object
    Foreign,
}

/// Per-value ownership marker. Constrains which operations may consume the
/// value; preserved verbatim when values are cloned across functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipKind {
    /// The value is owned and must be consumed exactly once
    Owned,
    /// The value is borrowed for the duration of a scope
    Guaranteed,
    /// Non-owning reference that does not keep the object alive
    Unowned,
    /// No ownership semantics (trivial types, addresses)
    Trivial,
}

/// Where a function's implementation comes from and which convention it
/// uses. Mandatory inlining refuses foreign callees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FunctionRepresentation {
    /// Vesper function with a MIR body
    #[default]
    Native,
    /// Method imported from a foreign object runtime
    ForeignMethod,
    /// Imported C function
    ForeignC,
}

/// Enforcement policy attached to a formal memory-access region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessEnforcement {
    /// Verified at compile time; no runtime artifact
    Static,
    /// Checked at runtime against concurrent accesses
    Dynamic,
    /// Explicitly unchecked
    Unsafe,
    /// Not yet inferred; must not survive into canonical MIR
    Unknown,
}

/// Kind of a formal memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKind {
    Read,
    Modify,
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "Void"),
            IrType::Bool => write!(f, "Bool"),
            IrType::I8 => write!(f, "Int8"),
            IrType::I16 => write!(f, "Int16"),
            IrType::I32 => write!(f, "Int32"),
            IrType::I64 => write!(f, "Int64"),
            IrType::U8 => write!(f, "UInt8"),
            IrType::U16 => write!(f, "UInt16"),
            IrType::U32 => write!(f, "UInt32"),
            IrType::U64 => write!(f, "UInt64"),
            IrType::F32 => write!(f, "Float32"),
            IrType::F64 => write!(f, "Float64"),
            IrType::String => write!(f, "String"),
            IrType::RawPointer => write!(f, "RawPointer"),
            IrType::BridgeObject => write!(f, "BridgeObject"),
            IrType::Address(pointee) => write!(f, "*{}", pointee),
            IrType::Ref(pointee) => write!(f, "&{}", pointee),
            IrType::Tuple(elements) => {
                write!(f, "(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            IrType::Struct { name } => write!(f, "{}", name),
            IrType::Class { name } => write!(f, "{}", name),
            IrType::Enum { name } => write!(f, "{}", name),
            IrType::Existential { name } => write!(f, "any {}", name),
            IrType::Function {
                params,
                return_type,
            } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", return_type)
            }
            IrType::Metatype {
                instance,
                representation,
            } => {
                let tag = match representation {
                    MetatypeRepresentation::Thin => "@thin",
                    MetatypeRepresentation::Thick => "@thick",
                    MetatypeRepresentation::Foreign => "@foreign",
                };
                write!(f, "{} {}.Type", tag, instance)
            }
        }
    }
}
