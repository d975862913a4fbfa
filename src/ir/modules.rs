//! IR Modules
//!
//! The top-level compilation unit: functions, global variables, and the
//! module-owned debug-scope arena. Maps are insertion-ordered so that
//! iteration (and therefore dumps and pass behavior) is deterministic.

use super::{
    IrDebugScope, IrFunction, IrFunctionId, IrFunctionSignature, IrLocation, IrScopeArena, IrType,
    Linkage,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Global variable identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrGlobalId(pub u32);

impl std::fmt::Display for IrGlobalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Global variable definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrGlobal {
    /// Global identifier
    pub id: IrGlobalId,

    /// Variable name
    pub name: String,

    /// Variable type
    pub ty: IrType,

    /// Linkage type
    pub linkage: Linkage,
}

/// IR module - represents a compilation unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrModule {
    /// Module name
    pub name: String,

    /// Functions defined in this module
    pub functions: IndexMap<IrFunctionId, IrFunction>,

    /// Global variables
    pub globals: IndexMap<IrGlobalId, IrGlobal>,

    /// Debug scopes; allocated here, never freed while the module lives
    pub scopes: IrScopeArena,

    /// Next available IDs
    pub next_function_id: u32,
    pub next_global_id: u32,
}

impl IrModule {
    /// Create a new, empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: IndexMap::new(),
            globals: IndexMap::new(),
            scopes: IrScopeArena::new(),
            next_function_id: 0,
            next_global_id: 0,
        }
    }

    /// Create a function with a fresh root debug scope and register it.
    pub fn create_function(
        &mut self,
        name: impl Into<String>,
        signature: IrFunctionSignature,
        loc: IrLocation,
    ) -> IrFunctionId {
        let id = IrFunctionId(self.next_function_id);
        self.next_function_id += 1;

        let scope = self.scopes.alloc(IrDebugScope::function_root(id, loc));
        let function = IrFunction::new(id, name.into(), signature, scope);
        self.functions.insert(id, function);
        id
    }

    /// Register a global variable.
    pub fn create_global(&mut self, name: impl Into<String>, ty: IrType) -> IrGlobalId {
        let id = IrGlobalId(self.next_global_id);
        self.next_global_id += 1;
        self.globals.insert(
            id,
            IrGlobal {
                id,
                name: name.into(),
                ty,
                linkage: Linkage::Private,
            },
        );
        id
    }

    /// Get a function by ID
    pub fn function(&self, id: IrFunctionId) -> Option<&IrFunction> {
        self.functions.get(&id)
    }

    /// Get a mutable function by ID
    pub fn function_mut(&mut self, id: IrFunctionId) -> Option<&mut IrFunction> {
        self.functions.get_mut(&id)
    }

    /// Look up a function by name
    pub fn function_by_name(&self, name: &str) -> Option<&IrFunction> {
        self.functions.values().find(|f| f.name == name)
    }
}
