//! Debug locations and scopes.
//!
//! Every instruction carries an [`IrLocation`] and (usually) a debug scope.
//! Scopes form a tree: each scope has a lexical parent (another scope or
//! the owning function) and an optional `inlined_call_site` link that
//! records, level by level, the chain of call sites an instruction was
//! inlined through. Scopes live in a module-owned arena and are never
//! freed while the module exists.

use super::{IrFunctionId, IrSourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a location relates to the inlining history of its instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LocationKind {
    /// Written at this position in the source
    #[default]
    Regular,
    /// Reached this function through performance inlining
    Inlined,
    /// Reached this function through mandatory inlining
    MandatoryInlined,
}

/// A source range plus its inlining provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrLocation {
    pub span: IrSourceLocation,
    pub kind: LocationKind,
}

impl IrLocation {
    pub fn new(span: IrSourceLocation) -> Self {
        Self {
            span,
            kind: LocationKind::Regular,
        }
    }

    pub fn unknown() -> Self {
        Self::new(IrSourceLocation::unknown())
    }

    /// Wrap this location as reached by performance inlining.
    pub fn inlined(self) -> Self {
        Self {
            span: self.span,
            kind: LocationKind::Inlined,
        }
    }

    /// Wrap this location as reached by mandatory inlining.
    pub fn mandatory_inlined(self) -> Self {
        Self {
            span: self.span,
            kind: LocationKind::MandatoryInlined,
        }
    }

    pub fn is_inlined(&self) -> bool {
        !matches!(self.kind, LocationKind::Regular)
    }
}

/// Index of a debug scope in the module's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrScopeId(pub u32);

impl fmt::Display for IrScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope{}", self.0)
    }
}

/// Lexical parent of a debug scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeParent {
    /// The scope is the function's root scope
    Function(IrFunctionId),
    /// The scope is nested inside another scope
    Scope(IrScopeId),
}

/// A node of the debug-scope tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrDebugScope {
    /// Source range this scope covers
    pub loc: IrLocation,

    /// Lexical parent (function root scopes have a Function parent)
    pub parent: Option<ScopeParent>,

    /// Scope of the call site this scope was inlined at, if any
    pub inlined_call_site: Option<IrScopeId>,
}

impl IrDebugScope {
    pub fn function_root(function: IrFunctionId, loc: IrLocation) -> Self {
        Self {
            loc,
            parent: Some(ScopeParent::Function(function)),
            inlined_call_site: None,
        }
    }

    pub fn nested(parent: IrScopeId, loc: IrLocation) -> Self {
        Self {
            loc,
            parent: Some(ScopeParent::Scope(parent)),
            inlined_call_site: None,
        }
    }
}

/// Module-owned arena of debug scopes.
///
/// Scopes are allocated during lowering and by the inliner, and handed out
/// as ids. Nothing is ever deallocated; scopes live for the remainder of
/// the compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrScopeArena {
    scopes: Vec<IrDebugScope>,
}

impl IrScopeArena {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn alloc(&mut self, scope: IrDebugScope) -> IrScopeId {
        let id = IrScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    pub fn get(&self, id: IrScopeId) -> &IrDebugScope {
        &self.scopes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Walk the `inlined_call_site` chain from `id`, outermost last.
    pub fn inlined_at_chain(&self, id: IrScopeId) -> Vec<IrScopeId> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id).inlined_call_site;
        while let Some(s) = cursor {
            chain.push(s);
            cursor = self.get(s).inlined_call_site;
        }
        chain
    }

    /// Walk the lexical `parent` chain from `id`, innermost first, stopping
    /// at the first function parent.
    pub fn lexical_chain(&self, id: IrScopeId) -> Vec<IrScopeId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(s) = cursor {
            chain.push(s);
            cursor = match self.get(s).parent {
                Some(ScopeParent::Scope(p)) => Some(p),
                _ => None,
            };
        }
        chain
    }
}
