//! Function bodies, closure environments and slot arrays.

use replay_snapshot::model::Scope;
use replay_snapshot::{ContextId, EnvironmentId, FunctionBodyId, SlotArrayId, Value};
use smallvec::SmallVec;

/// A compiled function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBody {
    /// Body ID.
    pub id: FunctionBodyId,
    /// Compiling context.
    pub context: ContextId,
    /// Display name.
    pub name: String,
    /// Lexically enclosing body.
    pub parent: Option<FunctionBodyId>,
    /// Source line.
    pub line: u32,
    /// Source column.
    pub column: u32,
}

/// A closure environment: the lexical scopes a closure captured,
/// innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Environment ID.
    pub id: EnvironmentId,
    /// Owning context.
    pub context: ContextId,
    /// Scopes.
    pub scopes: SmallVec<[Scope; 4]>,
}

impl Environment {
    /// Check if the environment captured nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Captured variables of one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotArray {
    /// Slot array ID.
    pub id: SlotArrayId,
    /// Owning context.
    pub context: ContextId,
    /// Variable values.
    pub slots: Vec<Value>,
    /// Set when this is a function's declared-variable scope.
    pub function_body: Option<FunctionBodyId>,
}
