//! Snapshot record types.
//!
//! Records are immutable once written. They refer to each other and to heap
//! values exclusively through stable entity IDs; variable-length parts live
//! in the snapshot's [`SnapshotArena`](super::SnapshotArena).

use crate::id::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, PtrId, SlotArrayId, TypeId,
    Value,
};
use crate::model::{PropertyDescriptor, PropertyId, ScopeKind, TopLevelKind};
use crate::snapshot::arena::{ArenaSlice, ArenaStr};

// =============================================================================
// Contexts and Functions
// =============================================================================

/// An execution context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextRecord {
    /// Context log ID.
    pub id: ContextId,
    /// The context's global object.
    pub global_object: ObjectId,
    /// Top-level source units, in load order.
    pub top_level: ArenaSlice<TopLevelRecord>,
}

/// A top-level source unit and its function body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopLevelRecord {
    /// How the unit was loaded.
    pub kind: TopLevelKind,
    /// Load sequence number within the context.
    pub load_id: u64,
    /// Source URI.
    pub uri: ArenaStr,
    /// Source text.
    pub source: ArenaStr,
    /// The unit's top-level function body.
    pub body: FunctionBodyRecord,
}

/// A function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionBodyRecord {
    /// Body ID.
    pub id: FunctionBodyId,
    /// Owning context.
    pub context: ContextId,
    /// Display name.
    pub name: ArenaStr,
    /// Lexically enclosing body.
    pub parent: Option<FunctionBodyId>,
    /// Source line.
    pub line: u32,
    /// Source column.
    pub column: u32,
    /// Registered as an engine-intrinsic entity.
    pub well_known: bool,
}

// =============================================================================
// Layouts and Types
// =============================================================================

/// A layout descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRecord {
    /// Layout ID.
    pub id: LayoutId,
    /// Properties in slot order.
    pub properties: ArenaSlice<PropertyDescriptor>,
    /// Inline slot capacity.
    pub inline_slot_capacity: u16,
    /// Whether properties may be added.
    pub extensible: bool,
}

/// A type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRecord {
    /// Type ID.
    pub id: TypeId,
    /// Runtime type tag.
    pub type_tag: u32,
    /// Owning context.
    pub context: ContextId,
    /// Layout of a dynamic type.
    pub layout: Option<LayoutId>,
    /// Prototype object.
    pub prototype: Option<ObjectId>,
    /// No instance property is enumerable.
    pub has_no_enumerable_properties: bool,
}

// =============================================================================
// Objects
// =============================================================================

/// Value held by a primitive record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveRecordValue {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Number.
    Number(f64),
    /// 64-bit integer.
    Int64(i64),
    /// String contents.
    String(ArenaStr),
    /// Symbol.
    Symbol(PropertyId),
}

/// A primitive heap object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveRecord {
    /// Object ID.
    pub id: ObjectId,
    /// Type ID; its record is always extracted first.
    pub type_id: TypeId,
    /// Registered as an engine-intrinsic entity.
    pub well_known: bool,
    /// The value.
    pub value: PrimitiveRecordValue,
}

/// Kind-specific part of a compound object record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectPayload {
    /// Ordinary object; everything lives in its slots.
    Plain,
    /// Array with dense elements.
    Array {
        /// Elements in index order.
        elements: ArenaSlice<Value>,
    },
    /// Wrapper object around a value (number, string, boolean wrappers).
    Boxed(Value),
    /// Closure over a function body.
    ScriptFunction {
        /// Function body.
        body: FunctionBodyId,
        /// Environment, when it has at least one scope.
        environment: Option<EnvironmentId>,
        /// Home object for `super` lookups.
        home_object: Option<ObjectId>,
    },
    /// Function with a bound receiver and arguments.
    BoundFunction {
        /// Target function.
        target: ObjectId,
        /// Bound receiver.
        bound_this: Value,
        /// Bound arguments.
        args: ArenaSlice<Value>,
    },
    /// Keyed collection; entries are stored as `[key0, value0, key1, value1, ..]`.
    Map {
        /// Flattened entries.
        entries: ArenaSlice<Value>,
    },
    /// Set collection.
    Set {
        /// Members in insertion order.
        entries: ArenaSlice<Value>,
    },
    /// Date with its time value.
    Date(f64),
}

/// A compound heap object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRecord {
    /// Object ID.
    pub id: ObjectId,
    /// Type ID; its record is always extracted first.
    pub type_id: TypeId,
    /// Registered as an engine-intrinsic entity.
    pub well_known: bool,
    /// Property slot values in slot order.
    pub slots: ArenaSlice<Value>,
    /// Indexed-element backing store.
    pub indexed_store: Option<ObjectId>,
    /// Kind-specific payload.
    pub payload: ObjectPayload,
}

// =============================================================================
// Scopes
// =============================================================================

/// One entry of a scope chain record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeEntry {
    /// Scope kind.
    pub kind: ScopeKind,
    /// Object ID for activation/with scopes, slot array ID otherwise.
    pub id: PtrId,
}

/// A closure environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeChainRecord {
    /// Environment ID.
    pub id: EnvironmentId,
    /// Owning context.
    pub context: ContextId,
    /// Scopes in original order.
    pub entries: ArenaSlice<ScopeEntry>,
}

/// A slot array of captured variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotArrayRecord {
    /// Slot array ID.
    pub id: SlotArrayId,
    /// Owning context.
    pub context: ContextId,
    /// Captured values.
    pub slots: ArenaSlice<Value>,
    /// Owning function for a declared-variable scope.
    pub function_body: Option<FunctionBodyId>,
}

impl SlotArrayRecord {
    /// True when the slot array is a function's declared-variable scope.
    #[inline]
    pub fn is_function_scope(&self) -> bool {
        self.function_body.is_some()
    }
}
