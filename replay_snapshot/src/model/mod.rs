//! Object-model interface consumed by the snapshot engine.
//!
//! The engine never sees the runtime's concrete object representation. It
//! walks and extracts the heap exclusively through [`HeapModel`], which the
//! runtime implements once, usually by dispatching on an object-kind table.
//!
//! ```text
//! ┌────────────────────────┐         ┌──────────────────────────┐
//! │    replay_snapshot     │         │      replay_runtime      │
//! │                        │         │                          │
//! │  SnapshotExtractor     │◀────────│  Heap (impl HeapModel)   │
//! │                        │         │                          │
//! │  uses:                 │         │  dispatches to:          │
//! │  HeapModel + Marker    │         │  per-kind hook table     │
//! └────────────────────────┘         └──────────────────────────┘
//! ```
//!
//! All methods take `&self`. The heap must not change while a snapshot cycle
//! runs; the only permitted transition is [`HeapModel::ensure_materialized`],
//! which implementations perform through interior mutability.

pub mod marker;

pub use marker::{CountingMarker, Marker};

use crate::id::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, PtrId, SlotArrayId, TypeId,
    Value,
};
use crate::snapshot::{ObjectPayload, SnapshotArena};
use smallvec::SmallVec;

// =============================================================================
// Properties
// =============================================================================

bitflags::bitflags! {
    /// Property attributes recorded in layout descriptors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// Property value can be changed.
        const WRITABLE = 1 << 0;
        /// Property appears in enumeration.
        const ENUMERABLE = 1 << 1;
        /// Property can be deleted or have attributes changed.
        const CONFIGURABLE = 1 << 2;
        /// Property is an accessor pair rather than a data slot.
        const ACCESSOR = 1 << 3;
    }
}

impl Default for PropertyFlags {
    #[inline]
    fn default() -> Self {
        Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE
    }
}

/// Interned property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PropertyId(pub u32);

/// One property of a layout descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name.
    pub id: PropertyId,
    /// Slot index in the object's storage.
    pub slot: u32,
    /// Attribute flags.
    pub flags: PropertyFlags,
}

// =============================================================================
// Objects and Types
// =============================================================================

/// How the engine treats a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    /// Leaf value with a type but no outgoing references besides the type.
    Primitive,
    /// Object with properties and kind-specific references; walked via the worklist.
    Compound,
}

/// Structural information about a type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInfo {
    /// Runtime type tag (the runtime's own type enumeration).
    pub type_tag: u32,
    /// Context the type belongs to.
    pub context: ContextId,
    /// Layout descriptor; present exactly when the type is dynamic.
    pub layout: Option<LayoutId>,
    /// Prototype object, if any.
    pub prototype: Option<ObjectId>,
    /// True when no instance property of this type is enumerable.
    pub has_no_enumerable_properties: bool,
}

impl TypeInfo {
    /// Dynamic types are extensible and carry a layout descriptor.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.layout.is_some()
    }
}

/// Layout descriptor contents.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInfo<'a> {
    /// Properties in slot order.
    pub properties: &'a [PropertyDescriptor],
    /// Number of slots stored inline in the object.
    pub inline_slot_capacity: u16,
    /// Whether new properties may be added.
    pub extensible: bool,
}

/// The value held by a primitive object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveValue<'a> {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Heap-allocated number.
    Number(f64),
    /// 64-bit integer.
    Int64(i64),
    /// String contents.
    String(&'a str),
    /// Symbol, identified by its property ID.
    Symbol(PropertyId),
}

// =============================================================================
// Functions and Scopes
// =============================================================================

/// Descriptive information about a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionBodyInfo<'a> {
    /// Context that compiled the body.
    pub context: ContextId,
    /// Display name.
    pub name: &'a str,
    /// Lexically enclosing body; `None` for top-level code.
    pub parent: Option<FunctionBodyId>,
    /// Source line of the body start.
    pub line: u32,
    /// Source column of the body start.
    pub column: u32,
}

/// Kind of a lexical scope in an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Activation object scope.
    Activation,
    /// `with` statement scope.
    With,
    /// Slot array of captured variables.
    SlotArray,
}

/// One scope of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Scope backed by an activation object.
    Activation(ObjectId),
    /// Scope backed by the object of a `with` statement.
    With(ObjectId),
    /// Scope backed by a slot array.
    SlotArray(SlotArrayId),
}

impl Scope {
    /// The kind of this scope.
    #[inline]
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Activation(_) => ScopeKind::Activation,
            Scope::With(_) => ScopeKind::With,
            Scope::SlotArray(_) => ScopeKind::SlotArray,
        }
    }

    /// Identity of the backing object or slot array.
    #[inline]
    pub fn ptr_id(&self) -> PtrId {
        match *self {
            Scope::Activation(obj) | Scope::With(obj) => obj.ptr_id(),
            Scope::SlotArray(slots) => slots.ptr_id(),
        }
    }
}

/// Contents of a closure environment.
#[derive(Debug, Clone)]
pub struct EnvironmentInfo {
    /// Owning context.
    pub context: ContextId,
    /// Scopes, innermost first.
    pub scopes: SmallVec<[Scope; 4]>,
}

/// Contents of a slot array.
#[derive(Debug, Clone, Copy)]
pub struct SlotArrayInfo<'a> {
    /// Owning context.
    pub context: ContextId,
    /// Captured variable values.
    pub slots: &'a [Value],
    /// Owning function when this is a function's declared-variable scope.
    pub function_body: Option<FunctionBodyId>,
}

// =============================================================================
// Contexts
// =============================================================================

/// How a top-level function body entered its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopLevelKind {
    /// Global script load.
    ScriptLoad,
    /// Body created by the `Function` constructor.
    NewFunction,
    /// Body created by `eval`.
    Eval,
}

/// A top-level source unit loaded into a context.
#[derive(Debug, Clone, Copy)]
pub struct TopLevelSource<'a> {
    /// How the unit was loaded.
    pub kind: TopLevelKind,
    /// Load sequence number within the context.
    pub load_id: u64,
    /// The top-level function body.
    pub body: FunctionBodyId,
    /// Source URI.
    pub uri: &'a str,
    /// Source text.
    pub source: &'a str,
}

/// Per-context metadata captured when a snapshot begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextInfo {
    /// Context log ID.
    pub id: ContextId,
    /// The context's global object.
    pub global_object: ObjectId,
}

// =============================================================================
// Heap Model
// =============================================================================

/// Read access to a runtime heap for snapshotting.
///
/// Implementations must be deterministic for the duration of a cycle: the
/// same query returns the same answer, except that
/// [`ensure_materialized`](Self::ensure_materialized) may switch a deferred
/// object to its concrete form (and type) exactly once.
pub trait HeapModel {
    // -------------------------------------------------------------------------
    // Objects
    // -------------------------------------------------------------------------

    /// Classify an object as primitive or compound.
    fn object_class(&self, obj: ObjectId) -> ObjectClass;

    /// Current type of an object.
    fn type_of(&self, obj: ObjectId) -> TypeId;

    /// True while the object's properties have not been materialized yet.
    fn is_deferred(&self, obj: ObjectId) -> bool;

    /// Force a deferred object into its concrete, walkable form.
    ///
    /// Must be idempotent.
    fn ensure_materialized(&self, obj: ObjectId);

    /// Values of every occupied property slot, in slot order.
    fn object_slots(&self, obj: ObjectId) -> SmallVec<[Value; 8]>;

    /// Auxiliary indexed-element backing store, if any.
    fn indexed_store(&self, obj: ObjectId) -> Option<ObjectId>;

    /// Report every kind-specific reference of a compound object.
    fn mark_kind_specific(&self, obj: ObjectId, marker: &mut dyn Marker);

    /// Build the kind-specific payload of a compound object.
    ///
    /// Variable-length data must be copied into `arena`.
    fn extract_kind_payload(&self, obj: ObjectId, arena: &mut SnapshotArena) -> ObjectPayload;

    /// Environment of a closure; `None` for every other kind.
    fn closure_environment(&self, obj: ObjectId) -> Option<EnvironmentId>;

    /// Value of a primitive object.
    fn primitive_value(&self, obj: ObjectId) -> PrimitiveValue<'_>;

    // -------------------------------------------------------------------------
    // Types and Layouts
    // -------------------------------------------------------------------------

    /// Structural information about a type.
    fn type_info(&self, ty: TypeId) -> TypeInfo;

    /// Contents of a layout descriptor.
    fn layout_info(&self, layout: LayoutId) -> LayoutInfo<'_>;

    // -------------------------------------------------------------------------
    // Functions and Scopes
    // -------------------------------------------------------------------------

    /// Descriptive information about a function body.
    fn function_body_info(&self, body: FunctionBodyId) -> FunctionBodyInfo<'_>;

    /// Scopes of an environment.
    fn environment_info(&self, env: EnvironmentId) -> EnvironmentInfo;

    /// Contents of a slot array.
    fn slot_array_info(&self, slots: SlotArrayId) -> SlotArrayInfo<'_>;

    // -------------------------------------------------------------------------
    // Contexts
    // -------------------------------------------------------------------------

    /// Metadata of a live context.
    fn context_info(&self, ctx: ContextId) -> ContextInfo;

    /// Visit every top-level source unit loaded into a context, in load order.
    fn for_each_loaded_source(&self, ctx: ContextId, visit: &mut dyn FnMut(TopLevelSource<'_>));

    /// Report the context's well-known (engine-intrinsic) objects and types.
    fn mark_well_known(&self, ctx: ContextId, marker: &mut dyn Marker);
}
