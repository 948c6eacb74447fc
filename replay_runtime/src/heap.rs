//! The runtime heap.
//!
//! Owns every object, type, layout, function body, environment and slot
//! array, keyed by IDs drawn from one shared [`IdIssuer`]. The builder API
//! returns [`HeapError`] for caller mistakes; the snapshot-facing lookups in
//! [`heap_model`](crate::heap_model) treat a missing entity as a fault.

use crate::context::{LoadedSource, ScriptContext};
use crate::function::{Environment, FunctionBody, SlotArray};
use crate::object::shape::LayoutRegistry;
use crate::object::types::{RuntimeType, TypeKey, TypeTag};
use crate::object::{CompoundObject, HeapObject, ObjectKind, ObjectStorage, PrimitiveData};
use replay_snapshot::model::{PropertyFlags, PropertyId, Scope, TopLevelKind};
use replay_snapshot::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, PtrId, SlotArrayId, TypeId,
    Value,
};
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, trace};

// =============================================================================
// Identity
// =============================================================================

/// Issues entity identities. Every entity kind draws from the same counter.
#[derive(Debug)]
pub(crate) struct IdIssuer {
    next: u64,
}

impl IdIssuer {
    pub(crate) const fn new() -> Self {
        Self { next: 1 }
    }

    #[inline]
    pub(crate) fn issue(&mut self) -> PtrId {
        let id = PtrId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdIssuer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error returned by the heap builder API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// No context with this ID exists.
    #[error("unknown context {0:?}")]
    UnknownContext(ContextId),

    /// An entity ID does not name a live entity of the expected kind.
    #[error("unknown {kind} {id}")]
    Unknown {
        /// Entity kind.
        kind: &'static str,
        /// Raw identity.
        id: PtrId,
    },

    /// The operation needs a compound object.
    #[error("object {0:?} is a primitive")]
    NotCompound(ObjectId),

    /// The object's type has no layout to add properties to.
    #[error("object {object:?} has static type {ty:?}")]
    StaticType {
        /// The object.
        object: ObjectId,
        /// Its type.
        ty: TypeId,
    },

    /// The object's layout is sealed.
    #[error("object {0:?} is not extensible")]
    NotExtensible(ObjectId),

    /// A slot index is past the end of the storage.
    #[error("slot {slot} of {id} is out of range (length {len})")]
    SlotOutOfRange {
        /// Owning object or slot array.
        id: PtrId,
        /// Requested slot.
        slot: usize,
        /// Storage length.
        len: usize,
    },
}

impl HeapError {
    #[inline]
    fn unknown(kind: &'static str, id: impl Into<PtrId>) -> Self {
        HeapError::Unknown {
            kind,
            id: id.into(),
        }
    }
}

/// Report a lookup that the heap's own invariants guarantee to succeed.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn missing(kind: &'static str, id: impl fmt::Debug) -> ! {
    error!(kind, id = ?id, "heap entity not found");
    panic!("unknown {kind} {id:?}");
}

// =============================================================================
// Heap
// =============================================================================

/// A runtime heap.
#[derive(Debug, Default)]
pub struct Heap {
    ids: IdIssuer,
    objects: FxHashMap<ObjectId, HeapObject>,
    types: FxHashMap<TypeId, RuntimeType>,
    layouts: LayoutRegistry,
    type_cache: FxHashMap<TypeKey, TypeId>,
    static_types: FxHashMap<(ContextId, TypeTag), TypeId>,
    bodies: FxHashMap<FunctionBodyId, FunctionBody>,
    environments: FxHashMap<EnvironmentId, Environment>,
    slot_arrays: FxHashMap<SlotArrayId, SlotArray>,
    contexts: Vec<ScriptContext>,
    materializations: Cell<usize>,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Contexts
    // -------------------------------------------------------------------------

    /// Create a context with its global object and intrinsic prototypes.
    ///
    /// The global object, both prototypes and every primitive type are
    /// registered as well-known.
    pub fn create_context(&mut self) -> ContextId {
        let id = ContextId(self.contexts.len() as u32 + 1);
        let empty = self.layouts.empty_layout(&mut self.ids);

        let root_ty = self.dynamic_type(id, TypeTag::Object, None, empty);
        let object_prototype = self.alloc_compound(id, root_ty, ObjectKind::Plain);
        let object_ty = self.dynamic_type(id, TypeTag::Object, Some(object_prototype), empty);
        let function_prototype = self.alloc_compound(id, object_ty, ObjectKind::Plain);
        let global_object = self.alloc_compound(id, object_ty, ObjectKind::Plain);

        let mut context = ScriptContext {
            id,
            global_object,
            object_prototype,
            function_prototype,
            well_known_objects: Vec::new(),
            well_known_types: Vec::new(),
            loaded_sources: Vec::new(),
        };
        context.add_well_known_object(global_object);
        context.add_well_known_object(object_prototype);
        context.add_well_known_object(function_prototype);
        for tag in TypeTag::PRIMITIVES {
            let ty = self.static_type(id, tag);
            context.add_well_known_type(ty);
        }
        self.contexts.push(context);

        debug!(context = id.0, global = %global_object.ptr_id(), "context created");
        id
    }

    /// Get a context.
    pub fn context(&self, ctx: ContextId) -> Option<&ScriptContext> {
        let index = (ctx.0 as usize).checked_sub(1)?;
        self.contexts.get(index)
    }

    fn context_mut(&mut self, ctx: ContextId) -> Result<&mut ScriptContext, HeapError> {
        (ctx.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.contexts.get_mut(index))
            .ok_or(HeapError::UnknownContext(ctx))
    }

    fn check_context(&self, ctx: ContextId) -> Result<&ScriptContext, HeapError> {
        self.context(ctx).ok_or(HeapError::UnknownContext(ctx))
    }

    /// IDs of every live context, in creation order.
    pub fn context_ids(&self) -> Vec<ContextId> {
        self.contexts.iter().map(ScriptContext::id).collect()
    }

    /// Register an object as well-known in a context.
    pub fn register_well_known(&mut self, ctx: ContextId, obj: ObjectId) -> Result<(), HeapError> {
        self.check_object(obj)?;
        self.context_mut(ctx)?.add_well_known_object(obj);
        Ok(())
    }

    /// Register a type as well-known in a context.
    pub fn register_well_known_type(
        &mut self,
        ctx: ContextId,
        ty: TypeId,
    ) -> Result<(), HeapError> {
        if !self.types.contains_key(&ty) {
            return Err(HeapError::unknown("type", ty));
        }
        self.context_mut(ctx)?.add_well_known_type(ty);
        Ok(())
    }

    /// Record a top-level source unit. Returns its load ID.
    pub fn load_source(
        &mut self,
        ctx: ContextId,
        kind: TopLevelKind,
        body: FunctionBodyId,
        uri: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<u64, HeapError> {
        if !self.bodies.contains_key(&body) {
            return Err(HeapError::unknown("function body", body));
        }
        let context = self.context_mut(ctx)?;
        let load_id = context.loaded_sources.len() as u64 + 1;
        context.loaded_sources.push(LoadedSource {
            kind,
            load_id,
            body,
            uri: uri.into(),
            source: source.into(),
        });
        debug!(context = ctx.0, load_id, ?kind, "source loaded");
        Ok(load_id)
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn static_type(&mut self, ctx: ContextId, tag: TypeTag) -> TypeId {
        if let Some(&ty) = self.static_types.get(&(ctx, tag)) {
            return ty;
        }
        let id = TypeId::new(self.ids.issue());
        self.types.insert(
            id,
            RuntimeType {
                id,
                tag,
                context: ctx,
                layout: None,
                prototype: None,
                has_no_enumerable_properties: true,
            },
        );
        self.static_types.insert((ctx, tag), id);
        id
    }

    fn dynamic_type(
        &mut self,
        ctx: ContextId,
        tag: TypeTag,
        prototype: Option<ObjectId>,
        layout: LayoutId,
    ) -> TypeId {
        let key = TypeKey {
            context: ctx,
            tag,
            prototype,
            layout,
        };
        if let Some(&ty) = self.type_cache.get(&key) {
            return ty;
        }

        let has_no_enumerable_properties = self
            .layouts
            .get(layout)
            .map_or(true, |l| l.has_no_enumerable_properties());
        let id = TypeId::new(self.ids.issue());
        self.types.insert(
            id,
            RuntimeType {
                id,
                tag,
                context: ctx,
                layout: Some(layout),
                prototype,
                has_no_enumerable_properties,
            },
        );
        self.type_cache.insert(key, id);
        trace!(ty = %id.ptr_id(), ?tag, layout = %layout.ptr_id(), "dynamic type created");
        id
    }

    /// Get a type.
    pub fn runtime_type(&self, ty: TypeId) -> Option<&RuntimeType> {
        self.types.get(&ty)
    }

    /// The layout registry.
    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    // -------------------------------------------------------------------------
    // Objects
    // -------------------------------------------------------------------------

    fn alloc_compound(&mut self, ctx: ContextId, ty: TypeId, kind: ObjectKind) -> ObjectId {
        let id = ObjectId::new(self.ids.issue());
        self.objects.insert(
            id,
            HeapObject::new_compound(ctx, ty, kind, ObjectStorage::empty()),
        );
        id
    }

    fn default_prototype(&self, ctx: ContextId, kind: &ObjectKind) -> Result<ObjectId, HeapError> {
        let context = self.check_context(ctx)?;
        Ok(if kind.tag().type_tag().is_callable() {
            context.function_prototype
        } else {
            context.object_prototype
        })
    }

    fn check_object(&self, obj: ObjectId) -> Result<&HeapObject, HeapError> {
        self.objects
            .get(&obj)
            .ok_or_else(|| HeapError::unknown("object", obj))
    }

    /// Create an object whose prototype is the context's default for `kind`.
    pub fn create_object(&mut self, ctx: ContextId, kind: ObjectKind) -> Result<ObjectId, HeapError> {
        let prototype = self.default_prototype(ctx, &kind)?;
        self.create_object_with_prototype(ctx, kind, Some(prototype))
    }

    /// Create an object with an explicit prototype.
    pub fn create_object_with_prototype(
        &mut self,
        ctx: ContextId,
        kind: ObjectKind,
        prototype: Option<ObjectId>,
    ) -> Result<ObjectId, HeapError> {
        self.check_context(ctx)?;
        if let Some(proto) = prototype {
            self.check_object(proto)?;
        }
        let empty = self.layouts.empty_layout(&mut self.ids);
        let ty = self.dynamic_type(ctx, kind.tag().type_tag(), prototype, empty);
        Ok(self.alloc_compound(ctx, ty, kind))
    }

    /// Create a primitive object.
    pub fn create_primitive(
        &mut self,
        ctx: ContextId,
        data: PrimitiveData,
    ) -> Result<ObjectId, HeapError> {
        self.check_context(ctx)?;
        let ty = self.static_type(ctx, data.tag());
        let id = ObjectId::new(self.ids.issue());
        self.objects.insert(id, HeapObject::new_primitive(ctx, ty, data));
        Ok(id)
    }

    /// Create an object whose properties are recorded but not laid out.
    ///
    /// The object carries a static placeholder type until it is first
    /// materialized, either by a mutation or by a snapshot's mark phase.
    pub fn create_deferred_object(
        &mut self,
        ctx: ContextId,
        kind: ObjectKind,
        properties: &[(PropertyId, Value)],
    ) -> Result<ObjectId, HeapError> {
        let prototype = self.default_prototype(ctx, &kind)?;
        let tag = kind.tag().type_tag();

        let mut layout = self.layouts.empty_layout(&mut self.ids);
        let mut slots = Vec::with_capacity(properties.len());
        for &(name, value) in properties {
            let existing = self.layouts.get(layout).and_then(|l| l.lookup(name));
            match existing {
                Some(slot) => slots[slot as usize] = value,
                None => {
                    layout = self
                        .layouts
                        .transition(&mut self.ids, layout, name, PropertyFlags::default())
                        .ok_or_else(|| HeapError::unknown("layout", layout))?;
                    slots.push(value);
                }
            }
        }

        let target = self.dynamic_type(ctx, tag, Some(prototype), layout);
        let placeholder = self.static_type(ctx, tag);
        let id = ObjectId::new(self.ids.issue());
        self.objects.insert(
            id,
            HeapObject::new_compound(
                ctx,
                placeholder,
                kind,
                ObjectStorage::Deferred { target, slots },
            ),
        );
        trace!(obj = %id.ptr_id(), target = %target.ptr_id(), "deferred object created");
        Ok(id)
    }

    /// Get an object.
    pub fn object(&self, obj: ObjectId) -> Option<&HeapObject> {
        self.objects.get(&obj)
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Switch a deferred object to its materialized form and target type.
    ///
    /// Returns `true` if a transition happened.
    pub(crate) fn materialize(&self, obj: ObjectId) -> bool {
        let Some(object) = self.objects.get(&obj) else {
            return false;
        };
        let Some(cell) = object.compound() else {
            return false;
        };
        let Some(target) = cell.borrow_mut().storage.materialize() else {
            return false;
        };
        object.type_id.set(target);
        self.materializations.set(self.materializations.get() + 1);
        trace!(obj = %obj.ptr_id(), target = %target.ptr_id(), "object materialized");
        true
    }

    /// Number of deferred objects materialized so far.
    pub fn materialization_count(&self) -> usize {
        self.materializations.get()
    }

    /// Layout of a materialized compound object's type.
    fn object_layout(&self, obj: ObjectId) -> Result<(RuntimeType, LayoutId), HeapError> {
        let object = self.check_object(obj)?;
        if object.is_primitive() {
            return Err(HeapError::NotCompound(obj));
        }
        let ty = object.type_id();
        let rt = *self
            .types
            .get(&ty)
            .ok_or_else(|| HeapError::unknown("type", ty))?;
        let layout = rt
            .layout
            .ok_or(HeapError::StaticType { object: obj, ty })?;
        Ok((rt, layout))
    }

    /// Set a named property, transitioning the object's layout if the
    /// property is new.
    pub fn set_property(
        &mut self,
        obj: ObjectId,
        name: PropertyId,
        value: Value,
    ) -> Result<(), HeapError> {
        self.materialize(obj);
        let (rt, layout_id) = self.object_layout(obj)?;
        let layout = self
            .layouts
            .get(layout_id)
            .ok_or_else(|| HeapError::unknown("layout", layout_id))?;

        if let Some(slot) = layout.lookup(name) {
            return self.store_slot(obj, slot as usize, value);
        }
        if !layout.is_extensible() {
            return Err(HeapError::NotExtensible(obj));
        }

        let next = self
            .layouts
            .transition(&mut self.ids, layout_id, name, PropertyFlags::default())
            .ok_or_else(|| HeapError::unknown("layout", layout_id))?;
        let next_ty = self.dynamic_type(rt.context, rt.tag, rt.prototype, next);

        let object = self
            .objects
            .get_mut(&obj)
            .ok_or_else(|| HeapError::unknown("object", obj))?;
        object.type_id.set(next_ty);
        object
            .compound_mut()
            .ok_or(HeapError::NotCompound(obj))?
            .storage
            .slots_mut()
            .push(value);
        Ok(())
    }

    /// Read a named property.
    ///
    /// Deferred objects are read through their target layout without being
    /// materialized.
    pub fn get_property(&self, obj: ObjectId, name: PropertyId) -> Option<Value> {
        let object = self.objects.get(&obj)?;
        let compound = object.compound()?.borrow();
        let ty = match &compound.storage {
            ObjectStorage::Deferred { target, .. } => *target,
            ObjectStorage::Materialized { .. } => object.type_id(),
        };
        let layout = self.types.get(&ty)?.layout?;
        let slot = self.layouts.get(layout)?.lookup(name)?;
        compound.storage.slots().get(slot as usize).copied()
    }

    /// Overwrite an existing property slot.
    pub fn store_slot(&mut self, obj: ObjectId, slot: usize, value: Value) -> Result<(), HeapError> {
        let slots = self.compound_mut(obj)?.storage.slots_mut();
        let len = slots.len();
        let target = slots.get_mut(slot).ok_or(HeapError::SlotOutOfRange {
            id: obj.ptr_id(),
            slot,
            len,
        })?;
        *target = value;
        Ok(())
    }

    /// Attach or detach an indexed-element backing store.
    pub fn set_indexed_store(
        &mut self,
        obj: ObjectId,
        store: Option<ObjectId>,
    ) -> Result<(), HeapError> {
        if let Some(store) = store {
            self.check_object(store)?;
        }
        self.materialize(obj);
        if let ObjectStorage::Materialized { indexed_store, .. } =
            &mut self.compound_mut(obj)?.storage
        {
            *indexed_store = store;
        }
        Ok(())
    }

    /// Mutable access to an object's kind-specific data.
    pub fn kind_mut(&mut self, obj: ObjectId) -> Result<&mut ObjectKind, HeapError> {
        Ok(&mut self.compound_mut(obj)?.kind)
    }

    fn compound_mut(&mut self, obj: ObjectId) -> Result<&mut CompoundObject, HeapError> {
        self.objects
            .get_mut(&obj)
            .ok_or_else(|| HeapError::unknown("object", obj))?
            .compound_mut()
            .ok_or(HeapError::NotCompound(obj))
    }

    /// Make an object non-extensible.
    pub fn seal_object(&mut self, obj: ObjectId) -> Result<(), HeapError> {
        self.materialize(obj);
        let (rt, layout_id) = self.object_layout(obj)?;
        let sealed = self
            .layouts
            .seal(&mut self.ids, layout_id)
            .ok_or_else(|| HeapError::unknown("layout", layout_id))?;
        let ty = self.dynamic_type(rt.context, rt.tag, rt.prototype, sealed);
        self.check_object(obj)?.type_id.set(ty);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Functions and Scopes
    // -------------------------------------------------------------------------

    /// Create a function body.
    pub fn create_function_body(
        &mut self,
        ctx: ContextId,
        name: impl Into<String>,
        parent: Option<FunctionBodyId>,
        line: u32,
        column: u32,
    ) -> Result<FunctionBodyId, HeapError> {
        self.check_context(ctx)?;
        if let Some(parent) = parent {
            if !self.bodies.contains_key(&parent) {
                return Err(HeapError::unknown("function body", parent));
            }
        }
        let id = FunctionBodyId::new(self.ids.issue());
        self.bodies.insert(
            id,
            FunctionBody {
                id,
                context: ctx,
                name: name.into(),
                parent,
                line,
                column,
            },
        );
        Ok(id)
    }

    /// Get a function body.
    pub fn function_body(&self, body: FunctionBodyId) -> Option<&FunctionBody> {
        self.bodies.get(&body)
    }

    /// Create a slot array of captured variables.
    pub fn create_slot_array(
        &mut self,
        ctx: ContextId,
        slots: Vec<Value>,
        function_body: Option<FunctionBodyId>,
    ) -> Result<SlotArrayId, HeapError> {
        self.check_context(ctx)?;
        if let Some(body) = function_body {
            if !self.bodies.contains_key(&body) {
                return Err(HeapError::unknown("function body", body));
            }
        }
        let id = SlotArrayId::new(self.ids.issue());
        self.slot_arrays.insert(
            id,
            SlotArray {
                id,
                context: ctx,
                slots,
                function_body,
            },
        );
        Ok(id)
    }

    /// Overwrite one captured variable.
    pub fn set_slot_array_value(
        &mut self,
        id: SlotArrayId,
        slot: usize,
        value: Value,
    ) -> Result<(), HeapError> {
        let array = self
            .slot_arrays
            .get_mut(&id)
            .ok_or_else(|| HeapError::unknown("slot array", id))?;
        let len = array.slots.len();
        let target = array.slots.get_mut(slot).ok_or(HeapError::SlotOutOfRange {
            id: id.ptr_id(),
            slot,
            len,
        })?;
        *target = value;
        Ok(())
    }

    /// Get a slot array.
    pub fn slot_array(&self, id: SlotArrayId) -> Option<&SlotArray> {
        self.slot_arrays.get(&id)
    }

    /// Create a closure environment from its scopes, innermost first.
    pub fn create_environment(
        &mut self,
        ctx: ContextId,
        scopes: &[Scope],
    ) -> Result<EnvironmentId, HeapError> {
        self.check_context(ctx)?;
        for scope in scopes {
            match *scope {
                Scope::Activation(obj) | Scope::With(obj) => {
                    self.check_object(obj)?;
                }
                Scope::SlotArray(slots) => {
                    if !self.slot_arrays.contains_key(&slots) {
                        return Err(HeapError::unknown("slot array", slots));
                    }
                }
            }
        }
        let id = EnvironmentId::new(self.ids.issue());
        self.environments.insert(
            id,
            Environment {
                id,
                context: ctx,
                scopes: scopes.iter().copied().collect(),
            },
        );
        Ok(id)
    }

    /// Get an environment.
    pub fn environment(&self, env: EnvironmentId) -> Option<&Environment> {
        self.environments.get(&env)
    }

    /// Create a closure over `body` capturing `environment`.
    pub fn create_closure(
        &mut self,
        ctx: ContextId,
        body: FunctionBodyId,
        environment: EnvironmentId,
    ) -> Result<ObjectId, HeapError> {
        if !self.bodies.contains_key(&body) {
            return Err(HeapError::unknown("function body", body));
        }
        if !self.environments.contains_key(&environment) {
            return Err(HeapError::unknown("environment", environment));
        }
        self.create_object(
            ctx,
            ObjectKind::Closure {
                body,
                environment,
                home_object: None,
            },
        )
    }

    // -------------------------------------------------------------------------
    // Faulting lookups
    // -------------------------------------------------------------------------

    #[track_caller]
    pub(crate) fn expect_object(&self, obj: ObjectId) -> &HeapObject {
        self.objects
            .get(&obj)
            .unwrap_or_else(|| missing("object", obj))
    }

    #[track_caller]
    pub(crate) fn expect_type(&self, ty: TypeId) -> &RuntimeType {
        self.types.get(&ty).unwrap_or_else(|| missing("type", ty))
    }

    #[track_caller]
    pub(crate) fn expect_body(&self, body: FunctionBodyId) -> &FunctionBody {
        self.bodies
            .get(&body)
            .unwrap_or_else(|| missing("function body", body))
    }

    #[track_caller]
    pub(crate) fn expect_environment(&self, env: EnvironmentId) -> &Environment {
        self.environments
            .get(&env)
            .unwrap_or_else(|| missing("environment", env))
    }

    #[track_caller]
    pub(crate) fn expect_slot_array(&self, id: SlotArrayId) -> &SlotArray {
        self.slot_arrays
            .get(&id)
            .unwrap_or_else(|| missing("slot array", id))
    }

    #[track_caller]
    pub(crate) fn expect_context(&self, ctx: ContextId) -> &ScriptContext {
        self.context(ctx).unwrap_or_else(|| missing("context", ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: PropertyId = PropertyId(1);
    const Y: PropertyId = PropertyId(2);

    #[test]
    fn test_context_intrinsics() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let context = heap.context(ctx).unwrap();

        assert_eq!(context.well_known_objects().len(), 3);
        assert_eq!(context.well_known_types().len(), TypeTag::PRIMITIVES.len());
        let global = context.global_object();
        let global_ty = heap.runtime_type(heap.object(global).unwrap().type_id()).unwrap();
        assert_eq!(global_ty.prototype, Some(context.object_prototype()));
        assert_eq!(heap.context_ids(), vec![ctx]);
        assert!(heap.context(ContextId(0)).is_none());
        assert!(heap.context(ContextId(2)).is_none());
    }

    #[test]
    fn test_same_additions_share_type() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let a = heap.create_object(ctx, ObjectKind::Plain).unwrap();
        let b = heap.create_object(ctx, ObjectKind::Plain).unwrap();

        for obj in [a, b] {
            heap.set_property(obj, X, Value::Int(1)).unwrap();
            heap.set_property(obj, Y, Value::Int(2)).unwrap();
        }
        let ty_a = heap.object(a).unwrap().type_id();
        assert_eq!(ty_a, heap.object(b).unwrap().type_id());

        heap.set_property(a, X, Value::Int(10)).unwrap();
        assert_eq!(heap.object(a).unwrap().type_id(), ty_a);
        assert_eq!(heap.get_property(a, X), Some(Value::Int(10)));
        assert_eq!(heap.get_property(b, Y), Some(Value::Int(2)));
        assert_eq!(heap.get_property(b, PropertyId(7)), None);
    }

    #[test]
    fn test_deferred_object_materializes_on_write() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let obj = heap
            .create_deferred_object(ctx, ObjectKind::Plain, &[(X, Value::Int(1)), (Y, Value::Int(2))])
            .unwrap();

        let placeholder = heap.object(obj).unwrap().type_id();
        assert!(!heap.runtime_type(placeholder).unwrap().is_dynamic());
        assert_eq!(heap.get_property(obj, Y), Some(Value::Int(2)));
        assert_eq!(heap.materialization_count(), 0);

        heap.set_property(obj, X, Value::Int(5)).unwrap();
        assert_eq!(heap.materialization_count(), 1);
        let ty = heap.object(obj).unwrap().type_id();
        assert!(heap.runtime_type(ty).unwrap().is_dynamic());
        assert_eq!(heap.get_property(obj, X), Some(Value::Int(5)));

        assert!(!heap.materialize(obj));
        assert_eq!(heap.materialization_count(), 1);
    }

    #[test]
    fn test_sealed_object_rejects_new_properties() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let obj = heap.create_object(ctx, ObjectKind::Plain).unwrap();
        heap.set_property(obj, X, Value::Int(1)).unwrap();
        heap.seal_object(obj).unwrap();

        heap.set_property(obj, X, Value::Int(2)).unwrap();
        assert_eq!(
            heap.set_property(obj, Y, Value::Int(3)),
            Err(HeapError::NotExtensible(obj))
        );
    }

    #[test]
    fn test_builder_errors() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let prim = heap
            .create_primitive(ctx, PrimitiveData::String("s".into()))
            .unwrap();

        assert_eq!(
            heap.create_object(ContextId(9), ObjectKind::Plain),
            Err(HeapError::UnknownContext(ContextId(9)))
        );
        assert_eq!(
            heap.set_property(prim, X, Value::Int(1)),
            Err(HeapError::NotCompound(prim))
        );

        let obj = heap.create_object(ctx, ObjectKind::Plain).unwrap();
        assert_eq!(
            heap.store_slot(obj, 3, Value::Int(1)),
            Err(HeapError::SlotOutOfRange {
                id: obj.ptr_id(),
                slot: 3,
                len: 0
            })
        );

        let missing_body = FunctionBodyId::from_raw(9999);
        assert!(matches!(
            heap.load_source(ctx, TopLevelKind::Eval, missing_body, "u", "s"),
            Err(HeapError::Unknown { kind: "function body", .. })
        ));
    }

    #[test]
    fn test_closures_use_function_prototype() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let body = heap.create_function_body(ctx, "f", None, 1, 0).unwrap();
        let env = heap.create_environment(ctx, &[]).unwrap();
        let closure = heap.create_closure(ctx, body, env).unwrap();

        let ty = heap.runtime_type(heap.object(closure).unwrap().type_id()).unwrap();
        assert_eq!(ty.tag, TypeTag::Function);
        assert_eq!(
            ty.prototype,
            Some(heap.context(ctx).unwrap().function_prototype())
        );
    }

    #[test]
    fn test_load_ids_are_sequential() {
        let mut heap = Heap::new();
        let ctx = heap.create_context();
        let a = heap.create_function_body(ctx, "a", None, 0, 0).unwrap();
        let b = heap.create_function_body(ctx, "b", None, 0, 0).unwrap();

        assert_eq!(heap.load_source(ctx, TopLevelKind::ScriptLoad, a, "a.js", "a()"), Ok(1));
        assert_eq!(heap.load_source(ctx, TopLevelKind::NewFunction, b, "", "b()"), Ok(2));
        assert_eq!(heap.context(ctx).unwrap().loaded_sources()[1].body, b);
    }

    #[test]
    #[should_panic(expected = "unknown object ObjectId(#4242)")]
    fn test_missing_entity_faults() {
        let heap = Heap::new();
        heap.expect_object(ObjectId::from_raw(4242));
    }
}
