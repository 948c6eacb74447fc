//! Minimal in-crate heap used by the engine's unit tests.

use crate::id::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, PtrId, SlotArrayId, TypeId,
    Value,
};
use crate::model::{
    ContextInfo, EnvironmentInfo, FunctionBodyInfo, HeapModel, LayoutInfo, Marker, ObjectClass,
    PrimitiveValue, PropertyDescriptor, PropertyFlags, PropertyId, Scope, SlotArrayInfo,
    TopLevelKind, TopLevelSource, TypeInfo,
};
use crate::snapshot::{ObjectPayload, SnapshotArena};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};

pub(crate) const CONTEXT: ContextId = ContextId(1);

/// A structural query answered by the mock, in the order it was asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Query {
    Type(TypeId),
    Layout(LayoutId),
    Payload(ObjectId),
    Primitive(ObjectId),
}

struct MockObject {
    class: ObjectClass,
    ty: Cell<TypeId>,
    /// Type switched to on materialization.
    pending: Cell<Option<TypeId>>,
    materializations: Cell<usize>,
    slots: Vec<Value>,
    closure: Option<(FunctionBodyId, EnvironmentId)>,
}

pub(crate) struct MockHeap {
    next_id: u64,
    objects: FxHashMap<ObjectId, MockObject>,
    types: FxHashMap<TypeId, TypeInfo>,
    layouts: FxHashMap<LayoutId, Vec<PropertyDescriptor>>,
    bodies: FxHashMap<FunctionBodyId, Option<FunctionBodyId>>,
    environments: FxHashMap<EnvironmentId, Vec<Scope>>,
    slot_arrays: FxHashMap<SlotArrayId, (Vec<Value>, Option<FunctionBodyId>)>,
    well_known: Vec<ObjectId>,
    sources: Vec<FunctionBodyId>,
    global: ObjectId,
    body_queries: Cell<usize>,
    queries: RefCell<Vec<Query>>,
}

impl MockHeap {
    pub(crate) fn new() -> Self {
        let mut heap = Self {
            next_id: 0,
            objects: FxHashMap::default(),
            types: FxHashMap::default(),
            layouts: FxHashMap::default(),
            bodies: FxHashMap::default(),
            environments: FxHashMap::default(),
            slot_arrays: FxHashMap::default(),
            well_known: Vec::new(),
            sources: Vec::new(),
            global: ObjectId::from_raw(0),
            body_queries: Cell::new(0),
            queries: RefCell::new(Vec::new()),
        };
        let (ty, _) = heap.dynamic_type(None);
        heap.global = heap.object(ty, vec![]);
        heap
    }

    fn issue(&mut self) -> PtrId {
        self.next_id += 1;
        PtrId(self.next_id)
    }

    pub(crate) fn contexts(&self) -> Vec<ContextId> {
        vec![CONTEXT]
    }

    pub(crate) fn global(&self) -> ObjectId {
        self.global
    }

    pub(crate) fn dynamic_type(&mut self, prototype: Option<ObjectId>) -> (TypeId, LayoutId) {
        let layout = LayoutId::new(self.issue());
        self.layouts.insert(
            layout,
            vec![PropertyDescriptor {
                id: PropertyId(1),
                slot: 0,
                flags: PropertyFlags::default(),
            }],
        );
        let ty = TypeId::new(self.issue());
        self.types.insert(
            ty,
            TypeInfo {
                type_tag: 30,
                context: CONTEXT,
                layout: Some(layout),
                prototype,
                has_no_enumerable_properties: false,
            },
        );
        (ty, layout)
    }

    pub(crate) fn static_type(&mut self) -> TypeId {
        let ty = TypeId::new(self.issue());
        self.types.insert(
            ty,
            TypeInfo {
                type_tag: 5,
                context: CONTEXT,
                layout: None,
                prototype: None,
                has_no_enumerable_properties: true,
            },
        );
        ty
    }

    fn insert_object(
        &mut self,
        class: ObjectClass,
        ty: TypeId,
        pending: Option<TypeId>,
        slots: Vec<Value>,
        closure: Option<(FunctionBodyId, EnvironmentId)>,
    ) -> ObjectId {
        let id = ObjectId::new(self.issue());
        self.objects.insert(
            id,
            MockObject {
                class,
                ty: Cell::new(ty),
                pending: Cell::new(pending),
                materializations: Cell::new(0),
                slots,
                closure,
            },
        );
        id
    }

    pub(crate) fn object(&mut self, ty: TypeId, slots: Vec<Value>) -> ObjectId {
        self.insert_object(ObjectClass::Compound, ty, None, slots, None)
    }

    pub(crate) fn deferred_object(
        &mut self,
        deferred_ty: TypeId,
        ty: TypeId,
        slots: Vec<Value>,
    ) -> ObjectId {
        self.insert_object(ObjectClass::Compound, deferred_ty, Some(ty), slots, None)
    }

    pub(crate) fn primitive(&mut self, ty: TypeId) -> ObjectId {
        self.insert_object(ObjectClass::Primitive, ty, None, vec![], None)
    }

    pub(crate) fn closure(
        &mut self,
        ty: TypeId,
        body: FunctionBodyId,
        env: EnvironmentId,
    ) -> ObjectId {
        self.insert_object(ObjectClass::Compound, ty, None, vec![], Some((body, env)))
    }

    pub(crate) fn set_slots(&mut self, obj: ObjectId, slots: Vec<Value>) {
        if let Some(entry) = self.objects.get_mut(&obj) {
            entry.slots = slots;
        }
    }

    pub(crate) fn function_body(&mut self, parent: Option<FunctionBodyId>) -> FunctionBodyId {
        let body = FunctionBodyId::new(self.issue());
        self.bodies.insert(body, parent);
        body
    }

    pub(crate) fn environment(&mut self, scopes: Vec<Scope>) -> EnvironmentId {
        let env = EnvironmentId::new(self.issue());
        self.environments.insert(env, scopes);
        env
    }

    pub(crate) fn slot_array(
        &mut self,
        slots: Vec<Value>,
        function_body: Option<FunctionBodyId>,
    ) -> SlotArrayId {
        let id = SlotArrayId::new(self.issue());
        self.slot_arrays.insert(id, (slots, function_body));
        id
    }

    pub(crate) fn add_well_known(&mut self, obj: ObjectId) {
        self.well_known.push(obj);
    }

    pub(crate) fn add_loaded_source(&mut self, body: FunctionBodyId) {
        self.sources.push(body);
    }

    pub(crate) fn materialize_count(&self, obj: ObjectId) -> usize {
        self.objects[&obj].materializations.get()
    }

    pub(crate) fn body_queries(&self) -> usize {
        self.body_queries.get()
    }

    pub(crate) fn reset_body_queries(&self) {
        self.body_queries.set(0);
    }

    /// Queries logged since the last [`MockHeap::take_queries`].
    pub(crate) fn take_queries(&self) -> Vec<Query> {
        self.queries.take()
    }

    fn log(&self, query: Query) {
        self.queries.borrow_mut().push(query);
    }
}

impl HeapModel for MockHeap {
    fn object_class(&self, obj: ObjectId) -> ObjectClass {
        self.objects[&obj].class
    }

    fn type_of(&self, obj: ObjectId) -> TypeId {
        self.objects[&obj].ty.get()
    }

    fn is_deferred(&self, obj: ObjectId) -> bool {
        self.objects[&obj].pending.get().is_some()
    }

    fn ensure_materialized(&self, obj: ObjectId) {
        let entry = &self.objects[&obj];
        if let Some(ty) = entry.pending.take() {
            entry.ty.set(ty);
            entry.materializations.set(entry.materializations.get() + 1);
        }
    }

    fn object_slots(&self, obj: ObjectId) -> SmallVec<[Value; 8]> {
        self.objects[&obj].slots.iter().copied().collect()
    }

    fn indexed_store(&self, _obj: ObjectId) -> Option<ObjectId> {
        None
    }

    fn mark_kind_specific(&self, obj: ObjectId, marker: &mut dyn Marker) {
        if let Some((body, env)) = self.objects[&obj].closure {
            marker.mark_function_body(body);
            marker.mark_environment(env);
        }
    }

    fn extract_kind_payload(&self, obj: ObjectId, _arena: &mut SnapshotArena) -> ObjectPayload {
        self.log(Query::Payload(obj));
        match self.objects[&obj].closure {
            Some((body, env)) => ObjectPayload::ScriptFunction {
                body,
                environment: (!self.environments[&env].is_empty()).then_some(env),
                home_object: None,
            },
            None => ObjectPayload::Plain,
        }
    }

    fn closure_environment(&self, obj: ObjectId) -> Option<EnvironmentId> {
        self.objects[&obj].closure.map(|(_, env)| env)
    }

    fn primitive_value(&self, obj: ObjectId) -> PrimitiveValue<'_> {
        self.log(Query::Primitive(obj));
        PrimitiveValue::String("mock")
    }

    fn type_info(&self, ty: TypeId) -> TypeInfo {
        self.log(Query::Type(ty));
        self.types[&ty]
    }

    fn layout_info(&self, layout: LayoutId) -> LayoutInfo<'_> {
        self.log(Query::Layout(layout));
        LayoutInfo {
            properties: &self.layouts[&layout],
            inline_slot_capacity: 4,
            extensible: true,
        }
    }

    fn function_body_info(&self, body: FunctionBodyId) -> FunctionBodyInfo<'_> {
        self.body_queries.set(self.body_queries.get() + 1);
        FunctionBodyInfo {
            context: CONTEXT,
            name: "f",
            parent: self.bodies[&body],
            line: 1,
            column: 0,
        }
    }

    fn environment_info(&self, env: EnvironmentId) -> EnvironmentInfo {
        EnvironmentInfo {
            context: CONTEXT,
            scopes: self.environments[&env].iter().copied().collect(),
        }
    }

    fn slot_array_info(&self, slots: SlotArrayId) -> SlotArrayInfo<'_> {
        let (values, function_body) = &self.slot_arrays[&slots];
        SlotArrayInfo {
            context: CONTEXT,
            slots: values,
            function_body: *function_body,
        }
    }

    fn context_info(&self, ctx: ContextId) -> ContextInfo {
        ContextInfo {
            id: ctx,
            global_object: self.global,
        }
    }

    fn for_each_loaded_source(&self, _ctx: ContextId, visit: &mut dyn FnMut(TopLevelSource<'_>)) {
        for (i, body) in self.sources.iter().enumerate() {
            visit(TopLevelSource {
                kind: TopLevelKind::ScriptLoad,
                load_id: i as u64 + 1,
                body: *body,
                uri: "mock.js",
                source: "f();",
            });
        }
    }

    fn mark_well_known(&self, _ctx: ContextId, marker: &mut dyn Marker) {
        marker.mark_value(Value::Object(self.global));
        for obj in &self.well_known {
            marker.mark_value(Value::Object(*obj));
        }
    }
}
