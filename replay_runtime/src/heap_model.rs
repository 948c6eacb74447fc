//! Snapshot access to the heap.
//!
//! Implements [`HeapModel`] for [`Heap`]. Kind-specific queries go through
//! the [`kind_dispatch`](crate::kind_dispatch) table; everything else reads
//! the heap's own maps. An ID that does not resolve is a fault: the engine
//! only asks about entities the heap handed out.

use crate::heap::{missing, Heap};
use crate::kind_dispatch::entry_for;
use crate::object::PrimitiveData;
use replay_snapshot::model::{
    ContextInfo, EnvironmentInfo, FunctionBodyInfo, HeapModel, LayoutInfo, Marker, ObjectClass,
    PrimitiveValue, SlotArrayInfo, TopLevelSource, TypeInfo,
};
use replay_snapshot::snapshot::{ObjectPayload, SnapshotArena};
use replay_snapshot::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, SlotArrayId, TypeId, Value,
};
use smallvec::SmallVec;

impl HeapModel for Heap {
    fn object_class(&self, obj: ObjectId) -> ObjectClass {
        if self.expect_object(obj).is_primitive() {
            ObjectClass::Primitive
        } else {
            ObjectClass::Compound
        }
    }

    fn type_of(&self, obj: ObjectId) -> TypeId {
        self.expect_object(obj).type_id()
    }

    fn is_deferred(&self, obj: ObjectId) -> bool {
        self.expect_object(obj)
            .compound()
            .is_some_and(|cell| cell.borrow().storage.is_deferred())
    }

    fn ensure_materialized(&self, obj: ObjectId) {
        self.expect_object(obj);
        self.materialize(obj);
    }

    fn object_slots(&self, obj: ObjectId) -> SmallVec<[Value; 8]> {
        match self.expect_object(obj).compound() {
            Some(cell) => SmallVec::from_slice(cell.borrow().storage.slots()),
            None => SmallVec::new(),
        }
    }

    fn indexed_store(&self, obj: ObjectId) -> Option<ObjectId> {
        self.expect_object(obj)
            .compound()
            .and_then(|cell| cell.borrow().storage.indexed_store())
    }

    fn mark_kind_specific(&self, obj: ObjectId, marker: &mut dyn Marker) {
        if let Some(cell) = self.expect_object(obj).compound() {
            let compound = cell.borrow();
            (entry_for(&compound.kind).mark)(&compound.kind, marker);
        }
    }

    fn extract_kind_payload(&self, obj: ObjectId, arena: &mut SnapshotArena) -> ObjectPayload {
        match self.expect_object(obj).compound() {
            Some(cell) => {
                let compound = cell.borrow();
                (entry_for(&compound.kind).extract)(self, &compound.kind, arena)
            }
            None => ObjectPayload::Plain,
        }
    }

    fn closure_environment(&self, obj: ObjectId) -> Option<EnvironmentId> {
        let cell = self.expect_object(obj).compound()?;
        let compound = cell.borrow();
        (entry_for(&compound.kind).environment)(&compound.kind)
    }

    fn primitive_value(&self, obj: ObjectId) -> PrimitiveValue<'_> {
        let Some(data) = self.expect_object(obj).primitive_data() else {
            missing("primitive object", obj);
        };
        match data {
            PrimitiveData::Undefined => PrimitiveValue::Undefined,
            PrimitiveData::Null => PrimitiveValue::Null,
            PrimitiveData::Boolean(b) => PrimitiveValue::Boolean(*b),
            PrimitiveData::Number(n) => PrimitiveValue::Number(*n),
            PrimitiveData::Int64(i) => PrimitiveValue::Int64(*i),
            PrimitiveData::String(s) => PrimitiveValue::String(s),
            PrimitiveData::Symbol(sym) => PrimitiveValue::Symbol(*sym),
        }
    }

    fn type_info(&self, ty: TypeId) -> TypeInfo {
        let rt = self.expect_type(ty);
        TypeInfo {
            type_tag: rt.tag.raw(),
            context: rt.context,
            layout: rt.layout,
            prototype: rt.prototype,
            has_no_enumerable_properties: rt.has_no_enumerable_properties,
        }
    }

    fn layout_info(&self, layout: LayoutId) -> LayoutInfo<'_> {
        let layout = self
            .layouts()
            .get(layout)
            .unwrap_or_else(|| missing("layout", layout));
        LayoutInfo {
            properties: layout.properties(),
            inline_slot_capacity: layout.inline_slot_capacity(),
            extensible: layout.is_extensible(),
        }
    }

    fn function_body_info(&self, body: FunctionBodyId) -> FunctionBodyInfo<'_> {
        let body = self.expect_body(body);
        FunctionBodyInfo {
            context: body.context,
            name: &body.name,
            parent: body.parent,
            line: body.line,
            column: body.column,
        }
    }

    fn environment_info(&self, env: EnvironmentId) -> EnvironmentInfo {
        let env = self.expect_environment(env);
        EnvironmentInfo {
            context: env.context,
            scopes: env.scopes.clone(),
        }
    }

    fn slot_array_info(&self, slots: SlotArrayId) -> SlotArrayInfo<'_> {
        let array = self.expect_slot_array(slots);
        SlotArrayInfo {
            context: array.context,
            slots: &array.slots,
            function_body: array.function_body,
        }
    }

    fn context_info(&self, ctx: ContextId) -> ContextInfo {
        let context = self.expect_context(ctx);
        ContextInfo {
            id: context.id(),
            global_object: context.global_object(),
        }
    }

    fn for_each_loaded_source(&self, ctx: ContextId, visit: &mut dyn FnMut(TopLevelSource<'_>)) {
        for source in self.expect_context(ctx).loaded_sources() {
            visit(TopLevelSource {
                kind: source.kind,
                load_id: source.load_id,
                body: source.body,
                uri: &source.uri,
                source: &source.source,
            });
        }
    }

    fn mark_well_known(&self, ctx: ContextId, marker: &mut dyn Marker) {
        let context = self.expect_context(ctx);
        for &obj in context.well_known_objects() {
            marker.mark_value(obj.into());
        }
        for &ty in context.well_known_types() {
            marker.mark_type(ty);
        }
    }
}
