//! The mark phase.

use super::{MarkTable, MarkTag, Worklist};
use crate::id::{ContextId, EnvironmentId, FunctionBodyId, ObjectId, SlotArrayId, TypeId, Value};
use crate::model::{HeapModel, Marker, ObjectClass, Scope};

/// Counters reported by one mark phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MarkSummary {
    /// Roots supplied by the caller.
    pub roots: usize,
    /// Compound objects whose fields were expanded.
    pub objects_expanded: usize,
    /// Marks set when the phase finished.
    pub marks: usize,
}

/// Marks everything reachable from the roots and the contexts' well-known tables.
pub(crate) fn run_mark_phase<H: HeapModel + ?Sized>(
    heap: &H,
    marks: &mut MarkTable,
    worklist: &mut Worklist,
    roots: &[Value],
    contexts: &[ContextId],
) -> MarkSummary {
    let mut walker = MarkWalker {
        heap,
        marks,
        worklist,
        well_known: false,
        expanded: 0,
    };

    for root in roots {
        walker.visit_value(*root);
    }
    walker.drain_worklist();

    // Intrinsics may be unreachable from user roots; close over them the same way.
    walker.well_known = true;
    for ctx in contexts {
        heap.mark_well_known(*ctx, &mut walker);
    }
    walker.well_known = false;
    walker.drain_worklist();

    MarkSummary {
        roots: roots.len(),
        objects_expanded: walker.expanded,
        marks: walker.marks.len(),
    }
}

/// Marking visitor.
///
/// Hooks reach it through [`Marker`]; entities reported while `well_known` is
/// set get the well-known flag, entities reached through them do not.
struct MarkWalker<'a, H: HeapModel + ?Sized> {
    heap: &'a H,
    marks: &'a mut MarkTable,
    worklist: &'a mut Worklist,
    well_known: bool,
    expanded: usize,
}

impl<'a, H: HeapModel + ?Sized> MarkWalker<'a, H> {
    fn visit_value(&mut self, value: Value) {
        let Some(obj) = value.as_object() else {
            return;
        };
        let heap = self.heap;

        match heap.object_class(obj) {
            ObjectClass::Primitive => {
                if self.marks.mark_and_test(obj, MarkTag::PrimitiveObject) {
                    self.visit_type(heap.type_of(obj));
                }
            }
            ObjectClass::Compound => {
                if self.marks.mark_and_test(obj, MarkTag::CompoundObject) {
                    // Materializing can change the type, so it must happen first.
                    if heap.is_deferred(obj) {
                        heap.ensure_materialized(obj);
                    }
                    self.visit_type(heap.type_of(obj));
                    self.worklist.enqueue(obj);
                }
            }
        }
    }

    fn visit_type(&mut self, ty: TypeId) {
        if !self.marks.mark_and_test(ty, MarkTag::Type) {
            return;
        }

        let info = self.heap.type_info(ty);
        if let Some(layout) = info.layout {
            self.marks.mark_and_test(layout, MarkTag::LayoutDescriptor);
        }
        if let Some(proto) = info.prototype {
            self.visit_value(Value::Object(proto));
        }
    }

    fn visit_environment(&mut self, env: EnvironmentId) {
        if !self.marks.mark_and_test(env, MarkTag::Environment) {
            return;
        }

        for scope in self.heap.environment_info(env).scopes {
            match scope {
                Scope::Activation(obj) | Scope::With(obj) => self.visit_value(Value::Object(obj)),
                Scope::SlotArray(slots) => self.visit_slot_array(slots),
            }
        }
    }

    fn visit_slot_array(&mut self, slots: SlotArrayId) {
        if !self.marks.mark_and_test(slots, MarkTag::SlotArray) {
            return;
        }

        let heap = self.heap;
        let info = heap.slot_array_info(slots);
        if let Some(body) = info.function_body {
            self.visit_function_body(body);
        }
        for value in info.slots {
            self.visit_value(*value);
        }
    }

    /// Marks `body` and its lexical parents, stopping at the first ancestor
    /// that is already marked; sibling closures share the walk above it.
    fn visit_function_body(&mut self, body: FunctionBodyId) {
        if !self.marks.mark_and_test(body, MarkTag::FunctionBody) {
            return;
        }

        let heap = self.heap;
        let mut parent = heap.function_body_info(body).parent;
        while let Some(current) = parent {
            if !self.marks.mark_and_test(current, MarkTag::FunctionBody) {
                break;
            }
            parent = heap.function_body_info(current).parent;
        }
    }

    fn visit_standard_properties(&mut self, obj: ObjectId) {
        let heap = self.heap;
        for value in heap.object_slots(obj) {
            self.visit_value(value);
        }
        if let Some(store) = heap.indexed_store(obj) {
            self.visit_value(Value::Object(store));
        }
    }

    fn drain_worklist(&mut self) {
        let heap = self.heap;
        while let Some(obj) = self.worklist.dequeue() {
            self.expanded += 1;
            self.visit_standard_properties(obj);
            heap.mark_kind_specific(obj, self);
        }
    }

    fn flag_well_known(&mut self, id: impl Into<crate::id::PtrId>) {
        if self.well_known {
            self.marks.set_well_known(id);
        }
    }
}

impl<'a, H: HeapModel + ?Sized> Marker for MarkWalker<'a, H> {
    fn mark_value(&mut self, value: Value) {
        self.visit_value(value);
        if let Some(obj) = value.as_object() {
            self.flag_well_known(obj);
        }
    }

    fn mark_type(&mut self, ty: TypeId) {
        self.visit_type(ty);
        self.flag_well_known(ty);
    }

    fn mark_environment(&mut self, env: EnvironmentId) {
        self.visit_environment(env);
        self.flag_well_known(env);
    }

    fn mark_function_body(&mut self, body: FunctionBodyId) {
        self.visit_function_body(body);
        self.flag_well_known(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::MarkFlags;
    use crate::testing::MockHeap;

    fn mark(heap: &MockHeap, roots: &[Value]) -> (MarkTable, MarkSummary) {
        let mut marks = MarkTable::new();
        let mut worklist = Worklist::new();
        let summary = run_mark_phase(heap, &mut marks, &mut worklist, roots, &heap.contexts());
        assert!(worklist.is_empty());
        (marks, summary)
    }

    #[test]
    fn test_immediates_are_not_marked() {
        let heap = MockHeap::new();
        let (marks, summary) = mark(&heap, &[Value::Int(1), Value::Float(2.0)]);

        assert_eq!(summary.roots, 2);
        // Only the well-known global is marked and expanded.
        assert_eq!(summary.objects_expanded, 1);
        assert_eq!(marks.count_for_tag(MarkTag::CompoundObject), 1);
        assert!(marks.is_marked_as(heap.global(), MarkTag::CompoundObject));
    }

    #[test]
    fn test_no_contexts_expands_nothing_for_immediates() {
        let heap = MockHeap::new();
        let mut marks = MarkTable::new();
        let mut worklist = Worklist::new();
        let summary = run_mark_phase(&heap, &mut marks, &mut worklist, &[Value::Int(1)], &[]);

        assert_eq!(summary.roots, 1);
        assert_eq!(summary.objects_expanded, 0);
        assert!(marks.is_empty());
    }

    #[test]
    fn test_shared_type_and_layout_marked_once() {
        let mut heap = MockHeap::new();
        let (ty, layout) = heap.dynamic_type(None);
        let b = heap.object(ty, vec![]);
        let a = heap.object(ty, vec![Value::Int(5), Value::Object(b)]);

        let (marks, _) = mark(&heap, &[Value::Object(a)]);

        assert!(marks.is_marked_as(a, MarkTag::CompoundObject));
        assert!(marks.is_marked_as(b, MarkTag::CompoundObject));
        assert!(marks.is_marked_as(ty, MarkTag::Type));
        assert!(marks.is_marked_as(layout, MarkTag::LayoutDescriptor));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut heap = MockHeap::new();
        let (ty, _) = heap.dynamic_type(None);
        let a = heap.object(ty, vec![]);
        let b = heap.object(ty, vec![Value::Object(a)]);
        heap.set_slots(a, vec![Value::Object(b), Value::Object(a)]);

        let (marks, summary) = mark(&heap, &[Value::Object(a), Value::Object(b)]);

        // a, b and the well-known global.
        assert_eq!(marks.count_for_tag(MarkTag::CompoundObject), 3);
        assert_eq!(summary.objects_expanded, 3);
    }

    #[test]
    fn test_primitive_marks_its_type_but_is_not_expanded() {
        let mut heap = MockHeap::new();
        let static_ty = heap.static_type();
        let prim = heap.primitive(static_ty);

        let (marks, summary) = mark(&heap, &[Value::Object(prim)]);

        assert!(marks.is_marked_as(prim, MarkTag::PrimitiveObject));
        assert!(marks.is_marked_as(static_ty, MarkTag::Type));
        // Only the global is expanded.
        assert_eq!(summary.objects_expanded, 1);
    }

    #[test]
    fn test_deferred_object_materialized_before_type_visit() {
        let mut heap = MockHeap::new();
        let deferred_ty = heap.static_type();
        let (ty, layout) = heap.dynamic_type(None);
        let obj = heap.deferred_object(deferred_ty, ty, vec![Value::Int(1)]);

        let (marks, _) = mark(&heap, &[Value::Object(obj)]);

        assert!(!heap.is_deferred(obj));
        assert_eq!(heap.materialize_count(obj), 1);
        assert!(marks.is_marked_as(ty, MarkTag::Type));
        assert!(marks.is_marked_as(layout, MarkTag::LayoutDescriptor));
        assert!(!marks.is_marked(deferred_ty));
    }

    #[test]
    fn test_prototype_chain_is_marked() {
        let mut heap = MockHeap::new();
        let (proto_ty, _) = heap.dynamic_type(None);
        let proto = heap.object(proto_ty, vec![]);
        let (ty, _) = heap.dynamic_type(Some(proto));
        let obj = heap.object(ty, vec![]);

        let (marks, _) = mark(&heap, &[Value::Object(obj)]);
        assert!(marks.is_marked_as(proto, MarkTag::CompoundObject));
        assert!(marks.is_marked_as(proto_ty, MarkTag::Type));
    }

    #[test]
    fn test_closure_scope_chain_marking() {
        let mut heap = MockHeap::new();
        let (ty, _) = heap.dynamic_type(None);
        let captured = heap.object(ty, vec![]);
        let outer = heap.function_body(None);
        let inner = heap.function_body(Some(outer));
        let slots = heap.slot_array(vec![Value::Object(captured), Value::Int(3)], Some(inner));
        let activation = heap.object(ty, vec![]);
        let env = heap.environment(vec![Scope::SlotArray(slots), Scope::Activation(activation)]);
        let closure = heap.closure(ty, inner, env);

        let (marks, _) = mark(&heap, &[Value::Object(closure)]);

        assert!(marks.is_marked_as(env, MarkTag::Environment));
        assert!(marks.is_marked_as(slots, MarkTag::SlotArray));
        assert!(marks.is_marked_as(captured, MarkTag::CompoundObject));
        assert!(marks.is_marked_as(activation, MarkTag::CompoundObject));
        assert!(marks.is_marked_as(inner, MarkTag::FunctionBody));
        assert!(marks.is_marked_as(outer, MarkTag::FunctionBody));
    }

    #[test]
    fn test_parent_walk_stops_at_marked_ancestor() {
        let mut heap = MockHeap::new();
        let root = heap.function_body(None);
        let middle = heap.function_body(Some(root));
        let leaf_a = heap.function_body(Some(middle));
        let leaf_b = heap.function_body(Some(middle));

        let mut marks = MarkTable::new();
        let mut worklist = Worklist::new();
        let mut walker = MarkWalker {
            heap: &heap,
            marks: &mut marks,
            worklist: &mut worklist,
            well_known: false,
            expanded: 0,
        };

        walker.visit_function_body(leaf_a);
        heap.reset_body_queries();
        walker.visit_function_body(leaf_b);

        // Only leaf_b itself is queried; `middle` is already marked.
        assert_eq!(heap.body_queries(), 1);
        assert_eq!(marks.count_for_tag(MarkTag::FunctionBody), 4);
    }

    #[test]
    fn test_well_known_entities_are_flagged_and_closed_over() {
        let mut heap = MockHeap::new();
        let (ty, layout) = heap.dynamic_type(None);
        let hidden = heap.object(ty, vec![]);
        let intrinsic = heap.object(ty, vec![Value::Object(hidden)]);
        heap.add_well_known(intrinsic);

        let (marks, _) = mark(&heap, &[]);

        assert!(marks.is_well_known(intrinsic));
        assert!(marks.is_marked_as(hidden, MarkTag::CompoundObject));
        assert!(!marks.is_well_known(hidden));
        assert!(!marks.flags(layout).contains(MarkFlags::WELL_KNOWN));
    }
}
