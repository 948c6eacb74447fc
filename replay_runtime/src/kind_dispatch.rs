//! Per-kind snapshot dispatch.
//!
//! The heap answers kind-specific snapshot queries through a static table of
//! function pointers indexed by [`KindTag`], so adding an object kind means
//! registering one entry rather than extending every query:
//!
//! ```text
//! ┌───────────────┬──────────────────┬──────────────────────┬──────────────────┐
//! │ KindTag       │ mark_fn          │ extract_fn           │ environment_fn   │
//! ├───────────────┼──────────────────┼──────────────────────┼──────────────────┤
//! │ Plain         │ mark_none        │ extract_plain        │ no_environment   │
//! │ Array         │ mark_array       │ extract_array        │ no_environment   │
//! │ Closure       │ mark_closure     │ extract_closure      │ closure_env      │
//! │ ...           │ ...              │ ...                  │ ...              │
//! └───────────────┴──────────────────┴──────────────────────┴──────────────────┘
//! ```
//!
//! The table is built once on first use and read-only thereafter.

use crate::heap::Heap;
use crate::object::{KindTag, ObjectKind};
use replay_snapshot::model::Marker;
use replay_snapshot::snapshot::{ObjectPayload, SnapshotArena};
use replay_snapshot::EnvironmentId;
use std::sync::OnceLock;
use tracing::error;

// =============================================================================
// Dispatch Entry
// =============================================================================

/// Report every kind-specific reference.
pub type MarkFn = fn(kind: &ObjectKind, marker: &mut dyn Marker);

/// Build the kind-specific snapshot payload.
pub type ExtractFn = fn(heap: &Heap, kind: &ObjectKind, arena: &mut SnapshotArena) -> ObjectPayload;

/// Environment captured by the object, if any.
pub type EnvironmentFn = fn(kind: &ObjectKind) -> Option<EnvironmentId>;

/// Dispatch entry for one object kind.
#[derive(Clone, Copy)]
pub struct DispatchEntry {
    /// Mark references.
    pub mark: MarkFn,
    /// Extract payload.
    pub extract: ExtractFn,
    /// Captured environment.
    pub environment: EnvironmentFn,
}

// =============================================================================
// Dispatch Table
// =============================================================================

struct DispatchTable {
    entries: [DispatchEntry; KindTag::COUNT],
}

impl DispatchTable {
    const fn new() -> Self {
        Self {
            entries: [DispatchEntry {
                mark: mark_none,
                extract: extract_plain,
                environment: no_environment,
            }; KindTag::COUNT],
        }
    }

    fn register(&mut self, tag: KindTag, entry: DispatchEntry) {
        self.entries[tag as usize] = entry;
    }

    #[inline(always)]
    fn get(&self, tag: KindTag) -> &DispatchEntry {
        &self.entries[tag as usize]
    }
}

static DISPATCH_TABLE: OnceLock<DispatchTable> = OnceLock::new();

#[inline(always)]
fn dispatch_table() -> &'static DispatchTable {
    DISPATCH_TABLE.get_or_init(init_dispatch_table)
}

fn init_dispatch_table() -> DispatchTable {
    let mut table = DispatchTable::new();

    table.register(
        KindTag::Array,
        DispatchEntry {
            mark: mark_array,
            extract: extract_array,
            environment: no_environment,
        },
    );
    table.register(
        KindTag::Boxed,
        DispatchEntry {
            mark: mark_boxed,
            extract: extract_boxed,
            environment: no_environment,
        },
    );
    table.register(
        KindTag::Closure,
        DispatchEntry {
            mark: mark_closure,
            extract: extract_closure,
            environment: closure_environment,
        },
    );
    table.register(
        KindTag::BoundFunction,
        DispatchEntry {
            mark: mark_bound_function,
            extract: extract_bound_function,
            environment: no_environment,
        },
    );
    table.register(
        KindTag::Map,
        DispatchEntry {
            mark: mark_map,
            extract: extract_map,
            environment: no_environment,
        },
    );
    table.register(
        KindTag::Set,
        DispatchEntry {
            mark: mark_set,
            extract: extract_set,
            environment: no_environment,
        },
    );
    table.register(
        KindTag::Date,
        DispatchEntry {
            mark: mark_none,
            extract: extract_date,
            environment: no_environment,
        },
    );

    table
}

/// Get the dispatch entry for an object kind.
#[inline]
pub fn entry_for(kind: &ObjectKind) -> &'static DispatchEntry {
    dispatch_table().get(kind.tag())
}

// =============================================================================
// Mark Functions
// =============================================================================

fn mark_none(_kind: &ObjectKind, _marker: &mut dyn Marker) {}

fn mark_array(kind: &ObjectKind, marker: &mut dyn Marker) {
    if let ObjectKind::Array(elements) = kind {
        for &value in elements {
            marker.mark_value(value);
        }
    }
}

fn mark_boxed(kind: &ObjectKind, marker: &mut dyn Marker) {
    if let ObjectKind::Boxed(value) = kind {
        marker.mark_value(*value);
    }
}

fn mark_closure(kind: &ObjectKind, marker: &mut dyn Marker) {
    if let ObjectKind::Closure {
        body,
        environment,
        home_object,
    } = kind
    {
        marker.mark_function_body(*body);
        marker.mark_environment(*environment);
        if let Some(home) = home_object {
            marker.mark_value((*home).into());
        }
    }
}

fn mark_bound_function(kind: &ObjectKind, marker: &mut dyn Marker) {
    if let ObjectKind::BoundFunction {
        target,
        bound_this,
        args,
    } = kind
    {
        marker.mark_value((*target).into());
        marker.mark_value(*bound_this);
        for &arg in args {
            marker.mark_value(arg);
        }
    }
}

fn mark_map(kind: &ObjectKind, marker: &mut dyn Marker) {
    if let ObjectKind::Map(entries) = kind {
        for &(key, value) in entries {
            marker.mark_value(key);
            marker.mark_value(value);
        }
    }
}

fn mark_set(kind: &ObjectKind, marker: &mut dyn Marker) {
    if let ObjectKind::Set(members) = kind {
        for &member in members {
            marker.mark_value(member);
        }
    }
}

// =============================================================================
// Extract Functions
// =============================================================================

/// An entry was invoked for an object of another kind.
#[cold]
#[inline(never)]
fn kind_mismatch(expected: KindTag, kind: &ObjectKind) -> ! {
    error!(?expected, found = ?kind.tag(), "dispatch entry does not match object kind");
    panic!("dispatch entry for {expected:?} invoked on {:?} object", kind.tag());
}

fn extract_plain(_heap: &Heap, _kind: &ObjectKind, _arena: &mut SnapshotArena) -> ObjectPayload {
    ObjectPayload::Plain
}

fn extract_array(_heap: &Heap, kind: &ObjectKind, arena: &mut SnapshotArena) -> ObjectPayload {
    match kind {
        ObjectKind::Array(elements) => ObjectPayload::Array {
            elements: arena.alloc_slice(elements),
        },
        other => kind_mismatch(KindTag::Array, other),
    }
}

fn extract_boxed(_heap: &Heap, kind: &ObjectKind, _arena: &mut SnapshotArena) -> ObjectPayload {
    match kind {
        ObjectKind::Boxed(value) => ObjectPayload::Boxed(*value),
        other => kind_mismatch(KindTag::Boxed, other),
    }
}

fn extract_closure(heap: &Heap, kind: &ObjectKind, _arena: &mut SnapshotArena) -> ObjectPayload {
    match kind {
        ObjectKind::Closure {
            body,
            environment,
            home_object,
        } => ObjectPayload::ScriptFunction {
            body: *body,
            // An environment with no scopes gets no scope chain record.
            environment: (!heap.expect_environment(*environment).is_empty())
                .then_some(*environment),
            home_object: *home_object,
        },
        other => kind_mismatch(KindTag::Closure, other),
    }
}

fn extract_bound_function(
    _heap: &Heap,
    kind: &ObjectKind,
    arena: &mut SnapshotArena,
) -> ObjectPayload {
    match kind {
        ObjectKind::BoundFunction {
            target,
            bound_this,
            args,
        } => ObjectPayload::BoundFunction {
            target: *target,
            bound_this: *bound_this,
            args: arena.alloc_slice(args),
        },
        other => kind_mismatch(KindTag::BoundFunction, other),
    }
}

fn extract_map(_heap: &Heap, kind: &ObjectKind, arena: &mut SnapshotArena) -> ObjectPayload {
    match kind {
        ObjectKind::Map(entries) => ObjectPayload::Map {
            entries: arena.alloc_iter(entries.iter().flat_map(|&(k, v)| [k, v])),
        },
        other => kind_mismatch(KindTag::Map, other),
    }
}

fn extract_set(_heap: &Heap, kind: &ObjectKind, arena: &mut SnapshotArena) -> ObjectPayload {
    match kind {
        ObjectKind::Set(members) => ObjectPayload::Set {
            entries: arena.alloc_slice(members),
        },
        other => kind_mismatch(KindTag::Set, other),
    }
}

fn extract_date(_heap: &Heap, kind: &ObjectKind, _arena: &mut SnapshotArena) -> ObjectPayload {
    match kind {
        ObjectKind::Date(time) => ObjectPayload::Date(*time),
        other => kind_mismatch(KindTag::Date, other),
    }
}

// =============================================================================
// Environment Functions
// =============================================================================

fn no_environment(_kind: &ObjectKind) -> Option<EnvironmentId> {
    None
}

fn closure_environment(kind: &ObjectKind) -> Option<EnvironmentId> {
    match kind {
        ObjectKind::Closure { environment, .. } => Some(*environment),
        other => kind_mismatch(KindTag::Closure, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_snapshot::model::CountingMarker;
    use replay_snapshot::{ObjectId, Value};

    #[test]
    fn test_every_kind_dispatches() {
        let kinds = [
            ObjectKind::Plain,
            ObjectKind::Array(vec![Value::Int(1)]),
            ObjectKind::Boxed(Value::Int(2)),
            ObjectKind::BoundFunction {
                target: ObjectId::from_raw(1),
                bound_this: Value::Int(0),
                args: vec![],
            },
            ObjectKind::Map(vec![]),
            ObjectKind::Set(vec![]),
            ObjectKind::Date(0.0),
        ];
        for kind in &kinds {
            let mut marker = CountingMarker::new();
            (entry_for(kind).mark)(kind, &mut marker);
            assert_eq!((entry_for(kind).environment)(kind), None);
        }
    }

    #[test]
    fn test_mark_reports_references() {
        let map = ObjectKind::Map(vec![
            (Value::Int(1), Value::Object(ObjectId::from_raw(3))),
            (Value::Int(2), Value::Float(1.0)),
        ]);
        let mut marker = CountingMarker::new();
        (entry_for(&map).mark)(&map, &mut marker);
        assert_eq!(marker.values, 4);

        let bound = ObjectKind::BoundFunction {
            target: ObjectId::from_raw(1),
            bound_this: Value::Int(0),
            args: vec![Value::Int(1), Value::Int(2)],
        };
        let mut marker = CountingMarker::new();
        (entry_for(&bound).mark)(&bound, &mut marker);
        assert_eq!(marker.values, 4);
    }

    #[test]
    fn test_closure_marks_body_and_environment() {
        let closure = ObjectKind::Closure {
            body: replay_snapshot::FunctionBodyId::from_raw(1),
            environment: EnvironmentId::from_raw(2),
            home_object: Some(ObjectId::from_raw(3)),
        };
        let mut marker = CountingMarker::new();
        (entry_for(&closure).mark)(&closure, &mut marker);
        assert_eq!(marker.function_bodies, 1);
        assert_eq!(marker.environments, 1);
        assert_eq!(marker.values, 1);
        assert_eq!(
            (entry_for(&closure).environment)(&closure),
            Some(EnvironmentId::from_raw(2))
        );
    }

    #[test]
    #[should_panic(expected = "dispatch entry for Array invoked on Plain object")]
    fn test_extract_on_wrong_kind_panics() {
        let heap = Heap::new();
        let mut arena = SnapshotArena::new();
        extract_array(&heap, &ObjectKind::Plain, &mut arena);
    }

    #[test]
    fn test_map_entries_are_flattened() {
        let heap = Heap::new();
        let mut arena = SnapshotArena::new();
        let map = ObjectKind::Map(vec![(Value::Int(1), Value::Int(10)), (Value::Int(2), Value::Int(20))]);

        match (entry_for(&map).extract)(&heap, &map, &mut arena) {
            ObjectPayload::Map { entries } => assert_eq!(
                arena.get(entries),
                &[Value::Int(1), Value::Int(10), Value::Int(2), Value::Int(20)]
            ),
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
