//! The snapshot container.
//!
//! A [`Snapshot`] owns every record extracted in one cycle, the arena
//! holding their variable-length payloads, and the cycle's two phase
//! durations. It is created by
//! [`SnapshotExtractor::begin_snapshot`](crate::SnapshotExtractor::begin_snapshot)
//! and handed to the caller, fully populated, by
//! [`complete_snapshot`](crate::SnapshotExtractor::complete_snapshot).
//!
//! Records reference each other only by stable entity ID. The `find_*`
//! lookups are linear scans meant for inspection and tests; consumers that
//! restore a snapshot build their own indexes.

mod arena;
mod records;

pub use arena::{ArenaItem, ArenaSlice, ArenaStr, RecordId, RecordList, SnapshotArena};
pub use records::{
    ContextRecord, FunctionBodyRecord, LayoutRecord, ObjectPayload, ObjectRecord,
    PrimitiveRecord, PrimitiveRecordValue, ScopeChainRecord, ScopeEntry, SlotArrayRecord,
    TopLevelRecord, TypeRecord,
};

use crate::config::SnapshotConfig;
use crate::id::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, SlotArrayId, TypeId, Value,
};
use crate::model::PropertyDescriptor;
use crate::verify::{self, IntegrityError};

/// Number of records per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    /// Context records.
    pub contexts: usize,
    /// Top-level source records across all contexts.
    pub top_level_bodies: usize,
    /// Layout descriptor records.
    pub layouts: usize,
    /// Type records.
    pub types: usize,
    /// Primitive object records.
    pub primitives: usize,
    /// Compound object records.
    pub objects: usize,
    /// Function body records (excluding top-level bodies).
    pub function_bodies: usize,
    /// Scope chain records.
    pub scope_chains: usize,
    /// Slot array records.
    pub slot_arrays: usize,
}

impl RecordCounts {
    /// Total number of records.
    pub fn total(&self) -> usize {
        self.contexts
            + self.top_level_bodies
            + self.layouts
            + self.types
            + self.primitives
            + self.objects
            + self.function_bodies
            + self.scope_chains
            + self.slot_arrays
    }
}

/// A self-contained, immutable copy of the reachable heap.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) contexts: RecordList<ContextRecord>,
    pub(crate) layouts: RecordList<LayoutRecord>,
    pub(crate) types: RecordList<TypeRecord>,
    pub(crate) primitives: RecordList<PrimitiveRecord>,
    pub(crate) objects: RecordList<ObjectRecord>,
    pub(crate) function_bodies: RecordList<FunctionBodyRecord>,
    pub(crate) scope_chains: RecordList<ScopeChainRecord>,
    pub(crate) slot_arrays: RecordList<SlotArrayRecord>,
    pub(crate) arena: SnapshotArena,
    pub(crate) mark_time_ms: f64,
    pub(crate) extract_time_ms: f64,
}

impl Snapshot {
    pub(crate) fn new(config: &SnapshotConfig) -> Self {
        Self {
            contexts: RecordList::new(),
            layouts: RecordList::new(),
            types: RecordList::new(),
            primitives: RecordList::new(),
            objects: RecordList::new(),
            function_bodies: RecordList::new(),
            scope_chains: RecordList::new(),
            slot_arrays: RecordList::new(),
            arena: SnapshotArena::with_capacity(
                config.arena_value_capacity,
                config.arena_text_capacity,
            ),
            mark_time_ms: 0.0,
            extract_time_ms: 0.0,
        }
    }

    // =========================================================================
    // Record Collections
    // =========================================================================

    /// Context records, in the order the contexts were supplied.
    pub fn contexts(&self) -> &[ContextRecord] {
        self.contexts.as_slice()
    }

    /// Layout descriptor records.
    pub fn layouts(&self) -> &[LayoutRecord] {
        self.layouts.as_slice()
    }

    /// Type records.
    pub fn types(&self) -> &[TypeRecord] {
        self.types.as_slice()
    }

    /// Primitive object records.
    pub fn primitives(&self) -> &[PrimitiveRecord] {
        self.primitives.as_slice()
    }

    /// Compound object records.
    pub fn objects(&self) -> &[ObjectRecord] {
        self.objects.as_slice()
    }

    /// Function body records, excluding the top-level bodies held by contexts.
    pub fn function_bodies(&self) -> &[FunctionBodyRecord] {
        self.function_bodies.as_slice()
    }

    /// Scope chain records.
    pub fn scope_chains(&self) -> &[ScopeChainRecord] {
        self.scope_chains.as_slice()
    }

    /// Slot array records.
    pub fn slot_arrays(&self) -> &[SlotArrayRecord] {
        self.slot_arrays.as_slice()
    }

    /// The payload arena.
    pub fn arena(&self) -> &SnapshotArena {
        &self.arena
    }

    // =========================================================================
    // Payload Resolution
    // =========================================================================

    /// Resolve a value slice.
    #[inline]
    pub fn values(&self, slice: ArenaSlice<Value>) -> &[Value] {
        self.arena.get(slice)
    }

    /// Resolve a scope entry slice.
    #[inline]
    pub fn scope_entries(&self, slice: ArenaSlice<ScopeEntry>) -> &[ScopeEntry] {
        self.arena.get(slice)
    }

    /// Resolve a property descriptor slice.
    #[inline]
    pub fn properties(&self, slice: ArenaSlice<PropertyDescriptor>) -> &[PropertyDescriptor] {
        self.arena.get(slice)
    }

    /// Resolve a top-level source slice.
    #[inline]
    pub fn top_level(&self, slice: ArenaSlice<TopLevelRecord>) -> &[TopLevelRecord] {
        self.arena.get(slice)
    }

    /// Resolve a string.
    #[inline]
    pub fn text(&self, s: ArenaStr) -> &str {
        self.arena.str(s)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Find a context record.
    pub fn find_context(&self, id: ContextId) -> Option<&ContextRecord> {
        self.contexts.iter().find(|r| r.id == id)
    }

    /// Find a layout record.
    pub fn find_layout(&self, id: LayoutId) -> Option<&LayoutRecord> {
        self.layouts.iter().find(|r| r.id == id)
    }

    /// Find a type record.
    pub fn find_type(&self, id: TypeId) -> Option<&TypeRecord> {
        self.types.iter().find(|r| r.id == id)
    }

    /// Find a compound object record.
    pub fn find_object(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.objects.iter().find(|r| r.id == id)
    }

    /// Find a primitive object record.
    pub fn find_primitive(&self, id: ObjectId) -> Option<&PrimitiveRecord> {
        self.primitives.iter().find(|r| r.id == id)
    }

    /// Find a function body, including top-level bodies held by contexts.
    pub fn find_function_body(&self, id: FunctionBodyId) -> Option<&FunctionBodyRecord> {
        self.function_bodies
            .iter()
            .find(|r| r.id == id)
            .or_else(|| self.top_level_bodies().find(|r| r.id == id))
    }

    /// Find a scope chain record.
    pub fn find_scope_chain(&self, id: EnvironmentId) -> Option<&ScopeChainRecord> {
        self.scope_chains.iter().find(|r| r.id == id)
    }

    /// Find a slot array record.
    pub fn find_slot_array(&self, id: SlotArrayId) -> Option<&SlotArrayRecord> {
        self.slot_arrays.iter().find(|r| r.id == id)
    }

    /// Every top-level function body across all contexts.
    pub fn top_level_bodies(&self) -> impl Iterator<Item = &FunctionBodyRecord> + '_ {
        self.contexts
            .iter()
            .flat_map(move |ctx| self.top_level(ctx.top_level).iter().map(|t| &t.body))
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Duration of the mark phase in milliseconds.
    pub fn mark_time_ms(&self) -> f64 {
        self.mark_time_ms
    }

    /// Duration of the extraction phase in milliseconds.
    pub fn extract_time_ms(&self) -> f64 {
        self.extract_time_ms
    }

    /// Number of records per category.
    pub fn record_counts(&self) -> RecordCounts {
        RecordCounts {
            contexts: self.contexts.len(),
            top_level_bodies: self
                .contexts
                .iter()
                .map(|ctx| ctx.top_level.len())
                .sum(),
            layouts: self.layouts.len(),
            types: self.types.len(),
            primitives: self.primitives.len(),
            objects: self.objects.len(),
            function_bodies: self.function_bodies.len(),
            scope_chains: self.scope_chains.len(),
            slot_arrays: self.slot_arrays.len(),
        }
    }

    /// Check that IDs are unique and every cross-reference resolves.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        verify::verify_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snap = Snapshot::new(&SnapshotConfig::default());

        assert_eq!(snap.record_counts(), RecordCounts::default());
        assert_eq!(snap.record_counts().total(), 0);
        assert_eq!(snap.mark_time_ms(), 0.0);
        assert!(snap.verify().is_ok());
    }

    #[test]
    fn test_top_level_bodies_are_found() {
        let mut snap = Snapshot::new(&SnapshotConfig::default());
        let name = snap.arena.alloc_str("global code");
        let uri = snap.arena.alloc_str("main.js");
        let source = snap.arena.alloc_str("var x = 1;");
        let body = FunctionBodyRecord {
            id: FunctionBodyId::from_raw(3),
            context: ContextId(1),
            name,
            parent: None,
            line: 0,
            column: 0,
            well_known: false,
        };
        let top_level = snap.arena.alloc_slice(&[TopLevelRecord {
            kind: crate::model::TopLevelKind::ScriptLoad,
            load_id: 1,
            uri,
            source,
            body,
        }]);
        snap.contexts.alloc(ContextRecord {
            id: ContextId(1),
            global_object: ObjectId::from_raw(1),
            top_level,
        });

        assert!(snap.function_bodies().is_empty());
        let found = snap
            .find_function_body(FunctionBodyId::from_raw(3))
            .expect("top-level body");
        assert_eq!(snap.text(found.name), "global code");
        assert_eq!(snap.record_counts().top_level_bodies, 1);
    }
}
