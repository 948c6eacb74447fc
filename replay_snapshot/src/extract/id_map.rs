//! Identity → record index maps used during extraction.

use crate::fault::{fault, SnapshotFault};
use crate::id::PtrId;
use crate::snapshot::RecordId;
use rustc_hash::FxHashMap;

/// Maps the identity of an extracted entity to its record.
///
/// Only dependency categories (layouts and types) need one: they are the
/// records other records must find by identity while the scan is running.
#[derive(Debug)]
pub(crate) struct IdMap<R> {
    entries: FxHashMap<PtrId, RecordId<R>>,
    kind: &'static str,
}

impl<R> IdMap<R> {
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            entries: FxHashMap::default(),
            kind,
        }
    }

    /// Reserve room for `count` records before a scan.
    pub(crate) fn initialize(&mut self, count: usize) {
        self.entries.clear();
        self.entries.reserve(count);
    }

    pub(crate) fn insert(&mut self, id: impl Into<PtrId>, record: RecordId<R>) {
        self.entries.insert(id.into(), record);
    }

    #[inline]
    pub(crate) fn get(&self, id: impl Into<PtrId>) -> Option<RecordId<R>> {
        self.entries.get(&id.into()).copied()
    }

    #[inline]
    pub(crate) fn contains(&self, id: impl Into<PtrId>) -> bool {
        self.entries.contains_key(&id.into())
    }

    /// Look up a record that must already have been extracted.
    #[track_caller]
    pub(crate) fn lookup_known(&self, id: impl Into<PtrId>) -> RecordId<R> {
        let id = id.into();
        match self.entries.get(&id) {
            Some(record) => *record,
            None => fault(SnapshotFault::MissingDependency {
                kind: self.kind,
                id,
            }),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry, keeping capacity for the next cycle.
    pub(crate) fn unload(&mut self) {
        self.entries.clear();
    }
}
