//! Snapshot cycle orchestration.
//!
//! A [`SnapshotExtractor`] drives one cycle at a time through four steps:
//!
//! ```text
//!   begin_snapshot ──▶ do_mark_walk ──▶ evacuate ──▶ complete_snapshot
//!       Idle            Marking         Extracting      Complete ──▶ Idle
//! ```
//!
//! Each step is valid only in the phase shown beneath it; calling one out
//! of order is a [fault](crate::SnapshotFault). The extractor keeps its mark
//! table, worklist and identity maps between cycles and only clears them, so
//! a long-running program reuses the same allocations for every snapshot.

use crate::config::{ConfigError, SnapshotConfig};
use crate::extract::{extract_contexts, run_extract_phase, ExtractMaps};
use crate::fault::{fault, SnapshotFault};
use crate::id::{ContextId, Value};
use crate::mark::{run_mark_phase, MarkTable, Worklist};
use crate::model::HeapModel;
use crate::snapshot::Snapshot;
use crate::stats::{format_bytes, ExtractorStats, SnapshotTimer};

/// Where the extractor is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotPhase {
    /// No snapshot pending.
    Idle,
    /// Snapshot begun; waiting for the mark walk.
    Marking,
    /// Marking done; waiting for evacuation.
    Extracting,
    /// Records written; waiting to hand the snapshot out.
    Complete,
}

/// Reusable driver for snapshot cycles.
///
/// # Example
///
/// ```ignore
/// use replay_snapshot::SnapshotExtractor;
///
/// let mut extractor = SnapshotExtractor::new();
/// let snapshot = extractor.take_snapshot(&heap, &roots, &contexts);
/// assert_eq!(extractor.stats().snapshots_taken, 1);
/// ```
#[derive(Debug)]
pub struct SnapshotExtractor {
    config: SnapshotConfig,
    phase: SnapshotPhase,
    pending: Option<Snapshot>,

    // Scratch state, cleared after every cycle.
    marks: MarkTable,
    worklist: Worklist,
    maps: ExtractMaps,

    stats: ExtractorStats,
}

impl SnapshotExtractor {
    /// Create an extractor with the default configuration.
    pub fn new() -> Self {
        Self::build(SnapshotConfig::default())
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: SnapshotConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SnapshotConfig) -> Self {
        Self {
            phase: SnapshotPhase::Idle,
            pending: None,
            marks: MarkTable::with_capacity(config.mark_table_capacity),
            worklist: Worklist::with_capacity(config.worklist_capacity),
            maps: ExtractMaps::new(),
            stats: ExtractorStats::new(),
            config,
        }
    }

    // =========================================================================
    // Cycle
    // =========================================================================

    /// Start a snapshot and record each context's metadata.
    ///
    /// Context records are written immediately, so their top-level function
    /// bodies are captured before any marking happens.
    pub fn begin_snapshot<H: HeapModel + ?Sized>(&mut self, heap: &H, contexts: &[ContextId]) {
        if self.pending.is_some() || self.phase != SnapshotPhase::Idle {
            fault(SnapshotFault::AlreadyPending);
        }

        let mut snap = Snapshot::new(&self.config);
        extract_contexts(heap, contexts, &mut snap);
        if self.config.trace {
            tracing::debug!(
                contexts = contexts.len(),
                top_level = snap.record_counts().top_level_bodies,
                "snapshot begun"
            );
        }

        self.pending = Some(snap);
        self.phase = SnapshotPhase::Marking;
    }

    /// Mark everything reachable from `roots` and from the contexts'
    /// well-known tables.
    pub fn do_mark_walk<H: HeapModel + ?Sized>(
        &mut self,
        heap: &H,
        roots: &[Value],
        contexts: &[ContextId],
    ) {
        self.expect_phase("do_mark_walk", SnapshotPhase::Marking);

        let timer = SnapshotTimer::start("mark");
        let summary = run_mark_phase(heap, &mut self.marks, &mut self.worklist, roots, contexts);
        let elapsed = timer.stop();

        match self.pending.as_mut() {
            Some(snap) => snap.mark_time_ms = elapsed,
            None => fault(SnapshotFault::NoPendingSnapshot),
        }
        if self.config.trace {
            tracing::debug!(
                roots = summary.roots,
                expanded = summary.objects_expanded,
                marks = summary.marks,
                elapsed_ms = elapsed,
                "mark phase complete"
            );
        }

        self.phase = SnapshotPhase::Extracting;
    }

    /// Write a record for every marked entity.
    pub fn evacuate<H: HeapModel + ?Sized>(&mut self, heap: &H, contexts: &[ContextId]) {
        self.expect_phase("evacuate", SnapshotPhase::Extracting);

        let snap = match self.pending.as_mut() {
            Some(snap) => snap,
            None => fault(SnapshotFault::NoPendingSnapshot),
        };

        let timer = SnapshotTimer::start("extract");
        let summary = run_extract_phase(heap, &mut self.marks, &mut self.maps, snap, contexts);
        let elapsed = timer.stop();
        snap.extract_time_ms = elapsed;

        if self.config.trace {
            tracing::debug!(
                scanned = summary.scanned,
                top_level_skipped = summary.top_level_skipped,
                records = snap.record_counts().total(),
                elapsed_ms = elapsed,
                "extraction phase complete"
            );
        }

        self.phase = SnapshotPhase::Complete;
    }

    /// Hand the finished snapshot to the caller.
    ///
    /// Resets scratch state and updates statistics. The extractor is idle
    /// and ready for the next cycle afterwards.
    pub fn complete_snapshot(&mut self) -> Snapshot {
        self.expect_phase("complete_snapshot", SnapshotPhase::Complete);

        let snap = match self.pending.take() {
            Some(snap) => snap,
            None => fault(SnapshotFault::NoPendingSnapshot),
        };
        if self.config.verify_snapshot {
            if let Err(err) = snap.verify() {
                fault(err.into());
            }
        }

        self.reset();

        let records = snap.record_counts().total();
        let arena_bytes = snap.arena().bytes_used();
        self.stats
            .record_snapshot(snap.mark_time_ms, snap.extract_time_ms, records, arena_bytes);

        tracing::debug!(
            records,
            arena = %format_bytes(arena_bytes as u64),
            mark_ms = snap.mark_time_ms,
            extract_ms = snap.extract_time_ms,
            "snapshot complete"
        );

        snap
    }

    /// Run a complete cycle.
    pub fn take_snapshot<H: HeapModel + ?Sized>(
        &mut self,
        heap: &H,
        roots: &[Value],
        contexts: &[ContextId],
    ) -> Snapshot {
        self.begin_snapshot(heap, contexts);
        self.do_mark_walk(heap, roots, contexts);
        self.evacuate(heap, contexts);
        self.complete_snapshot()
    }

    fn reset(&mut self) {
        self.marks.clear();
        self.worklist.clear();
        self.maps.unload();
        self.phase = SnapshotPhase::Idle;
    }

    #[track_caller]
    fn expect_phase(&self, operation: &'static str, expected: SnapshotPhase) {
        if self.phase == expected {
            return;
        }
        if self.phase == SnapshotPhase::Idle {
            fault(SnapshotFault::NoPendingSnapshot);
        }
        fault(SnapshotFault::WrongPhase {
            operation,
            phase: self.phase,
        });
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> SnapshotPhase {
        self.phase
    }

    /// Check if a snapshot is in progress.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Configuration in use.
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Statistics over all completed snapshots.
    pub fn stats(&self) -> &ExtractorStats {
        &self.stats
    }

    /// Clear accumulated statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

impl Default for SnapshotExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockHeap, CONTEXT};

    fn graph() -> (MockHeap, Vec<Value>) {
        let mut heap = MockHeap::new();
        let (ty, _) = heap.dynamic_type(None);
        let b = heap.object(ty, vec![Value::Float(0.5)]);
        let a = heap.object(ty, vec![Value::Object(b)]);
        heap.set_slots(b, vec![Value::Object(a)]);
        (heap, vec![Value::Object(a)])
    }

    #[test]
    fn test_phase_transitions() {
        let (heap, roots) = graph();
        let mut extractor = SnapshotExtractor::new();
        assert_eq!(extractor.phase(), SnapshotPhase::Idle);

        extractor.begin_snapshot(&heap, &[CONTEXT]);
        assert_eq!(extractor.phase(), SnapshotPhase::Marking);
        assert!(extractor.is_pending());

        extractor.do_mark_walk(&heap, &roots, &[CONTEXT]);
        assert_eq!(extractor.phase(), SnapshotPhase::Extracting);

        extractor.evacuate(&heap, &[CONTEXT]);
        assert_eq!(extractor.phase(), SnapshotPhase::Complete);

        let snap = extractor.complete_snapshot();
        assert_eq!(extractor.phase(), SnapshotPhase::Idle);
        assert!(!extractor.is_pending());
        assert_eq!(snap.objects().len(), 3);
        assert!(snap.mark_time_ms() >= 0.0);
    }

    #[test]
    fn test_extractor_is_reusable() {
        let (heap, roots) = graph();
        let mut extractor = SnapshotExtractor::new();

        let first = extractor.take_snapshot(&heap, &roots, &[CONTEXT]);
        let second = extractor.take_snapshot(&heap, &roots, &[CONTEXT]);

        assert_eq!(first.record_counts(), second.record_counts());
        assert_eq!(first.objects(), second.objects());
        assert_eq!(extractor.stats().snapshots_taken, 2);
    }

    #[test]
    fn test_stats_track_each_cycle() {
        let (heap, roots) = graph();
        let mut extractor = SnapshotExtractor::new();
        let mut total_mark = 0.0;
        let mut max_mark: f64 = 0.0;
        let mut last = None;

        for _ in 0..4 {
            let snap = extractor.take_snapshot(&heap, &roots, &[CONTEXT]);
            total_mark += snap.mark_time_ms();
            max_mark = max_mark.max(snap.mark_time_ms());
            last = Some(snap);
        }

        let stats = extractor.stats();
        let last = last.unwrap();
        assert_eq!(stats.snapshots_taken, 4);
        assert_eq!(stats.total_mark_ms, total_mark);
        assert_eq!(stats.max_mark_ms, max_mark);
        assert_eq!(stats.last_mark_ms, last.mark_time_ms());
        assert_eq!(stats.last_extract_ms, last.extract_time_ms());
        assert_eq!(stats.last_record_count, last.record_counts().total());

        extractor.reset_stats();
        assert_eq!(extractor.stats().snapshots_taken, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SnapshotConfig {
            worklist_capacity: 0,
            ..Default::default()
        };
        assert_eq!(
            SnapshotExtractor::with_config(config).err(),
            Some(ConfigError::WorklistTooSmall)
        );
    }

    #[test]
    #[should_panic(expected = "a snapshot is already pending")]
    fn test_begin_twice_faults() {
        let heap = MockHeap::new();
        let mut extractor = SnapshotExtractor::new();
        extractor.begin_snapshot(&heap, &[CONTEXT]);
        extractor.begin_snapshot(&heap, &[CONTEXT]);
    }

    #[test]
    #[should_panic(expected = "no snapshot is pending")]
    fn test_mark_without_begin_faults() {
        let heap = MockHeap::new();
        let mut extractor = SnapshotExtractor::new();
        extractor.do_mark_walk(&heap, &[], &[CONTEXT]);
    }

    #[test]
    #[should_panic(expected = "evacuate is not valid in the Marking phase")]
    fn test_evacuate_before_mark_faults() {
        let heap = MockHeap::new();
        let mut extractor = SnapshotExtractor::new();
        extractor.begin_snapshot(&heap, &[CONTEXT]);
        extractor.evacuate(&heap, &[CONTEXT]);
    }

    #[test]
    #[should_panic(expected = "complete_snapshot is not valid in the Extracting phase")]
    fn test_complete_before_evacuate_faults() {
        let heap = MockHeap::new();
        let mut extractor = SnapshotExtractor::new();
        extractor.begin_snapshot(&heap, &[CONTEXT]);
        extractor.do_mark_walk(&heap, &[], &[CONTEXT]);
        extractor.complete_snapshot();
    }
}
