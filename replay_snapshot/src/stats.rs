//! Extractor statistics and phase timing.

use std::time::Instant;

/// Cumulative statistics over every completed snapshot.
///
/// Updated only by
/// [`complete_snapshot`](crate::SnapshotExtractor::complete_snapshot), so a
/// faulted cycle never shows up here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractorStats {
    // =========================================================================
    // Counts
    // =========================================================================
    /// Number of snapshots completed.
    pub snapshots_taken: u64,
    /// Records in the most recent snapshot.
    pub last_record_count: usize,
    /// Arena bytes used by the most recent snapshot.
    pub last_arena_bytes: usize,

    // =========================================================================
    // Mark Phase (milliseconds)
    // =========================================================================
    /// Sum of all mark phase durations.
    pub total_mark_ms: f64,
    /// Longest mark phase.
    pub max_mark_ms: f64,
    /// Most recent mark phase.
    pub last_mark_ms: f64,

    // =========================================================================
    // Extraction Phase (milliseconds)
    // =========================================================================
    /// Sum of all extraction phase durations.
    pub total_extract_ms: f64,
    /// Longest extraction phase.
    pub max_extract_ms: f64,
    /// Most recent extraction phase.
    pub last_extract_ms: f64,
}

impl ExtractorStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed snapshot.
    pub fn record_snapshot(
        &mut self,
        mark_ms: f64,
        extract_ms: f64,
        record_count: usize,
        arena_bytes: usize,
    ) {
        self.snapshots_taken += 1;
        self.last_record_count = record_count;
        self.last_arena_bytes = arena_bytes;

        self.total_mark_ms += mark_ms;
        self.max_mark_ms = self.max_mark_ms.max(mark_ms);
        self.last_mark_ms = mark_ms;

        self.total_extract_ms += extract_ms;
        self.max_extract_ms = self.max_extract_ms.max(extract_ms);
        self.last_extract_ms = extract_ms;
    }

    /// Average mark phase duration.
    pub fn avg_mark_ms(&self) -> f64 {
        if self.snapshots_taken == 0 {
            return 0.0;
        }
        self.total_mark_ms / self.snapshots_taken as f64
    }

    /// Average extraction phase duration.
    pub fn avg_extract_ms(&self) -> f64 {
        if self.snapshots_taken == 0 {
            return 0.0;
        }
        self.total_extract_ms / self.snapshots_taken as f64
    }

    /// Combined time spent in both phases.
    pub fn total_ms(&self) -> f64 {
        self.total_mark_ms + self.total_extract_ms
    }

    /// Reset all statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Log a summary of snapshot statistics.
    pub fn log_summary(&self) {
        tracing::info!(
            snapshots = self.snapshots_taken,
            total_ms = self.total_ms(),
            avg_mark_ms = self.avg_mark_ms(),
            max_mark_ms = self.max_mark_ms,
            avg_extract_ms = self.avg_extract_ms(),
            max_extract_ms = self.max_extract_ms,
            last_records = self.last_record_count,
            last_arena = %format_bytes(self.last_arena_bytes as u64),
            "snapshot statistics"
        );
    }
}

/// Format bytes in human-readable form.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Timer for measuring snapshot phases.
pub struct SnapshotTimer {
    start: Instant,
    label: &'static str,
}

impl SnapshotTimer {
    /// Start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
        }
    }

    /// Stop the timer and return the elapsed time in milliseconds.
    pub fn stop(self) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::trace!(phase = self.label, elapsed_ms = elapsed, "phase finished");
        elapsed
    }
}
