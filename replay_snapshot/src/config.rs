//! Snapshot extractor configuration.
//!
//! All capacities are starting sizes for scratch state that is reused across
//! cycles; nothing here limits how large a snapshot may grow.

use thiserror::Error;

/// Configuration for the snapshot extractor.
///
/// # Example
///
/// ```ignore
/// use replay_snapshot::{SnapshotConfig, SnapshotExtractor};
///
/// // Large program with frequent snapshots
/// let config = SnapshotConfig {
///     mark_table_capacity: 256 * 1024,
///     verify_snapshot: false,
///     ..Default::default()
/// };
/// let extractor = SnapshotExtractor::with_config(config)?;
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    // =========================================================================
    // Mark Phase
    // =========================================================================
    /// Initial capacity of the compound-object worklist.
    ///
    /// Default: 4096
    pub worklist_capacity: usize,

    /// Initial capacity of the mark table, in identities.
    ///
    /// Sized for the number of live entities expected per snapshot. The
    /// table keeps its capacity between cycles.
    ///
    /// Default: 16384
    pub mark_table_capacity: usize,

    // =========================================================================
    // Snapshot Arena
    // =========================================================================
    /// Values reserved up front in each snapshot's arena.
    ///
    /// Default: 8192
    pub arena_value_capacity: usize,

    /// Bytes of text reserved up front in each snapshot's arena.
    ///
    /// Source text of loaded scripts usually dominates.
    ///
    /// Default: 16KB
    pub arena_text_capacity: usize,

    // =========================================================================
    // Debugging
    // =========================================================================
    /// Verify snapshot integrity before handing it out.
    ///
    /// A failed check is a fault.
    ///
    /// Default: false (enabled in debug builds)
    pub verify_snapshot: bool,

    /// Log per-phase details of every cycle at debug level.
    ///
    /// Default: false
    pub trace: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            // Mark phase
            worklist_capacity: 4096,
            mark_table_capacity: 16 * 1024,

            // Arena
            arena_value_capacity: 8192,
            arena_text_capacity: 16 * 1024, // 16KB

            // Debugging
            verify_snapshot: cfg!(debug_assertions),
            trace: false,
        }
    }
}

impl SnapshotConfig {
    /// Minimum worklist capacity.
    pub const MIN_WORKLIST_CAPACITY: usize = 16;

    /// Minimum arena text capacity in bytes.
    pub const MIN_ARENA_TEXT_CAPACITY: usize = 256;

    /// Create a configuration for small heaps.
    pub fn low_memory() -> Self {
        Self {
            worklist_capacity: 256,
            mark_table_capacity: 1024,
            arena_value_capacity: 512,
            arena_text_capacity: 1024, // 1KB
            ..Default::default()
        }
    }

    /// Create a configuration for large heaps.
    pub fn large_heap() -> Self {
        Self {
            worklist_capacity: 64 * 1024,
            mark_table_capacity: 512 * 1024,
            arena_value_capacity: 256 * 1024,
            arena_text_capacity: 1024 * 1024, // 1MB
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worklist_capacity < Self::MIN_WORKLIST_CAPACITY {
            return Err(ConfigError::WorklistTooSmall);
        }
        if self.arena_text_capacity < Self::MIN_ARENA_TEXT_CAPACITY {
            return Err(ConfigError::TextArenaTooSmall);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Worklist capacity is below the minimum.
    #[error("worklist capacity must be at least {}", SnapshotConfig::MIN_WORKLIST_CAPACITY)]
    WorklistTooSmall,
    /// Text arena capacity is below the minimum.
    #[error(
        "arena text capacity must be at least {} bytes",
        SnapshotConfig::MIN_ARENA_TEXT_CAPACITY
    )]
    TextArenaTooSmall,
}
