//! Fatal invariant violations.
//!
//! A snapshot cycle has no recoverable error channel: every failure below
//! means the extractor or the heap model is broken, and continuing would
//! produce a snapshot that cannot be replayed. Faults are logged and then
//! abort the cycle with a panic.

use crate::extractor::SnapshotPhase;
use crate::id::PtrId;
use crate::verify::IntegrityError;
use thiserror::Error;

/// An internal-consistency violation detected during a snapshot cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotFault {
    /// `begin_snapshot` called while a snapshot is still pending.
    #[error("a snapshot is already pending")]
    AlreadyPending,
    /// A cycle operation was called with no snapshot in progress.
    #[error("no snapshot is pending")]
    NoPendingSnapshot,
    /// A cycle operation was called out of order.
    #[error("{operation} is not valid in the {phase:?} phase")]
    WrongPhase {
        /// Operation that was attempted.
        operation: &'static str,
        /// Phase the extractor was in.
        phase: SnapshotPhase,
    },
    /// A closure environment with no scopes was asked to produce a scope chain.
    #[error("environment {0:?} has no scopes to extract")]
    EmptyEnvironment(crate::id::EnvironmentId),
    /// A record needed by another record was never extracted.
    #[error("{kind} {id} was required but never extracted")]
    MissingDependency {
        /// Category of the missing record.
        kind: &'static str,
        /// Entity ID.
        id: PtrId,
    },
    /// The completed snapshot failed verification.
    #[error("snapshot integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
}

/// Log `fault` and abort the cycle.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn fault(fault: SnapshotFault) -> ! {
    tracing::error!(%fault, "snapshot fault");
    panic!("snapshot fault: {fault}");
}
