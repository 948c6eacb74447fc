//! Heap Snapshot Engine
//!
//! Captures a self-contained, identity-stable copy of every heap entity
//! reachable from a set of roots, for time-travel debugging and record/replay.
//!
//! # Architecture
//!
//! A snapshot cycle has two phases:
//!
//! - **Mark**: breadth-first walk from the roots and from each context's
//!   well-known objects, recording every reached entity in a tagged
//!   [`MarkTable`](mark::MarkTable). Deferred objects are materialized
//!   before their type is inspected.
//!
//! - **Extract**: a single scan over the mark table writes one record per
//!   entity into the [`Snapshot`], extracting types and layouts on demand so
//!   they always precede the records that reference them.
//!
//! The engine knows nothing about the runtime's object representation. It
//! reads the heap through the [`HeapModel`](model::HeapModel) trait and hands
//! hooks a [`Marker`](model::Marker) to report references.
//!
//! # Usage
//!
//! ```ignore
//! use replay_snapshot::{SnapshotExtractor, Value};
//!
//! let mut extractor = SnapshotExtractor::new();
//!
//! // One call per cycle...
//! let snapshot = extractor.take_snapshot(&heap, &[Value::Object(root)], &contexts);
//!
//! // ...or step by step.
//! extractor.begin_snapshot(&heap, &contexts);
//! extractor.do_mark_walk(&heap, &roots, &contexts);
//! extractor.evacuate(&heap, &contexts);
//! let snapshot = extractor.complete_snapshot();
//! ```
//!
//! # Faults
//!
//! Calling a cycle operation out of order, or finding a record missing that
//! marking should have guaranteed, indicates a broken heap model or caller.
//! Such faults are logged and then panic; see [`SnapshotFault`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod mark;
pub mod model;
pub mod snapshot;
pub mod verify;

mod extract;
mod extractor;
mod fault;
mod id;
mod stats;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{ConfigError, SnapshotConfig};
pub use extractor::{SnapshotExtractor, SnapshotPhase};
pub use fault::SnapshotFault;
pub use id::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, PtrId, SlotArrayId, TypeId,
    Value,
};
pub use model::{HeapModel, Marker};
pub use snapshot::{RecordCounts, Snapshot};
pub use stats::{ExtractorStats, SnapshotTimer};
pub use verify::IntegrityError;
