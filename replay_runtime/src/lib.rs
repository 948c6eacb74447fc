//! Reference Object Model
//!
//! A compact runtime heap that exposes itself to the snapshot engine through
//! [`HeapModel`](replay_snapshot::HeapModel).
//!
//! # Architecture
//!
//! - **Objects**: primitives and compound objects with kind-specific data
//!   ([`object`]). Compound objects may be created deferred and are
//!   materialized on first mutation or when a snapshot reaches them.
//!
//! - **Types and layouts**: dynamic types pair a prototype with a layout from
//!   a shared transition tree ([`object::shape`]); objects built by the same
//!   property additions share both.
//!
//! - **Functions and scopes**: function bodies, closure environments and
//!   slot arrays ([`function`]).
//!
//! - **Contexts**: global object, intrinsic prototypes, well-known entities
//!   and loaded top-level sources ([`context`]).
//!
//! # Usage
//!
//! ```ignore
//! use replay_runtime::{Heap, ObjectKind};
//! use replay_snapshot::{SnapshotExtractor, Value};
//!
//! let mut heap = Heap::new();
//! let ctx = heap.create_context();
//! let obj = heap.create_object(ctx, ObjectKind::Plain)?;
//!
//! let snapshot = SnapshotExtractor::new().take_snapshot(&heap, &[Value::Object(obj)], &[ctx]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod function;
pub mod heap;
pub mod kind_dispatch;
pub mod object;

mod heap_model;

// Re-exports for convenient access
pub use context::{LoadedSource, ScriptContext};
pub use function::{Environment, FunctionBody, SlotArray};
pub use heap::{Heap, HeapError};
pub use object::shape::{Layout, LayoutRegistry};
pub use object::types::{RuntimeType, TypeTag};
pub use object::{HeapObject, KindTag, ObjectKind, ObjectStorage, PrimitiveData};
