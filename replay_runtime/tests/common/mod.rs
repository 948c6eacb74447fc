//! Shared helpers for integration tests.

#![allow(dead_code)]

use replay_runtime::{Heap, ObjectKind};
use replay_snapshot::model::PropertyId;
use replay_snapshot::{ContextId, ObjectId, SnapshotConfig, SnapshotExtractor, Value};
use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true).with_test_writer());
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// An extractor that verifies every snapshot and logs each phase.
pub fn verifying_extractor() -> SnapshotExtractor {
    let config = SnapshotConfig {
        verify_snapshot: true,
        trace: true,
        ..SnapshotConfig::default()
    };
    SnapshotExtractor::with_config(config).expect("default-based config is valid")
}

/// A heap with one context.
pub fn heap_with_context() -> (Heap, ContextId) {
    init_test_logging();
    let mut heap = Heap::new();
    let ctx = heap.create_context();
    (heap, ctx)
}

/// A plain object with no prototype.
pub fn bare_object(heap: &mut Heap, ctx: ContextId) -> ObjectId {
    heap.create_object_with_prototype(ctx, ObjectKind::Plain, None)
        .expect("context exists")
}

/// Property name helper.
pub const fn prop(n: u32) -> PropertyId {
    PropertyId(n)
}

/// Reference helper.
pub fn obj(id: ObjectId) -> Value {
    Value::Object(id)
}
