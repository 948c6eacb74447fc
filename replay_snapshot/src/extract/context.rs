//! Context metadata extraction.
//!
//! Runs when a snapshot begins, before anything is marked. Each context
//! record carries its top-level source units together with their function
//! bodies, so those bodies are never extracted a second time by the scan.

use super::function_body_record;
use crate::id::ContextId;
use crate::model::HeapModel;
use crate::snapshot::{ContextRecord, Snapshot, TopLevelRecord};
use smallvec::SmallVec;

/// Append one context record per entry of `contexts`.
pub(crate) fn extract_contexts<H: HeapModel + ?Sized>(
    heap: &H,
    contexts: &[ContextId],
    snap: &mut Snapshot,
) {
    for ctx in contexts {
        let info = heap.context_info(*ctx);

        let mut top_level: SmallVec<[TopLevelRecord; 8]> = SmallVec::new();
        let arena = &mut snap.arena;
        heap.for_each_loaded_source(*ctx, &mut |source| {
            let body = function_body_record(heap, source.body, false, arena);
            top_level.push(TopLevelRecord {
                kind: source.kind,
                load_id: source.load_id,
                uri: arena.alloc_str(source.uri),
                source: arena.alloc_str(source.source),
                body,
            });
        });

        let top_level = snap.arena.alloc_slice(&top_level);
        snap.contexts.alloc(ContextRecord {
            id: info.id,
            global_object: info.global_object,
            top_level,
        });
    }
}
