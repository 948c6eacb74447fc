//! Extraction (evacuation) of marked entities into snapshot records.
//!
//! After marking, a single cursor scan walks the mark table in category
//! order and writes one record per marked entity:
//!
//! ```text
//!   LayoutDescriptor ─▶ Type ─▶ PrimitiveObject ─▶ CompoundObject ─▶ FunctionBody
//!                        ▲            │                  │
//!                        └────────────┴──────────────────┘
//!                          types (and their layouts) are
//!                          extracted on demand when first needed
//! ```
//!
//! An entity's mark doubles as its "not yet extracted" bit: extracting it
//! clears the mark, so a later on-demand request or a later position in the
//! scan finds nothing to do. Types and layouts are the only categories other
//! records must resolve while the scan runs, so they alone get an
//! [`IdMap`]. Environments and slot arrays are written only when a closure
//! needs them; their own scan entries just drop the mark.

mod context;
mod id_map;

pub(crate) use context::extract_contexts;
pub(crate) use id_map::IdMap;

use crate::fault::{fault, SnapshotFault};
use crate::id::{
    ContextId, EnvironmentId, FunctionBodyId, LayoutId, ObjectId, SlotArrayId, TypeId,
};
use crate::mark::{MarkTable, MarkTag};
use crate::model::{EnvironmentInfo, HeapModel, PrimitiveValue, Scope};
use crate::snapshot::{
    FunctionBodyRecord, LayoutRecord, ObjectRecord, PrimitiveRecord, PrimitiveRecordValue,
    RecordId, ScopeChainRecord, ScopeEntry, SlotArrayRecord, Snapshot, SnapshotArena, TypeRecord,
};

/// Identity maps reused across cycles.
#[derive(Debug)]
pub(crate) struct ExtractMaps {
    pub layouts: IdMap<LayoutRecord>,
    pub types: IdMap<TypeRecord>,
}

impl ExtractMaps {
    pub(crate) fn new() -> Self {
        Self {
            layouts: IdMap::new("layout"),
            types: IdMap::new("type"),
        }
    }

    pub(crate) fn unload(&mut self) {
        self.layouts.unload();
        self.types.unload();
    }
}

/// Counters reported by one extraction phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ExtractSummary {
    /// Top-level bodies skipped because their context record already holds them.
    pub top_level_skipped: usize,
    /// Scan entries visited.
    pub scanned: usize,
}

/// Build a function body record.
pub(crate) fn function_body_record<H: HeapModel + ?Sized>(
    heap: &H,
    body: FunctionBodyId,
    well_known: bool,
    arena: &mut SnapshotArena,
) -> FunctionBodyRecord {
    let info = heap.function_body_info(body);
    FunctionBodyRecord {
        id: body,
        context: info.context,
        name: arena.alloc_str(info.name),
        parent: info.parent,
        line: info.line,
        column: info.column,
        well_known,
    }
}

/// Write a record for every marked entity into `snap`, consuming the marks.
pub(crate) fn run_extract_phase<H: HeapModel + ?Sized>(
    heap: &H,
    marks: &mut MarkTable,
    maps: &mut ExtractMaps,
    snap: &mut Snapshot,
    contexts: &[ContextId],
) -> ExtractSummary {
    let mut top_level_skipped = 0;
    for ctx in contexts {
        heap.for_each_loaded_source(*ctx, &mut |source| {
            if marks.is_marked_as(source.body, MarkTag::FunctionBody) {
                marks.clear_mark(source.body);
                top_level_skipped += 1;
            }
        });
    }

    maps.layouts
        .initialize(marks.count_for_tag(MarkTag::LayoutDescriptor));
    maps.types.initialize(marks.count_for_tag(MarkTag::Type));

    let mut evacuator = Evacuator {
        heap,
        marks,
        maps,
        snap,
    };
    let scanned = evacuator.scan();

    ExtractSummary {
        top_level_skipped,
        scanned,
    }
}

struct Evacuator<'a, H: HeapModel + ?Sized> {
    heap: &'a H,
    marks: &'a mut MarkTable,
    maps: &'a mut ExtractMaps,
    snap: &'a mut Snapshot,
}

impl<'a, H: HeapModel + ?Sized> Evacuator<'a, H> {
    fn scan(&mut self) -> usize {
        let mut scanned = 0;
        let mut cursor = self.marks.cursor();

        while let Some(entry) = self.marks.next_marked(&mut cursor) {
            scanned += 1;
            match entry.tag {
                MarkTag::LayoutDescriptor => {
                    self.extract_layout_if_needed(LayoutId::new(entry.id));
                }
                MarkTag::Type => {
                    self.extract_type_if_needed(TypeId::new(entry.id));
                }
                MarkTag::PrimitiveObject => {
                    self.extract_primitive(ObjectId::new(entry.id), entry.well_known)
                }
                MarkTag::CompoundObject => {
                    self.extract_object(ObjectId::new(entry.id), entry.well_known)
                }
                MarkTag::FunctionBody => {
                    self.extract_function_body(FunctionBodyId::new(entry.id), entry.well_known)
                }
                // Written on demand by the closures that use them.
                MarkTag::Environment | MarkTag::SlotArray => self.marks.clear_mark(entry.id),
            }
        }

        scanned
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    fn extract_layout_if_needed(&mut self, layout: LayoutId) -> RecordId<LayoutRecord> {
        if !self.marks.is_marked_as(layout, MarkTag::LayoutDescriptor) {
            return self.maps.layouts.lookup_known(layout);
        }

        let info = self.heap.layout_info(layout);
        let properties = self.snap.arena.alloc_slice(info.properties);
        let record = self.snap.layouts.alloc(LayoutRecord {
            id: layout,
            properties,
            inline_slot_capacity: info.inline_slot_capacity,
            extensible: info.extensible,
        });

        self.maps.layouts.insert(layout, record);
        self.marks.clear_mark(layout);
        record
    }

    fn extract_type_if_needed(&mut self, ty: TypeId) -> RecordId<TypeRecord> {
        if !self.marks.is_marked_as(ty, MarkTag::Type) {
            return self.maps.types.lookup_known(ty);
        }

        let info = self.heap.type_info(ty);
        if let Some(layout) = info.layout {
            self.extract_layout_if_needed(layout);
        }
        let record = self.snap.types.alloc(TypeRecord {
            id: ty,
            type_tag: info.type_tag,
            context: info.context,
            layout: info.layout,
            prototype: info.prototype,
            has_no_enumerable_properties: info.has_no_enumerable_properties,
        });

        self.maps.types.insert(ty, record);
        self.marks.clear_mark(ty);
        record
    }

    fn extract_scope_chain_if_needed(&mut self, env: EnvironmentId, info: EnvironmentInfo) {
        if !self.marks.is_marked_as(env, MarkTag::Environment) {
            return;
        }
        if info.scopes.is_empty() {
            fault(SnapshotFault::EmptyEnvironment(env));
        }

        for scope in &info.scopes {
            if let Scope::SlotArray(slots) = *scope {
                self.extract_slot_array_if_needed(slots);
            }
        }

        let entries = self.snap.arena.alloc_iter(info.scopes.iter().map(|scope| ScopeEntry {
            kind: scope.kind(),
            id: scope.ptr_id(),
        }));
        self.snap.scope_chains.alloc(ScopeChainRecord {
            id: env,
            context: info.context,
            entries,
        });
        self.marks.clear_mark(env);
    }

    fn extract_slot_array_if_needed(&mut self, slots: SlotArrayId) {
        if !self.marks.is_marked_as(slots, MarkTag::SlotArray) {
            return;
        }

        let info = self.heap.slot_array_info(slots);
        let values = self.snap.arena.alloc_slice(info.slots);
        self.snap.slot_arrays.alloc(SlotArrayRecord {
            id: slots,
            context: info.context,
            slots: values,
            function_body: info.function_body,
        });
        self.marks.clear_mark(slots);
    }

    // =========================================================================
    // Scan Entries
    // =========================================================================

    fn extract_primitive(&mut self, obj: ObjectId, well_known: bool) {
        let heap = self.heap;
        let type_id = heap.type_of(obj);
        self.extract_type_if_needed(type_id);

        let arena = &mut self.snap.arena;
        let value = match heap.primitive_value(obj) {
            PrimitiveValue::Undefined => PrimitiveRecordValue::Undefined,
            PrimitiveValue::Null => PrimitiveRecordValue::Null,
            PrimitiveValue::Boolean(b) => PrimitiveRecordValue::Boolean(b),
            PrimitiveValue::Number(n) => PrimitiveRecordValue::Number(n),
            PrimitiveValue::Int64(n) => PrimitiveRecordValue::Int64(n),
            PrimitiveValue::String(s) => PrimitiveRecordValue::String(arena.alloc_str(s)),
            PrimitiveValue::Symbol(id) => PrimitiveRecordValue::Symbol(id),
        };

        self.snap.primitives.alloc(PrimitiveRecord {
            id: obj,
            type_id,
            well_known,
            value,
        });
        self.marks.clear_mark(obj);
    }

    fn extract_object(&mut self, obj: ObjectId, well_known: bool) {
        let heap = self.heap;
        let type_id = heap.type_of(obj);
        self.extract_type_if_needed(type_id);

        if let Some(env) = heap.closure_environment(obj) {
            let info = heap.environment_info(env);
            if !info.scopes.is_empty() {
                self.extract_scope_chain_if_needed(env, info);
            }
        }

        let slots = self.snap.arena.alloc_iter(heap.object_slots(obj));
        let payload = heap.extract_kind_payload(obj, &mut self.snap.arena);
        self.snap.objects.alloc(ObjectRecord {
            id: obj,
            type_id,
            well_known,
            slots,
            indexed_store: heap.indexed_store(obj),
            payload,
        });
        self.marks.clear_mark(obj);
    }

    fn extract_function_body(&mut self, body: FunctionBodyId, well_known: bool) {
        let record = function_body_record(self.heap, body, well_known, &mut self.snap.arena);
        self.snap.function_bodies.alloc(record);
        self.marks.clear_mark(body);
    }
}
