//! Snapshot integrity verification.
//!
//! A completed snapshot must be self-contained: every ID a record mentions
//! names another record of the same snapshot, and no entity is recorded
//! twice. The extractor runs this check before handing out a snapshot when
//! [`SnapshotConfig::verify_snapshot`](crate::SnapshotConfig::verify_snapshot)
//! is set; consumers may run it on their own through
//! [`Snapshot::verify`](crate::Snapshot::verify).

use crate::id::{PtrId, Value};
use crate::model::ScopeKind;
use crate::snapshot::{ObjectPayload, Snapshot};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// A violation of snapshot self-containment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    /// The same entity was recorded twice.
    #[error("duplicate {category} record for {id}")]
    Duplicate {
        /// Record category.
        category: &'static str,
        /// Entity ID.
        id: PtrId,
    },
    /// A record references an entity that has no record.
    #[error("{from} references {target} {id} which is not in the snapshot")]
    Dangling {
        /// Referencing entity.
        from: PtrId,
        /// Category of the missing record.
        target: &'static str,
        /// Missing entity ID.
        id: PtrId,
    },
}

#[derive(Default)]
struct IdSets {
    layouts: FxHashSet<PtrId>,
    types: FxHashSet<PtrId>,
    objects: FxHashSet<PtrId>,
    function_bodies: FxHashSet<PtrId>,
    scope_chains: FxHashSet<PtrId>,
    slot_arrays: FxHashSet<PtrId>,
}

fn insert_unique(
    set: &mut FxHashSet<PtrId>,
    category: &'static str,
    id: PtrId,
) -> Result<(), IntegrityError> {
    if set.insert(id) {
        Ok(())
    } else {
        Err(IntegrityError::Duplicate { category, id })
    }
}

fn require(
    set: &FxHashSet<PtrId>,
    from: PtrId,
    target: &'static str,
    id: PtrId,
) -> Result<(), IntegrityError> {
    if set.contains(&id) {
        Ok(())
    } else {
        Err(IntegrityError::Dangling { from, target, id })
    }
}

fn require_value(sets: &IdSets, from: PtrId, value: Value) -> Result<(), IntegrityError> {
    match value.as_object() {
        Some(obj) => require(&sets.objects, from, "object", obj.ptr_id()),
        None => Ok(()),
    }
}

fn require_values(sets: &IdSets, from: PtrId, values: &[Value]) -> Result<(), IntegrityError> {
    values
        .iter()
        .try_for_each(|value| require_value(sets, from, *value))
}

/// Verify that `snap` is self-contained.
pub fn verify_snapshot(snap: &Snapshot) -> Result<(), IntegrityError> {
    let sets = collect_ids(snap)?;

    for ctx in snap.contexts() {
        let from = PtrId(ctx.id.0 as u64);
        require(&sets.objects, from, "object", ctx.global_object.ptr_id())?;
    }

    for ty in snap.types() {
        let from = ty.id.ptr_id();
        if let Some(layout) = ty.layout {
            require(&sets.layouts, from, "layout", layout.ptr_id())?;
        }
        if let Some(proto) = ty.prototype {
            require(&sets.objects, from, "object", proto.ptr_id())?;
        }
    }

    for prim in snap.primitives() {
        require(&sets.types, prim.id.ptr_id(), "type", prim.type_id.ptr_id())?;
    }

    for obj in snap.objects() {
        let from = obj.id.ptr_id();
        require(&sets.types, from, "type", obj.type_id.ptr_id())?;
        require_values(&sets, from, snap.values(obj.slots))?;
        if let Some(store) = obj.indexed_store {
            require(&sets.objects, from, "object", store.ptr_id())?;
        }
        verify_payload(snap, &sets, from, &obj.payload)?;
    }

    for body in snap.function_bodies().iter().chain(snap.top_level_bodies()) {
        if let Some(parent) = body.parent {
            require(
                &sets.function_bodies,
                body.id.ptr_id(),
                "function body",
                parent.ptr_id(),
            )?;
        }
    }

    for chain in snap.scope_chains() {
        let from = chain.id.ptr_id();
        for entry in snap.scope_entries(chain.entries) {
            match entry.kind {
                ScopeKind::Activation | ScopeKind::With => {
                    require(&sets.objects, from, "object", entry.id)?
                }
                ScopeKind::SlotArray => require(&sets.slot_arrays, from, "slot array", entry.id)?,
            }
        }
    }

    for slots in snap.slot_arrays() {
        let from = slots.id.ptr_id();
        require_values(&sets, from, snap.values(slots.slots))?;
        if let Some(body) = slots.function_body {
            require(&sets.function_bodies, from, "function body", body.ptr_id())?;
        }
    }

    Ok(())
}

fn collect_ids(snap: &Snapshot) -> Result<IdSets, IntegrityError> {
    let mut sets = IdSets::default();

    for layout in snap.layouts() {
        insert_unique(&mut sets.layouts, "layout", layout.id.ptr_id())?;
    }
    for ty in snap.types() {
        insert_unique(&mut sets.types, "type", ty.id.ptr_id())?;
    }
    for prim in snap.primitives() {
        insert_unique(&mut sets.objects, "object", prim.id.ptr_id())?;
    }
    for obj in snap.objects() {
        insert_unique(&mut sets.objects, "object", obj.id.ptr_id())?;
    }
    for body in snap.function_bodies().iter().chain(snap.top_level_bodies()) {
        insert_unique(&mut sets.function_bodies, "function body", body.id.ptr_id())?;
    }
    for chain in snap.scope_chains() {
        insert_unique(&mut sets.scope_chains, "scope chain", chain.id.ptr_id())?;
    }
    for slots in snap.slot_arrays() {
        insert_unique(&mut sets.slot_arrays, "slot array", slots.id.ptr_id())?;
    }

    Ok(sets)
}

fn verify_payload(
    snap: &Snapshot,
    sets: &IdSets,
    from: PtrId,
    payload: &ObjectPayload,
) -> Result<(), IntegrityError> {
    match *payload {
        ObjectPayload::Plain | ObjectPayload::Date(_) => Ok(()),
        ObjectPayload::Array { elements } => require_values(sets, from, snap.values(elements)),
        ObjectPayload::Map { entries } | ObjectPayload::Set { entries } => {
            require_values(sets, from, snap.values(entries))
        }
        ObjectPayload::Boxed(value) => require_value(sets, from, value),
        ObjectPayload::ScriptFunction {
            body,
            environment,
            home_object,
        } => {
            require(&sets.function_bodies, from, "function body", body.ptr_id())?;
            if let Some(env) = environment {
                require(&sets.scope_chains, from, "scope chain", env.ptr_id())?;
            }
            if let Some(home) = home_object {
                require(&sets.objects, from, "object", home.ptr_id())?;
            }
            Ok(())
        }
        ObjectPayload::BoundFunction {
            target,
            bound_this,
            args,
        } => {
            require(&sets.objects, from, "object", target.ptr_id())?;
            require_value(sets, from, bound_this)?;
            require_values(sets, from, snap.values(args))
        }
    }
}
