//! Script contexts.
//!
//! A context owns a global object, the intrinsic prototypes, and the list of
//! top-level source units loaded into it. Intrinsics are registered as
//! well-known so every snapshot carries them even when nothing reachable
//! from the roots points at them.

use replay_snapshot::model::TopLevelKind;
use replay_snapshot::{ContextId, FunctionBodyId, ObjectId, TypeId};

/// A top-level source unit loaded into a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    /// How the unit was loaded.
    pub kind: TopLevelKind,
    /// Load sequence number, starting at 1.
    pub load_id: u64,
    /// Top-level body.
    pub body: FunctionBodyId,
    /// Source URI.
    pub uri: String,
    /// Source text.
    pub source: String,
}

/// An execution context.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub(crate) id: ContextId,
    pub(crate) global_object: ObjectId,
    pub(crate) object_prototype: ObjectId,
    pub(crate) function_prototype: ObjectId,
    pub(crate) well_known_objects: Vec<ObjectId>,
    pub(crate) well_known_types: Vec<TypeId>,
    pub(crate) loaded_sources: Vec<LoadedSource>,
}

impl ScriptContext {
    /// Context ID.
    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Global object.
    #[inline]
    pub fn global_object(&self) -> ObjectId {
        self.global_object
    }

    /// `Object.prototype`.
    #[inline]
    pub fn object_prototype(&self) -> ObjectId {
        self.object_prototype
    }

    /// `Function.prototype`.
    #[inline]
    pub fn function_prototype(&self) -> ObjectId {
        self.function_prototype
    }

    /// Objects registered as well-known.
    pub fn well_known_objects(&self) -> &[ObjectId] {
        &self.well_known_objects
    }

    /// Types registered as well-known.
    pub fn well_known_types(&self) -> &[TypeId] {
        &self.well_known_types
    }

    /// Top-level source units in load order.
    pub fn loaded_sources(&self) -> &[LoadedSource] {
        &self.loaded_sources
    }

    pub(crate) fn add_well_known_object(&mut self, obj: ObjectId) {
        if !self.well_known_objects.contains(&obj) {
            self.well_known_objects.push(obj);
        }
    }

    pub(crate) fn add_well_known_type(&mut self, ty: TypeId) {
        if !self.well_known_types.contains(&ty) {
            self.well_known_types.push(ty);
        }
    }
}
