//! Marker interface handed to object-model hooks during the mark phase.

use crate::id::{EnvironmentId, FunctionBodyId, TypeId, Value};

/// Visitor the mark phase passes to [`HeapModel`](super::HeapModel) hooks.
///
/// Kind-specific marking and well-known marking report every reference they
/// hold through this interface. The implementation decides whether the
/// entity is new, recurses into it and queues compound objects; hooks never
/// need to remember what they already reported.
///
/// # Example
///
/// ```ignore
/// fn mark_kind_specific(&self, obj: ObjectId, marker: &mut dyn Marker) {
///     if let Kind::Closure { body, env, .. } = self.kind(obj) {
///         marker.mark_function_body(body);
///         marker.mark_environment(env);
///     }
/// }
/// ```
pub trait Marker {
    /// Mark a value. Tagged-inline values are ignored.
    fn mark_value(&mut self, value: Value);

    /// Mark a type (and through it, its layout and prototype).
    fn mark_type(&mut self, ty: TypeId);

    /// Mark a closure environment and every scope it lists.
    fn mark_environment(&mut self, env: EnvironmentId);

    /// Mark a function body and its lexical parent chain.
    fn mark_function_body(&mut self, body: FunctionBodyId);
}

/// A marker that only counts what it is given.
///
/// Useful for testing object-model hooks in isolation.
#[derive(Debug, Default)]
pub struct CountingMarker {
    /// Values reported, including tagged-inline ones.
    pub values: usize,
    /// Types reported.
    pub types: usize,
    /// Environments reported.
    pub environments: usize,
    /// Function bodies reported.
    pub function_bodies: usize,
}

impl CountingMarker {
    /// Create a new counting marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of references reported.
    pub fn total(&self) -> usize {
        self.values + self.types + self.environments + self.function_bodies
    }
}

impl Marker for CountingMarker {
    fn mark_value(&mut self, _value: Value) {
        self.values += 1;
    }

    fn mark_type(&mut self, _ty: TypeId) {
        self.types += 1;
    }

    fn mark_environment(&mut self, _env: EnvironmentId) {
        self.environments += 1;
    }

    fn mark_function_body(&mut self, _body: FunctionBodyId) {
        self.function_bodies += 1;
    }
}
