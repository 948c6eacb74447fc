//! Entity identities and snapshot values.
//!
//! Every heap entity the engine can mark carries a stable, non-zero integer
//! handle issued by the object model when the entity is created. Handles of
//! all entity kinds share one namespace, so the mark table can key a single
//! map by [`PtrId`] while the rest of the API works with typed wrappers.

use std::fmt;

// =============================================================================
// Raw Identity
// =============================================================================

/// Raw identity of a heap entity.
///
/// Stable for the lifetime of the entity; never reused while the entity is
/// alive. The same value is written into every snapshot record that refers to
/// the entity, which is what makes snapshots identity-stable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PtrId(pub u64);

impl PtrId {
    /// Reserved "no entity" identity.
    pub const INVALID: Self = Self(0);

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check if this identity refers to an entity.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for PtrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#INVALID")
        }
    }
}

impl fmt::Display for PtrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Typed Handles
// =============================================================================

macro_rules! entity_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(PtrId);

        impl $name {
            /// Wrap a raw identity.
            #[inline]
            pub const fn new(id: PtrId) -> Self {
                Self(id)
            }

            /// Build a handle from a raw integer.
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(PtrId(raw))
            }

            /// Get the untyped identity.
            #[inline]
            pub const fn ptr_id(self) -> PtrId {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl From<$name> for PtrId {
            #[inline]
            fn from(handle: $name) -> PtrId {
                handle.0
            }
        }
    };
}

entity_handle!(
    /// Handle to a primitive or compound heap object.
    ObjectId
);
entity_handle!(
    /// Handle to a type (static or dynamic).
    TypeId
);
entity_handle!(
    /// Handle to a layout descriptor shared by objects of dynamic types.
    LayoutId
);
entity_handle!(
    /// Handle to a compiled function body.
    FunctionBodyId
);
entity_handle!(
    /// Handle to a closure environment (ordered list of lexical scopes).
    EnvironmentId
);
entity_handle!(
    /// Handle to a slot array holding a scope's captured variables.
    SlotArrayId
);

/// Log identifier of an execution context.
///
/// Contexts are not marked; they are extracted eagerly when a snapshot begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ContextId(pub u32);

// =============================================================================
// Value
// =============================================================================

/// A runtime value as seen by the snapshot engine.
///
/// Integers and floats are tagged inline and have no identity; everything
/// else is a reference to a heap object. Snapshot records store values in
/// this form, so a reference inside a record is already a stable ID.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Tagged-inline small integer.
    Int(i32),
    /// Tagged-inline double.
    Float(f64),
    /// Reference to a heap object.
    Object(ObjectId),
}

impl Value {
    /// Get the referenced object, if any.
    #[inline]
    pub fn as_object(self) -> Option<ObjectId> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Check if this value is a tagged-inline immediate.
    #[inline]
    pub fn is_tagged_inline(self) -> bool {
        !matches!(self, Value::Object(_))
    }
}

impl From<ObjectId> for Value {
    #[inline]
    fn from(obj: ObjectId) -> Self {
        Value::Object(obj)
    }
}
