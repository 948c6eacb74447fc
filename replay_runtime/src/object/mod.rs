//! Heap object representation.
//!
//! An object is either a primitive (an immutable leaf value) or a compound
//! object with property slots and kind-specific data. Compound objects may
//! start out deferred: their properties are recorded but not laid out, and
//! their type is a static placeholder until first materialized.
//!
//! ```text
//! HeapObject
//! ├── context
//! ├── type_id: Cell<TypeId>        (switches once, on materialization)
//! └── body
//!     ├── Primitive(PrimitiveData)
//!     └── Compound(RefCell<CompoundObject>)
//!             ├── kind: ObjectKind
//!             └── storage: Deferred { target, slots } | Materialized { slots, indexed_store }
//! ```

pub mod shape;
pub mod types;

use replay_snapshot::model::PropertyId;
use replay_snapshot::{ContextId, EnvironmentId, FunctionBodyId, ObjectId, TypeId, Value};
use std::cell::{Cell, RefCell};
use types::TypeTag;

// =============================================================================
// Primitives
// =============================================================================

/// Value of a primitive object.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveData {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Heap number.
    Number(f64),
    /// 64-bit integer.
    Int64(i64),
    /// String.
    String(String),
    /// Symbol.
    Symbol(PropertyId),
}

impl PrimitiveData {
    /// Type tag of this primitive.
    pub fn tag(&self) -> TypeTag {
        match self {
            PrimitiveData::Undefined => TypeTag::Undefined,
            PrimitiveData::Null => TypeTag::Null,
            PrimitiveData::Boolean(_) => TypeTag::Boolean,
            PrimitiveData::Number(_) => TypeTag::Number,
            PrimitiveData::Int64(_) => TypeTag::Int64,
            PrimitiveData::String(_) => TypeTag::String,
            PrimitiveData::Symbol(_) => TypeTag::Symbol,
        }
    }
}

// =============================================================================
// Compound Objects
// =============================================================================

/// Kind-specific data of a compound object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Ordinary object.
    Plain,
    /// Array with dense elements.
    Array(Vec<Value>),
    /// Wrapper around a value.
    Boxed(Value),
    /// Closure over a function body.
    Closure {
        /// Function body.
        body: FunctionBodyId,
        /// Captured environment.
        environment: EnvironmentId,
        /// Home object for `super` lookups.
        home_object: Option<ObjectId>,
    },
    /// Function with bound receiver and arguments.
    BoundFunction {
        /// Target function.
        target: ObjectId,
        /// Bound receiver.
        bound_this: Value,
        /// Bound arguments.
        args: Vec<Value>,
    },
    /// Keyed collection.
    Map(Vec<(Value, Value)>),
    /// Set collection.
    Set(Vec<Value>),
    /// Date with its time value.
    Date(f64),
}

/// Dispatch tag of an [`ObjectKind`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    /// [`ObjectKind::Plain`].
    Plain = 0,
    /// [`ObjectKind::Array`].
    Array = 1,
    /// [`ObjectKind::Boxed`].
    Boxed = 2,
    /// [`ObjectKind::Closure`].
    Closure = 3,
    /// [`ObjectKind::BoundFunction`].
    BoundFunction = 4,
    /// [`ObjectKind::Map`].
    Map = 5,
    /// [`ObjectKind::Set`].
    Set = 6,
    /// [`ObjectKind::Date`].
    Date = 7,
}

impl KindTag {
    /// Number of kinds.
    pub const COUNT: usize = 8;

    /// Runtime type tag of objects of this kind.
    pub const fn type_tag(self) -> TypeTag {
        match self {
            KindTag::Plain => TypeTag::Object,
            KindTag::Array => TypeTag::Array,
            KindTag::Boxed => TypeTag::BoxedValue,
            KindTag::Closure => TypeTag::Function,
            KindTag::BoundFunction => TypeTag::BoundFunction,
            KindTag::Map => TypeTag::Map,
            KindTag::Set => TypeTag::Set,
            KindTag::Date => TypeTag::Date,
        }
    }
}

impl ObjectKind {
    /// Dispatch tag.
    pub fn tag(&self) -> KindTag {
        match self {
            ObjectKind::Plain => KindTag::Plain,
            ObjectKind::Array(_) => KindTag::Array,
            ObjectKind::Boxed(_) => KindTag::Boxed,
            ObjectKind::Closure { .. } => KindTag::Closure,
            ObjectKind::BoundFunction { .. } => KindTag::BoundFunction,
            ObjectKind::Map(_) => KindTag::Map,
            ObjectKind::Set(_) => KindTag::Set,
            ObjectKind::Date(_) => KindTag::Date,
        }
    }
}

/// Property storage of a compound object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectStorage {
    /// Properties recorded but not laid out yet.
    Deferred {
        /// Type the object takes once materialized.
        target: TypeId,
        /// Slot values in the target layout's order.
        slots: Vec<Value>,
    },
    /// Properties laid out according to the current type's layout.
    Materialized {
        /// Slot values.
        slots: Vec<Value>,
        /// Indexed-element backing store.
        indexed_store: Option<ObjectId>,
    },
}

impl ObjectStorage {
    /// Empty materialized storage.
    pub const fn empty() -> Self {
        ObjectStorage::Materialized {
            slots: Vec::new(),
            indexed_store: None,
        }
    }

    /// Check if the storage is still deferred.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, ObjectStorage::Deferred { .. })
    }

    /// Slot values.
    pub fn slots(&self) -> &[Value] {
        match self {
            ObjectStorage::Deferred { slots, .. } | ObjectStorage::Materialized { slots, .. } => {
                slots
            }
        }
    }

    pub(crate) fn slots_mut(&mut self) -> &mut Vec<Value> {
        match self {
            ObjectStorage::Deferred { slots, .. } | ObjectStorage::Materialized { slots, .. } => {
                slots
            }
        }
    }

    /// Indexed-element backing store.
    pub fn indexed_store(&self) -> Option<ObjectId> {
        match self {
            ObjectStorage::Deferred { .. } => None,
            ObjectStorage::Materialized { indexed_store, .. } => *indexed_store,
        }
    }

    /// Switch deferred storage to its materialized form.
    ///
    /// Returns the target type if a transition happened.
    pub fn materialize(&mut self) -> Option<TypeId> {
        match std::mem::replace(self, ObjectStorage::empty()) {
            ObjectStorage::Deferred { target, slots } => {
                *self = ObjectStorage::Materialized {
                    slots,
                    indexed_store: None,
                };
                Some(target)
            }
            materialized => {
                *self = materialized;
                None
            }
        }
    }
}

/// Compound object state.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundObject {
    /// Kind-specific data.
    pub kind: ObjectKind,
    /// Property storage.
    pub storage: ObjectStorage,
}

/// Object body.
#[derive(Debug)]
pub enum ObjectBody {
    /// Primitive leaf.
    Primitive(PrimitiveData),
    /// Compound object.
    Compound(RefCell<CompoundObject>),
}

/// A heap object.
#[derive(Debug)]
pub struct HeapObject {
    pub(crate) context: ContextId,
    pub(crate) type_id: Cell<TypeId>,
    pub(crate) body: ObjectBody,
}

impl HeapObject {
    pub(crate) fn new_primitive(context: ContextId, type_id: TypeId, data: PrimitiveData) -> Self {
        Self {
            context,
            type_id: Cell::new(type_id),
            body: ObjectBody::Primitive(data),
        }
    }

    pub(crate) fn new_compound(
        context: ContextId,
        type_id: TypeId,
        kind: ObjectKind,
        storage: ObjectStorage,
    ) -> Self {
        Self {
            context,
            type_id: Cell::new(type_id),
            body: ObjectBody::Compound(RefCell::new(CompoundObject { kind, storage })),
        }
    }

    /// Owning context.
    #[inline]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Current type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id.get()
    }

    /// Check if this is a primitive object.
    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(self.body, ObjectBody::Primitive(_))
    }

    /// Primitive value, if this is a primitive.
    pub fn primitive_data(&self) -> Option<&PrimitiveData> {
        match &self.body {
            ObjectBody::Primitive(data) => Some(data),
            ObjectBody::Compound(_) => None,
        }
    }

    /// Compound state, if this is a compound object.
    pub fn compound(&self) -> Option<&RefCell<CompoundObject>> {
        match &self.body {
            ObjectBody::Primitive(_) => None,
            ObjectBody::Compound(cell) => Some(cell),
        }
    }

    /// Mutable compound state, if this is a compound object.
    pub fn compound_mut(&mut self) -> Option<&mut CompoundObject> {
        match &mut self.body {
            ObjectBody::Primitive(_) => None,
            ObjectBody::Compound(cell) => Some(cell.get_mut()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_once() {
        let target = TypeId::from_raw(5);
        let mut storage = ObjectStorage::Deferred {
            target,
            slots: vec![Value::Int(1)],
        };
        assert!(storage.is_deferred());
        assert_eq!(storage.indexed_store(), None);

        assert_eq!(storage.materialize(), Some(target));
        assert!(!storage.is_deferred());
        assert_eq!(storage.slots(), &[Value::Int(1)]);

        assert_eq!(storage.materialize(), None);
        assert_eq!(storage.slots(), &[Value::Int(1)]);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ObjectKind::Plain.tag(), KindTag::Plain);
        assert_eq!(ObjectKind::Date(0.0).tag().type_tag(), TypeTag::Date);
        assert_eq!(
            ObjectKind::Map(vec![]).tag().type_tag(),
            TypeTag::Map
        );
        assert_eq!(PrimitiveData::String("s".into()).tag(), TypeTag::String);
    }

    #[test]
    fn test_object_body() {
        let mut obj = HeapObject::new_compound(
            ContextId(1),
            TypeId::from_raw(2),
            ObjectKind::Set(vec![]),
            ObjectStorage::empty(),
        );
        assert!(!obj.is_primitive());
        assert!(obj.primitive_data().is_none());
        obj.compound_mut().unwrap().kind = ObjectKind::Set(vec![Value::Int(3)]);
        assert_eq!(
            obj.compound().unwrap().borrow().kind,
            ObjectKind::Set(vec![Value::Int(3)])
        );

        let prim = HeapObject::new_primitive(ContextId(1), TypeId::from_raw(3), PrimitiveData::Null);
        assert!(prim.is_primitive());
        assert_eq!(prim.type_id(), TypeId::from_raw(3));
    }
}
