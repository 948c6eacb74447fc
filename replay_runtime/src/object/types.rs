//! Runtime types.
//!
//! Every heap object points at a type. Static types describe primitives and
//! objects whose properties have not been materialized; they carry no layout.
//! Dynamic types pair a prototype with a layout and are shared by every
//! object that reached the same layout through the same property additions.

use replay_snapshot::{ContextId, LayoutId, ObjectId, TypeId};

/// Runtime type tag recorded in snapshot type records.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    /// `undefined`.
    Undefined = 0,
    /// `null`.
    Null = 1,
    /// Boolean.
    Boolean = 2,
    /// Heap number.
    Number = 3,
    /// 64-bit integer.
    Int64 = 4,
    /// String.
    String = 5,
    /// Symbol.
    Symbol = 6,
    /// Ordinary object.
    Object = 16,
    /// Array.
    Array = 17,
    /// Boxed primitive wrapper.
    BoxedValue = 18,
    /// Script function.
    Function = 19,
    /// Bound function.
    BoundFunction = 20,
    /// Map.
    Map = 21,
    /// Set.
    Set = 22,
    /// Date.
    Date = 23,
}

impl TypeTag {
    /// Tags of primitive types, in declaration order.
    pub const PRIMITIVES: [TypeTag; 7] = [
        TypeTag::Undefined,
        TypeTag::Null,
        TypeTag::Boolean,
        TypeTag::Number,
        TypeTag::Int64,
        TypeTag::String,
        TypeTag::Symbol,
    ];

    /// Get the raw tag value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Check if values of this tag are primitive objects.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        (self as u32) < TypeTag::Object as u32
    }

    /// Check if objects of this tag are callable.
    #[inline]
    pub const fn is_callable(self) -> bool {
        matches!(self, TypeTag::Function | TypeTag::BoundFunction)
    }
}

/// A type as stored by the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeType {
    /// Type ID.
    pub id: TypeId,
    /// Type tag.
    pub tag: TypeTag,
    /// Owning context.
    pub context: ContextId,
    /// Layout; present exactly for dynamic types.
    pub layout: Option<LayoutId>,
    /// Prototype object.
    pub prototype: Option<ObjectId>,
    /// No property of the layout is enumerable.
    pub has_no_enumerable_properties: bool,
}

impl RuntimeType {
    /// Check if this is a dynamic type.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.layout.is_some()
    }
}

/// Cache key under which dynamic types are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TypeKey {
    pub context: ContextId,
    pub tag: TypeTag,
    pub prototype: Option<ObjectId>,
    pub layout: LayoutId,
}
