//! Per-snapshot arena storage.
//!
//! A snapshot owns two kinds of storage:
//! - **Record lists**: one append-only list per record category, addressed by
//!   [`RecordId`]. Records are never removed.
//! - **Payload pools**: contiguous bump-allocated pools for the
//!   variable-length parts of records (slot values, scope entries, property
//!   descriptors, top-level sources, text). Records hold [`ArenaSlice`] /
//!   [`ArenaStr`] handles into them.
//!
//! Nothing is freed individually; everything goes away with the snapshot.

use crate::id::Value;
use crate::model::PropertyDescriptor;
use crate::snapshot::records::{ScopeEntry, TopLevelRecord};
use std::marker::PhantomData;
use std::ops::Index;

// =============================================================================
// Record Lists
// =============================================================================

/// Index of a record inside its snapshot's record list.
///
/// The generic parameter keeps indices of different record categories apart.
pub struct RecordId<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for RecordId<T> {}

impl<T> Clone for RecordId<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for RecordId<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for RecordId<T> {}

impl<T> std::hash::Hash for RecordId<T> {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> std::fmt::Debug for RecordId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.index)
    }
}

impl<T> RecordId<T> {
    #[inline]
    const fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Get the index as usize.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.index as usize
    }
}

/// Append-only list of records of one category.
#[derive(Debug, Clone)]
pub struct RecordList<T> {
    items: Vec<T>,
}

impl<T> RecordList<T> {
    /// Create an empty list.
    #[inline]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Create an empty list with room for `capacity` records.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Append a record and return its index.
    #[inline]
    pub fn alloc(&mut self, item: T) -> RecordId<T> {
        let index = self.items.len() as u32;
        self.items.push(item);
        RecordId::new(index)
    }

    /// Get a record by index.
    #[inline]
    pub fn get(&self, id: RecordId<T>) -> Option<&T> {
        self.items.get(id.as_usize())
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All records in extraction order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate over all records.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<RecordId<T>> for RecordList<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: RecordId<T>) -> &T {
        &self.items[id.as_usize()]
    }
}

// =============================================================================
// Payload Handles
// =============================================================================

/// A run of payload items inside a [`SnapshotArena`].
pub struct ArenaSlice<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ArenaSlice<T> {}

impl<T> Clone for ArenaSlice<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for ArenaSlice<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.len == other.len
    }
}

impl<T> Eq for ArenaSlice<T> {}

impl<T> std::fmt::Debug for ArenaSlice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..+{}]", self.start, self.len)
    }
}

impl<T> Default for ArenaSlice<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ArenaSlice<T> {
    /// The empty slice.
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    /// Number of items.
    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Check if the slice is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    fn range(self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// A string inside a [`SnapshotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStr {
    start: u32,
    len: u32,
}

impl ArenaStr {
    /// Length in bytes.
    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Check if the string is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

// =============================================================================
// Arena
// =============================================================================

mod sealed {
    use super::SnapshotArena;

    pub trait Pooled: Sized {
        fn pool(arena: &SnapshotArena) -> &Vec<Self>;
        fn pool_mut(arena: &mut SnapshotArena) -> &mut Vec<Self>;
    }
}

/// Item types that have a payload pool in [`SnapshotArena`].
pub trait ArenaItem: Copy + sealed::Pooled {}

macro_rules! arena_item {
    ($ty:ty, $field:ident) => {
        impl sealed::Pooled for $ty {
            #[inline]
            fn pool(arena: &SnapshotArena) -> &Vec<Self> {
                &arena.$field
            }

            #[inline]
            fn pool_mut(arena: &mut SnapshotArena) -> &mut Vec<Self> {
                &mut arena.$field
            }
        }

        impl ArenaItem for $ty {}
    };
}

arena_item!(Value, values);
arena_item!(ScopeEntry, scopes);
arena_item!(PropertyDescriptor, properties);
arena_item!(TopLevelRecord, top_level);

/// Bump storage for the variable-length parts of snapshot records.
#[derive(Debug, Clone, Default)]
pub struct SnapshotArena {
    values: Vec<Value>,
    scopes: Vec<ScopeEntry>,
    properties: Vec<PropertyDescriptor>,
    top_level: Vec<TopLevelRecord>,
    text: String,
}

impl SnapshotArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena with pre-reserved value and text pools.
    pub fn with_capacity(values: usize, text: usize) -> Self {
        Self {
            values: Vec::with_capacity(values),
            text: String::with_capacity(text),
            ..Self::default()
        }
    }

    /// Copy `items` into the arena.
    pub fn alloc_slice<T: ArenaItem>(&mut self, items: &[T]) -> ArenaSlice<T> {
        self.alloc_iter(items.iter().copied())
    }

    /// Append every item yielded by `items` as one contiguous slice.
    pub fn alloc_iter<T: ArenaItem>(&mut self, items: impl IntoIterator<Item = T>) -> ArenaSlice<T> {
        let pool = T::pool_mut(self);
        let start = pool.len();
        pool.extend(items);
        let len = pool.len() - start;
        if len == 0 {
            return ArenaSlice::EMPTY;
        }
        ArenaSlice {
            start: start as u32,
            len: len as u32,
            _marker: PhantomData,
        }
    }

    /// Resolve a slice handle.
    #[inline]
    pub fn get<T: ArenaItem>(&self, slice: ArenaSlice<T>) -> &[T] {
        &T::pool(self)[slice.range()]
    }

    /// Copy a string into the arena.
    pub fn alloc_str(&mut self, s: &str) -> ArenaStr {
        let start = self.text.len() as u32;
        self.text.push_str(s);
        ArenaStr {
            start,
            len: s.len() as u32,
        }
    }

    /// Resolve a string handle.
    #[inline]
    pub fn str(&self, s: ArenaStr) -> &str {
        let start = s.start as usize;
        &self.text[start..start + s.len as usize]
    }

    /// Approximate number of payload bytes in use.
    pub fn bytes_used(&self) -> usize {
        use std::mem::size_of;

        self.values.len() * size_of::<Value>()
            + self.scopes.len() * size_of::<ScopeEntry>()
            + self.properties.len() * size_of::<PropertyDescriptor>()
            + self.top_level.len() * size_of::<TopLevelRecord>()
            + self.text.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;

    #[test]
    fn test_record_list_alloc() {
        let mut list: RecordList<u64> = RecordList::new();
        let a = list.alloc(10);
        let b = list.alloc(20);

        assert_eq!(list.len(), 2);
        assert_eq!(list[a], 10);
        assert_eq!(list.get(b), Some(&20));
        assert_ne!(a, b);
    }

    #[test]
    fn test_value_slices_are_contiguous() {
        let mut arena = SnapshotArena::new();
        let first = arena.alloc_slice(&[Value::Int(1), Value::Int(2)]);
        let second = arena.alloc_slice(&[Value::Object(ObjectId::from_raw(5))]);

        assert_eq!(arena.get(first), &[Value::Int(1), Value::Int(2)]);
        assert_eq!(arena.get(second), &[Value::Object(ObjectId::from_raw(5))]);
    }

    #[test]
    fn test_empty_slice() {
        let mut arena = SnapshotArena::new();
        let empty: ArenaSlice<Value> = arena.alloc_slice(&[]);
        assert!(empty.is_empty());
        assert!(arena.get(empty).is_empty());
        assert_eq!(empty, ArenaSlice::EMPTY);
    }

    #[test]
    fn test_strings() {
        let mut arena = SnapshotArena::with_capacity(0, 64);
        let a = arena.alloc_str("hello");
        let b = arena.alloc_str("");
        let c = arena.alloc_str("world");

        assert_eq!(arena.str(a), "hello");
        assert!(b.is_empty());
        assert_eq!(arena.str(b), "");
        assert_eq!(arena.str(c), "world");
        assert_eq!(arena.bytes_used(), 10);
    }
}
