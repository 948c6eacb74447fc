//! Layouts (hidden classes) for dynamic types.
//!
//! Objects that receive the same sequence of property additions share a
//! layout. Layouts form a transition tree rooted at the empty layout:
//!
//! ```text
//!     EmptyLayout
//!         |
//!     +---+---+
//!     |       |
//!    "x"     "y"
//!     |       |
//!  Layout1  Layout2
//!     |
//!    "y"
//!     |
//!  Layout3 (has both x and y)
//! ```
//!
//! A layout never changes once created; adding a property produces (or
//! reuses) the child layout for that property.

use crate::heap::IdIssuer;
use replay_snapshot::model::{PropertyDescriptor, PropertyFlags, PropertyId};
use replay_snapshot::LayoutId;
use rustc_hash::FxHashMap;

/// Maximum number of inline property slots.
///
/// Properties beyond this count live in out-of-line storage; the layout
/// still records them in slot order.
pub const MAX_INLINE_SLOTS: u16 = 8;

/// The property layout of a dynamic type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    id: LayoutId,
    properties: Vec<PropertyDescriptor>,
    extensible: bool,
}

impl Layout {
    /// Get the layout ID.
    #[inline]
    pub fn id(&self) -> LayoutId {
        self.id
    }

    /// Properties in slot order.
    #[inline]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Number of properties.
    #[inline]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Number of slots stored inline.
    #[inline]
    pub fn inline_slot_capacity(&self) -> u16 {
        MAX_INLINE_SLOTS
    }

    /// Whether properties may be added.
    #[inline]
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// Check if this is an empty layout.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Check if no property is enumerable.
    pub fn has_no_enumerable_properties(&self) -> bool {
        !self
            .properties
            .iter()
            .any(|p| p.flags.contains(PropertyFlags::ENUMERABLE))
    }

    /// Lookup a property's slot.
    pub fn lookup(&self, name: PropertyId) -> Option<u32> {
        self.properties
            .iter()
            .find(|p| p.id == name)
            .map(|p| p.slot)
    }

    /// Get a property's full descriptor.
    pub fn get_descriptor(&self, name: PropertyId) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.id == name)
    }
}

/// Owner of every layout in a heap, with cached transitions.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: FxHashMap<LayoutId, Layout>,
    transitions: FxHashMap<(LayoutId, PropertyId), LayoutId>,
    sealed: FxHashMap<LayoutId, LayoutId>,
    empty: Option<LayoutId>,
}

impl LayoutRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (creating on first use) the shared empty layout.
    pub(crate) fn empty_layout(&mut self, ids: &mut IdIssuer) -> LayoutId {
        if let Some(empty) = self.empty {
            return empty;
        }
        let id = self.insert(ids, Vec::new(), true);
        self.empty = Some(id);
        id
    }

    /// Transition to the layout that adds `name` to `from`.
    ///
    /// If the transition already exists, returns the cached layout.
    pub(crate) fn transition(
        &mut self,
        ids: &mut IdIssuer,
        from: LayoutId,
        name: PropertyId,
        flags: PropertyFlags,
    ) -> Option<LayoutId> {
        // Fast path: cached
        if let Some(existing) = self.transitions.get(&(from, name)) {
            return Some(*existing);
        }

        let parent = self.layouts.get(&from)?;
        let mut properties = parent.properties.clone();
        properties.push(PropertyDescriptor {
            id: name,
            slot: properties.len() as u32,
            flags,
        });
        let extensible = parent.extensible;

        let id = self.insert(ids, properties, extensible);
        self.transitions.insert((from, name), id);
        Some(id)
    }

    /// Get the non-extensible counterpart of `from`.
    pub(crate) fn seal(&mut self, ids: &mut IdIssuer, from: LayoutId) -> Option<LayoutId> {
        if let Some(existing) = self.sealed.get(&from) {
            return Some(*existing);
        }

        let parent = self.layouts.get(&from)?;
        if !parent.extensible {
            return Some(from);
        }
        let properties = parent.properties.clone();

        let id = self.insert(ids, properties, false);
        self.sealed.insert(from, id);
        Some(id)
    }

    fn insert(
        &mut self,
        ids: &mut IdIssuer,
        properties: Vec<PropertyDescriptor>,
        extensible: bool,
    ) -> LayoutId {
        let id = LayoutId::new(ids.issue());
        self.layouts.insert(
            id,
            Layout {
                id,
                properties,
                extensible,
            },
        );
        id
    }

    /// Get a layout.
    #[inline]
    pub fn get(&self, id: LayoutId) -> Option<&Layout> {
        self.layouts.get(&id)
    }

    /// Number of layouts created.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Check if no layout has been created.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
