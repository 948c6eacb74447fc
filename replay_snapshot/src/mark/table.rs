//! Tagged reachability set.

use super::{MarkFlags, MarkTag};
use crate::id::PtrId;
use rustc_hash::FxHashMap;

/// Per-identity state.
#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Current category bits plus `WELL_KNOWN`.
    flags: MarkFlags,
    /// Categories this identity was ever appended to the scan order under.
    /// Never cleared within a cycle, so re-marking does not duplicate scan entries.
    listed: MarkFlags,
}

/// One marked (identity, category) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkEntry {
    /// Marked identity.
    pub id: PtrId,
    /// Category it is marked under.
    pub tag: MarkTag,
    /// Whether a context registered it as well-known.
    pub well_known: bool,
}

/// Position of a scan over a [`MarkTable`].
///
/// The cursor does not borrow the table, so entries may be cleared (or
/// extracted on demand) between steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkCursor {
    tag: usize,
    position: usize,
}

/// Reachability set keyed by identity, partitioned by [`MarkTag`].
///
/// Scan order is grouped by category (in [`MarkTag::ALL`] order) and, within
/// a category, follows first-mark order. That order is stable for a cycle.
#[derive(Debug, Default)]
pub struct MarkTable {
    entries: FxHashMap<PtrId, Slot>,
    order: [Vec<PtrId>; MarkTag::COUNT],
    counts: [usize; MarkTag::COUNT],
}

impl MarkTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` identities.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Mark `id` under `tag`.
    ///
    /// Returns true only if `id` was not already marked under `tag`; callers
    /// use that to decide whether to recurse.
    #[inline]
    pub fn mark_and_test(&mut self, id: impl Into<PtrId>, tag: MarkTag) -> bool {
        let id = id.into();
        let flag = tag.flag();
        let slot = self.entries.entry(id).or_insert(Slot {
            flags: MarkFlags::empty(),
            listed: MarkFlags::empty(),
        });

        if slot.flags.contains(flag) {
            return false;
        }

        slot.flags.insert(flag);
        if !slot.listed.contains(flag) {
            slot.listed.insert(flag);
            self.order[tag.index()].push(id);
        }
        self.counts[tag.index()] += 1;
        true
    }

    /// Flag a marked identity as well-known.
    ///
    /// Returns false if the identity is not marked.
    pub fn set_well_known(&mut self, id: impl Into<PtrId>) -> bool {
        match self.entries.get_mut(&id.into()) {
            Some(slot) if slot.flags.intersects(MarkFlags::ALL_KINDS) => {
                slot.flags.insert(MarkFlags::WELL_KNOWN);
                true
            }
            _ => false,
        }
    }

    /// Check if `id` is marked under any category.
    #[inline]
    pub fn is_marked(&self, id: impl Into<PtrId>) -> bool {
        self.flags(id).intersects(MarkFlags::ALL_KINDS)
    }

    /// Check if `id` is marked under `tag`.
    #[inline]
    pub fn is_marked_as(&self, id: impl Into<PtrId>, tag: MarkTag) -> bool {
        self.flags(id).contains(tag.flag())
    }

    /// Check if `id` is flagged well-known.
    #[inline]
    pub fn is_well_known(&self, id: impl Into<PtrId>) -> bool {
        self.flags(id).contains(MarkFlags::WELL_KNOWN)
    }

    /// Current flags of `id` (empty if unmarked).
    #[inline]
    pub fn flags(&self, id: impl Into<PtrId>) -> MarkFlags {
        self.entries
            .get(&id.into())
            .map_or(MarkFlags::empty(), |slot| slot.flags)
    }

    /// Remove every mark of `id`.
    ///
    /// Used once an entity has been extracted so it is never extracted again.
    pub fn clear_mark(&mut self, id: impl Into<PtrId>) {
        if let Some(slot) = self.entries.get_mut(&id.into()) {
            for tag in MarkTag::ALL {
                if slot.flags.contains(tag.flag()) {
                    self.counts[tag.index()] -= 1;
                }
            }
            slot.flags = MarkFlags::empty();
        }
    }

    /// Number of identities currently marked under `tag`.
    #[inline]
    pub fn count_for_tag(&self, tag: MarkTag) -> usize {
        self.counts[tag.index()]
    }

    /// Number of (identity, category) marks currently set.
    pub fn len(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Check if nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a scan at the first category.
    #[inline]
    pub fn cursor(&self) -> MarkCursor {
        MarkCursor::default()
    }

    /// Advance `cursor` to the next entry that is still marked.
    pub fn next_marked(&self, cursor: &mut MarkCursor) -> Option<MarkEntry> {
        while cursor.tag < MarkTag::COUNT {
            let tag = MarkTag::ALL[cursor.tag];
            let order = &self.order[cursor.tag];

            while cursor.position < order.len() {
                let id = order[cursor.position];
                cursor.position += 1;

                let flags = self.flags(id);
                if flags.contains(tag.flag()) {
                    return Some(MarkEntry {
                        id,
                        tag,
                        well_known: flags.contains(MarkFlags::WELL_KNOWN),
                    });
                }
            }

            cursor.tag += 1;
            cursor.position = 0;
        }
        None
    }

    /// Iterate over every current mark in scan order.
    pub fn iter(&self) -> impl Iterator<Item = MarkEntry> + '_ {
        let mut cursor = self.cursor();
        std::iter::from_fn(move || self.next_marked(&mut cursor))
    }

    /// Remove every mark, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        for order in &mut self.order {
            order.clear();
        }
        self.counts = [0; MarkTag::COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ObjectId, TypeId};

    #[test]
    fn test_mark_and_test_is_idempotent() {
        let mut marks = MarkTable::new();
        let obj = ObjectId::from_raw(0x1000);

        assert!(marks.mark_and_test(obj, MarkTag::CompoundObject));
        assert!(!marks.mark_and_test(obj, MarkTag::CompoundObject));
        assert!(marks.is_marked(obj));
        assert!(marks.is_marked_as(obj, MarkTag::CompoundObject));
        assert!(!marks.is_marked_as(obj, MarkTag::PrimitiveObject));
        assert_eq!(marks.count_for_tag(MarkTag::CompoundObject), 1);
    }

    #[test]
    fn test_clear_mark_allows_remark() {
        let mut marks = MarkTable::new();
        let ty = TypeId::from_raw(7);

        assert!(marks.mark_and_test(ty, MarkTag::Type));
        marks.clear_mark(ty);
        assert!(!marks.is_marked(ty));
        assert_eq!(marks.count_for_tag(MarkTag::Type), 0);

        assert!(marks.mark_and_test(ty, MarkTag::Type));
        assert_eq!(marks.count_for_tag(MarkTag::Type), 1);
        // Re-marking must not produce a second scan entry.
        assert_eq!(marks.iter().count(), 1);
    }

    #[test]
    fn test_scan_is_grouped_by_tag_in_mark_order() {
        let mut marks = MarkTable::new();
        marks.mark_and_test(PtrId(30), MarkTag::CompoundObject);
        marks.mark_and_test(PtrId(10), MarkTag::Type);
        marks.mark_and_test(PtrId(20), MarkTag::CompoundObject);
        marks.mark_and_test(PtrId(40), MarkTag::LayoutDescriptor);

        let scanned: Vec<_> = marks.iter().map(|e| (e.id, e.tag)).collect();
        assert_eq!(
            scanned,
            vec![
                (PtrId(40), MarkTag::LayoutDescriptor),
                (PtrId(10), MarkTag::Type),
                (PtrId(30), MarkTag::CompoundObject),
                (PtrId(20), MarkTag::CompoundObject),
            ]
        );
    }

    #[test]
    fn test_scan_skips_entries_cleared_mid_scan() {
        let mut marks = MarkTable::new();
        marks.mark_and_test(PtrId(1), MarkTag::Type);
        marks.mark_and_test(PtrId(2), MarkTag::Type);
        marks.mark_and_test(PtrId(3), MarkTag::PrimitiveObject);

        let mut cursor = marks.cursor();
        let first = marks.next_marked(&mut cursor).unwrap();
        assert_eq!(first.id, PtrId(1));

        // Simulates an on-demand extraction of a later entry.
        marks.clear_mark(PtrId(2));
        marks.clear_mark(first.id);

        let next = marks.next_marked(&mut cursor).unwrap();
        assert_eq!(next.id, PtrId(3));
        assert!(marks.next_marked(&mut cursor).is_none());
    }

    #[test]
    fn test_well_known_flag() {
        let mut marks = MarkTable::new();
        assert!(!marks.set_well_known(PtrId(5)));

        marks.mark_and_test(PtrId(5), MarkTag::PrimitiveObject);
        assert!(marks.set_well_known(PtrId(5)));
        assert!(marks.is_well_known(PtrId(5)));

        let entry = marks.iter().next().unwrap();
        assert!(entry.well_known);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut marks = MarkTable::with_capacity(16);
        marks.mark_and_test(PtrId(1), MarkTag::FunctionBody);
        marks.mark_and_test(PtrId(2), MarkTag::SlotArray);
        assert_eq!(marks.len(), 2);

        marks.clear();
        assert!(marks.is_empty());
        assert_eq!(marks.iter().count(), 0);
        assert!(marks.mark_and_test(PtrId(1), MarkTag::FunctionBody));
    }
}
