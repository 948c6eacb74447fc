//! Reachability marking.
//!
//! The mark phase walks the heap breadth-first from the roots and the
//! contexts' well-known tables, recording every reached entity in the
//! [`MarkTable`] under its category:
//!
//! ```text
//!   root ──▶ CompoundObject ──▶ Type ──▶ LayoutDescriptor
//!                 │               │
//!                 │               └──▶ prototype (CompoundObject)
//!                 ├──▶ slot values / indexed store
//!                 └──▶ kind-specific refs ──▶ Environment ──▶ SlotArray
//!                                                               │
//!                                                               └──▶ FunctionBody ──▶ parent ..
//! ```
//!
//! Compound objects go through the [`Worklist`]; everything else is visited
//! recursively on first mark. The mark test is idempotent, which is what
//! terminates the walk on cyclic graphs.

mod table;
mod walker;
mod worklist;

pub use table::{MarkCursor, MarkEntry, MarkTable};
pub(crate) use walker::run_mark_phase;
pub use worklist::Worklist;

bitflags::bitflags! {
    /// Category and attribute bits of a mark table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MarkFlags: u8 {
        /// Layout descriptor.
        const LAYOUT_DESCRIPTOR = 1 << 0;
        /// Type.
        const TYPE = 1 << 1;
        /// Primitive heap object.
        const PRIMITIVE_OBJECT = 1 << 2;
        /// Compound heap object.
        const COMPOUND_OBJECT = 1 << 3;
        /// Function body.
        const FUNCTION_BODY = 1 << 4;
        /// Closure environment.
        const ENVIRONMENT = 1 << 5;
        /// Slot array.
        const SLOT_ARRAY = 1 << 6;
        /// Registered by a context's well-known table.
        const WELL_KNOWN = 1 << 7;

        /// Every category bit.
        const ALL_KINDS = Self::LAYOUT_DESCRIPTOR.bits()
            | Self::TYPE.bits()
            | Self::PRIMITIVE_OBJECT.bits()
            | Self::COMPOUND_OBJECT.bits()
            | Self::FUNCTION_BODY.bits()
            | Self::ENVIRONMENT.bits()
            | Self::SLOT_ARRAY.bits();
    }
}

/// Category an entity is marked under.
///
/// Declaration order is the order the extraction scan processes categories.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkTag {
    /// Layout descriptor of a dynamic type.
    LayoutDescriptor = 0,
    /// Type.
    Type = 1,
    /// Primitive heap object.
    PrimitiveObject = 2,
    /// Compound heap object.
    CompoundObject = 3,
    /// Function body.
    FunctionBody = 4,
    /// Closure environment.
    Environment = 5,
    /// Slot array.
    SlotArray = 6,
}

impl MarkTag {
    /// Number of categories.
    pub const COUNT: usize = 7;

    /// Every category in scan order.
    pub const ALL: [MarkTag; Self::COUNT] = [
        MarkTag::LayoutDescriptor,
        MarkTag::Type,
        MarkTag::PrimitiveObject,
        MarkTag::CompoundObject,
        MarkTag::FunctionBody,
        MarkTag::Environment,
        MarkTag::SlotArray,
    ];

    /// The flag bit for this category.
    #[inline]
    pub const fn flag(self) -> MarkFlags {
        match self {
            MarkTag::LayoutDescriptor => MarkFlags::LAYOUT_DESCRIPTOR,
            MarkTag::Type => MarkFlags::TYPE,
            MarkTag::PrimitiveObject => MarkFlags::PRIMITIVE_OBJECT,
            MarkTag::CompoundObject => MarkFlags::COMPOUND_OBJECT,
            MarkTag::FunctionBody => MarkFlags::FUNCTION_BODY,
            MarkTag::Environment => MarkFlags::ENVIRONMENT,
            MarkTag::SlotArray => MarkFlags::SLOT_ARRAY,
        }
    }

    /// Index into per-category arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_flags_are_distinct() {
        let mut all = MarkFlags::empty();
        for tag in MarkTag::ALL {
            assert!(!all.intersects(tag.flag()));
            all |= tag.flag();
        }
        assert_eq!(all, MarkFlags::ALL_KINDS);
        assert!(!all.contains(MarkFlags::WELL_KNOWN));
    }

    #[test]
    fn test_tag_indices_follow_scan_order() {
        for (i, tag) in MarkTag::ALL.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
    }
}
