//! Core identifiers, capacity constants, and the component mask.
//!
//! This module defines the fundamental types shared by all subsystems:
//! entity directory indices, group and slot addressing, component
//! identifiers, and the fixed-capacity [`Mask`] bitset that records which
//! component types an entity currently owns.
//!
//! ## Layout constants
//!
//! Two constants govern physical layout and are deliberately small:
//!
//! - [`MASK_CAP`] — the hard ceiling on distinct component types. A mask is
//!   a fixed array of `u64` words; the ceiling is a process-wide limit on
//!   registered component types, not a per-entity limit.
//! - [`BLOCK_CAP`] — the cache-block capacity: the number of entities stored
//!   per block inside a group's component pools. Iterating one block touches
//!   a bounded, predictable amount of memory per component column. Changing
//!   this value changes physical layout but never observable query results.
//!
//! Both are validated with compile-time assertions.

/// Packed 64-bit entity identifier (generation in the high half, directory
/// index in the low half).
pub type EntityID = u64;
/// Stable directory index of an entity.
pub type IndexID = u32;
/// Generation counter used to detect stale handles.
pub type VersionID = u32;

/// Dense slot of an entity within its group.
pub type SlotID = u32;
/// Identifier of a mask group.
pub type GroupID = u16;
/// Compact runtime identifier for a component type.
pub type ComponentID = u16;

/// Number of bits reserved for the directory index inside an [`EntityID`].
pub const INDEX_BITS: u32 = 32;
/// Mask selecting the index portion of an [`EntityID`].
pub const INDEX_MASK: EntityID = (1 << INDEX_BITS) - 1;

/// Maximum number of distinct component types the engine supports.
pub const MASK_CAP: usize = 64;
/// Number of `u64` words required to represent a full component mask.
pub const MASK_WORDS: usize = (MASK_CAP + 63) / 64;

/// Number of entities stored per cache block within a group.
pub const BLOCK_CAP: usize = 64;

const _: [(); 1] = [(); (MASK_CAP > 0) as usize];
const _: [(); 1] = [(); (MASK_CAP <= u16::MAX as usize) as usize];
const _: [(); 1] = [(); (BLOCK_CAP > 0) as usize];

/// Bitset recording a set of component types.
///
/// One bit per registered component type; the bit index is the component's
/// [`ComponentID`]. A group's mask equals the mask of every entity it holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mask {
    /// Packed component bitset.
    pub words: [u64; MASK_WORDS],
}

impl Mask {
    /// Sets the bit corresponding to `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentID) {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.words[index] |= 1u64 << bits;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentID) {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.words[index] &= !(1u64 << bits);
    }

    /// Returns `true` if `component_id` is present in this mask.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        (self.words[index] >> bits) & 1 == 1
    }

    /// Returns `true` if every component in `other` is present in `self`.
    #[inline]
    pub fn contains_all(&self, other: &Mask) -> bool {
        for (own, required) in self.words.iter().zip(other.words.iter()) {
            if (own & required) != *required {
                return false;
            }
        }
        true
    }

    /// Returns `true` if no component bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Returns a copy of this mask with `component_id` added.
    #[inline]
    pub fn with(mut self, component_id: ComponentID) -> Mask {
        self.set(component_id);
        self
    }

    /// Returns a copy of this mask with `component_id` removed.
    #[inline]
    pub fn without(mut self, component_id: ComponentID) -> Mask {
        self.clear(component_id);
        self
    }

    /// Iterates over all component IDs set in this mask, in ascending order.
    pub fn iterate_over_components(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((base + tz) as ComponentID)
            })
        })
    }
}

/// Builds a component mask from a list of component IDs.
pub fn build_mask(component_ids: &[ComponentID]) -> Mask {
    let mut mask = Mask::default();
    for &component_id in component_ids {
        mask.set(component_id);
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_set_clear_has() {
        let mut mask = Mask::default();
        assert!(!mask.has(3));
        mask.set(3);
        assert!(mask.has(3));
        mask.clear(3);
        assert!(!mask.has(3));
        assert!(mask.is_empty());
    }

    #[test]
    fn mask_superset_and_iteration() {
        let small = build_mask(&[1, 5]);
        let large = build_mask(&[1, 5, 9]);
        assert!(large.contains_all(&small));
        assert!(!small.contains_all(&large));

        let ids: Vec<ComponentID> = large.iterate_over_components().collect();
        assert_eq!(ids, vec![1, 5, 9]);
    }

    #[test]
    fn mask_highest_bit_is_addressable() {
        let mut mask = Mask::default();
        mask.set((MASK_CAP - 1) as ComponentID);
        assert!(mask.has((MASK_CAP - 1) as ComponentID));
    }
}
