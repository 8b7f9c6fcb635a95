use std::collections::VecDeque;

use crate::engine::error::invariant;
use crate::engine::types::{
    EntityID, GroupID, IndexID, SlotID, VersionID, INDEX_BITS, INDEX_MASK,
};

/// Generation-tagged entity handle, packed as `generation << 32 | index`.
///
/// A handle never points at memory; it is validated against the
/// [`EntityDirectory`] on every dereference, so a stale handle always fails
/// instead of reading a reused slot.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity(pub EntityID);

#[inline]
const fn make_id(index: IndexID, generation: VersionID) -> EntityID {
    ((generation as EntityID) << INDEX_BITS) | (index as EntityID)
}

#[inline]
fn make_entity(index: IndexID, generation: VersionID) -> Entity {
    Entity(make_id(index, generation))
}

impl Entity {
    /// Stable directory index of this entity.
    #[inline]
    pub fn index(self) -> IndexID {
        (self.0 & INDEX_MASK) as IndexID
    }

    /// Generation this handle was issued at.
    #[inline]
    pub fn generation(self) -> VersionID {
        (self.0 >> INDEX_BITS) as VersionID
    }
}

/// Current placement of a live entity: its group and its dense slot within
/// that group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityLocation {
    /// Group the entity currently belongs to.
    pub group: GroupID,
    /// Dense slot within the group.
    pub slot: SlotID,
}

/// Maps stable entity indices to their current group placement and tracks
/// the generation counter used to detect stale handles.
///
/// Freed indices are recycled in the order they were freed; a freed index's
/// generation is incremented before reuse, so at most one live
/// `(index, generation)` pair exists per index at any instant.
#[derive(Default)]
pub struct EntityDirectory {
    generations: Vec<VersionID>,
    alive: Vec<bool>,
    locations: Vec<EntityLocation>,
    free_store: VecDeque<IndexID>,
    live: usize,
}

impl EntityDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an index (reusing the free list, else extending) and
    /// returns a handle at the index's current generation.
    pub fn allocate(&mut self, location: EntityLocation) -> Entity {
        let index = match self.free_store.pop_front() {
            Some(index) => index,
            None => {
                invariant(
                    self.generations.len() < INDEX_MASK as usize,
                    "entity index space exhausted",
                );
                let index = self.generations.len() as IndexID;
                self.generations.push(0);
                self.alive.push(false);
                self.locations.push(EntityLocation::default());
                index
            }
        };

        let i = index as usize;
        self.alive[i] = true;
        self.locations[i] = location;
        self.live += 1;
        make_entity(index, self.generations[i])
    }

    /// Invalidates `entity`, bumping its slot generation and returning the
    /// index to the free list. Returns `false` for stale handles.
    pub fn release(&mut self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        match self.generations.get_mut(index) {
            Some(generation)
                if *generation == entity.generation()
                    && self.alive.get(index).copied().unwrap_or(false) =>
            {
                *generation = generation.wrapping_add(1);
                self.alive[index] = false;
                self.locations[index] = EntityLocation::default();
                self.free_store.push_back(entity.index());
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `entity` refers to a live index at its current
    /// generation.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        index < self.generations.len()
            && self.alive.get(index).copied().unwrap_or(false)
            && self.generations[index] == entity.generation()
    }

    /// Returns the current placement of `entity`, or `None` for stale
    /// handles.
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        if self.is_alive(entity) {
            Some(self.locations[entity.index() as usize])
        } else {
            None
        }
    }

    /// Rewrites the placement of a live entity (used when compaction moves
    /// it to another slot, or migration to another group).
    pub fn set_location(&mut self, entity: Entity, location: EntityLocation) {
        debug_assert!(
            self.is_alive(entity),
            "set_location called on a dead or stale entity: {:?}",
            entity
        );
        let index = entity.index() as usize;
        if index < self.locations.len() {
            self.locations[index] = location;
        }
    }

    /// Number of live entities.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Returns the live handle at `index`, if any.
    pub fn entity_at(&self, index: IndexID) -> Option<Entity> {
        let i = index as usize;
        if self.alive.get(i).copied().unwrap_or(false) {
            Some(make_entity(index, self.generations[i]))
        } else {
            None
        }
    }
}
