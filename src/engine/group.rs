//! Mask groups: contiguous storage for entities sharing a component mask.
//!
//! ## Purpose
//! A [`Group`] owns the component pools for every entity whose mask equals
//! the group's mask, plus the slot-aligned list of entity handles. Entities
//! are densely packed with swap-remove semantics, so slot indices have no
//! holes and iteration is block-contiguous per component column.
//!
//! ## Invariants
//! - At most one group exists per distinct mask value; every live entity
//!   belongs to exactly the group whose mask equals its own.
//! - Every pool in the group and the entity list report identical lengths;
//!   slot `i` of every column belongs to `entities[i]`.
//! - Pool allocation exactly reflects the mask bits.
//!
//! Removing a slot swaps the last slot into the gap; the displaced entity's
//! directory entry is patched by the caller using the entity returned from
//! the swap-remove. Handles stay valid across this churn because they
//! address the stable directory index, not the slot.

use crate::engine::component::make_empty_pool;
use crate::engine::entity::Entity;
use crate::engine::error::invariant;
use crate::engine::pool::{AnyPool, Pool};
use crate::engine::types::{ComponentID, GroupID, Mask, SlotID, MASK_CAP};

/// Storage for all entities sharing one component mask.
pub struct Group {
    group_id: GroupID,
    mask: Mask,
    entities: Vec<Entity>,
    pools: Vec<Option<Box<dyn AnyPool>>>,
}

impl Group {
    /// Creates an empty group for `mask`, allocating one empty pool per mask
    /// bit from the registered factories. No blocks are allocated yet.
    pub(crate) fn new(group_id: GroupID, mask: Mask) -> Self {
        let mut pools: Vec<Option<Box<dyn AnyPool>>> = (0..MASK_CAP).map(|_| None).collect();
        for component_id in mask.iterate_over_components() {
            pools[component_id as usize] = Some(make_empty_pool(component_id));
        }
        Self {
            group_id,
            mask,
            entities: Vec::new(),
            pools,
        }
    }

    /// Returns the identifier assigned to this group at creation.
    ///
    /// Stable for the lifetime of the manager; group creation order defines
    /// query visitation order.
    #[inline]
    pub fn group_id(&self) -> GroupID {
        self.group_id
    }

    /// Returns the mask shared by every entity in this group.
    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Number of entities currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the group holds no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if this group's mask is a superset of `mask`.
    #[inline]
    pub fn matches(&self, mask: &Mask) -> bool {
        self.mask.contains_all(mask)
    }

    /// Returns the entity occupying `slot`.
    #[inline]
    pub fn entity_at(&self, slot: SlotID) -> Entity {
        self.entities[slot as usize]
    }

    /// Appends `entity` to the slot list, returning its slot.
    ///
    /// Component columns for the slot must be filled by the caller in the
    /// same operation; every pool length must equal the entity count again
    /// once the operation completes.
    pub(crate) fn push_entity(&mut self, entity: Entity) -> SlotID {
        let slot = self.entities.len() as SlotID;
        self.entities.push(entity);
        slot
    }

    /// Removes `slot` from the entity list by swapping in the last entity.
    ///
    /// Returns the entity that now occupies `slot`, if any; the caller must
    /// patch its directory entry.
    pub(crate) fn swap_remove_entity(&mut self, slot: SlotID) -> Option<Entity> {
        invariant(
            (slot as usize) < self.entities.len(),
            "group slot out of bounds",
        );
        self.entities.swap_remove(slot as usize);
        self.entities.get(slot as usize).copied()
    }

    /// Returns the type-erased pool for `component_id`.
    pub(crate) fn pool_dyn(&self, component_id: ComponentID) -> &dyn AnyPool {
        match self
            .pools
            .get(component_id as usize)
            .and_then(|pool| pool.as_deref())
        {
            Some(pool) => pool,
            None => {
                invariant(false, "group has no pool for a component in its mask");
                unreachable!()
            }
        }
    }

    /// Returns the type-erased pool for `component_id`, mutably.
    pub(crate) fn pool_dyn_mut(&mut self, component_id: ComponentID) -> &mut dyn AnyPool {
        match self
            .pools
            .get_mut(component_id as usize)
            .and_then(|pool| pool.as_deref_mut())
        {
            Some(pool) => pool,
            None => {
                invariant(false, "group has no pool for a component in its mask");
                unreachable!()
            }
        }
    }

    /// Returns the typed pool storing component `T`.
    pub fn pool<T: 'static + Send + Sync>(&self, component_id: ComponentID) -> &Pool<T> {
        match self.pool_dyn(component_id).as_any().downcast_ref::<Pool<T>>() {
            Some(pool) => pool,
            None => {
                invariant(false, "group pool does not match its component type");
                unreachable!()
            }
        }
    }

    /// Returns the typed pool storing component `T`, mutably.
    pub fn pool_mut<T: 'static + Send + Sync>(&mut self, component_id: ComponentID) -> &mut Pool<T> {
        match self
            .pool_dyn_mut(component_id)
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
        {
            Some(pool) => pool,
            None => {
                invariant(false, "group pool does not match its component type");
                unreachable!()
            }
        }
    }

    /// Returns mutable borrows of `N` distinct pools at once.
    ///
    /// Used by bulk iteration to walk several component columns of the same
    /// group in lockstep. The ids must be pairwise distinct and present in
    /// the group's mask.
    pub(crate) fn pools_many_mut<const N: usize>(
        &mut self,
        component_ids: [ComponentID; N],
    ) -> [&mut dyn AnyPool; N] {
        for i in 0..N {
            for j in (i + 1)..N {
                invariant(
                    component_ids[i] != component_ids[j],
                    "duplicate component in access set",
                );
            }
        }

        let base = self.pools.as_mut_ptr();
        std::array::from_fn(|k| {
            let index = component_ids[k] as usize;
            invariant(index < MASK_CAP, "component id out of mask capacity");
            // Each index is distinct, so the borrows are disjoint.
            match unsafe { (*base.add(index)).as_deref_mut() } {
                Some(pool) => pool,
                None => {
                    invariant(false, "group has no pool for a component in its mask");
                    unreachable!()
                }
            }
        })
    }

    /// Moves the component row of `component_id` at `slot` from `source`
    /// into `destination`.
    ///
    /// Returns the destination slot the value landed at and the source slot
    /// the displaced last element came from, if a swap occurred.
    pub(crate) fn move_component_row(
        source: &mut Group,
        destination: &mut Group,
        component_id: ComponentID,
        slot: SlotID,
    ) -> (SlotID, Option<SlotID>) {
        let source_pool = source.pool_dyn_mut(component_id);
        let destination_pool = destination.pool_dyn_mut(component_id);
        source_pool.move_slot_to(destination_pool, slot)
    }
}
