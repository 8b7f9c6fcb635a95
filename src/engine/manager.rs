//! Entity lifecycle, component mutation, and migration orchestration.
//!
//! This module defines [`EntityManager`], the top-level owner of the entity
//! directory, all mask groups, and their component pools. It is the single
//! entry point for:
//!
//! * entity creation and destruction,
//! * component add/set/remove/get,
//! * migration of entities between groups when their mask changes,
//! * bulk iteration over component columns.
//!
//! ## Execution model
//!
//! The manager is single-threaded and cooperative: every operation runs to
//! completion before the next begins, and there is no suspension point
//! anywhere in the core. Contract violations surface immediately as
//! [`EcsError`]; a failed operation leaves the manager exactly as it was.
//!
//! ## Migration
//!
//! Changing an entity's mask from `M` to `M'` resolves (or lazily creates)
//! the group for `M'`, moves every component present in both masks into the
//! destination columns, constructs values only in `M'`, drops values only in
//! `M`, and compacts the vacated source slot by swapping in the group's last
//! entity. The swapped entity's directory entry is patched; handles survive
//! the churn because they reference the stable index, not the slot.
//!
//! ## Reference validity
//!
//! A reference obtained from [`EntityManager::get`] aliases live group
//! storage and is invalidated by the next operation that could migrate or
//! destroy that entity; Rust's borrow rules enforce the re-fetch that the
//! contract requires.

use std::any::{type_name, Any};
use std::collections::HashMap;

use log::{debug, trace};

use crate::engine::component::{component_id_of, Bundle};
use crate::engine::entity::{Entity, EntityDirectory, EntityLocation};
use crate::engine::error::{invariant, EcsError, EcsResult};
use crate::engine::group::Group;
use crate::engine::pool::Pool;
use crate::engine::query::{ComponentBundle, ComponentSet};
use crate::engine::types::{
    build_mask, ComponentID, GroupID, IndexID, Mask, SlotID, BLOCK_CAP, MASK_WORDS,
};

/// Top-level owner of all groups, pools, and the entity directory.
pub struct EntityManager {
    pub(crate) directory: EntityDirectory,
    pub(crate) groups: Vec<Group>,
    mask_map: HashMap<[u64; MASK_WORDS], GroupID>,
}

/// Generates a typed bulk-callback adapter walking the component columns of
/// every matching group block by block, in lockstep.
macro_rules! impl_for_each {
    ($(#[$docs:meta])* $method:ident => $(($type:ident, $pool:ident)),+) => {
        $(#[$docs])*
        pub fn $method<$($type: 'static + Send + Sync),+>(
            &mut self,
            mut f: impl FnMut($(&mut $type),+),
        ) {
            let ids = [$(component_id_of::<$type>()),+];
            let mask = build_mask(&ids);

            for group in &mut self.groups {
                let length = group.len();
                if length == 0 || !group.matches(&mask) {
                    continue;
                }

                let [$($pool),+] = group.pools_many_mut(ids);
                $(
                    let $pool = match $pool.as_any_mut().downcast_mut::<Pool<$type>>() {
                        Some(pool) => pool,
                        None => {
                            invariant(false, "group pool does not match its component type");
                            unreachable!()
                        }
                    };
                )+

                let block_count = (length + BLOCK_CAP - 1) / BLOCK_CAP;
                for block in 0..block_count {
                    let rows = BLOCK_CAP.min(length - block * BLOCK_CAP);
                    $(let $pool = $pool.block_slice_mut(block);)+
                    for row in 0..rows {
                        f($(&mut $pool[row]),+);
                    }
                }
            }
        }
    };
}

impl EntityManager {
    /// Creates an empty manager.
    ///
    /// The group for the empty mask is created up front; entities without
    /// components rest there.
    pub fn new() -> Self {
        let mut manager = Self {
            directory: EntityDirectory::new(),
            groups: Vec::new(),
            mask_map: HashMap::new(),
        };
        manager.get_or_create_group(&Mask::default());
        manager
    }

    /// Resolves the group for `mask`, creating it lazily.
    ///
    /// Groups are assigned monotonically increasing ids; creation order is
    /// the visitation order of queries.
    pub(crate) fn get_or_create_group(&mut self, mask: &Mask) -> GroupID {
        if let Some(&group_id) = self.mask_map.get(&mask.words) {
            return group_id;
        }

        let group_id = self.groups.len() as GroupID;
        invariant(
            self.groups.len() < GroupID::MAX as usize,
            "group id space exhausted",
        );
        debug!("creating group {} for mask {:?}", group_id, mask.words);
        self.mask_map.insert(mask.words, group_id);
        self.groups.push(Group::new(group_id, *mask));
        group_id
    }

    pub(crate) fn location_of(&self, entity: Entity) -> EcsResult<EntityLocation> {
        self.directory
            .location(entity)
            .ok_or(EcsError::InvalidEntity(entity))
    }

    /// Returns mutable references to two distinct groups.
    ///
    /// Relies on slice splitting so source and destination can be mutated
    /// together during migration without violating aliasing rules.
    fn group_pair_mut(
        groups: &mut [Group],
        a: GroupID,
        b: GroupID,
    ) -> (&mut Group, &mut Group) {
        invariant(a != b, "source and destination group must differ");

        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = groups.split_at_mut(high as usize);

        let left = &mut head[low as usize];
        let right = &mut tail[0];

        if a < b {
            (left, right)
        } else {
            (right, left)
        }
    }

    // ── Creation ────────────────────────────────────────────────────────────

    /// Creates an entity with no components, placed in the empty-mask group.
    ///
    /// Indices are reused from the free list in the order they were freed,
    /// else the directory is extended.
    pub fn create(&mut self) -> Entity {
        let group_id = self.get_or_create_group(&Mask::default());
        let slot = self.groups[group_id as usize].len() as SlotID;
        let entity = self.directory.allocate(EntityLocation {
            group: group_id,
            slot,
        });
        self.groups[group_id as usize].push_entity(entity);
        entity
    }

    /// Creates `count` entities; the returned handles match creation order.
    pub fn create_many(&mut self, count: usize) -> Vec<Entity> {
        (0..count).map(|_| self.create()).collect()
    }

    /// Creates an entity directly in the group for the bundle's mask.
    ///
    /// The typed bundle (a tuple of component values, arity 1–4) cannot fail
    /// construction; for the fallible type-erased path see
    /// [`create_from_bundle`](Self::create_from_bundle).
    pub fn create_with<B: ComponentBundle>(&mut self, bundle: B) -> Entity {
        let mask = B::mask();
        let group_id = self.get_or_create_group(&mask);

        let group = &mut self.groups[group_id as usize];
        let slot = bundle.spawn_into(group);
        invariant(
            slot as usize == group.len(),
            "bundle columns disagreed with the group entity list",
        );

        let entity = self.directory.allocate(EntityLocation {
            group: group_id,
            slot,
        });
        self.groups[group_id as usize].push_entity(entity);
        entity
    }

    /// Creates an entity from a type-erased [`Bundle`].
    ///
    /// Fails with [`EcsError::Construction`] if a staged value's dynamic
    /// type does not match its component id. On failure every column already
    /// written for the new entity is rolled back; no entity is allocated and
    /// no group changes size.
    pub fn create_from_bundle(&mut self, bundle: Bundle) -> EcsResult<Entity> {
        let (mask, values) = bundle.into_parts();
        let group_id = self.get_or_create_group(&mask);
        let group = &mut self.groups[group_id as usize];

        let mut spawn_slot: Option<SlotID> = None;
        let mut pushed: Vec<ComponentID> = Vec::with_capacity(values.len());

        for (component_id, value) in values {
            match group.pool_dyn_mut(component_id).push_dyn(value) {
                Ok(slot) => {
                    match spawn_slot {
                        None => spawn_slot = Some(slot),
                        Some(previous) => invariant(
                            previous == slot,
                            "bundle columns disagreed on spawn slot",
                        ),
                    }
                    pushed.push(component_id);
                }
                Err(error) => {
                    // Unwind the columns already written for this entity.
                    for &written in &pushed {
                        let pool = group.pool_dyn_mut(written);
                        let last = (pool.length() - 1) as SlotID;
                        pool.swap_remove_dyn(last);
                    }
                    return Err(EcsError::Construction(error));
                }
            }
        }

        let slot = group.len() as SlotID;
        if let Some(spawned) = spawn_slot {
            invariant(
                spawned == slot,
                "bundle columns disagreed with the group entity list",
            );
        }

        let entity = self.directory.allocate(EntityLocation {
            group: group_id,
            slot,
        });
        self.groups[group_id as usize].push_entity(entity);
        Ok(entity)
    }

    // ── Destruction ─────────────────────────────────────────────────────────

    /// Destroys `entity`, dropping every component value it owns.
    ///
    /// Fails with [`EcsError::InvalidEntity`] if the handle is stale or the
    /// entity was already destroyed. The vacated slot is compacted by
    /// swapping in the group's last entity; the handle's generation is
    /// invalidated for all future use.
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        let location = self.location_of(entity)?;
        let group = &mut self.groups[location.group as usize];

        let mask = *group.mask();
        let mut vacated_fill: Option<Option<SlotID>> = None;
        for component_id in mask.iterate_over_components() {
            let moved_from = group.pool_dyn_mut(component_id).swap_remove_dyn(location.slot);
            match vacated_fill {
                None => vacated_fill = Some(moved_from),
                Some(previous) => invariant(
                    previous == moved_from,
                    "component columns disagreed on swap fill",
                ),
            }
        }

        let moved_entity = group.swap_remove_entity(location.slot);
        if let Some(filled) = vacated_fill {
            invariant(
                filled.is_some() == moved_entity.is_some(),
                "entity list and columns disagreed on swap fill",
            );
        }
        if let Some(moved) = moved_entity {
            self.directory.set_location(moved, location);
        }

        let released = self.directory.release(entity);
        invariant(released, "directory refused to release a located entity");
        trace!("destroyed entity index {}", entity.index());
        Ok(())
    }

    // ── Component mutation ──────────────────────────────────────────────────

    /// Adds component `T`, migrating the entity to the group for
    /// `mask | {T}`.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if `T` is already
    /// present.
    pub fn add<T: 'static + Send + Sync>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        let location = self.location_of(entity)?;
        let component_id = component_id_of::<T>();
        let source_mask = *self.groups[location.group as usize].mask();

        if source_mask.has(component_id) {
            return Err(EcsError::DuplicateComponent {
                component: type_name::<T>(),
            });
        }

        let destination_mask = source_mask.with(component_id);
        self.migrate(entity, location, destination_mask, Some((component_id, Box::new(value))));
        Ok(())
    }

    /// Constructs or overwrites component `T` unconditionally.
    ///
    /// Overwrites in place when present (no group change); migrates as
    /// [`add`](Self::add) when absent.
    pub fn set<T: 'static + Send + Sync>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        let location = self.location_of(entity)?;
        let component_id = component_id_of::<T>();
        let group = &mut self.groups[location.group as usize];

        if group.mask().has(component_id) {
            match group.pool_mut::<T>(component_id).get_mut(location.slot) {
                Some(stored) => {
                    *stored = value;
                    Ok(())
                }
                None => {
                    invariant(false, "directory slot out of pool bounds");
                    unreachable!()
                }
            }
        } else {
            let destination_mask = group.mask().with(component_id);
            self.migrate(entity, location, destination_mask, Some((component_id, Box::new(value))));
            Ok(())
        }
    }

    /// Removes component `T`, dropping its value and migrating the entity to
    /// the group for `mask \ {T}`.
    ///
    /// Fails with [`EcsError::MissingComponent`] if `T` is absent. Removing
    /// the last component leaves the entity alive in the empty-mask group.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: Entity) -> EcsResult<()> {
        let location = self.location_of(entity)?;
        let component_id = component_id_of::<T>();
        let source_mask = *self.groups[location.group as usize].mask();

        if !source_mask.has(component_id) {
            return Err(EcsError::MissingComponent {
                component: type_name::<T>(),
            });
        }

        let destination_mask = source_mask.without(component_id);
        self.migrate(entity, location, destination_mask, None);
        Ok(())
    }

    /// Moves `entity` from its current group to the group for
    /// `destination_mask`.
    ///
    /// Components present in both masks move with the entity; `added` is
    /// appended for a component only in the destination mask; values only in
    /// the source mask are dropped. Every column must agree on the
    /// destination slot and on the swap that fills the vacated source slot —
    /// disagreement is storage corruption and trips the assertion hook.
    fn migrate(
        &mut self,
        entity: Entity,
        location: EntityLocation,
        destination_mask: Mask,
        added: Option<(ComponentID, Box<dyn Any + Send>)>,
    ) {
        let destination_id = self.get_or_create_group(&destination_mask);
        let source_id = location.group;
        let slot = location.slot;

        let (source, destination) =
            Self::group_pair_mut(&mut self.groups, source_id, destination_id);
        let source_mask = *source.mask();

        let mut destination_slot: Option<SlotID> = None;
        let mut vacated_fill: Option<Option<SlotID>> = None;

        for component_id in source_mask.iterate_over_components() {
            let moved_from = if destination_mask.has(component_id) {
                let (dest, moved_from) =
                    Group::move_component_row(source, destination, component_id, slot);
                match destination_slot {
                    None => destination_slot = Some(dest),
                    Some(previous) => invariant(
                        previous == dest,
                        "component columns disagreed on destination slot",
                    ),
                }
                moved_from
            } else {
                source.pool_dyn_mut(component_id).swap_remove_dyn(slot)
            };

            match vacated_fill {
                None => vacated_fill = Some(moved_from),
                Some(previous) => invariant(
                    previous == moved_from,
                    "component columns disagreed on swap fill",
                ),
            }
        }

        if let Some((component_id, value)) = added {
            match destination.pool_dyn_mut(component_id).push_dyn(value) {
                Ok(dest) => match destination_slot {
                    None => destination_slot = Some(dest),
                    Some(previous) => invariant(
                        previous == dest,
                        "component columns disagreed on destination slot",
                    ),
                },
                Err(_) => {
                    invariant(false, "migration value does not match its component pool");
                }
            }
        }

        let moved_entity = source.swap_remove_entity(slot);
        if let Some(filled) = vacated_fill {
            invariant(
                filled.is_some() == moved_entity.is_some(),
                "entity list and columns disagreed on swap fill",
            );
        }
        if let Some(moved) = moved_entity {
            self.directory.set_location(moved, location);
        }

        let destination_entity_slot = destination.push_entity(entity);
        if let Some(dest) = destination_slot {
            invariant(
                dest == destination_entity_slot,
                "entity list and columns disagreed on destination slot",
            );
        }
        self.directory.set_location(
            entity,
            EntityLocation {
                group: destination_id,
                slot: destination_entity_slot,
            },
        );
        trace!(
            "migrated entity index {} from group {} to group {}",
            entity.index(),
            source_id,
            destination_id
        );
    }

    // ── Component access ────────────────────────────────────────────────────

    /// Returns a reference to `entity`'s component `T`.
    ///
    /// The reference aliases live group storage; it stays valid only until
    /// the next operation that could migrate or destroy the entity.
    pub fn get<T: 'static + Send + Sync>(&self, entity: Entity) -> EcsResult<&T> {
        let location = self.location_of(entity)?;
        let component_id = component_id_of::<T>();
        let group = &self.groups[location.group as usize];

        if !group.mask().has(component_id) {
            return Err(EcsError::MissingComponent {
                component: type_name::<T>(),
            });
        }
        match group.pool::<T>(component_id).get(location.slot) {
            Some(value) => Ok(value),
            None => {
                invariant(false, "directory slot out of pool bounds");
                unreachable!()
            }
        }
    }

    /// Returns a mutable reference to `entity`'s component `T`.
    ///
    /// Mutations through it are visible to every subsequent read until the
    /// entity next migrates.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        let location = self.location_of(entity)?;
        let component_id = component_id_of::<T>();
        let group = &mut self.groups[location.group as usize];

        if !group.mask().has(component_id) {
            return Err(EcsError::MissingComponent {
                component: type_name::<T>(),
            });
        }
        match group.pool_mut::<T>(component_id).get_mut(location.slot) {
            Some(value) => Ok(value),
            None => {
                invariant(false, "directory slot out of pool bounds");
                unreachable!()
            }
        }
    }

    /// Returns `true` iff `entity`'s mask is a superset of the component
    /// set `S`.
    ///
    /// Fails with [`EcsError::InvalidEntity`] on a stale handle.
    pub fn has<S: ComponentSet>(&self, entity: Entity) -> EcsResult<bool> {
        let location = self.location_of(entity)?;
        Ok(self.groups[location.group as usize].matches(&S::mask()))
    }

    /// Returns `true` if `entity` is live at the handle's generation.
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.directory.is_alive(entity)
    }

    /// Total number of live entities across all groups.
    pub fn count(&self) -> usize {
        self.directory.live_count()
    }

    /// Returns the live entity at directory `index`, if any.
    ///
    /// For a manager that has seen no destruction, index order equals
    /// creation order.
    pub fn entity_at(&self, index: IndexID) -> Option<Entity> {
        self.directory.entity_at(index)
    }

    // ── Bulk iteration ──────────────────────────────────────────────────────

    /// Streams matching entity handles to `f`, re-validating the current
    /// slot after every call.
    ///
    /// Destroying the entity currently passed to the callback is safe and is
    /// the supported filter-and-remove pattern: the slot is re-examined, so
    /// the entity swapped into it is still visited. Mutating the mask of
    /// *other* matching entities from inside the callback may skip or
    /// double-visit entries and must be avoided.
    pub fn for_each_entity<S: ComponentSet>(
        &mut self,
        mut f: impl FnMut(&mut EntityManager, Entity),
    ) {
        let mask = S::mask();
        let mut group_index = 0;
        while group_index < self.groups.len() {
            if !self.groups[group_index].matches(&mask) {
                group_index += 1;
                continue;
            }

            let mut slot = 0usize;
            while slot < self.groups[group_index].len() {
                let entity = self.groups[group_index].entity_at(slot as SlotID);
                f(self, entity);

                // Advance only if the callback left the entity in place;
                // otherwise the slot now holds a not-yet-visited entity.
                let still_here = self.directory.location(entity).is_some_and(|location| {
                    location.group as usize == group_index && location.slot as usize == slot
                });
                if still_here {
                    slot += 1;
                }
            }
            group_index += 1;
        }
    }

    impl_for_each! {
        /// Invokes `f` once per entity owning component `A`, passing a live
        /// reference into group storage.
        for_each1 => (A, pool_a)
    }

    impl_for_each! {
        /// Invokes `f` once per entity owning components `A` and `B`.
        ///
        /// References are live aliases; copying a value out yields an
        /// independent snapshot. Component order is part of the signature
        /// only — `for_each2::<A, B>` and `for_each2::<B, A>` visit the same
        /// entities.
        for_each2 => (A, pool_a), (B, pool_b)
    }

    impl_for_each! {
        /// Invokes `f` once per entity owning components `A`, `B`, and `C`.
        for_each3 => (A, pool_a), (B, pool_b), (C, pool_c)
    }

    impl_for_each! {
        /// Invokes `f` once per entity owning components `A`, `B`, `C`, and
        /// `D`.
        for_each4 => (A, pool_a), (B, pool_b), (C, pool_c), (D, pool_d)
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
