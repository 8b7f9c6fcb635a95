//! Mask-filtered views over groups and the tuple traits that drive them.
//!
//! A query is parameterized by a required component set, written as a tuple
//! of component types (arity 1–4). Evaluation enumerates every group whose
//! mask is a superset of the required mask — in group creation order, then
//! slot order within each group — and streams handles or typed projections.
//!
//! ## Consumption modes
//! * **Lazy iteration** — [`View::iter`] / [`View::entities`]: a finite,
//!   lazy sequence over matching groups. The view holds a shared borrow of
//!   the manager, so the sequence cannot observe mutation; the mutating
//!   traversal is [`EntityManager::for_each_entity`].
//! * **Eager count** — [`View::count`] sums matching group sizes without
//!   materializing the sequence.
//! * **Bulk callbacks** — the `for_each1`..`for_each4` adapters on
//!   [`EntityManager`] walk component columns block by block.
//!
//! Visitation order is deterministic for a given history of creations and
//! migrations, but is not guaranteed stable across mutations between two
//! evaluations.

use std::marker::PhantomData;

use crate::engine::component::component_id_of;
use crate::engine::entity::Entity;
use crate::engine::error::invariant;
use crate::engine::facet::Facet;
use crate::engine::group::Group;
use crate::engine::manager::EntityManager;
use crate::engine::types::{build_mask, Mask, SlotID};

/// A set of component types, written as a tuple (`(A,)`, `(A, B)`, ...),
/// used to parameterize queries, capability tests, and projections.
pub trait ComponentSet: 'static {
    /// Returns the mask covering every component in the set, registering
    /// component ids on first reference.
    fn mask() -> Mask;
}

/// A tuple of component values that can spawn an entity directly into the
/// group for its combined mask.
pub trait ComponentBundle: 'static {
    /// Returns the mask implied by the bundle's component types.
    fn mask() -> Mask;

    /// Pushes every value into its column of `group`, returning the common
    /// spawn slot.
    fn spawn_into(self, group: &mut Group) -> SlotID;
}

macro_rules! impl_component_set {
    ($($type:ident),+) => {
        impl<$($type: 'static + Send + Sync),+> ComponentSet for ($($type,)+) {
            fn mask() -> Mask {
                build_mask(&[$(component_id_of::<$type>()),+])
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);

macro_rules! impl_component_bundle {
    ($(($type:ident, $index:tt)),+) => {
        impl<$($type: 'static + Send + Sync),+> ComponentBundle for ($($type,)+) {
            fn mask() -> Mask {
                build_mask(&[$(component_id_of::<$type>()),+])
            }

            fn spawn_into(self, group: &mut Group) -> SlotID {
                let mut spawn_slot: Option<SlotID> = None;
                $(
                    let component_id = component_id_of::<$type>();
                    let slot = group.pool_mut::<$type>(component_id).push(self.$index);
                    match spawn_slot {
                        None => spawn_slot = Some(slot),
                        Some(previous) => invariant(
                            previous == slot,
                            "bundle columns disagreed on spawn slot",
                        ),
                    }
                )+
                spawn_slot.expect("bundles have at least one component")
            }
        }
    };
}

impl_component_bundle!((A, 0));
impl_component_bundle!((A, 0), (B, 1));
impl_component_bundle!((A, 0), (B, 1), (C, 2));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3));

/// A lazy, mask-filtered view over the manager's groups.
///
/// Produced by [`EntityManager::with`] and [`EntityManager::fetch_every`].
pub struct View<'m, S: ComponentSet> {
    manager: &'m EntityManager,
    mask: Mask,
    _required: PhantomData<fn(S)>,
}

impl<'m, S: ComponentSet> View<'m, S> {
    pub(crate) fn new(manager: &'m EntityManager) -> Self {
        Self {
            manager,
            mask: S::mask(),
            _required: PhantomData,
        }
    }

    /// Number of matching entities, evaluated eagerly by summing matching
    /// group sizes.
    pub fn count(&self) -> usize {
        self.manager
            .groups
            .iter()
            .filter(|group| group.matches(&self.mask))
            .map(|group| group.len())
            .sum()
    }

    /// Lazily iterates matching entities as typed projections.
    pub fn iter(&self) -> ViewIter<'m, S> {
        ViewIter {
            manager: self.manager,
            mask: self.mask,
            group_cursor: 0,
            slot_cursor: 0,
            _required: PhantomData,
        }
    }

    /// Lazily iterates matching entity handles.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + 'm {
        self.iter().map(|facet| facet.entity())
    }
}

impl<'m, S: ComponentSet> Clone for View<'m, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'m, S: ComponentSet> Copy for View<'m, S> {}

impl<'m, S: ComponentSet> IntoIterator for View<'m, S> {
    type Item = Facet<'m, S>;
    type IntoIter = ViewIter<'m, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`View`]: groups in creation order, slots in dense order
/// within each group.
pub struct ViewIter<'m, S: ComponentSet> {
    manager: &'m EntityManager,
    mask: Mask,
    group_cursor: usize,
    slot_cursor: usize,
    _required: PhantomData<fn(S)>,
}

impl<'m, S: ComponentSet> Iterator for ViewIter<'m, S> {
    type Item = Facet<'m, S>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let group = self.manager.groups.get(self.group_cursor)?;
            if !group.matches(&self.mask) || self.slot_cursor >= group.len() {
                self.group_cursor += 1;
                self.slot_cursor = 0;
                continue;
            }

            let entity = group.entity_at(self.slot_cursor as SlotID);
            self.slot_cursor += 1;
            return Some(Facet::new(self.manager, entity));
        }
    }
}

impl EntityManager {
    /// Returns a lazy view over every entity whose mask is a superset of
    /// the component set `S`.
    pub fn with<S: ComponentSet>(&self) -> View<'_, S> {
        View::new(self)
    }

    /// Returns a lazy view yielding typed projections for the component set
    /// `S`.
    ///
    /// Identical filtering to [`with`](Self::with); this spelling reads
    /// better when iterating application kinds declared as
    /// [`Facet`](crate::Facet) aliases.
    pub fn fetch_every<S: ComponentSet>(&self) -> View<'_, S> {
        View::new(self)
    }
}
