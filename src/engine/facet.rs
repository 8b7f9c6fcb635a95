//! Typed projections: compile-time capability views over entity handles.
//!
//! A [`Facet`] binds a fixed, compile-time-known component set to a handle
//! and exposes accessors for exactly those components. Application "kinds"
//! are facet aliases over component sets rather than subclasses of an
//! entity base type — no inheritance, no virtual dispatch:
//!
//! ```ignore
//! struct Wheels { count: u8 }
//! type Car<'m> = Facet<'m, (Wheels,)>;
//!
//! let car: Car<'_> = manager.facet(entity)?;
//! let wheels: &Wheels = car.get();
//! ```
//!
//! Construction checks the capability once; while the projection is alive it
//! holds a shared borrow of the manager, so the capability cannot be lost
//! underneath it.

use std::marker::PhantomData;

use crate::engine::component::component_name;
use crate::engine::entity::Entity;
use crate::engine::error::{invariant, EcsError, EcsResult};
use crate::engine::manager::EntityManager;
use crate::engine::query::ComponentSet;

/// Marker proving that component `T` is a member of a component-set tuple.
///
/// The `Index` parameter names the member's position so that sets mentioning
/// the same type twice do not produce overlapping impls; it is inferred at
/// call sites (`facet.get::<Wheels, _>()`).
pub trait Contains<T, Index> {}

/// Position marker for the first member of a component set.
pub struct Index0;
/// Position marker for the second member of a component set.
pub struct Index1;
/// Position marker for the third member of a component set.
pub struct Index2;
/// Position marker for the fourth member of a component set.
pub struct Index3;

impl<A> Contains<A, Index0> for (A,) {}

impl<A, B> Contains<A, Index0> for (A, B) {}
impl<A, B> Contains<B, Index1> for (A, B) {}

impl<A, B, C> Contains<A, Index0> for (A, B, C) {}
impl<A, B, C> Contains<B, Index1> for (A, B, C) {}
impl<A, B, C> Contains<C, Index2> for (A, B, C) {}

impl<A, B, C, D> Contains<A, Index0> for (A, B, C, D) {}
impl<A, B, C, D> Contains<B, Index1> for (A, B, C, D) {}
impl<A, B, C, D> Contains<C, Index2> for (A, B, C, D) {}
impl<A, B, C, D> Contains<D, Index3> for (A, B, C, D) {}

/// A component set whose members can all be default-constructed, enabling
/// [`EntityManager::assume`].
pub trait DefaultFill: ComponentSet {
    /// Adds a default-constructed value for every required component the
    /// entity lacks.
    fn fill_missing(manager: &mut EntityManager, entity: Entity) -> EcsResult<()>;
}

macro_rules! impl_default_fill {
    ($($type:ident),+) => {
        impl<$($type: Default + 'static + Send + Sync),+> DefaultFill for ($($type,)+) {
            fn fill_missing(manager: &mut EntityManager, entity: Entity) -> EcsResult<()> {
                $(
                    if !manager.has::<($type,)>(entity)? {
                        manager.add::<$type>(entity, <$type>::default())?;
                    }
                )+
                Ok(())
            }
        }
    };
}

impl_default_fill!(A);
impl_default_fill!(A, B);
impl_default_fill!(A, B, C);
impl_default_fill!(A, B, C, D);

/// Typed capability view over an entity handle for the component set `S`.
pub struct Facet<'m, S: ComponentSet> {
    manager: &'m EntityManager,
    entity: Entity,
    _required: PhantomData<fn(S)>,
}

impl<'m, S: ComponentSet> Facet<'m, S> {
    pub(crate) fn new(manager: &'m EntityManager, entity: Entity) -> Self {
        Self {
            manager,
            entity,
            _required: PhantomData,
        }
    }

    /// The handle this projection is bound to.
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Returns a reference to the bound entity's component `T`.
    ///
    /// `T` must be a member of the projected set `S`; membership is a
    /// compile-time bound, not a runtime test.
    pub fn get<T, I>(&self) -> &T
    where
        S: Contains<T, I>,
        T: 'static + Send + Sync,
    {
        match self.manager.get::<T>(self.entity) {
            Ok(value) => value,
            Err(_) => {
                invariant(false, "facet capability lost while projection was alive");
                unreachable!()
            }
        }
    }
}

impl<'m, S: ComponentSet> Clone for Facet<'m, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'m, S: ComponentSet> Copy for Facet<'m, S> {}

impl EntityManager {
    /// Projects `entity` as a [`Facet`] over the component set `S`.
    ///
    /// Fails with [`EcsError::MissingCapability`] (naming the first missing
    /// component) if the entity lacks any required component, or
    /// [`EcsError::InvalidEntity`] for a stale handle.
    pub fn facet<S: ComponentSet>(&self, entity: Entity) -> EcsResult<Facet<'_, S>> {
        let location = self.location_of(entity)?;
        let required = S::mask();
        let group = &self.groups[location.group as usize];

        if !group.matches(&required) {
            let missing = required
                .iterate_over_components()
                .find(|&component_id| !group.mask().has(component_id));
            return Err(EcsError::MissingCapability {
                component: missing.map(component_name).unwrap_or("<unknown component>"),
            });
        }
        Ok(Facet::new(self, entity))
    }

    /// Returns `true` if `entity` can be projected over `S` — live, with
    /// every required component present. Never fails.
    pub fn can_project<S: ComponentSet>(&self, entity: Entity) -> bool {
        self.directory
            .location(entity)
            .map_or(false, |location| {
                self.groups[location.group as usize].matches(&S::mask())
            })
    }

    /// Projects `entity` over `S`, force-adding any missing required
    /// component default-constructed.
    ///
    /// Unlike [`facet`](Self::facet) this never fails on a missing
    /// capability; only a stale handle is an error.
    pub fn assume<S: DefaultFill>(&mut self, entity: Entity) -> EcsResult<Facet<'_, S>> {
        S::fill_missing(self, entity)?;
        Ok(Facet::new(self, entity))
    }
}
