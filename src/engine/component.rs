//! # Component Registry
//!
//! This module provides a global registry that assigns stable
//! [`ComponentID`] values to Rust component types and exposes type-erased
//! pool factories for group column allocation.
//!
//! ## Purpose
//! The registry decouples component type information (`TypeId`, name) from
//! runtime storage, enabling groups to store heterogeneous component columns
//! behind [`AnyPool`].
//!
//! ## Design
//! - Component ids are assigned **lazily on first reference** of a type and
//!   are stable for the lifetime of the process; they are never reclaimed.
//! - The id doubles as the mask bit index and the pool lookup key.
//! - A per-component factory function is stored for constructing empty pool
//!   columns when a group is created for a new mask.
//!
//! ## Invariants
//! - `ComponentID` values are unique, dense, and bounded by [`MASK_CAP`] —
//!   the hard ceiling on distinct component types. Exceeding the ceiling is
//!   an invariant violation, not a recoverable error.
//! - A registered component always has a corresponding pool factory.
//!
//! ## Concurrency
//! The registry is protected by `RwLock` for concurrent reads and serialized
//! writes; the storage engine itself is single-threaded, but type ids are
//! process-wide.

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    sync::{OnceLock, RwLock},
};

use log::debug;

use crate::engine::error::invariant;
use crate::engine::pool::{AnyPool, Pool};
use crate::engine::types::{ComponentID, Mask, MASK_CAP};

/// Factory function for constructing an empty type-erased component pool.
type PoolFactory = fn() -> Box<dyn AnyPool>;

/// Describes a registered component type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentDesc {
    /// Runtime identifier assigned to this component type.
    pub component_id: ComponentID,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the component.
    pub type_id: TypeId,
}

/// Global mapping between Rust component types and compact [`ComponentID`]
/// values, plus the pool factories used to allocate group columns.
pub struct ComponentRegistry {
    next_id: ComponentID,
    by_type: HashMap<TypeId, ComponentID>,
    by_id: Vec<Option<ComponentDesc>>,
    factories: Vec<Option<PoolFactory>>,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn component_registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(ComponentRegistry::new()))
}

fn new_pool_storage<T: 'static + Send + Sync>() -> Box<dyn AnyPool> {
    Box::new(Pool::<T>::default())
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            by_type: HashMap::new(),
            by_id: vec![None; MASK_CAP],
            factories: vec![None; MASK_CAP],
        }
    }

    /// Allocates the next `ComponentID`.
    ///
    /// The ceiling is [`MASK_CAP`]: the mask has one bit per component type,
    /// so the registry can never hand out more ids than the mask can record.
    fn alloc_id(&mut self) -> ComponentID {
        let component_id = self.next_id;
        invariant(
            (component_id as usize) < MASK_CAP,
            "component type capacity exceeded",
        );
        self.next_id = component_id.wrapping_add(1);
        component_id
    }

    /// Registers component type `T` and returns its assigned `ComponentID`.
    ///
    /// If `T` is already registered, returns the existing id. Otherwise a
    /// new id is allocated, the descriptor recorded, and the pool factory
    /// for `T` installed.
    pub fn register<T: 'static + Send + Sync>(&mut self) -> ComponentID {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return existing;
        }

        let id = self.alloc_id();
        self.by_type.insert(type_id, id);
        self.by_id[id as usize] = Some(ComponentDesc {
            component_id: id,
            name: type_name::<T>(),
            type_id,
        });
        self.factories[id as usize] = Some(new_pool_storage::<T>);
        debug!("registered component {} as id {}", type_name::<T>(), id);
        id
    }

    /// Returns the `ComponentID` for `T`, if registered.
    pub fn id_of<T: 'static>(&self) -> Option<ComponentID> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the descriptor for `component_id`, if registered.
    pub fn description(&self, component_id: ComponentID) -> Option<&ComponentDesc> {
        self.by_id
            .get(component_id as usize)
            .and_then(|desc| desc.as_ref())
    }

    fn factory(&self, component_id: ComponentID) -> Option<PoolFactory> {
        self.factories
            .get(component_id as usize)
            .and_then(|factory| *factory)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers component type `T` in the global registry and returns its
/// `ComponentID`.
pub fn register_component<T: 'static + Send + Sync>() -> ComponentID {
    component_registry().write().unwrap().register::<T>()
}

/// Returns the process-wide `ComponentID` for type `T`, registering it on
/// first reference.
pub fn component_id_of<T: 'static + Send + Sync>() -> ComponentID {
    if let Some(id) = component_registry().read().unwrap().id_of::<T>() {
        return id;
    }
    register_component::<T>()
}

/// Returns the type name registered for `component_id`.
pub fn component_name(component_id: ComponentID) -> &'static str {
    component_registry()
        .read()
        .unwrap()
        .description(component_id)
        .map(|desc| desc.name)
        .unwrap_or("<unregistered component>")
}

/// Creates an empty type-erased pool for `component_id`.
///
/// Used by group construction to allocate one column per mask bit.
pub(crate) fn make_empty_pool(component_id: ComponentID) -> Box<dyn AnyPool> {
    match component_registry().read().unwrap().factory(component_id) {
        Some(factory) => factory(),
        None => {
            invariant(false, "no pool factory registered for component id");
            unreachable!()
        }
    }
}

/// Type-erased container of component values for staged entity
/// construction.
///
/// A bundle accumulates `(ComponentID, value)` pairs and the mask they
/// imply; [`EntityManager::create_from_bundle`](crate::EntityManager::create_from_bundle)
/// then spawns an entity directly into the group for that mask. Inserting a
/// component that is already staged replaces its value.
pub struct Bundle {
    mask: Mask,
    values: Vec<(ComponentID, Box<dyn Any + Send>)>,
}

impl Bundle {
    /// Creates an empty bundle.
    #[inline]
    pub fn new() -> Self {
        Self {
            mask: Mask::default(),
            values: Vec::new(),
        }
    }

    /// Clears all staged component values.
    #[inline]
    pub fn clear(&mut self) {
        self.mask = Mask::default();
        self.values.clear();
    }

    /// Stages a component value, replacing any previous value of the same
    /// type.
    pub fn insert<T: 'static + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.insert_boxed(component_id_of::<T>(), Box::new(value))
    }

    /// Stages a type-erased component value under an explicit component id.
    ///
    /// The dynamic type of `value` must match the type registered for
    /// `component_id`; a mismatch surfaces as a
    /// [`ConstructionError`](crate::ConstructionError) when the bundle is
    /// spawned.
    pub fn insert_boxed(
        &mut self,
        component_id: ComponentID,
        value: Box<dyn Any + Send>,
    ) -> &mut Self {
        match self
            .values
            .iter_mut()
            .find(|(existing, _)| *existing == component_id)
        {
            Some(entry) => entry.1 = value,
            None => self.values.push((component_id, value)),
        }
        self.mask.set(component_id);
        self
    }

    /// Unstages the value for component type `T`, if present.
    pub fn remove<T: 'static + Send + Sync>(&mut self) -> &mut Self {
        let component_id = component_id_of::<T>();
        self.values.retain(|(existing, _)| *existing != component_id);
        self.mask.clear(component_id);
        self
    }

    /// Returns the mask implied by the staged components.
    #[inline]
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns `true` if no components are staged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Mask, Vec<(ComponentID, Box<dyn Any + Send>)>) {
        (self.mask, self.values)
    }
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}
