//! System abstractions and the ordered system registry.
//!
//! A **system** is a unit of per-frame logic that operates on the entity
//! manager through its query interface. The [`SystemManager`] keeps one
//! instance per distinct system type, in registration order, and ticks them
//! sequentially once per [`update`](SystemManager::update) call — there is
//! no parallelism and no reordering.

use std::any::{type_name, TypeId};

use log::trace;

use crate::engine::error::{EcsError, EcsResult};
use crate::engine::manager::EntityManager;

/// A unit of per-frame logic invoked once per scheduler tick.
///
/// Systems hold whatever state they need; the registry is only aware of
/// their type identity.
pub trait System: 'static {
    /// Executes one tick of this system's logic.
    fn update(&mut self, entities: &mut EntityManager, elapsed_time: f32);
}

struct SystemEntry {
    type_id: TypeId,
    name: &'static str,
    system: Box<dyn System>,
}

/// Insertion-ordered registry of system instances, keyed by type identity.
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<SystemEntry>,
}

impl SystemManager {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn position<S: System>(&self) -> Option<usize> {
        let type_id = TypeId::of::<S>();
        self.systems.iter().position(|entry| entry.type_id == type_id)
    }

    /// Registers a default-constructed instance of `S` at the end of the
    /// update order.
    ///
    /// Fails with [`EcsError::DuplicateSystem`] if `S` is already
    /// registered.
    pub fn add<S: System + Default>(&mut self) -> EcsResult<()> {
        self.add_system(S::default())
    }

    /// Registers a pre-built system instance at the end of the update
    /// order.
    ///
    /// Fails with [`EcsError::DuplicateSystem`] if a system of the same
    /// type is already registered.
    pub fn add_system<S: System>(&mut self, system: S) -> EcsResult<()> {
        if self.position::<S>().is_some() {
            return Err(EcsError::DuplicateSystem {
                system: type_name::<S>(),
            });
        }
        self.systems.push(SystemEntry {
            type_id: TypeId::of::<S>(),
            name: type_name::<S>(),
            system: Box::new(system),
        });
        Ok(())
    }

    /// Unregisters the system of type `S`.
    ///
    /// Fails with [`EcsError::SystemNotFound`] if absent. Update order of
    /// the remaining systems is preserved.
    pub fn remove<S: System>(&mut self) -> EcsResult<()> {
        match self.position::<S>() {
            Some(index) => {
                self.systems.remove(index);
                Ok(())
            }
            None => Err(EcsError::SystemNotFound {
                system: type_name::<S>(),
            }),
        }
    }

    /// Returns `true` if a system of type `S` is registered.
    pub fn exists<S: System>(&self) -> bool {
        self.position::<S>().is_some()
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no systems are registered.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Invokes every registered system's update, in registration order,
    /// synchronously, once each.
    pub fn update(&mut self, entities: &mut EntityManager, elapsed_time: f32) {
        for entry in &mut self.systems {
            trace!("running system {}", entry.name);
            entry.system.update(entities, elapsed_time);
        }
    }
}
