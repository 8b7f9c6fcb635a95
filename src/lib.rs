//! # corral
//!
//! Entity-component storage engine built around *mask groups*: every entity
//! carries a bitset of the component types it currently owns, and all
//! entities sharing an identical bitset live together in one group, their
//! component values packed into fixed-capacity cache blocks.
//!
//! ## Design Goals
//! - Group-contiguous storage for cache-efficient iteration
//! - Generation-tagged handles for use-after-destroy safety
//! - Mask-filtered queries that stay correct under compaction
//! - Safe, explicit data access
//!
//! Composition replaces inheritance throughout: runtime objects are built
//! from plain data components, per-frame logic runs as systems over
//! mask-filtered views, and application "kinds" are typed projections
//! ([`Facet`]) over handles rather than subclasses.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core storage types

pub use engine::manager::EntityManager;

pub use engine::entity::{
    Entity,
    EntityDirectory,
    EntityLocation,
};

pub use engine::component::{
    Bundle,
    ComponentDesc,
    ComponentRegistry,
    component_id_of,
    component_name,
    register_component,
};

pub use engine::pool::{AnyPool, Pool};
pub use engine::group::Group;

pub use engine::query::{
    ComponentBundle,
    ComponentSet,
    View,
    ViewIter,
};

pub use engine::facet::{Contains, DefaultFill, Facet};

pub use engine::systems::{System, SystemManager};

pub use engine::error::{
    AssertHandler,
    ConstructionError,
    EcsError,
    EcsResult,
    set_assert_handler,
};

pub use engine::types::{
    build_mask,
    ComponentID,
    GroupID,
    IndexID,
    Mask,
    SlotID,
    VersionID,
    BLOCK_CAP,
    MASK_CAP,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used engine types.
///
/// Import with:
/// ```rust
/// use corral::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        component_id_of,
        Bundle,
        ComponentBundle,
        ComponentSet,
        EcsError,
        EcsResult,
        Entity,
        EntityManager,
        Facet,
        Mask,
        System,
        SystemManager,
        View,
    };
}
