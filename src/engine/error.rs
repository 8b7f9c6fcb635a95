//! Error types and the pluggable assertion hook.
//!
//! Every contract violation the engine can detect is surfaced immediately at
//! the call site as an [`EcsError`]; nothing is retried or deferred, and a
//! failed operation leaves the manager exactly as it was. All variants are
//! ordinary caller-correctable errors, not process-ending states.
//!
//! Internal invariant violations — misaligned component columns, registry
//! overflow, type-confused pools — are a different category: they indicate
//! engine corruption and route through a single assertion primitive that a
//! host may redirect (see [`set_assert_handler`]). The engine never continues
//! past a violated invariant.
//!
//! ## Goals
//! * **Specificity:** each variant models a single failure mode and carries
//!   enough context (entity, component name, type ids) to act on.
//! * **Ergonomics:** everything implements [`std::error::Error`] and
//!   [`fmt::Display`]; `From` conversions support `?` at call sites.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::any::TypeId;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use crate::engine::entity::Entity;

/// Result alias used across the engine surface.
pub type EcsResult<T> = Result<T, EcsError>;

/// Returned when a component value cannot be constructed into its target
/// pool because its dynamic type does not match the registered type of the
/// component id it was supplied under.
///
/// This only arises on the type-erased [`Bundle`](crate::Bundle) path; the
/// typed operations are statically type-correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructionError {
    /// Name of the component type the pool stores.
    pub component: &'static str,

    /// The [`TypeId`] the destination pool declares.
    pub expected: TypeId,

    /// The [`TypeId`] of the value that was provided.
    pub actual: TypeId,
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot construct component {}: expected {:?}, got {:?}",
            self.component, self.expected, self.actual
        )
    }
}

impl std::error::Error for ConstructionError {}

/// Aggregate error for all entity, component, projection, and system
/// registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// A stale or destroyed entity handle was used.
    InvalidEntity(Entity),

    /// `add` was called for a component the entity already owns.
    DuplicateComponent {
        /// Name of the offending component type.
        component: &'static str,
    },

    /// `get` or `remove` was called for a component the entity does not own.
    MissingComponent {
        /// Name of the absent component type.
        component: &'static str,
    },

    /// A typed projection was requested for an entity lacking one of the
    /// required components.
    MissingCapability {
        /// Name of the first missing component type.
        component: &'static str,
    },

    /// A system type was registered twice.
    DuplicateSystem {
        /// Name of the offending system type.
        system: &'static str,
    },

    /// A system type was removed without being registered.
    SystemNotFound {
        /// Name of the absent system type.
        system: &'static str,
    },

    /// A component value could not be constructed from its supplied
    /// type-erased argument.
    Construction(ConstructionError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::InvalidEntity(entity) => {
                write!(
                    f,
                    "stale or destroyed entity reference (index {}, generation {})",
                    entity.index(),
                    entity.generation()
                )
            }
            EcsError::DuplicateComponent { component } => {
                write!(f, "component already present: {component}")
            }
            EcsError::MissingComponent { component } => {
                write!(f, "component not present: {component}")
            }
            EcsError::MissingCapability { component } => {
                write!(f, "projection requires component not present: {component}")
            }
            EcsError::DuplicateSystem { system } => {
                write!(f, "system already registered: {system}")
            }
            EcsError::SystemNotFound { system } => {
                write!(f, "system not registered: {system}")
            }
            EcsError::Construction(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<ConstructionError> for EcsError {
    fn from(e: ConstructionError) -> Self {
        EcsError::Construction(e)
    }
}

/// Handler invoked when an internal engine invariant is violated.
///
/// Receives a human-readable description of the violation.
pub type AssertHandler = fn(&str);

static ASSERT_HANDLER: OnceLock<RwLock<AssertHandler>> = OnceLock::new();

fn assert_handler() -> &'static RwLock<AssertHandler> {
    ASSERT_HANDLER.get_or_init(|| RwLock::new(default_assert_handler))
}

fn default_assert_handler(message: &str) {
    panic!("engine invariant violated: {message}");
}

/// Redirects internal invariant failures to `handler`.
///
/// The engine raises all internal failures through this single seam; a host
/// may redirect it to abort, log, or panic with its own formatting. A
/// handler that returns is followed by a panic regardless — the engine
/// cannot continue past a violated invariant.
pub fn set_assert_handler(handler: AssertHandler) {
    *assert_handler().write().unwrap() = handler;
}

/// Checks an internal invariant, routing failures through the installed
/// assertion handler.
#[inline]
pub(crate) fn invariant(condition: bool, message: &str) {
    if !condition {
        let handler = *assert_handler().read().unwrap();
        handler(message);
        panic!("engine invariant violated: {message}");
    }
}
