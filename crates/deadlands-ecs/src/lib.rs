//! Deadlands ECS -- entity registry, component storage and event bus for the
//! Deadlands survival simulation.
//!
//! Component kinds form a closed set. Each kind has one column in
//! [`ComponentStores`](component::ComponentStores), indexed by the slot of a
//! generational [`EntityId`](entity::EntityId), so typed access is O(1) and
//! stale handles miss instead of aliasing a recycled slot.
//!
//! # Quick Start
//!
//! ```
//! use deadlands_ecs::prelude::*;
//!
//! let bus = EventBus::new();
//! let mut world = World::new(bus.clone());
//!
//! let entity = world.add_entity(
//!     EntityBundle::new()
//!         .with(Position::new(0.0, 0.0))
//!         .with(Velocity { dx: 1.0, dy: 0.0 }),
//! );
//!
//! assert_eq!(world.query(&[ComponentKind::Position, ComponentKind::Velocity]), vec![entity]);
//! assert!(world.remove_entity(entity));
//! assert!(!world.remove_entity(entity));
//! ```

#![deny(unsafe_code)]

pub mod bus;
pub mod component;
pub mod components;
pub mod entity;
pub mod events;
pub mod terrain;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A bundle was given two components of one kind.
    #[error("duplicate component kind {kind:?} in bundle")]
    DuplicateComponent { kind: component::ComponentKind },
}

/// Errors produced when turning external input into events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("unknown topic '{topic}'")]
    UnknownTopic { topic: String },

    #[error("malformed '{topic}' payload: {details}")]
    MalformedPayload { topic: String, details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bus::{EventBus, HandlerId};
    pub use crate::component::{AnyComponent, Component, ComponentKind, ComponentStores};
    pub use crate::components::*;
    pub use crate::entity::EntityId;
    pub use crate::events::*;
    pub use crate::terrain::{TileKind, TileMap};
    pub use crate::world::{EntityBundle, EntityRef, World, WorldBounds};
    pub use crate::{EcsError, EventError};
}
