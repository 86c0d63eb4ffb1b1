//! Deadlands Sync -- the boundary between the simulation and the application
//! state a UI renders from.
//!
//! A [`StateMirror`](mirror::StateMirror) listens on the public bus topics and
//! folds every event into a serializable
//! [`MirroredState`](state::MirroredState). In the other direction it
//! publishes the two topics the UI may send: `passiveBonusSelected` and
//! `xpCollected`.
//!
//! # Modules
//!
//! - [`state`]: the mirrored application state and its event reducer.
//! - [`mirror`]: bus subscription and the inbound publishers.
//!
//! # Example
//!
//! ```
//! use deadlands_ecs::prelude::*;
//! use deadlands_sync::mirror::StateMirror;
//!
//! let bus = EventBus::new();
//! let mut world = World::new(bus.clone());
//! let mirror = StateMirror::attach(&bus);
//!
//! let player = world.add_entity(EntityBundle::new().with(Player).with(Position::new(0.0, 0.0)));
//! assert_eq!(mirror.state().player.entity, Some(player));
//! ```

#![deny(unsafe_code)]

pub mod mirror;
pub mod state;

use deadlands_ecs::EventError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced at the sync boundary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Unknown topic or malformed payload.
    #[error(transparent)]
    Event(#[from] EventError),

    /// The topic exists but only the simulation publishes it.
    #[error("topic '{topic}' is not accepted from the application side")]
    NotInbound { topic: String },

    #[error("xp amount must be positive and finite, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("failed to serialize mirrored state: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub use mirror::StateMirror;
pub use state::MirroredState;
