//! Deadlands Engine -- frame scheduler, simulation systems and entity
//! factories for the Deadlands survival simulation.
//!
//! This crate builds on [`deadlands_ecs`]. An [`Engine`](engine::Engine)
//! owns the world and the event bus and runs the registered systems once per
//! frame. Time, input and drawing are host boundaries: a [`Clock`](clock::Clock),
//! an [`InputProvider`](input::InputProvider) and a
//! [`RenderTarget`](render::RenderTarget).
//!
//! # Quick Start
//!
//! ```
//! use deadlands_engine::prelude::*;
//!
//! let clock = ManualClock::new();
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     Box::new(clock.clone()),
//!     Box::new(NoInput),
//!     Box::new(NullTarget::new(1280.0, 720.0)),
//! )
//! .unwrap();
//! engine.install_default_systems(Box::new(StaticImageLoader::default()));
//! engine.start();
//!
//! clock.advance(0.016);
//! assert!(engine.run_frame());
//! ```

#![deny(unsafe_code)]

pub mod camera;
pub mod clock;
pub mod config;
pub mod engine;
pub mod factory;
pub mod input;
pub mod render;
pub mod settings;
pub mod systems;

/// Re-export the ECS crate for convenience.
pub use deadlands_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when building an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The render target reported a size that cannot be drawn to.
    #[error("render target size {width}x{height} is not usable")]
    UnusableRenderTarget { width: f64, height: f64 },

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use deadlands_ecs::prelude::*;

    pub use crate::camera::{CameraRig, CameraView, Rect};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::engine::{Engine, EngineState, FrameDiagnostics};
    pub use crate::input::{InputProvider, InputState, Key, NoInput, ScriptedInput};
    pub use crate::render::{NullTarget, RecordingTarget, RenderFrame, RenderTarget, SpriteDraw};
    pub use crate::settings::Settings;
    pub use crate::systems::sprite_loader::{ImageInfo, StaticImageLoader};
    pub use crate::systems::{ImageCache, ImageLoader, System};
    pub use crate::EngineError;
}
