//! Frame scheduler.
//!
//! The [`Engine`] owns the [`World`], the [`EventBus`] and the registered
//! systems, and drives them one frame at a time. Each frame:
//!
//! 1. `dt` is taken from the clock and clamped to `[0, max_frame_dt]`.
//! 2. Input is sampled into the shared [`InputState`].
//! 3. Unless paused, every system's `update` runs in registration order.
//! 4. Every system's `apply_deferred` runs, paused or not.
//! 5. The render queue is built and presented.
//!
//! The host calls [`run_frame`](Engine::run_frame) while
//! [`has_pending_frame`](Engine::has_pending_frame) is true.
//!
//! # Example
//!
//! ```
//! use deadlands_engine::prelude::*;
//!
//! let clock = ManualClock::new();
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     Box::new(clock.clone()),
//!     Box::new(NoInput),
//!     Box::new(NullTarget::new(800.0, 600.0)),
//! )
//! .unwrap();
//! engine.install_default_systems(Box::new(StaticImageLoader::default()));
//! engine.start();
//!
//! for _ in 0..10 {
//!     clock.advance(1.0 / 60.0);
//!     engine.run_frame();
//! }
//! assert_eq!(engine.frame_count(), 10);
//! assert!(engine.world().player().is_some());
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use deadlands_ecs::bus::{EventBus, HandlerId};
use deadlands_ecs::components::{Health, Position};
use deadlands_ecs::events::{GameEvent, Topic};
use deadlands_ecs::world::World;
use deadlands_ecs::EventError;

use crate::camera::CameraRig;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::factory;
use crate::input::{InputProvider, InputState, Key};
use crate::render::{build_render_queue, RenderTarget};
use crate::systems::{default_systems, ImageCache, ImageLoader, System, SystemContext};
use crate::EngineError;

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// Lifecycle as reported by [`Engine::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    Paused,
    /// Frozen by `playerKilled`. Only `stop` then `start` leaves it.
    HardPaused,
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing of the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per system update, in execution order. Empty for a
    /// paused frame.
    pub system_times: Vec<(String, Duration)>,
    /// Total time for the frame, render included.
    pub total_time: Duration,
    /// Simulation step handed to the systems.
    pub dt: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    world: World,
    bus: EventBus,
    config: EngineConfig,
    systems: Vec<Box<dyn System>>,
    state: EngineState,
    /// Set by the `playerKilled` handler; cleared only by `start`.
    hard_paused: Rc<Cell<bool>>,
    kill_handler: Option<HandlerId>,
    clock: Box<dyn Clock>,
    input_provider: Box<dyn InputProvider>,
    input: InputState,
    camera: CameraRig,
    images: ImageCache,
    target: Box<dyn RenderTarget>,
    last_time: f64,
    frame_pending: bool,
    frame_count: u64,
    diagnostics: FrameDiagnostics,
    shut_down: bool,
}

fn usable_size((width, height): (f64, f64)) -> bool {
    width > 0.0 && width.is_finite() && height > 0.0 && height.is_finite()
}

impl Engine {
    /// Create a stopped engine with an empty world and no systems.
    ///
    /// Fails when the configuration is invalid or the render target has no
    /// usable size.
    pub fn new(
        config: EngineConfig,
        clock: Box<dyn Clock>,
        input: Box<dyn InputProvider>,
        target: Box<dyn RenderTarget>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let (width, height) = target.size();
        if !usable_size((width, height)) {
            return Err(EngineError::UnusableRenderTarget { width, height });
        }

        let bus = EventBus::new();
        let world = World::new(bus.clone());
        let hard_paused = Rc::new(Cell::new(false));
        let flag = Rc::clone(&hard_paused);
        let kill_handler = bus.on(Topic::PlayerKilled, move |event| {
            if let GameEvent::PlayerKilled(killed) = event {
                tracing::info!(entity = %killed.entity, "player killed; hard pause");
                flag.set(true);
            }
        });

        Ok(Self {
            world,
            bus,
            camera: CameraRig::new(width, height, config.camera.frustum_padding),
            config,
            systems: Vec::new(),
            state: EngineState::Stopped,
            hard_paused,
            kill_handler: Some(kill_handler),
            last_time: clock.now(),
            clock,
            input_provider: input,
            input: InputState::new(),
            images: ImageCache::new(),
            target,
            frame_pending: false,
            frame_count: 0,
            diagnostics: FrameDiagnostics::default(),
            shut_down: false,
        })
    }

    // -- registration -------------------------------------------------------

    /// Register a system and run its `initialize` hook.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, mut system: Box<dyn System>) {
        let name = system.name();
        assert!(
            !self.systems.iter().any(|s| s.name() == name),
            "duplicate system name: {name:?}"
        );
        system.initialize(&mut self.world);
        tracing::debug!(system = name, "system registered");
        self.systems.push(system);
    }

    /// Register the sixteen standard systems in their fixed order.
    pub fn install_default_systems(&mut self, loader: Box<dyn ImageLoader>) {
        let systems = default_systems(
            SystemContext {
                config: &self.config,
                bus: &self.bus,
                input: &self.input,
                camera: &self.camera,
                images: &self.images,
            },
            loader,
        );
        for system in systems {
            self.add_system(system);
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Begin scheduling frames from a stopped engine.
    ///
    /// Clears a hard pause and makes sure a living player exists at the
    /// center of the world. Has no effect unless the engine is stopped.
    pub fn start(&mut self) {
        if self.state != EngineState::Stopped {
            tracing::debug!(state = ?self.state, "start ignored");
            return;
        }
        self.hard_paused.set(false);
        self.ensure_player();
        self.state = EngineState::Running;
        self.last_time = self.clock.now();
        self.frame_pending = true;
        tracing::info!("engine started");
    }

    /// Cancel the pending frame and stop.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.state = EngineState::Stopped;
        self.frame_pending = false;
        tracing::info!("engine stopped");
    }

    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
            tracing::info!("engine paused");
        }
    }

    /// Resume a paused engine. Time spent paused is not simulated. Ignored
    /// while hard-paused.
    pub fn resume(&mut self) {
        if self.state != EngineState::Paused || self.is_hard_paused() {
            return;
        }
        self.state = EngineState::Running;
        self.last_time = self.clock.now();
        tracing::info!("engine resumed");
    }

    pub fn toggle_pause(&mut self) {
        if self.is_hard_paused() {
            tracing::debug!("toggle pause ignored while hard-paused");
            return;
        }
        match self.state {
            EngineState::Running => self.pause(),
            EngineState::Paused => self.resume(),
            EngineState::Stopped | EngineState::HardPaused => {}
        }
    }

    /// Tear down every system in reverse order and stop. Runs once; later
    /// calls do nothing. Also run on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.stop();
        for system in self.systems.iter_mut().rev() {
            system.teardown(&mut self.world);
        }
        if let Some(id) = self.kill_handler.take() {
            self.bus.off(id);
        }
        self.shut_down = true;
        tracing::debug!("engine shut down");
    }

    fn ensure_player(&mut self) {
        if let Some(player) = self.world.player() {
            let alive = self.world.get::<Health>(player).map_or(true, |h| h.hp > 0.0);
            if alive {
                return;
            }
            self.world.remove_entity(player);
        }
        let (x, y) = self.world.bounds().center();
        let player = self.world.add_entity(factory::player(
            &self.config.settings.player,
            Position::new(x, y),
        ));
        tracing::info!(entity = %player, "player spawned");
    }

    // -- frames -------------------------------------------------------------

    /// Run one frame if one is pending. Returns whether a frame ran.
    pub fn run_frame(&mut self) -> bool {
        if !self.frame_pending {
            return false;
        }
        let frame_start = Instant::now();

        let now = self.clock.now();
        let dt = (now - self.last_time).clamp(0.0, self.config.max_frame_dt);
        self.last_time = now;

        self.input.sample(self.input_provider.as_ref());
        if self.input.just_pressed(Key::Pause) {
            self.toggle_pause();
        }

        let advancing = self.state == EngineState::Running && !self.is_hard_paused();
        let mut system_times = Vec::new();
        if advancing {
            system_times.reserve(self.systems.len());
            for system in &mut self.systems {
                let start = Instant::now();
                system.update(&mut self.world, dt);
                system_times.push((system.name().to_owned(), start.elapsed()));
            }
        }
        for system in &mut self.systems {
            system.apply_deferred(&mut self.world);
        }

        self.render();
        self.frame_count += 1;
        self.diagnostics = FrameDiagnostics {
            system_times,
            total_time: frame_start.elapsed(),
            dt: if advancing { dt } else { 0.0 },
        };
        tracing::trace!(
            frame = self.frame_count,
            dt = self.diagnostics.dt,
            total_us = self.diagnostics.total_time.as_micros() as u64,
            "frame"
        );
        self.frame_pending = self.state != EngineState::Stopped;
        true
    }

    /// Run frames until none is pending or `limit` frames ran. Returns the
    /// number of frames run.
    pub fn run_frames(&mut self, limit: u64) -> u64 {
        let mut ran = 0;
        while ran < limit && self.run_frame() {
            ran += 1;
        }
        ran
    }

    fn render(&mut self) {
        let size = self.target.size();
        if usable_size(size) {
            let view = self.camera.view();
            if (view.viewport_width, view.viewport_height) != size {
                self.camera.resize(size.0, size.1);
            }
        }
        let frame = build_render_queue(&self.world, &self.camera, &self.images);
        self.target.present(&frame);
    }

    // -- events -------------------------------------------------------------

    /// Publish `event` and apply the deferred work it queued.
    pub fn publish(&mut self, event: GameEvent) {
        self.bus.emit(event);
        for system in &mut self.systems {
            system.apply_deferred(&mut self.world);
        }
    }

    /// Publish a JSON payload for `topic`. Malformed input is logged and
    /// returned as an error; nothing is applied.
    pub fn publish_json(&mut self, topic: &str, payload: serde_json::Value) -> Result<(), EventError> {
        let event = GameEvent::from_json(topic, payload).map_err(|err| {
            tracing::warn!(topic, error = %err, "discarding external event");
            err
        })?;
        self.publish(event);
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access, for setup and tests.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current state, with a hard pause taking precedence over
    /// running or paused.
    pub fn state(&self) -> EngineState {
        if self.state != EngineState::Stopped && self.is_hard_paused() {
            EngineState::HardPaused
        } else {
            self.state
        }
    }

    pub fn is_running(&self) -> bool {
        self.state != EngineState::Stopped
    }

    /// True while simulation is suspended, by `pause` or by a hard pause.
    pub fn is_paused(&self) -> bool {
        matches!(self.state(), EngineState::Paused | EngineState::HardPaused)
    }

    pub fn is_hard_paused(&self) -> bool {
        self.hard_paused.get()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame_pending
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.diagnostics
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("hard_paused", &self.is_hard_paused())
            .field("frame_count", &self.frame_count)
            .field("systems", &self.system_names())
            .field("entities", &self.world.entity_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
