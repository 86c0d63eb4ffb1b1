//! Simulation systems.
//!
//! Each system owns one simulation concern. The engine calls them in
//! registration order once per frame; [`default_systems`] builds the
//! standard order.

use deadlands_ecs::bus::EventBus;
use deadlands_ecs::world::World;

use crate::camera::CameraRig;
use crate::config::EngineConfig;
use crate::input::InputState;

pub mod ai;
pub mod animation;
pub mod camera;
pub mod collision;
pub mod damage;
pub mod despawn;
pub mod effect;
pub mod experience;
pub mod map_generation;
pub mod movement;
pub mod player_control;
pub mod progression;
pub mod projectile;
pub mod ranged_attack;
pub mod spawn;
pub mod sprite_loader;

pub use ai::AiSystem;
pub use animation::AnimationSystem;
pub use camera::CameraSystem;
pub use collision::CollisionSystem;
pub use damage::DamageSystem;
pub use despawn::DespawnSystem;
pub use effect::EffectSystem;
pub use experience::ExperienceSystem;
pub use map_generation::MapGenerationSystem;
pub use movement::MovementSystem;
pub use player_control::PlayerControlSystem;
pub use progression::ProgressionSystem;
pub use projectile::ProjectileSystem;
pub use ranged_attack::EnemyRangedAttackSystem;
pub use spawn::SpawnSystem;
pub use sprite_loader::{ImageCache, ImageLoader, SpriteLoaderSystem};

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// One unit of per-frame simulation.
///
/// Only [`update`](System::update) is required. Handles to the bus, input,
/// and camera are given at construction, never looked up globally.
pub trait System {
    /// Unique name, used for diagnostics and duplicate detection.
    fn name(&self) -> &'static str;

    /// Called once when the system is registered.
    fn initialize(&mut self, _world: &mut World) {}

    /// Advance by `dt` seconds. Not called while the engine is paused.
    fn update(&mut self, world: &mut World, dt: f64);

    /// Apply work queued by bus handlers that must happen even while the
    /// engine is paused. Called every frame after `update` (or in its place
    /// when paused).
    fn apply_deferred(&mut self, _world: &mut World) {}

    /// Called once when the engine shuts down. Systems that subscribed to the
    /// bus unsubscribe here.
    fn teardown(&mut self, _world: &mut World) {}
}

/// Everything the standard systems need at construction.
pub struct SystemContext<'a> {
    pub config: &'a EngineConfig,
    pub bus: &'a EventBus,
    pub input: &'a InputState,
    pub camera: &'a CameraRig,
    pub images: &'a ImageCache,
}

/// The standard systems in their fixed frame order.
pub fn default_systems(ctx: SystemContext<'_>, loader: Box<dyn ImageLoader>) -> Vec<Box<dyn System>> {
    let config = ctx.config;
    vec![
        Box::new(MapGenerationSystem::new(config)),
        Box::new(SpriteLoaderSystem::new(loader, ctx.images.clone())),
        Box::new(PlayerControlSystem::new(config, ctx.input.clone())),
        Box::new(SpawnSystem::new(config, ctx.bus.clone())),
        Box::new(AiSystem::new()),
        Box::new(EnemyRangedAttackSystem::new(config)),
        Box::new(EffectSystem::new()),
        Box::new(MovementSystem::new()),
        Box::new(ProjectileSystem::new()),
        Box::new(CollisionSystem::new(config)),
        Box::new(DamageSystem::new(config, ctx.bus.clone())),
        Box::new(ExperienceSystem::new(config, ctx.bus.clone())),
        Box::new(ProgressionSystem::new(config, ctx.bus.clone())),
        Box::new(DespawnSystem::new()),
        Box::new(AnimationSystem::new(config)),
        Box::new(CameraSystem::new(config, ctx.camera.clone())),
    ]
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Add `amount` to the pending damage of `target`, creating the component if
/// needed. Several hits in one frame accumulate.
pub(crate) fn queue_damage(
    world: &mut World,
    target: deadlands_ecs::entity::EntityId,
    amount: f64,
    source: Option<deadlands_ecs::entity::EntityId>,
) {
    use deadlands_ecs::components::Damage;

    if let Some(pending) = world.get_mut::<Damage>(target) {
        pending.amount += amount;
        if source.is_some() {
            pending.source_id = source;
        }
        return;
    }
    let damage = Damage {
        amount,
        source_id: source,
    };
    if let Err(err) = world.insert(target, damage) {
        tracing::debug!(error = %err, "damage target vanished");
    }
}
