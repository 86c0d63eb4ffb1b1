//! Timed removal of short-lived entities.

use deadlands_ecs::components::DespawnTimer;
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::World;

use super::System;

/// Counts every [`DespawnTimer`] down and removes its entity at zero.
#[derive(Debug, Default)]
pub struct DespawnSystem;

impl DespawnSystem {
    pub const NAME: &'static str = "despawn";

    pub fn new() -> Self {
        Self
    }
}

impl System for DespawnSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let ids: Vec<EntityId> = world
            .stores()
            .despawn_timer
            .iter()
            .map(|(id, _)| id)
            .collect();
        let mut expired = Vec::new();
        for id in ids {
            if let Some(timer) = world.get_mut::<DespawnTimer>(id) {
                timer.ttl -= dt;
                if timer.ttl <= 0.0 {
                    expired.push(id);
                }
            }
        }
        for id in expired {
            tracing::trace!(entity = %id, "despawn timer expired");
            world.remove_entity(id);
        }
    }
}
