//! Euler integration of velocity into position.

use deadlands_ecs::component::ComponentKind;
use deadlands_ecs::world::World;

use super::System;

/// `position += velocity * speed_factor * dt` for every entity holding both.
///
/// The speed factor comes from live speed effects and is `1` without them.
/// No collision resolution happens here.
#[derive(Debug, Default)]
pub struct MovementSystem;

impl MovementSystem {
    pub const NAME: &'static str = "movement";

    pub fn new() -> Self {
        Self
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let movers = world.query(&[ComponentKind::Position, ComponentKind::Velocity]);
        let stores = world.stores_mut();
        for id in movers {
            let Some(velocity) = stores.velocity.get(id).copied() else {
                continue;
            };
            let factor = stores
                .effects
                .get(id)
                .map_or(1.0, |effects| effects.speed_factor());
            if let Some(position) = stores.position.get_mut(id) {
                position.x += velocity.dx * factor * dt;
                position.y += velocity.dy * factor * dt;
            }
        }
    }
}
