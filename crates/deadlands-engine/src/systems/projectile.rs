//! Projectile lifetime countdown.

use deadlands_ecs::components::Projectile;
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::World;

use super::System;

/// Counts every projectile's `lifetime` down and removes it at zero.
#[derive(Debug, Default)]
pub struct ProjectileSystem;

impl ProjectileSystem {
    pub const NAME: &'static str = "projectile";

    pub fn new() -> Self {
        Self
    }
}

impl System for ProjectileSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let mut expired: Vec<EntityId> = Vec::new();
        let ids: Vec<EntityId> = world.stores().projectile.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(projectile) = world.get_mut::<Projectile>(id) {
                projectile.lifetime -= dt;
                if projectile.lifetime <= 0.0 {
                    expired.push(id);
                }
            }
        }
        for id in expired {
            world.remove_entity(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadlands_ecs::bus::EventBus;
    use deadlands_ecs::components::ProjectileKind;
    use deadlands_ecs::world::EntityBundle;

    #[test]
    fn removes_at_zero() {
        let mut world = World::new(EventBus::new());
        let p = world.add_entity(EntityBundle::new().with(Projectile {
            damage: 1.0,
            source_id: None,
            speed: 1.0,
            lifetime: 0.5,
            kind: ProjectileKind::Bullet,
        }));
        let mut system = ProjectileSystem::new();
        system.update(&mut world, 0.25);
        assert!(world.contains(p));
        system.update(&mut world, 0.25);
        assert!(!world.contains(p));
    }
}
