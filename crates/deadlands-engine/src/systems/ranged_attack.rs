//! Enemy spit attacks.

use deadlands_ecs::components::{Ai, AiState, Collision, Health, Position, ProjectileKind};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::World;

use crate::config::EngineConfig;
use crate::factory::{self, ProjectileSpec};
use crate::settings::SpriteSettings;

use super::System;

const SPIT_RADIUS: f64 = 5.0;

/// Fires a spit projectile at the player whenever an enemy's ranged timer
/// runs out while the player is within range. Out of range, the timer stays
/// expired and the enemy fires as soon as the player comes close.
pub struct EnemyRangedAttackSystem {
    sprite: SpriteSettings,
}

impl EnemyRangedAttackSystem {
    pub const NAME: &'static str = "enemy_ranged_attack";

    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sprite: config.settings.spit_sprite.clone(),
        }
    }
}

impl System for EnemyRangedAttackSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let Some(player) = world.player() else {
            return;
        };
        if world.get::<Health>(player).map_or(true, |h| h.hp <= 0.0) {
            return;
        }
        let Some(target) = world.get::<Position>(player).copied() else {
            return;
        };

        let shooters: Vec<EntityId> = world
            .stores()
            .ranged_attack
            .iter()
            .map(|(id, _)| id)
            .collect();
        let mut shots = Vec::new();

        for id in shooters {
            if world.get::<Ai>(id).is_some_and(|ai| ai.state == AiState::Dead) {
                continue;
            }
            let Some(from) = world.get::<Position>(id).copied() else {
                continue;
            };
            let center = world
                .get::<Collision>(id)
                .map_or(from, |c| c.center(&from));
            let Some(ranged) = world.stores_mut().ranged_attack.get_mut(id) else {
                continue;
            };
            ranged.timer -= dt;
            if ranged.timer > 0.0 || center.distance(&target) > ranged.range {
                continue;
            }
            ranged.timer = ranged.cooldown;
            shots.push((
                ProjectileSpec {
                    kind: ProjectileKind::Spit,
                    source: Some(id),
                    damage: ranged.projectile_damage,
                    speed: ranged.projectile_speed,
                    range: ranged.range,
                    radius: SPIT_RADIUS,
                },
                center,
            ));
        }

        for (spec, from) in shots {
            tracing::debug!(source = ?spec.source, "enemy spit");
            world.add_entity(factory::projectile(
                spec,
                from,
                target.x - from.x,
                target.y - from.y,
                &self.sprite,
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
