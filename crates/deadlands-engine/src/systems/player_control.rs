//! Keyboard movement and auto-fire for the player.

use deadlands_ecs::components::{
    Attack, Collision, Health, PassiveBonuses, Position, ProjectileKind, Velocity,
};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::World;

use crate::config::EngineConfig;
use crate::factory::{self, ProjectileSpec};
use crate::input::{InputState, Key};
use crate::settings::{PlayerSettings, SpriteSettings};

use super::System;

/// Nearest living enemy to `from` within `range`, by collision center.
pub fn nearest_enemy(world: &World, from: Position, range: f64) -> Option<(EntityId, Position)> {
    let stores = world.stores();
    stores
        .enemy
        .iter()
        .filter(|(id, _)| stores.health.get(*id).map_or(false, |h| h.hp > 0.0))
        .filter_map(|(id, _)| {
            let pos = stores.position.get(id)?;
            let center = stores
                .collision
                .get(id)
                .map_or(*pos, |c| c.center(pos));
            let distance = from.distance(&center);
            (distance <= range).then_some((id, center, distance))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(id, center, _)| (id, center))
}

/// Turns the sampled keys into player velocity and fires bullets.
///
/// Speed comes from the player's passive bonuses. When the attack cooldown
/// has run out the player shoots the nearest enemy within bullet range, or
/// along its facing while `Fire` is held. With nothing to shoot the weapon
/// stays ready.
pub struct PlayerControlSystem {
    input: InputState,
    player: PlayerSettings,
    bullet_sprite: SpriteSettings,
    facing: (f64, f64),
}

impl PlayerControlSystem {
    pub const NAME: &'static str = "player_control";

    pub fn new(config: &EngineConfig, input: InputState) -> Self {
        Self {
            input,
            player: config.settings.player.clone(),
            bullet_sprite: config.settings.player.projectile_sprite.clone(),
            facing: (1.0, 0.0),
        }
    }

    fn steer(&mut self, world: &mut World, player: EntityId) {
        let bounds = world.bounds();
        if let Some(pos) = world.get_mut::<Position>(player) {
            let (x, y) = bounds.clamp(pos.x, pos.y);
            pos.x = x;
            pos.y = y;
        }

        let (dx, dy) = self.input.movement();
        if dx != 0.0 || dy != 0.0 {
            self.facing = (dx, dy);
        }
        let speed = world
            .get::<PassiveBonuses>(player)
            .map_or(self.player.speed, PassiveBonuses::effective_movement_speed);
        if let Some(v) = world.get_mut::<Velocity>(player) {
            *v = Velocity {
                dx: dx * speed,
                dy: dy * speed,
            };
        }
    }

    fn fire(&mut self, world: &mut World, player: EntityId, dt: f64) {
        let Some(pos) = world.get::<Position>(player).copied() else {
            return;
        };
        let from = world
            .get::<Collision>(player)
            .map_or(pos, |c| c.center(&pos));
        let Some(attack) = world.get_mut::<Attack>(player) else {
            return;
        };
        attack.cooldown_timer = (attack.cooldown_timer - dt).max(0.0);
        if attack.cooldown_timer > 0.0 {
            return;
        }
        let damage = attack.damage;
        let cooldown = attack.cooldown;

        let direction = match nearest_enemy(world, from, self.player.projectile_range) {
            Some((_, target)) => (target.x - from.x, target.y - from.y),
            None if self.input.is_pressed(Key::Fire) => self.facing,
            None => return,
        };
        if let Some(attack) = world.get_mut::<Attack>(player) {
            attack.cooldown_timer = cooldown;
        }
        let spec = ProjectileSpec {
            kind: ProjectileKind::Bullet,
            source: Some(player),
            damage,
            speed: self.player.projectile_speed,
            range: self.player.projectile_range,
            radius: self.player.projectile_radius,
        };
        world.add_entity(factory::projectile(
            spec,
            from,
            direction.0,
            direction.1,
            &self.bullet_sprite,
        ));
    }
}

impl System for PlayerControlSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let Some(player) = world.player() else {
            return;
        };
        if world.get::<Health>(player).map_or(false, |h| h.hp <= 0.0) {
            if let Some(v) = world.get_mut::<Velocity>(player) {
                *v = Velocity::ZERO;
            }
            return;
        }
        self.steer(world, player);
        self.fire(world, player, dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
