//! Sprite-sheet frame selection.

use std::f64::consts::FRAC_PI_4;

use deadlands_ecs::component::ComponentKind;
use deadlands_ecs::components::Sprite;
use deadlands_ecs::world::World;

use crate::config::EngineConfig;

use super::System;

/// Rows a sheet needs before it is treated as one row per heading.
pub const DIRECTION_ROWS: u32 = 8;

/// One of eight headings for a velocity, counted from +x toward +y in
/// 45 degree steps.
pub fn direction_bucket(dx: f64, dy: f64) -> u32 {
    let bucket = (dy.atan2(dx) / FRAC_PI_4).round() as i64;
    bucket.rem_euclid(8) as u32
}

/// Advance `sprite` by `dt` while it moves at `speed` along `(dx, dy)`.
///
/// Below `idle_threshold` the sprite rests on frame 0 with its timer reset.
/// Otherwise the frame steps every `frame_duration` seconds, wrapping for
/// looping sprites and holding the last column for the rest.
pub fn animate(sprite: &mut Sprite, dx: f64, dy: f64, dt: f64, idle_threshold: f64) {
    let speed = dx.hypot(dy);
    if speed < idle_threshold {
        sprite.animation_timer = 0.0;
        sprite.frame = 0;
        return;
    }
    if sprite.rows >= DIRECTION_ROWS {
        sprite.direction_row = direction_bucket(dx, dy);
    }
    let columns = sprite.columns.max(1);
    if sprite.frame_duration <= 0.0 || columns == 1 {
        return;
    }
    sprite.animation_timer += dt;
    while sprite.animation_timer >= sprite.frame_duration {
        sprite.animation_timer -= sprite.frame_duration;
        sprite.frame = if sprite.looping {
            (sprite.frame + 1) % columns
        } else {
            (sprite.frame + 1).min(columns - 1)
        };
    }
}

/// Animates every entity with a sprite and a velocity.
pub struct AnimationSystem {
    idle_threshold: f64,
}

impl AnimationSystem {
    pub const NAME: &'static str = "animation";

    pub fn new(config: &EngineConfig) -> Self {
        Self {
            idle_threshold: config.idle_speed_threshold,
        }
    }
}

impl System for AnimationSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let animated = world.query(&[ComponentKind::Sprite, ComponentKind::Velocity]);
        let stores = world.stores_mut();
        for id in animated {
            let Some(v) = stores.velocity.get(id).copied() else {
                continue;
            };
            if let Some(sprite) = stores.sprite.get_mut(id) {
                animate(sprite, v.dx, v.dy, dt, self.idle_threshold);
            }
        }
    }
}
