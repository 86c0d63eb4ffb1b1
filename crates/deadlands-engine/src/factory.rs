//! Entity factories.
//!
//! One builder per archetype. Each returns the full [`EntityBundle`] for the
//! archetype, assembled from a settings record; callers add it to the world.

use deadlands_ecs::components::{
    Ai, Attack, Collision, DespawnTimer, Enemy, EnemyProfile, EnemyRangedAttack, Experience,
    Health, Loot, Obstacle, PassiveBonuses, Player, Position, Projectile, ProjectileKind,
    SpawnPoint, SpawnType, Velocity,
};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::EntityBundle;

use crate::config::SpawnConfig;
use crate::settings::{EnemyVariant, ObstaclePreset, PlayerSettings, SpriteSettings};

pub fn player(settings: &PlayerSettings, at: Position) -> EntityBundle {
    EntityBundle::new()
        .with(Player)
        .with(at)
        .with(Velocity::ZERO)
        .with(Health::full(settings.health))
        .with(Collision::circle(settings.radius))
        .with(Attack {
            damage: settings.damage,
            cooldown: settings.attack_cooldown,
            cooldown_timer: 0.0,
        })
        .with(Experience::new(settings.initial_xp_to_next))
        .with(PassiveBonuses::new(
            settings.speed,
            settings.damage,
            settings.attack_cooldown,
        ))
        .with(settings.sprite.to_sprite("player"))
}

/// A regular enemy of `variant`, scaled to `level`.
pub fn zombie(variant: &EnemyVariant, level: u32, at: Position) -> EntityBundle {
    enemy(variant, level, at)
}

/// A boss of `variant`, scaled to `level`. The variant's own `boss` flag is
/// ignored; the entity is always tagged as a boss.
pub fn boss(variant: &EnemyVariant, level: u32, at: Position) -> EntityBundle {
    let mut variant = variant.clone();
    variant.spawn.boss = true;
    enemy(&variant, level, at)
}

fn enemy(variant: &EnemyVariant, level: u32, at: Position) -> EntityBundle {
    let damage = variant.damage.at(level);
    let mut bundle = EntityBundle::new()
        .with(at)
        .with(Velocity::ZERO)
        .with(Health::full(variant.health.at(level)))
        .with(Collision::circle(variant.radius))
        .with(Ai::default())
        .with(Enemy {
            kind: variant.kind(),
            xp_reward: variant.xp_reward.at(level),
            damage,
            speed: variant.speed.at(level),
            aggro_range: variant.aggro_range,
            attack_range: variant.attack_range,
            attack_cooldown: variant.attack_cooldown,
        })
        .with(Attack {
            damage,
            cooldown: variant.attack_cooldown,
            cooldown_timer: 0.0,
        })
        .with(EnemyProfile {
            variant_id: variant.id.clone(),
            display_name: variant.display_name.clone(),
            description: variant.description.clone(),
            tags: variant.tags.clone(),
            abilities: variant.abilities.clone(),
            spawn: variant.spawn.clone(),
        })
        .with(variant.sprite.to_sprite(&variant.id));
    if let Some(ranged) = variant.ranged {
        bundle = bundle.with(EnemyRangedAttack {
            cooldown: ranged.cooldown,
            range: ranged.range,
            projectile_damage: ranged.projectile_damage.at(level),
            projectile_speed: ranged.projectile_speed,
            timer: ranged.cooldown,
        });
    }
    bundle
}

/// Parameters of a projectile about to be fired.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileSpec {
    pub kind: ProjectileKind,
    pub source: Option<EntityId>,
    pub damage: f64,
    pub speed: f64,
    pub range: f64,
    pub radius: f64,
}

/// A projectile at `from` heading at `(dir_x, dir_y)`. The direction need not
/// be normalized; a zero direction fires along +x.
pub fn projectile(
    spec: ProjectileSpec,
    from: Position,
    dir_x: f64,
    dir_y: f64,
    sprite: &SpriteSettings,
) -> EntityBundle {
    let len = dir_x.hypot(dir_y);
    let (ux, uy) = if len > f64::EPSILON {
        (dir_x / len, dir_y / len)
    } else {
        (1.0, 0.0)
    };
    let lifetime = if spec.speed > 0.0 {
        spec.range / spec.speed
    } else {
        0.0
    };
    let name = match spec.kind {
        ProjectileKind::Bullet => "bullet",
        ProjectileKind::Spit => "spit",
    };
    EntityBundle::new()
        .with(from)
        .with(Velocity {
            dx: ux * spec.speed,
            dy: uy * spec.speed,
        })
        .with(Collision::circle(spec.radius))
        .with(Projectile {
            damage: spec.damage,
            source_id: spec.source,
            speed: spec.speed,
            lifetime,
            kind: spec.kind,
        })
        .with(sprite.to_sprite(name))
}

/// An XP orb worth `xp` that disappears after `ttl` seconds.
pub fn loot(xp: f64, at: Position, ttl: f64, sprite: &SpriteSettings) -> EntityBundle {
    EntityBundle::new()
        .with(at)
        .with(Loot { xp })
        .with(DespawnTimer { ttl })
        .with(sprite.to_sprite("xpOrb"))
}

/// An obstacle of `preset`. Presets with a `ttl` also get a despawn timer.
pub fn obstacle(preset: &ObstaclePreset, at: Position) -> EntityBundle {
    let name = serde_json::to_value(preset.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| "obstacle".to_owned());
    let mut bundle = EntityBundle::new()
        .with(at)
        .with(Collision::circle(preset.radius))
        .with(Obstacle {
            width: preset.width,
            height: preset.height,
            kind: preset.kind,
            is_blocking: preset.is_blocking,
            speed_reducing: preset.speed_reducing,
            damaging: preset.damaging,
        })
        .with(preset.sprite.to_sprite(&name));
    if let Some(ttl) = preset.ttl {
        bundle = bundle.with(DespawnTimer { ttl });
    }
    bundle
}

pub fn spawn_point(spawn: &SpawnConfig, at: Position) -> EntityBundle {
    EntityBundle::new().with(at).with(SpawnPoint {
        spawn_type: SpawnType::Zombie,
        radius: spawn.radius,
        interval: spawn.interval,
        max_entities: spawn.max_entities,
        auto_spawn: true,
        timer: 0.0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
