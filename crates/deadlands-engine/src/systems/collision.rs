//! Circle-vs-circle collision.
//!
//! Broad phase is all pairs over every entity with Position and Collision.
//! Two entities collide when the distance between their circle centers is at
//! most the sum of their radii.
//!
//! Resolved pair shapes:
//!
//! - **projectile vs health**: the target gets (or accumulates) a pending
//!   `Damage` whose `source_id` is the projectile entity itself, and the
//!   projectile is removed. A projectile hits at most once and never its own shooter.
//!   Bullets only hit enemies; spit only hits the player.
//! - **obstacle vs mover** (a non-projectile with Velocity): blocking
//!   obstacles push the mover out along the center line, speed-reducing ones
//!   refresh a `slow` effect, damaging ones refresh a `damageOverTime` effect.
//!
//! Every other overlapping pair is ignored.

use deadlands_ecs::component::ComponentKind;
use deadlands_ecs::components::{
    EffectEntry, EffectKind, Effects, Health, Obstacle, Position, Projectile, ProjectileKind,
};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::World;

use crate::config::EngineConfig;
use crate::settings::ObstaclePresets;

use super::{queue_damage, System};

/// How long an obstacle's slow or poison lingers after the mover leaves it.
const OBSTACLE_EFFECT_LINGER: f64 = 0.5;

/// Whether two circles overlap, boundary inclusive.
pub fn circles_overlap(a: Position, ra: f64, b: Position, rb: f64) -> bool {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let reach = ra + rb;
    dx * dx + dy * dy <= reach * reach
}

#[derive(Debug, Clone, Copy)]
struct Body {
    id: EntityId,
    center: Position,
    radius: f64,
    projectile: Option<Projectile>,
    obstacle: Option<Obstacle>,
    has_health: bool,
    is_enemy: bool,
    is_player: bool,
    is_mover: bool,
}

enum Contact {
    Hit {
        projectile: EntityId,
        target: EntityId,
        damage: f64,
    },
    Obstacle {
        obstacle: EntityId,
        kind: Obstacle,
        mover: EntityId,
        push: (f64, f64),
    },
}

pub struct CollisionSystem {
    presets: ObstaclePresets,
}

impl CollisionSystem {
    pub const NAME: &'static str = "collision";

    pub fn new(config: &EngineConfig) -> Self {
        Self {
            presets: config.settings.obstacles.clone(),
        }
    }

    fn gather(world: &World) -> Vec<Body> {
        let stores = world.stores();
        world
            .query(&[ComponentKind::Position, ComponentKind::Collision])
            .into_iter()
            .filter_map(|id| {
                let position = stores.position.get(id)?;
                let collision = stores.collision.get(id)?;
                let projectile = stores.projectile.get(id).copied();
                Some(Body {
                    id,
                    center: collision.center(position),
                    radius: collision.radius,
                    projectile,
                    obstacle: stores.obstacle.get(id).copied(),
                    has_health: stores.health.get(id).is_some(),
                    is_enemy: stores.enemy.get(id).is_some(),
                    is_player: stores.player.get(id).is_some(),
                    is_mover: projectile.is_none() && stores.velocity.get(id).is_some(),
                })
            })
            .collect()
    }

    /// Whether `projectile` may hit `target`.
    fn can_hit(projectile: &Projectile, target: &Body) -> bool {
        if !target.has_health || target.projectile.is_some() {
            return false;
        }
        if projectile.source_id == Some(target.id) {
            return false;
        }
        match projectile.kind {
            ProjectileKind::Bullet => target.is_enemy,
            ProjectileKind::Spit => target.is_player,
        }
    }

    fn contact(a: &Body, b: &Body) -> Option<Contact> {
        for (shot, target) in [(a, b), (b, a)] {
            if let Some(projectile) = shot.projectile {
                if Self::can_hit(&projectile, target) {
                    return Some(Contact::Hit {
                        projectile: shot.id,
                        target: target.id,
                        damage: projectile.damage,
                    });
                }
            }
        }
        for (solid, mover) in [(a, b), (b, a)] {
            if let (Some(kind), true) = (solid.obstacle, mover.is_mover) {
                let (dx, dy) = (mover.center.x - solid.center.x, mover.center.y - solid.center.y);
                let dist = dx.hypot(dy);
                let overlap = solid.radius + mover.radius - dist;
                let push = if dist > f64::EPSILON {
                    (dx / dist * overlap, dy / dist * overlap)
                } else {
                    (overlap, 0.0)
                };
                return Some(Contact::Obstacle {
                    obstacle: solid.id,
                    kind,
                    mover: mover.id,
                    push,
                });
            }
        }
        None
    }

    fn apply_obstacle(
        &self,
        world: &mut World,
        obstacle: EntityId,
        kind: Obstacle,
        mover: EntityId,
        push: (f64, f64),
    ) {
        if kind.is_blocking {
            if let Some(position) = world.get_mut::<Position>(mover) {
                position.x += push.0;
                position.y += push.1;
            }
        }
        let preset = self.presets.get(kind.kind);
        let mut entries = Vec::new();
        if kind.speed_reducing {
            let slow = preset.map_or(0.3, |p| p.slow);
            entries.push(EffectEntry::new(EffectKind::Slow, slow, OBSTACLE_EFFECT_LINGER, 0.0));
        }
        if kind.damaging && world.has::<Health>(mover) {
            let (per_tick, tick_rate) =
                preset.map_or((1.0, 0.5), |p| (p.damage_per_tick, p.tick_rate));
            entries.push(EffectEntry::new(
                EffectKind::DamageOverTime,
                per_tick,
                OBSTACLE_EFFECT_LINGER,
                tick_rate,
            ));
        }
        if entries.is_empty() {
            return;
        }
        if !world.has::<Effects>(mover) {
            if let Err(err) = world.insert(mover, Effects::default()) {
                tracing::debug!(error = %err, "effect target vanished");
                return;
            }
        }
        if let Some(effects) = world.get_mut::<Effects>(mover) {
            for entry in entries {
                effects.refresh(entry.from_source(obstacle));
            }
        }
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, _dt: f64) {
        let bodies = Self::gather(world);
        let mut consumed: Vec<EntityId> = Vec::new();

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (a, b) = (&bodies[i], &bodies[j]);
                if consumed.contains(&a.id) || consumed.contains(&b.id) {
                    continue;
                }
                if !circles_overlap(a.center, a.radius, b.center, b.radius) {
                    continue;
                }
                match Self::contact(a, b) {
                    Some(Contact::Hit {
                        projectile,
                        target,
                        damage,
                    }) => {
                        tracing::trace!(%projectile, %target, damage, "projectile hit");
                        queue_damage(world, target, damage, Some(projectile));
                        consumed.push(projectile);
                    }
                    Some(Contact::Obstacle {
                        obstacle,
                        kind,
                        mover,
                        push,
                    }) => self.apply_obstacle(world, obstacle, kind, mover, push),
                    None => {}
                }
            }
        }

        for id in consumed {
            world.remove_entity(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use deadlands_ecs::bus::EventBus;
    use deadlands_ecs::components::{
        Collision, Damage, Enemy, EnemyKind, ObstacleKind, Player, Velocity,
    };
    use deadlands_ecs::world::EntityBundle;

    fn system() -> CollisionSystem {
        CollisionSystem::new(&EngineConfig::default())
    }

    fn enemy() -> Enemy {
        Enemy {
            kind: EnemyKind::Zombie,
            xp_reward: 1.0,
            damage: 1.0,
            speed: 1.0,
            aggro_range: 100.0,
            attack_range: 10.0,
            attack_cooldown: 1.0,
        }
    }

    fn bullet(world: &mut World, x: f64, source: Option<EntityId>) -> EntityId {
        world.add_entity(
            EntityBundle::new()
                .with(Position::new(x, 0.0))
                .with(Collision::circle(4.0))
                .with(Projectile {
                    damage: 7.0,
                    source_id: source,
                    speed: 100.0,
                    lifetime: 1.0,
                    kind: ProjectileKind::Bullet,
                }),
        )
    }

    fn target(world: &mut World, x: f64) -> EntityId {
        world.add_entity(
            EntityBundle::new()
                .with(Position::new(x, 0.0))
                .with(Collision::circle(8.0))
                .with(Health::full(20.0))
                .with(enemy()),
        )
    }

    // -- 1. boundary --------------------------------------------------------

    #[test]
    fn contact_boundary_is_inclusive() {
        let mut world = World::new(EventBus::new());
        let p = bullet(&mut world, 0.0, None);
        let t = target(&mut world, 12.0);
        system().update(&mut world, 0.016);
        assert!(!world.contains(p));
        assert_eq!(world.get::<Damage>(t).unwrap().amount, 7.0);

        let mut world = World::new(EventBus::new());
        let p = bullet(&mut world, 0.0, None);
        let t = target(&mut world, 12.01);
        system().update(&mut world, 0.016);
        assert!(world.contains(p));
        assert!(world.get::<Damage>(t).is_none());
    }

    #[test]
    fn offsets_move_the_circle() {
        let a = Collision {
            radius: 1.0,
            offset_x: 10.0,
            offset_y: 0.0,
        };
        let center = a.center(&Position::new(0.0, 0.0));
        assert!(circles_overlap(center, 1.0, Position::new(11.5, 0.0), 1.0));
        assert!(!circles_overlap(Position::new(0.0, 0.0), 1.0, Position::new(11.5, 0.0), 1.0));
    }

    // -- 2. projectile rules -------------------------------------------------

    #[test]
    fn projectile_hits_once_and_damage_accumulates() {
        let mut world = World::new(EventBus::new());
        let t = target(&mut world, 0.0);
        let other = target(&mut world, 1.0);
        bullet(&mut world, 0.0, None);
        bullet(&mut world, 0.0, None);
        system().update(&mut world, 0.016);
        // Two bullets, each consumed by its first hit.
        let total = world.get::<Damage>(t).map_or(0.0, |d| d.amount)
            + world.get::<Damage>(other).map_or(0.0, |d| d.amount);
        assert_eq!(total, 14.0);
        assert!(world.query(&[ComponentKind::Projectile]).is_empty());
    }

    #[test]
    fn projectile_ignores_its_shooter_and_wrong_faction() {
        let mut world = World::new(EventBus::new());
        let shooter = target(&mut world, 0.0);
        let p = bullet(&mut world, 0.0, Some(shooter));
        let player = world.add_entity(
            EntityBundle::new()
                .with(Player)
                .with(Position::new(0.0, 0.0))
                .with(Collision::circle(8.0))
                .with(Health::full(20.0)),
        );
        system().update(&mut world, 0.016);
        assert!(world.contains(p));
        assert!(world.get::<Damage>(shooter).is_none());
        assert!(world.get::<Damage>(player).is_none());
    }

    #[test]
    fn spit_only_hits_player() {
        let mut world = World::new(EventBus::new());
        let zombie = target(&mut world, 0.0);
        let player = world.add_entity(
            EntityBundle::new()
                .with(Player)
                .with(Position::new(30.0, 0.0))
                .with(Collision::circle(8.0))
                .with(Health::full(20.0)),
        );
        let spit = world.add_entity(
            EntityBundle::new()
                .with(Position::new(2.0, 0.0))
                .with(Collision::circle(4.0))
                .with(Projectile {
                    damage: 3.0,
                    source_id: Some(zombie),
                    speed: 1.0,
                    lifetime: 1.0,
                    kind: ProjectileKind::Spit,
                }),
        );
        system().update(&mut world, 0.016);
        assert!(world.contains(spit));
        world.get_mut::<Position>(spit).unwrap().x = 28.0;
        system().update(&mut world, 0.016);
        assert!(!world.contains(spit));
        assert_eq!(world.get::<Damage>(player).unwrap().source_id, Some(spit));
    }

    #[test]
    fn hit_is_credited_to_the_projectile() {
        let mut world = World::new(EventBus::new());
        let shooter = world.add_entity(
            EntityBundle::new()
                .with(Player)
                .with(Position::new(-500.0, 0.0))
                .with(Collision::circle(8.0))
                .with(Health::full(20.0)),
        );
        let p = bullet(&mut world, 0.0, Some(shooter));
        let t = target(&mut world, 12.0);
        system().update(&mut world, 0.016);

        let damage = world.get::<Damage>(t).unwrap();
        assert_eq!(damage.source_id, Some(p));
        assert_ne!(damage.source_id, Some(shooter));
        assert!(!world.contains(p));
    }

    // -- 3. obstacles --------------------------------------------------------

    fn obstacle_at(world: &mut World, kind: ObstacleKind, x: f64) -> EntityId {
        let config = EngineConfig::default();
        let preset = config.settings.obstacles.get(kind).unwrap();
        world.add_entity(crate::factory::obstacle(preset, Position::new(x, 0.0)))
    }

    fn mover(world: &mut World, x: f64) -> EntityId {
        world.add_entity(
            EntityBundle::new()
                .with(Position::new(x, 0.0))
                .with(Velocity { dx: 10.0, dy: 0.0 })
                .with(Collision::circle(10.0))
                .with(Health::full(50.0)),
        )
    }

    #[test]
    fn blocking_obstacle_pushes_mover_out() {
        let mut world = World::new(EventBus::new());
        let rock = obstacle_at(&mut world, ObstacleKind::Rock, 0.0);
        let m = mover(&mut world, 20.0);
        let reach = world.get::<Collision>(rock).unwrap().radius + 10.0;
        system().update(&mut world, 0.016);
        let x = world.get::<Position>(m).unwrap().x;
        assert!((x - reach).abs() < 1e-9);
        assert!(!world.has::<Effects>(m));
    }

    #[test]
    fn puddle_refreshes_slow_and_poison() {
        let mut world = World::new(EventBus::new());
        obstacle_at(&mut world, ObstacleKind::ToxicPuddle, 0.0);
        let m = mover(&mut world, 5.0);
        let mut system = system();
        system.update(&mut world, 0.016);
        system.update(&mut world, 0.016);
        let effects = world.get::<Effects>(m).unwrap();
        assert_eq!(effects.entries.len(), 2);
        assert!(effects.entries.iter().any(|e| e.kind == EffectKind::Slow));
        assert!(effects
            .entries
            .iter()
            .any(|e| e.kind == EffectKind::DamageOverTime));
        // Not blocking: the mover stays where it was.
        assert_eq!(world.get::<Position>(m).unwrap().x, 5.0);
    }
}
