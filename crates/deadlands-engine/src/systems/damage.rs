//! Pending damage application and death handling.

use deadlands_ecs::bus::EventBus;
use deadlands_ecs::component::ComponentKind;
use deadlands_ecs::components::{
    Ability, Damage, Enemy, EnemyProfile, Health, ObstacleKind, Player, Position,
};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::events::{EnemyKilled, GameEvent, PlayerKilled};
use deadlands_ecs::world::World;

use crate::config::EngineConfig;
use crate::factory;
use crate::settings::{ObstaclePreset, SpriteSettings};

use super::System;

/// Consumes every pending [`Damage`] on a Health-bearing entity.
///
/// The component is removed as it is applied, so running the system again
/// without new damage changes nothing. Hit points are clamped at zero.
///
/// At zero hit points:
/// - the player is kept and `playerKilled` is published once;
/// - an enemy is removed, `enemyKilled` is published, and it drops an XP orb
///   (plus a toxic puddle if its variant has that ability);
/// - anything else with Health is removed.
pub struct DamageSystem {
    bus: EventBus,
    loot_ttl: f64,
    loot_sprite: SpriteSettings,
    puddle: Option<ObstaclePreset>,
}

struct Kill {
    entity: EntityId,
    source: Option<EntityId>,
    position: Position,
    enemy: Option<Enemy>,
    variant_id: Option<String>,
    leaves_puddle: bool,
}

impl DamageSystem {
    pub const NAME: &'static str = "damage";

    pub fn new(config: &EngineConfig, bus: EventBus) -> Self {
        Self {
            bus,
            loot_ttl: config.progression.loot_ttl,
            loot_sprite: config.settings.loot_sprite.clone(),
            puddle: config
                .settings
                .obstacles
                .get(ObstacleKind::ToxicPuddle)
                .cloned(),
        }
    }

    fn handle_kill(&self, world: &mut World, kill: Kill) {
        match kill.enemy {
            Some(enemy) => {
                world.remove_entity(kill.entity);
                tracing::debug!(
                    entity = %kill.entity,
                    variant = kill.variant_id.as_deref().unwrap_or("?"),
                    "enemy killed"
                );
                self.bus.emit(GameEvent::EnemyKilled(EnemyKilled {
                    entity: kill.entity,
                    source_id: kill.source,
                    xp_reward: enemy.xp_reward,
                    variant_id: kill.variant_id,
                    position: kill.position,
                }));
                if enemy.xp_reward > 0.0 {
                    world.add_entity(factory::loot(
                        enemy.xp_reward,
                        kill.position,
                        self.loot_ttl,
                        &self.loot_sprite,
                    ));
                }
                if kill.leaves_puddle {
                    if let Some(preset) = &self.puddle {
                        world.add_entity(factory::obstacle(preset, kill.position));
                    }
                }
            }
            None => {
                world.remove_entity(kill.entity);
            }
        }
    }
}

impl System for DamageSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, _dt: f64) {
        let targets = world.query(&[ComponentKind::Health, ComponentKind::Damage]);
        let mut kills = Vec::new();

        for id in targets {
            let Some(damage) = world.remove_component::<Damage>(id) else {
                continue;
            };
            if !damage.amount.is_finite() || damage.amount < 0.0 {
                tracing::warn!(entity = %id, amount = damage.amount, "discarding invalid damage");
                continue;
            }
            let Some(health) = world.get_mut::<Health>(id) else {
                continue;
            };
            let was_alive = health.hp > 0.0;
            health.hp = (health.hp - damage.amount).max(0.0);
            if health.hp > 0.0 || !was_alive {
                continue;
            }

            if world.has::<Player>(id) {
                tracing::info!(entity = %id, "player killed");
                self.bus.emit(GameEvent::PlayerKilled(PlayerKilled {
                    entity: id,
                    source_id: damage.source_id,
                }));
                continue;
            }

            let profile = world.get::<EnemyProfile>(id);
            kills.push(Kill {
                entity: id,
                source: damage.source_id,
                position: world.get::<Position>(id).copied().unwrap_or_default(),
                enemy: world.get::<Enemy>(id).cloned(),
                variant_id: profile.map(|p| p.variant_id.clone()),
                leaves_puddle: profile.is_some_and(|p| p.has_ability(Ability::ToxicPuddle)),
            });
        }

        for kill in kills {
            self.handle_kill(world, kill);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use deadlands_ecs::components::{Loot, Obstacle};
    use deadlands_ecs::events::Topic;
    use deadlands_ecs::world::EntityBundle;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (World, DamageSystem, Rc<RefCell<Vec<GameEvent>>>) {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for topic in [Topic::EnemyKilled, Topic::PlayerKilled] {
            let log = Rc::clone(&log);
            bus.on(topic, move |e| log.borrow_mut().push(e.clone()));
        }
        let system = DamageSystem::new(&EngineConfig::default(), bus.clone());
        (World::new(bus), system, log)
    }

    fn spawn(world: &mut World, variant: &str) -> EntityId {
        let settings = Settings::default();
        world.add_entity(factory::zombie(
            settings.variant(variant).unwrap(),
            1,
            Position::new(40.0, 50.0),
        ))
    }

    #[test]
    fn damage_is_consumed_once() {
        let (mut world, mut system, _) = setup();
        let e = spawn(&mut world, "brute");
        let before = world.get::<Health>(e).unwrap().hp;
        world.insert(e, Damage { amount: 10.0, source_id: None }).unwrap();
        system.update(&mut world, 0.016);
        assert_eq!(world.get::<Health>(e).unwrap().hp, before - 10.0);
        assert!(!world.has::<Damage>(e));
        system.update(&mut world, 0.016);
        assert_eq!(world.get::<Health>(e).unwrap().hp, before - 10.0);
    }

    #[test]
    fn lethal_damage_removes_enemy_and_drops_loot() {
        let (mut world, mut system, log) = setup();
        let e = spawn(&mut world, "walker");
        let bullet = EntityId::new(99, 0);
        world
            .insert(e, Damage { amount: 1_000.0, source_id: Some(bullet) })
            .unwrap();
        system.update(&mut world, 0.016);
        assert!(!world.contains(e));

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        let GameEvent::EnemyKilled(killed) = &log[0] else {
            panic!("expected enemyKilled, got {:?}", log[0]);
        };
        assert_eq!(killed.entity, e);
        assert_eq!(killed.source_id, Some(bullet));
        assert_eq!(killed.variant_id.as_deref(), Some("walker"));
        assert_eq!(killed.position, Position::new(40.0, 50.0));

        let orbs = world.query(&[ComponentKind::Loot]);
        assert_eq!(orbs.len(), 1);
        assert_eq!(world.get::<Loot>(orbs[0]).unwrap().xp, killed.xp_reward);
        assert!(world.query(&[ComponentKind::Obstacle]).is_empty());
    }

    #[test]
    fn toxic_variant_leaves_puddle() {
        let (mut world, mut system, _) = setup();
        let e = spawn(&mut world, "toxic");
        world.insert(e, Damage { amount: 1_000.0, source_id: None }).unwrap();
        system.update(&mut world, 0.016);
        let puddles = world.query(&[ComponentKind::Obstacle]);
        assert_eq!(puddles.len(), 1);
        assert_eq!(
            world.get::<Obstacle>(puddles[0]).unwrap().kind,
            ObstacleKind::ToxicPuddle
        );
    }

    #[test]
    fn player_death_keeps_entity_and_reports_once() {
        let (mut world, mut system, log) = setup();
        let settings = Settings::default();
        let p = world.add_entity(factory::player(&settings.player, Position::new(0.0, 0.0)));
        world.insert(p, Damage { amount: 500.0, source_id: None }).unwrap();
        system.update(&mut world, 0.016);
        assert!(world.contains(p));
        assert_eq!(world.get::<Health>(p).unwrap().hp, 0.0);
        world.insert(p, Damage { amount: 5.0, source_id: None }).unwrap();
        system.update(&mut world, 0.016);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].topic(), Topic::PlayerKilled);
    }

    #[test]
    fn damage_without_health_is_left_alone() {
        let (mut world, mut system, _) = setup();
        let e = world.add_entity(
            EntityBundle::new()
                .with(Position::new(0.0, 0.0))
                .with(Damage { amount: 3.0, source_id: None }),
        );
        system.update(&mut world, 0.016);
        assert!(world.contains(e));
    }
}
