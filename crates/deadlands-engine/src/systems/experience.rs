//! XP collection and leveling.
//!
//! Rewards arrive on the `xpCollected` topic, from outside the simulation or
//! from this system's own loot pickup, and wait in a queue until the next
//! update. Each update drains the queue into the target's Experience and then
//! runs the leveling loop, publishing `playerLevelUp` once per level gained.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use deadlands_ecs::bus::{EventBus, HandlerId};
use deadlands_ecs::components::{Experience, PassiveBonuses, Position};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::events::{GameEvent, PlayerLevelUp, Topic, XpCollected};
use deadlands_ecs::world::World;

use crate::config::EngineConfig;

use super::System;

/// Threshold growth for the leveling loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCurve {
    pub growth: f64,
    pub min_xp_to_next: f64,
}

impl LevelCurve {
    fn next_threshold(&self, current: f64) -> f64 {
        (current * self.growth).floor().max(self.min_xp_to_next)
    }
}

/// While `xp >= xp_to_next` (and `xp_to_next > 0`): subtract the threshold,
/// bump the level and grow the threshold. Returns the levels reached, in
/// ascending order.
pub fn apply_level_ups(experience: &mut Experience, curve: LevelCurve) -> Vec<u32> {
    let mut reached = Vec::new();
    while experience.xp_to_next > 0.0 && experience.xp >= experience.xp_to_next {
        experience.xp -= experience.xp_to_next;
        experience.level += 1;
        experience.xp_to_next = curve.next_threshold(experience.xp_to_next);
        reached.push(experience.level);
    }
    reached
}

type XpQueue = Rc<RefCell<VecDeque<XpCollected>>>;

pub struct ExperienceSystem {
    bus: EventBus,
    curve: LevelCurve,
    pickup_radius: f64,
    queue: XpQueue,
    handler: Option<HandlerId>,
}

impl ExperienceSystem {
    pub const NAME: &'static str = "experience";

    pub fn new(config: &EngineConfig, bus: EventBus) -> Self {
        Self {
            bus,
            curve: LevelCurve {
                growth: config.progression.xp_growth,
                min_xp_to_next: config.progression.min_xp_to_next,
            },
            pickup_radius: config.progression.pickup_radius,
            queue: Rc::new(RefCell::new(VecDeque::new())),
            handler: None,
        }
    }

    /// Number of rewards waiting for the next update.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn collect_loot(&self, world: &mut World, collector: EntityId) {
        let Some(at) = world.get::<Position>(collector).copied() else {
            return;
        };
        let radius_sq = self.pickup_radius * self.pickup_radius;
        let picked: Vec<(EntityId, f64)> = world
            .stores()
            .loot
            .iter()
            .filter_map(|(id, loot)| {
                let pos = world.stores().position.get(id)?;
                let (dx, dy) = (pos.x - at.x, pos.y - at.y);
                (dx * dx + dy * dy <= radius_sq).then_some((id, loot.xp))
            })
            .collect();
        for (orb, xp) in picked {
            world.remove_entity(orb);
            self.bus.emit(GameEvent::XpCollected(XpCollected {
                entity: Some(collector),
                amount: xp,
            }));
        }
    }

    fn gain(&self, world: &mut World, target: EntityId, amount: f64) {
        let multiplier = world
            .get::<PassiveBonuses>(target)
            .map_or(1.0, PassiveBonuses::xp_multiplier);
        let Some(experience) = world.get_mut::<Experience>(target) else {
            tracing::warn!(entity = %target, "xp target has no experience; discarding");
            return;
        };
        experience.xp += amount * multiplier;
        let reached = apply_level_ups(experience, self.curve);
        for level in reached {
            tracing::info!(entity = %target, level, "level up");
            self.bus.emit(GameEvent::PlayerLevelUp(PlayerLevelUp {
                entity: target,
                level,
            }));
        }
    }
}

impl System for ExperienceSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, _world: &mut World) {
        let queue = Rc::clone(&self.queue);
        self.handler = Some(self.bus.on(Topic::XpCollected, move |event| {
            let GameEvent::XpCollected(reward) = event else {
                return;
            };
            if !reward.amount.is_finite() || reward.amount <= 0.0 {
                tracing::warn!(amount = reward.amount, "discarding invalid xp reward");
                return;
            }
            queue.borrow_mut().push_back(*reward);
        }));
    }

    fn update(&mut self, world: &mut World, _dt: f64) {
        let player = world.player();
        if let Some(player) = player {
            self.collect_loot(world, player);
        }

        let rewards: Vec<XpCollected> = self.queue.borrow_mut().drain(..).collect();
        for reward in rewards {
            match reward.entity.or(player) {
                Some(target) => self.gain(world, target, reward.amount),
                None => tracing::warn!(amount = reward.amount, "xp reward with no target"),
            }
        }
    }

    fn teardown(&mut self, _world: &mut World) {
        if let Some(id) = self.handler.take() {
            self.bus.off(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;
    use crate::settings::Settings;
    use deadlands_ecs::component::ComponentKind;

    const CURVE: LevelCurve = LevelCurve {
        growth: 1.2,
        min_xp_to_next: 10.0,
    };

    #[test]
    fn leveling_is_a_loop() {
        let mut xp = Experience {
            xp: 250.0,
            level: 1,
            xp_to_next: 100.0,
        };
        let reached = apply_level_ups(&mut xp, CURVE);
        assert_eq!(reached, vec![2, 3]);
        assert_eq!(xp.level, 3);
        assert_eq!(xp.xp, 30.0);
        assert_eq!(xp.xp_to_next, 144.0);
        assert!(xp.xp < xp.xp_to_next);
    }

    #[test]
    fn threshold_is_floored_at_minimum() {
        let mut xp = Experience {
            xp: 5.0,
            level: 1,
            xp_to_next: 4.0,
        };
        apply_level_ups(&mut xp, CURVE);
        assert_eq!(xp.xp_to_next, 10.0);
    }

    #[test]
    fn zero_threshold_never_loops() {
        let mut xp = Experience {
            xp: 1_000.0,
            level: 1,
            xp_to_next: 0.0,
        };
        assert!(apply_level_ups(&mut xp, CURVE).is_empty());
    }

    fn setup() -> (World, ExperienceSystem, EventBus, EntityId) {
        let bus = EventBus::new();
        let mut world = World::new(bus.clone());
        let settings = Settings::default();
        let player = world.add_entity(factory::player(&settings.player, Position::new(0.0, 0.0)));
        let mut system = ExperienceSystem::new(&EngineConfig::default(), bus.clone());
        system.initialize(&mut world);
        (world, system, bus, player)
    }

    #[test]
    fn queued_reward_applies_on_update_with_events() {
        let (mut world, mut system, bus, player) = setup();
        let levels = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&levels);
        bus.on(Topic::PlayerLevelUp, move |e| {
            if let GameEvent::PlayerLevelUp(up) = e {
                l.borrow_mut().push(up.level);
            }
        });

        bus.emit(GameEvent::XpCollected(XpCollected {
            entity: None,
            amount: 250.0,
        }));
        assert_eq!(system.pending(), 1);
        assert_eq!(world.get::<Experience>(player).unwrap().xp, 0.0);

        system.update(&mut world, 0.016);
        assert_eq!(*levels.borrow(), vec![2, 3]);
        assert_eq!(world.get::<Experience>(player).unwrap().level, 3);
    }

    #[test]
    fn invalid_amounts_are_discarded() {
        let (_world, system, bus, _) = setup();
        for amount in [-5.0, 0.0, f64::NAN, f64::INFINITY] {
            bus.emit(GameEvent::XpCollected(XpCollected {
                entity: None,
                amount,
            }));
        }
        assert_eq!(system.pending(), 0);
    }

    #[test]
    fn xp_bonus_multiplies_rewards() {
        let (mut world, mut system, bus, player) = setup();
        world.get_mut::<PassiveBonuses>(player).unwrap().xp_bonus = 0.5;
        bus.emit(GameEvent::XpCollected(XpCollected {
            entity: Some(player),
            amount: 10.0,
        }));
        system.update(&mut world, 0.016);
        assert_eq!(world.get::<Experience>(player).unwrap().xp, 15.0);
    }

    #[test]
    fn nearby_orbs_are_picked_up() {
        let (mut world, mut system, _bus, player) = setup();
        let settings = Settings::default();
        let near = world.add_entity(factory::loot(
            7.0,
            Position::new(10.0, 0.0),
            30.0,
            &settings.loot_sprite,
        ));
        let far = world.add_entity(factory::loot(
            7.0,
            Position::new(500.0, 0.0),
            30.0,
            &settings.loot_sprite,
        ));
        system.update(&mut world, 0.016);
        assert!(!world.contains(near));
        assert!(world.contains(far));
        assert_eq!(world.get::<Experience>(player).unwrap().xp, 7.0);
        assert_eq!(world.query(&[ComponentKind::Loot]).len(), 1);
    }

    #[test]
    fn teardown_unsubscribes() {
        let (mut world, mut system, bus, _) = setup();
        assert_eq!(bus.listener_count(Topic::XpCollected), 1);
        system.teardown(&mut world);
        assert_eq!(bus.listener_count(Topic::XpCollected), 0);
    }
}
