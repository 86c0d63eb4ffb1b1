//! Timed effects.

use deadlands_ecs::components::{EffectKind, Effects, Health};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::world::World;

use super::{queue_damage, System};

/// Advances every effect entry.
///
/// Damage-over-time and heal-over-time entries act once per `tick_rate`
/// seconds: damage is queued as a pending [`Damage`](deadlands_ecs::components::Damage)
/// so kills go through the damage system, heals are applied directly and
/// capped at max hp. Speed entries are only timed here; movement reads them.
/// Expired entries are pruned and an empty component is removed.
#[derive(Debug, Default)]
pub struct EffectSystem;

impl EffectSystem {
    pub const NAME: &'static str = "effect";

    pub fn new() -> Self {
        Self
    }
}

impl System for EffectSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let ids: Vec<EntityId> = world.stores().effects.iter().map(|(id, _)| id).collect();
        for id in ids {
            let mut damage = 0.0;
            let mut damage_source = None;
            let mut heal = 0.0;

            let Some(effects) = world.get_mut::<Effects>(id) else {
                continue;
            };
            for entry in &mut effects.entries {
                let remaining = (entry.duration - entry.elapsed).max(0.0);
                let step = dt.min(remaining);
                entry.elapsed += dt;
                if !matches!(entry.kind, EffectKind::DamageOverTime | EffectKind::HealOverTime)
                    || entry.tick_rate <= 0.0
                {
                    continue;
                }
                entry.tick_timer += step;
                while entry.tick_timer >= entry.tick_rate {
                    entry.tick_timer -= entry.tick_rate;
                    match entry.kind {
                        EffectKind::DamageOverTime => {
                            damage += entry.value;
                            damage_source = entry.source.or(damage_source);
                        }
                        EffectKind::HealOverTime => heal += entry.value,
                        EffectKind::SpeedBoost | EffectKind::Slow => {}
                    }
                }
            }
            effects.entries.retain(|e| !e.is_expired());
            let empty = effects.entries.is_empty();

            if heal > 0.0 {
                if let Some(health) = world.get_mut::<Health>(id) {
                    if health.hp > 0.0 {
                        health.hp = (health.hp + heal).min(health.max_hp);
                    }
                }
            }
            if damage > 0.0 && world.has::<Health>(id) {
                queue_damage(world, id, damage, damage_source);
            }
            if empty {
                world.remove_component::<Effects>(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadlands_ecs::bus::EventBus;
    use deadlands_ecs::components::{Damage, EffectEntry};
    use deadlands_ecs::world::EntityBundle;

    fn entity_with(world: &mut World, hp: f64, entry: EffectEntry) -> EntityId {
        world.add_entity(
            EntityBundle::new()
                .with(Health { hp, max_hp: 100.0 })
                .with(Effects::with(entry)),
        )
    }

    #[test]
    fn dot_ticks_once_per_tick_rate() {
        let mut world = World::new(EventBus::new());
        let e = entity_with(
            &mut world,
            100.0,
            EffectEntry::new(EffectKind::DamageOverTime, 5.0, 10.0, 0.5),
        );
        let mut system = EffectSystem::new();
        system.update(&mut world, 0.25);
        assert!(world.get::<Damage>(e).is_none());
        system.update(&mut world, 0.25);
        assert_eq!(world.get::<Damage>(e).unwrap().amount, 5.0);
        // A long frame covers several ticks.
        system.update(&mut world, 1.0);
        assert_eq!(world.get::<Damage>(e).unwrap().amount, 15.0);
    }

    #[test]
    fn hot_heals_up_to_max() {
        let mut world = World::new(EventBus::new());
        let e = entity_with(
            &mut world,
            95.0,
            EffectEntry::new(EffectKind::HealOverTime, 10.0, 5.0, 1.0),
        );
        EffectSystem::new().update(&mut world, 1.0);
        assert_eq!(world.get::<Health>(e).unwrap().hp, 100.0);
    }

    #[test]
    fn expired_entries_are_pruned_and_component_removed() {
        let mut world = World::new(EventBus::new());
        let e = entity_with(&mut world, 50.0, EffectEntry::new(EffectKind::Slow, 0.5, 1.0, 0.0));
        world
            .get_mut::<Effects>(e)
            .unwrap()
            .entries
            .push(EffectEntry::new(EffectKind::SpeedBoost, 0.2, 3.0, 0.0));
        let mut system = EffectSystem::new();
        system.update(&mut world, 1.5);
        let effects = world.get::<Effects>(e).unwrap();
        assert_eq!(effects.entries.len(), 1);
        assert_eq!(effects.entries[0].kind, EffectKind::SpeedBoost);
        system.update(&mut world, 2.0);
        assert!(!world.has::<Effects>(e));
    }

    #[test]
    fn ticks_stop_at_duration() {
        let mut world = World::new(EventBus::new());
        let e = entity_with(
            &mut world,
            100.0,
            EffectEntry::new(EffectKind::DamageOverTime, 1.0, 1.0, 0.25),
        );
        EffectSystem::new().update(&mut world, 10.0);
        assert_eq!(world.get::<Damage>(e).unwrap().amount, 4.0);
        assert!(!world.has::<Effects>(e));
    }
}
