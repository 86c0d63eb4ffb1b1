//! Enemy spawning and boss waves.
//!
//! Every auto-spawning [`SpawnPoint`] accumulates time and, once its interval
//! has passed and the number of live non-boss enemies is below its cap,
//! spawns one enemy at a random point of its disk. The variant is drawn from
//! the catalog by weight among the variants eligible at the player's level.
//!
//! Waves advance on a fixed period. On every wave that is a multiple of the
//! boss interval a boss is spawned, unless one is already alive.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use deadlands_ecs::bus::EventBus;
use deadlands_ecs::components::{EnemyKind, Experience, Position, SpawnPoint};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::events::{BossSpawned, GameEvent};
use deadlands_ecs::world::{World, WorldBounds};

use crate::config::{EngineConfig, SpawnConfig};
use crate::factory;
use crate::settings::EnemyVariant;

use super::System;

/// Weighted pick among `variants` eligible at `level`, in declaration order.
///
/// `roll` is a uniform sample in `[0, 1)`. Returns the index into `variants`,
/// or `None` when no variant is eligible.
pub fn choose_variant(variants: &[EnemyVariant], level: u32, boss: bool, roll: f64) -> Option<usize> {
    let eligible: Vec<(usize, f64)> = variants
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_boss() == boss && v.spawn.weight > 0.0 && v.spawn.allows_level(level))
        .map(|(i, v)| (i, v.spawn.weight))
        .collect();
    let total: f64 = eligible.iter().map(|(_, w)| w).sum();
    let mut remaining = roll * total;
    for &(index, weight) in &eligible {
        if remaining < weight {
            return Some(index);
        }
        remaining -= weight;
    }
    eligible.last().map(|&(index, _)| index)
}

pub struct SpawnSystem {
    bus: EventBus,
    rules: SpawnConfig,
    catalog: Vec<EnemyVariant>,
    rng: Pcg32,
    wave: u32,
    wave_timer: f64,
}

impl SpawnSystem {
    pub const NAME: &'static str = "spawn";

    pub fn new(config: &EngineConfig, bus: EventBus) -> Self {
        Self {
            bus,
            rules: config.spawn.clone(),
            catalog: config.settings.enemies.clone(),
            rng: Pcg32::seed_from_u64(config.seed ^ 0x5350_4157),
            wave: 1,
            wave_timer: 0.0,
        }
    }

    /// Current wave, starting at 1.
    pub fn wave(&self) -> u32 {
        self.wave
    }

    fn player_level(world: &World) -> u32 {
        world
            .player()
            .and_then(|p| world.get::<Experience>(p))
            .map_or(1, |xp| xp.level)
    }

    fn count_enemies(world: &World, kind: EnemyKind) -> usize {
        world
            .stores()
            .enemy
            .iter()
            .filter(|(_, enemy)| enemy.kind == kind)
            .count()
    }

    /// Uniform point in the disk of `radius` around `center`, kept in bounds.
    fn disk_point(&mut self, bounds: WorldBounds, center: Position, radius: f64) -> Position {
        let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let r = radius.max(0.0) * self.rng.gen::<f64>().sqrt();
        let (x, y) = bounds.clamp(center.x + r * angle.cos(), center.y + r * angle.sin());
        Position::new(x, y)
    }

    fn advance_waves(&mut self, world: &mut World, dt: f64, level: u32) {
        if self.rules.wave_duration <= 0.0 {
            return;
        }
        self.wave_timer += dt;
        while self.wave_timer >= self.rules.wave_duration {
            self.wave_timer -= self.rules.wave_duration;
            self.wave += 1;
            tracing::debug!(wave = self.wave, "wave advanced");
            if self.rules.boss_wave_interval > 0
                && self.wave % self.rules.boss_wave_interval == 0
                && Self::count_enemies(world, EnemyKind::Boss) == 0
            {
                self.spawn_boss(world, level);
            }
        }
    }

    fn spawn_boss(&mut self, world: &mut World, level: u32) {
        let roll = self.rng.gen::<f64>();
        let Some(index) = choose_variant(&self.catalog, level, true, roll) else {
            tracing::warn!(level, "no boss variant eligible");
            return;
        };
        let points: Vec<EntityId> = world.stores().spawn_point.iter().map(|(id, _)| id).collect();
        let center = if points.is_empty() {
            let (x, y) = world.bounds().center();
            Position::new(x, y)
        } else {
            let pick = points[self.rng.gen_range(0..points.len())];
            world.get::<Position>(pick).copied().unwrap_or_default()
        };
        let at = self.disk_point(world.bounds(), center, self.rules.radius);
        let variant = &self.catalog[index];
        let entity = world.add_entity(factory::boss(variant, level, at));
        tracing::info!(entity = %entity, variant = %variant.id, wave = self.wave, "boss spawned");
        self.bus.emit(GameEvent::BossSpawned(BossSpawned {
            entity,
            variant_id: variant.id.clone(),
            wave: self.wave,
            position: at,
        }));
    }
}

impl System for SpawnSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        let level = Self::player_level(world);
        self.advance_waves(world, dt, level);

        let points: Vec<EntityId> = world.stores().spawn_point.iter().map(|(id, _)| id).collect();
        let mut live = Self::count_enemies(world, EnemyKind::Zombie);

        for id in points {
            let Some(center) = world.get::<Position>(id).copied() else {
                tracing::warn!(entity = %id, "spawn point without position");
                continue;
            };
            let Some(point) = world.get_mut::<SpawnPoint>(id) else {
                continue;
            };
            if !point.auto_spawn {
                continue;
            }
            point.timer += dt;
            if live >= point.max_entities || point.timer < point.interval {
                continue;
            }
            point.timer = 0.0;
            let radius = point.radius;

            let roll = self.rng.gen::<f64>();
            let Some(index) = choose_variant(&self.catalog, level, false, roll) else {
                tracing::warn!(level, "no enemy variant eligible");
                continue;
            };
            let at = self.disk_point(world.bounds(), center, radius);
            let variant = &self.catalog[index];
            let entity = world.add_entity(factory::zombie(variant, level, at));
            live += 1;
            tracing::debug!(entity = %entity, variant = %variant.id, spawner = %id, "enemy spawned");
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
    use deadlands_ecs::components::{Enemy, EnemyProfile};
    use deadlands_ecs::events::Topic;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(max_entities: usize) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.spawn.interval = 0.5;
        config.spawn.max_entities = max_entities;
        config
    }

    fn world_with_point(config: &EngineConfig, at: Position) -> World {
        let mut world = World::new(EventBus::new());
        world.add_entity(factory::spawn_point(&config.spawn, at));
        world
    }

    #[test]
    fn choice_respects_level_window() {
        let catalog = Settings::default().enemies;
        for roll in [0.0, 0.3, 0.7, 0.999] {
            let i = choose_variant(&catalog, 1, false, roll).unwrap();
            assert_eq!(catalog[i].id, "walker");
        }
        // Weights 10 + 6 at level 2.
        assert_eq!(catalog[choose_variant(&catalog, 2, false, 0.62).unwrap()].id, "walker");
        assert_eq!(catalog[choose_variant(&catalog, 2, false, 0.63).unwrap()].id, "runner");
        assert_eq!(catalog[choose_variant(&catalog, 1, true, 0.5).unwrap()].id, "abomination");
        assert!(choose_variant(&[], 1, false, 0.5).is_none());
    }

    #[test]
    fn spawns_on_interval_inside_disk() {
        let config = config(10);
        let center = Position::new(500.0, 500.0);
        let mut world = world_with_point(&config, center);
        let mut system = SpawnSystem::new(&config, world.bus().clone());

        system.update(&mut world, 0.25);
        assert_eq!(SpawnSystem::count_enemies(&world, EnemyKind::Zombie), 0);
        system.update(&mut world, 0.25);
        assert_eq!(SpawnSystem::count_enemies(&world, EnemyKind::Zombie), 1);

        for (id, _) in world.stores().enemy.iter() {
            let pos = world.get::<Position>(id).unwrap();
            assert!(pos.distance(&center) <= config.spawn.radius + 1e-9);
        }
    }

    #[test]
    fn never_exceeds_cap() {
        let config = config(3);
        let mut world = world_with_point(&config, Position::new(300.0, 300.0));
        let mut system = SpawnSystem::new(&config, world.bus().clone());
        for _ in 0..100 {
            system.update(&mut world, 0.5);
            assert!(SpawnSystem::count_enemies(&world, EnemyKind::Zombie) <= 3);
        }
        assert_eq!(SpawnSystem::count_enemies(&world, EnemyKind::Zombie), 3);
    }

    #[test]
    fn same_seed_same_spawns() {
        let config = config(5);
        let positions = |config: &EngineConfig| {
            let mut world = world_with_point(config, Position::new(400.0, 400.0));
            let mut system = SpawnSystem::new(config, world.bus().clone());
            for _ in 0..10 {
                system.update(&mut world, 0.5);
            }
            world
                .stores()
                .enemy
                .iter()
                .map(|(id, _)| *world.get::<Position>(id).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(positions(&config), positions(&config));
    }

    #[test]
    fn boss_wave_spawns_one_boss() {
        let mut config = config(0);
        config.spawn.wave_duration = 1.0;
        config.spawn.boss_wave_interval = 2;
        let mut world = world_with_point(&config, Position::new(300.0, 300.0));
        let bus = world.bus().clone();
        let spawned = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&spawned);
        bus.on(Topic::BossSpawned, move |e| {
            if let GameEvent::BossSpawned(b) = e {
                s.borrow_mut().push(b.clone());
            }
        });
        let mut system = SpawnSystem::new(&config, bus);

        system.update(&mut world, 1.0);
        assert_eq!(system.wave(), 2);
        assert_eq!(spawned.borrow().len(), 1);
        let boss = spawned.borrow()[0].clone();
        assert_eq!(boss.wave, 2);
        assert_eq!(world.get::<Enemy>(boss.entity).unwrap().kind, EnemyKind::Boss);
        assert_eq!(
            world.get::<EnemyProfile>(boss.entity).unwrap().variant_id,
            boss.variant_id
        );

        // Wave 4 comes while the first boss is still alive.
        system.update(&mut world, 2.0);
        assert_eq!(system.wave(), 4);
        assert_eq!(spawned.borrow().len(), 1);
    }
}
