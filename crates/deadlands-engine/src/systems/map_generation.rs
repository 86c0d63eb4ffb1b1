//! Procedural map setup.
//!
//! Runs once, when the system is registered: sets the world bounds, fills a
//! seeded tile grid, scatters obstacles away from the map center and places
//! spawn points around the edge. `update` does nothing.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use deadlands_ecs::components::Position;
use deadlands_ecs::terrain::{TileKind, TileMap};
use deadlands_ecs::world::{World, WorldBounds};

use crate::config::{EngineConfig, SpawnConfig, WorldConfig};
use crate::factory;
use crate::settings::ObstaclePresets;

use super::System;

/// Relative tile frequencies, in [`TileKind::ALL`] order.
const TILE_WEIGHTS: [u32; 4] = [70, 15, 10, 5];

/// Placement attempts per obstacle before it is dropped.
const MAX_PLACEMENT_ATTEMPTS: usize = 32;

fn pick_tile(roll: u32) -> TileKind {
    let mut remaining = roll;
    for (kind, weight) in TileKind::ALL.iter().zip(TILE_WEIGHTS) {
        if remaining < weight {
            return *kind;
        }
        remaining -= weight;
    }
    TileKind::Grass
}

/// `count` points spread evenly along the rectangle inset by `margin` from
/// the bounds, walking clockwise from the top-left corner.
pub fn edge_points(bounds: WorldBounds, margin: f64, count: usize) -> Vec<Position> {
    let margin = margin.clamp(0.0, bounds.width.min(bounds.height) / 2.0);
    let (left, top) = (margin, margin);
    let (w, h) = (bounds.width - 2.0 * margin, bounds.height - 2.0 * margin);
    let perimeter = 2.0 * (w + h);
    (0..count)
        .map(|i| {
            let mut t = (i as f64 + 0.5) / count as f64 * perimeter;
            if t < w {
                return Position::new(left + t, top);
            }
            t -= w;
            if t < h {
                return Position::new(left + w, top + t);
            }
            t -= h;
            if t < w {
                return Position::new(left + w - t, top + h);
            }
            t -= w;
            Position::new(left, top + h - t)
        })
        .collect()
}

pub struct MapGenerationSystem {
    world_config: WorldConfig,
    spawn: SpawnConfig,
    presets: ObstaclePresets,
    seed: u64,
}

impl MapGenerationSystem {
    pub const NAME: &'static str = "map_generation";

    pub fn new(config: &EngineConfig) -> Self {
        Self {
            world_config: config.world.clone(),
            spawn: config.spawn.clone(),
            presets: config.settings.obstacles.clone(),
            seed: config.seed,
        }
    }

    fn tiles(&self, rng: &mut Pcg32) -> TileMap {
        let size = self.world_config.tile_size;
        let columns = (self.world_config.width / size).ceil() as u32;
        let rows = (self.world_config.height / size).ceil() as u32;
        let mut tiles = TileMap::filled(columns, rows, size, TileKind::Grass);
        let total: u32 = TILE_WEIGHTS.iter().sum();
        for row in 0..rows {
            for column in 0..columns {
                tiles.set(column, row, pick_tile(rng.gen_range(0..total)));
            }
        }
        tiles
    }

    fn scatter_obstacles(&self, world: &mut World, rng: &mut Pcg32) -> usize {
        let weighted: Vec<_> = self.presets.iter().filter(|p| p.scatter_weight > 0.0).collect();
        let total: f64 = weighted.iter().map(|p| p.scatter_weight).sum();
        if weighted.is_empty() || total <= 0.0 {
            return 0;
        }
        let bounds = world.bounds();
        let (cx, cy) = bounds.center();
        let center = Position::new(cx, cy);
        let mut placed = 0;

        for _ in 0..self.world_config.obstacle_count {
            let mut remaining = rng.gen::<f64>() * total;
            let preset = weighted
                .iter()
                .find(|p| {
                    if remaining < p.scatter_weight {
                        return true;
                    }
                    remaining -= p.scatter_weight;
                    false
                })
                .or(weighted.last())
                .copied();
            let Some(preset) = preset else {
                continue;
            };

            let spot = (0..MAX_PLACEMENT_ATTEMPTS)
                .map(|_| {
                    Position::new(
                        rng.gen_range(0.0..bounds.width),
                        rng.gen_range(0.0..bounds.height),
                    )
                })
                .find(|p| p.distance(&center) > self.world_config.clear_radius + preset.radius);
            match spot {
                Some(at) => {
                    world.add_entity(factory::obstacle(preset, at));
                    placed += 1;
                }
                None => tracing::debug!(kind = ?preset.kind, "no room for obstacle"),
            }
        }
        placed
    }
}

impl System for MapGenerationSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, world: &mut World) {
        let mut rng = Pcg32::seed_from_u64(self.seed);
        world.set_bounds(WorldBounds {
            width: self.world_config.width,
            height: self.world_config.height,
        });
        world.set_tiles(self.tiles(&mut rng));
        let obstacles = self.scatter_obstacles(world, &mut rng);

        let points = edge_points(
            world.bounds(),
            self.world_config.edge_margin,
            self.world_config.spawn_point_count,
        );
        for at in &points {
            world.add_entity(factory::spawn_point(&self.spawn, *at));
        }
        tracing::info!(
            width = self.world_config.width,
            height = self.world_config.height,
            obstacles,
            spawn_points = points.len(),
            "map generated"
        );
    }

    fn update(&mut self, _world: &mut World, _dt: f64) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
