//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides:
//!
//! ```
//! use deadlands_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "seed": 7, "world": { "width": 1024 } }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.world.width, 1024.0);
//! assert_eq!(config.world.height, EngineConfig::default().world.height);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Map size and generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub tile_size: f64,
    pub obstacle_count: usize,
    pub spawn_point_count: usize,
    /// Radius around the map center kept free of obstacles.
    pub clear_radius: f64,
    /// Inset of spawn points from the map edge.
    pub edge_margin: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2048.0,
            height: 2048.0,
            tile_size: 64.0,
            obstacle_count: 60,
            spawn_point_count: 8,
            clear_radius: 220.0,
            edge_margin: 96.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    /// Fraction of the remaining distance closed per nominal 1/60 s frame.
    pub smoothing: f64,
    /// Margin added around the viewport when culling.
    pub frustum_padding: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.15,
            frustum_padding: 64.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnConfig {
    pub interval: f64,
    pub radius: f64,
    pub max_entities: usize,
    pub wave_duration: f64,
    /// A boss appears on every wave that is a multiple of this.
    pub boss_wave_interval: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interval: 2.5,
            radius: 80.0,
            max_entities: 40,
            wave_duration: 30.0,
            boss_wave_interval: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionConfig {
    pub xp_growth: f64,
    pub min_xp_to_next: f64,
    pub pickup_radius: f64,
    /// Seconds an XP orb stays on the ground.
    pub loot_ttl: f64,
    /// Fraction of max hp restored by one `heal` selection.
    pub heal_fraction: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_growth: 1.2,
            min_xp_to_next: 10.0,
            pickup_radius: 48.0,
            loot_ttl: 30.0,
            heal_fraction: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Seed for every random stream in the simulation.
    pub seed: u64,
    /// Upper bound of a single frame's dt, in seconds.
    pub max_frame_dt: f64,
    /// Speed below which a sprite shows its idle pose.
    pub idle_speed_threshold: f64,
    pub world: WorldConfig,
    pub camera: CameraConfig,
    pub spawn: SpawnConfig,
    pub progression: ProgressionConfig,
    pub settings: Settings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_dead,
            max_frame_dt: 0.1,
            idle_speed_threshold: 5.0,
            world: WorldConfig::default(),
            camera: CameraConfig::default(),
            spawn: SpawnConfig::default(),
            progression: ProgressionConfig::default(),
            settings: Settings::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive and finite, got {value}")))
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("maxFrameDt", self.max_frame_dt)?;
        positive("world.width", self.world.width)?;
        positive("world.height", self.world.height)?;
        positive("world.tileSize", self.world.tile_size)?;
        positive("spawn.interval", self.spawn.interval)?;
        positive("spawn.waveDuration", self.spawn.wave_duration)?;
        positive("progression.minXpToNext", self.progression.min_xp_to_next)?;
        positive(
            "settings.player.initialXpToNext",
            self.settings.player.initial_xp_to_next,
        )?;

        let smoothing = self.camera.smoothing;
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(invalid(
                "camera.smoothing",
                format!("must be in (0, 1], got {smoothing}"),
            ));
        }
        if !(self.progression.xp_growth >= 1.0 && self.progression.xp_growth.is_finite()) {
            return Err(invalid(
                "progression.xpGrowth",
                format!("must be at least 1, got {}", self.progression.xp_growth),
            ));
        }
        if self.spawn.boss_wave_interval == 0 {
            return Err(invalid("spawn.bossWaveInterval", "must be at least 1"));
        }
        if self.settings.zombies().next().is_none() {
            return Err(invalid("settings.enemies", "needs at least one non-boss variant"));
        }
        for variant in &self.settings.enemies {
            if !(variant.spawn.weight >= 0.0 && variant.spawn.weight.is_finite()) {
                return Err(invalid(
                    "settings.enemies.spawn.weight",
                    format!("variant '{}' has weight {}", variant.id, variant.spawn.weight),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
