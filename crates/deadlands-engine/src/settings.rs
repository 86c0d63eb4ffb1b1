//! Read-only settings tables consumed by the entity factories.
//!
//! Numeric profiles are plain data so they can be overridden from JSON
//! through [`EngineConfig`](crate::config::EngineConfig).

use serde::{Deserialize, Serialize};

use deadlands_ecs::components::{Ability, EnemyKind, ObstacleKind, SpawnRules, Sprite};

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Linear stat curve: `base + per_level * (level - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCurve {
    pub base: f64,
    #[serde(default)]
    pub per_level: f64,
}

impl StatCurve {
    pub const fn new(base: f64, per_level: f64) -> Self {
        Self { base, per_level }
    }

    pub const fn flat(base: f64) -> Self {
        Self {
            base,
            per_level: 0.0,
        }
    }

    /// Value at `level`. Levels below 1 read as level 1.
    pub fn at(&self, level: u32) -> f64 {
        self.base + self.per_level * f64::from(level.max(1) - 1)
    }
}

/// How an archetype is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteSettings {
    pub source: String,
    pub width: f64,
    pub height: f64,
    #[serde(default = "one")]
    pub columns: u32,
    #[serde(default = "one")]
    pub rows: u32,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f64,
}

fn one() -> u32 {
    1
}

fn unit_scale() -> f64 {
    1.0
}

fn default_frame_duration() -> f64 {
    0.12
}

impl SpriteSettings {
    fn sheet(source: &str, size: f64, columns: u32, rows: u32, z_index: i32) -> Self {
        Self {
            source: source.to_owned(),
            width: size,
            height: size,
            columns,
            rows,
            scale: 1.0,
            z_index,
            frame_duration: default_frame_duration(),
        }
    }

    /// A fresh sprite component named `name`.
    pub fn to_sprite(&self, name: &str) -> Sprite {
        Sprite::new(name, &self.source, self.width, self.height)
            .with_grid(self.columns, self.rows)
            .with_scale(self.scale)
            .with_z_index(self.z_index)
            .with_frame_duration(self.frame_duration)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    pub health: f64,
    pub speed: f64,
    pub damage: f64,
    pub attack_cooldown: f64,
    pub radius: f64,
    pub projectile_speed: f64,
    /// Distance a bullet travels before it expires. Also the auto-aim range.
    pub projectile_range: f64,
    pub projectile_radius: f64,
    pub initial_xp_to_next: f64,
    pub sprite: SpriteSettings,
    pub projectile_sprite: SpriteSettings,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            health: 100.0,
            speed: 160.0,
            damage: 12.0,
            attack_cooldown: 0.6,
            radius: 14.0,
            projectile_speed: 420.0,
            projectile_range: 360.0,
            projectile_radius: 4.0,
            initial_xp_to_next: 100.0,
            sprite: SpriteSettings::sheet("sprites/survivor.png", 48.0, 4, 8, 6),
            projectile_sprite: SpriteSettings::sheet("sprites/bullet.png", 8.0, 1, 1, 7),
        }
    }
}

// ---------------------------------------------------------------------------
// Enemy variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangedSettings {
    pub cooldown: f64,
    pub range: f64,
    pub projectile_damage: StatCurve,
    pub projectile_speed: f64,
}

/// One entry of the enemy catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyVariant {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    pub health: StatCurve,
    pub damage: StatCurve,
    pub speed: StatCurve,
    pub xp_reward: StatCurve,
    pub aggro_range: f64,
    pub attack_range: f64,
    pub attack_cooldown: f64,
    pub radius: f64,
    #[serde(default)]
    pub ranged: Option<RangedSettings>,
    pub spawn: SpawnRules,
    pub sprite: SpriteSettings,
}

impl EnemyVariant {
    pub fn kind(&self) -> EnemyKind {
        if self.spawn.boss {
            EnemyKind::Boss
        } else {
            EnemyKind::Zombie
        }
    }

    pub fn is_boss(&self) -> bool {
        self.spawn.boss
    }
}

#[allow(clippy::too_many_arguments)]
fn variant(
    id: &str,
    display_name: &str,
    description: &str,
    tags: &[&str],
    abilities: &[Ability],
    health: StatCurve,
    damage: StatCurve,
    speed: StatCurve,
    xp_reward: StatCurve,
    radius: f64,
    spawn: SpawnRules,
    sprite: SpriteSettings,
) -> EnemyVariant {
    EnemyVariant {
        id: id.to_owned(),
        display_name: display_name.to_owned(),
        description: description.to_owned(),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        abilities: abilities.to_vec(),
        health,
        damage,
        speed,
        xp_reward,
        aggro_range: 520.0,
        attack_range: radius + 18.0,
        attack_cooldown: 1.0,
        radius,
        ranged: None,
        spawn,
        sprite,
    }
}

fn rules(min_level: u32, weight: f64, boss: bool) -> SpawnRules {
    SpawnRules {
        min_level,
        max_level: None,
        weight,
        boss,
    }
}

/// The built-in enemy catalog, in declaration order.
pub fn default_enemy_catalog() -> Vec<EnemyVariant> {
    let spit = RangedSettings {
        cooldown: 2.2,
        range: 260.0,
        projectile_damage: StatCurve::new(8.0, 1.0),
        projectile_speed: 220.0,
    };

    let walker = variant(
        "walker",
        "Walker",
        "A slow, relentless corpse.",
        &["common"],
        &[],
        StatCurve::new(40.0, 8.0),
        StatCurve::new(8.0, 1.5),
        StatCurve::new(55.0, 2.0),
        StatCurve::new(10.0, 2.0),
        12.0,
        rules(1, 10.0, false),
        SpriteSettings::sheet("sprites/walker.png", 40.0, 4, 8, 5),
    );
    let runner = variant(
        "runner",
        "Runner",
        "Fresh and fast. Fragile.",
        &["common", "fast"],
        &[Ability::Sprint],
        StatCurve::new(25.0, 5.0),
        StatCurve::new(6.0, 1.0),
        StatCurve::new(95.0, 3.0),
        StatCurve::new(12.0, 2.0),
        10.0,
        rules(2, 6.0, false),
        SpriteSettings::sheet("sprites/runner.png", 36.0, 6, 8, 5),
    );
    let mut spitter = variant(
        "spitter",
        "Spitter",
        "Keeps its distance and spits acid.",
        &["ranged"],
        &[Ability::RangedSpit],
        StatCurve::new(30.0, 6.0),
        StatCurve::new(5.0, 1.0),
        StatCurve::new(45.0, 1.5),
        StatCurve::new(15.0, 3.0),
        12.0,
        rules(3, 4.0, false),
        SpriteSettings::sheet("sprites/spitter.png", 40.0, 4, 8, 5),
    );
    spitter.ranged = Some(spit);
    let toxic = variant(
        "toxic",
        "Bloater",
        "Bursts into a toxic puddle when killed.",
        &["hazard"],
        &[Ability::ToxicPuddle],
        StatCurve::new(45.0, 9.0),
        StatCurve::new(7.0, 1.0),
        StatCurve::new(50.0, 1.5),
        StatCurve::new(16.0, 3.0),
        14.0,
        rules(4, 3.0, false),
        SpriteSettings::sheet("sprites/bloater.png", 44.0, 4, 8, 5),
    );
    let mut brute = variant(
        "brute",
        "Brute",
        "Armored and heavy-handed.",
        &["tank"],
        &[Ability::Armored],
        StatCurve::new(120.0, 20.0),
        StatCurve::new(18.0, 3.0),
        StatCurve::new(38.0, 1.0),
        StatCurve::new(30.0, 5.0),
        18.0,
        rules(5, 2.0, false),
        SpriteSettings::sheet("sprites/brute.png", 56.0, 4, 8, 5),
    );
    brute.attack_cooldown = 1.6;

    let abomination = variant(
        "abomination",
        "Abomination",
        "Stitched from a dozen bodies.",
        &["boss"],
        &[Ability::Armored],
        StatCurve::new(600.0, 80.0),
        StatCurve::new(25.0, 3.0),
        StatCurve::new(60.0, 2.0),
        StatCurve::new(200.0, 25.0),
        28.0,
        rules(1, 1.0, true),
        SpriteSettings::sheet("sprites/abomination.png", 96.0, 4, 8, 5),
    );
    let mut plague_lord = variant(
        "plagueLord",
        "Plague Lord",
        "Spreads rot wherever it walks.",
        &["boss", "ranged", "hazard"],
        &[Ability::ToxicPuddle, Ability::RangedSpit],
        StatCurve::new(900.0, 100.0),
        StatCurve::new(30.0, 3.0),
        StatCurve::new(55.0, 2.0),
        StatCurve::new(320.0, 30.0),
        30.0,
        rules(6, 1.0, true),
        SpriteSettings::sheet("sprites/plague_lord.png", 96.0, 4, 8, 5),
    );
    plague_lord.ranged = Some(RangedSettings {
        cooldown: 1.4,
        range: 320.0,
        projectile_damage: StatCurve::new(14.0, 2.0),
        projectile_speed: 260.0,
    });

    vec![walker, runner, spitter, toxic, brute, abomination, plague_lord]
}

// ---------------------------------------------------------------------------
// Obstacles
// ---------------------------------------------------------------------------

/// Behavior and look of one obstacle kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstaclePreset {
    pub kind: ObstacleKind,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub is_blocking: bool,
    pub speed_reducing: bool,
    pub damaging: bool,
    /// Fraction of speed removed while inside.
    #[serde(default)]
    pub slow: f64,
    /// Hit points per tick while inside.
    #[serde(default)]
    pub damage_per_tick: f64,
    #[serde(default)]
    pub tick_rate: f64,
    /// Relative frequency during map generation; zero keeps a kind off the
    /// generated map.
    #[serde(default)]
    pub scatter_weight: f64,
    /// Lifetime of obstacles of this kind that are dropped during play.
    #[serde(default)]
    pub ttl: Option<f64>,
    pub sprite: SpriteSettings,
}

/// Preset table keyed by [`ObstacleKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstaclePresets(Vec<ObstaclePreset>);

impl ObstaclePresets {
    pub fn new(presets: Vec<ObstaclePreset>) -> Self {
        Self(presets)
    }

    pub fn get(&self, kind: ObstacleKind) -> Option<&ObstaclePreset> {
        self.0.iter().find(|p| p.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObstaclePreset> {
        self.0.iter()
    }
}

impl Default for ObstaclePresets {
    fn default() -> Self {
        let solid = |kind, size: f64, weight, source: &str| ObstaclePreset {
            kind,
            width: size,
            height: size,
            radius: size * 0.4,
            is_blocking: true,
            speed_reducing: false,
            damaging: false,
            slow: 0.0,
            damage_per_tick: 0.0,
            tick_rate: 0.0,
            scatter_weight: weight,
            ttl: None,
            sprite: SpriteSettings::sheet(source, size, 1, 1, 1),
        };
        Self(vec![
            solid(ObstacleKind::Rock, 48.0, 4.0, "sprites/rock.png"),
            solid(ObstacleKind::Tree, 64.0, 5.0, "sprites/tree.png"),
            ObstaclePreset {
                is_blocking: false,
                speed_reducing: true,
                slow: 0.3,
                ..solid(ObstacleKind::Bush, 40.0, 3.0, "sprites/bush.png")
            },
            ObstaclePreset {
                is_blocking: false,
                speed_reducing: true,
                slow: 0.5,
                radius: 40.0,
                ..solid(ObstacleKind::Water, 96.0, 1.0, "sprites/water.png")
            },
            ObstaclePreset {
                is_blocking: false,
                speed_reducing: true,
                damaging: true,
                slow: 0.25,
                damage_per_tick: 4.0,
                tick_rate: 0.5,
                scatter_weight: 0.0,
                ttl: Some(8.0),
                radius: 28.0,
                sprite: SpriteSettings::sheet("sprites/toxic_puddle.png", 64.0, 4, 1, 0),
                ..solid(ObstacleKind::ToxicPuddle, 64.0, 0.0, "sprites/toxic_puddle.png")
            },
        ])
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Every table the factories read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub player: PlayerSettings,
    pub enemies: Vec<EnemyVariant>,
    pub obstacles: ObstaclePresets,
    pub loot_sprite: SpriteSettings,
    pub spit_sprite: SpriteSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player: PlayerSettings::default(),
            enemies: default_enemy_catalog(),
            obstacles: ObstaclePresets::default(),
            loot_sprite: SpriteSettings::sheet("sprites/xp_orb.png", 16.0, 4, 1, 2),
            spit_sprite: SpriteSettings::sheet("sprites/spit.png", 12.0, 2, 1, 7),
        }
    }
}

impl Settings {
    pub fn variant(&self, id: &str) -> Option<&EnemyVariant> {
        self.enemies.iter().find(|v| v.id == id)
    }

    /// Non-boss variants, in declaration order.
    pub fn zombies(&self) -> impl Iterator<Item = &EnemyVariant> {
        self.enemies.iter().filter(|v| !v.is_boss())
    }

    /// Boss variants, in declaration order.
    pub fn bosses(&self) -> impl Iterator<Item = &EnemyVariant> {
        self.enemies.iter().filter(|v| v.is_boss())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
