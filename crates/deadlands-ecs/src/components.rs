//! Component data records.
//!
//! Components are plain data. The only behavior kept here is derived values
//! that several systems need to agree on (passive-bonus getters, effect speed
//! factor, circle centers).

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Kinematics
// ---------------------------------------------------------------------------

/// World-space position in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Velocity in pixels per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f64,
    pub dy: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { dx: 0.0, dy: 0.0 };

    pub fn speed(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Velocity of magnitude `speed` pointing from `from` to `to`, or zero
    /// when the points coincide.
    pub fn toward(from: &Position, to: &Position, speed: f64) -> Self {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let len = dx.hypot(dy);
        if len <= f64::EPSILON {
            return Self::ZERO;
        }
        Self {
            dx: dx / len * speed,
            dy: dy / len * speed,
        }
    }
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Hit points. `0 <= hp <= max_hp` is maintained by the systems that write it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub hp: f64,
    pub max_hp: f64,
}

impl Health {
    pub fn full(max_hp: f64) -> Self {
        Self { hp: max_hp, max_hp }
    }
}

/// Circle used for pairwise overlap tests, offset from the entity position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub radius: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Collision {
    pub fn circle(radius: f64) -> Self {
        Self {
            radius,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Circle center for an entity at `position`.
    pub fn center(&self, position: &Position) -> Position {
        Position::new(position.x + self.offset_x, position.y + self.offset_y)
    }
}

/// Periodic attack. `cooldown_timer` counts down to the next allowed hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    pub damage: f64,
    pub cooldown: f64,
    pub cooldown_timer: f64,
}

/// Pending damage, consumed by the damage system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Damage {
    pub amount: f64,
    pub source_id: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// AI and enemies
// ---------------------------------------------------------------------------

/// AI state machine states. `Dead` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiState {
    #[default]
    Idle,
    Chase,
    Attack,
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ai {
    pub state: AiState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnemyKind {
    Zombie,
    Boss,
}

/// Combat profile of a hostile entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enemy {
    pub kind: EnemyKind,
    pub xp_reward: f64,
    pub damage: f64,
    pub speed: f64,
    pub aggro_range: f64,
    pub attack_range: f64,
    pub attack_cooldown: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyRangedAttack {
    pub cooldown: f64,
    pub range: f64,
    pub projectile_damage: f64,
    pub projectile_speed: f64,
    pub timer: f64,
}

/// Special behaviors an enemy variant may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ability {
    /// Leaves a toxic puddle where it dies.
    ToxicPuddle,
    /// Spits projectiles at range.
    RangedSpit,
    /// Slow but heavily armored.
    Armored,
    /// Moves faster than the pack.
    Sprint,
}

/// When and how often a variant is eligible for spawning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRules {
    pub min_level: u32,
    #[serde(default)]
    pub max_level: Option<u32>,
    pub weight: f64,
    #[serde(default)]
    pub boss: bool,
}

impl SpawnRules {
    pub fn allows_level(&self, level: u32) -> bool {
        level >= self.min_level && self.max_level.map_or(true, |max| level <= max)
    }
}

/// Descriptive variant metadata. No system reads it for simulation except
/// the death-drop check on `abilities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyProfile {
    pub variant_id: String,
    pub display_name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub abilities: Vec<Ability>,
    pub spawn: SpawnRules,
}

impl EnemyProfile {
    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }
}

// ---------------------------------------------------------------------------
// Progression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub xp: f64,
    pub level: u32,
    pub xp_to_next: f64,
}

impl Experience {
    pub fn new(xp_to_next: f64) -> Self {
        Self {
            xp: 0.0,
            level: 1,
            xp_to_next,
        }
    }
}

/// Bonus kinds offered on level-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassiveBonusKind {
    MovementSpeed,
    Damage,
    AttackSpeed,
    Health,
    XpGain,
    Heal,
}

impl PassiveBonusKind {
    pub const ALL: [PassiveBonusKind; 6] = [
        PassiveBonusKind::MovementSpeed,
        PassiveBonusKind::Damage,
        PassiveBonusKind::AttackSpeed,
        PassiveBonusKind::Health,
        PassiveBonusKind::XpGain,
        PassiveBonusKind::Heal,
    ];

    /// Amount added per selection.
    pub fn step(self) -> f64 {
        match self {
            PassiveBonusKind::MovementSpeed => 10.0,
            PassiveBonusKind::Damage => 5.0,
            PassiveBonusKind::AttackSpeed => 0.15,
            PassiveBonusKind::Health => 20.0,
            PassiveBonusKind::XpGain => 0.1,
            PassiveBonusKind::Heal => 1.0,
        }
    }

    /// Ceiling of the accumulated bonus. For `Heal` this counts uses.
    pub fn max(self) -> f64 {
        match self {
            PassiveBonusKind::MovementSpeed => 60.0,
            PassiveBonusKind::Damage => 40.0,
            PassiveBonusKind::AttackSpeed => 1.5,
            PassiveBonusKind::Health => 200.0,
            PassiveBonusKind::XpGain => 1.0,
            PassiveBonusKind::Heal => 5.0,
        }
    }
}

/// Floor of the derived attack cooldown, in seconds.
pub const MIN_ATTACK_COOLDOWN: f64 = 0.1;

/// Accumulated level-up bonuses and the base stats they modify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveBonuses {
    pub base_movement_speed: f64,
    pub base_damage: f64,
    pub base_attack_cooldown: f64,
    pub movement_speed_bonus: f64,
    pub damage_bonus: f64,
    pub attack_speed_bonus: f64,
    pub health_bonus: f64,
    pub xp_bonus: f64,
    pub heal_used: u32,
    pub selections_used: u32,
}

impl PassiveBonuses {
    pub fn new(base_movement_speed: f64, base_damage: f64, base_attack_cooldown: f64) -> Self {
        Self {
            base_movement_speed,
            base_damage,
            base_attack_cooldown,
            movement_speed_bonus: 0.0,
            damage_bonus: 0.0,
            attack_speed_bonus: 0.0,
            health_bonus: 0.0,
            xp_bonus: 0.0,
            heal_used: 0,
            selections_used: 0,
        }
    }

    /// Current accumulated value of `kind`.
    pub fn value(&self, kind: PassiveBonusKind) -> f64 {
        match kind {
            PassiveBonusKind::MovementSpeed => self.movement_speed_bonus,
            PassiveBonusKind::Damage => self.damage_bonus,
            PassiveBonusKind::AttackSpeed => self.attack_speed_bonus,
            PassiveBonusKind::Health => self.health_bonus,
            PassiveBonusKind::XpGain => self.xp_bonus,
            PassiveBonusKind::Heal => f64::from(self.heal_used),
        }
    }

    pub fn is_maxed(&self, kind: PassiveBonusKind) -> bool {
        self.value(kind) >= kind.max()
    }

    /// Add one step of `kind`, clamped to its maximum.
    ///
    /// Returns `false` and leaves the record untouched when `kind` is maxed.
    pub fn bump(&mut self, kind: PassiveBonusKind) -> bool {
        if self.is_maxed(kind) {
            return false;
        }
        let next = (self.value(kind) + kind.step()).min(kind.max());
        match kind {
            PassiveBonusKind::MovementSpeed => self.movement_speed_bonus = next,
            PassiveBonusKind::Damage => self.damage_bonus = next,
            PassiveBonusKind::AttackSpeed => self.attack_speed_bonus = next,
            PassiveBonusKind::Health => self.health_bonus = next,
            PassiveBonusKind::XpGain => self.xp_bonus = next,
            PassiveBonusKind::Heal => self.heal_used += 1,
        }
        self.selections_used += 1;
        true
    }

    pub fn effective_movement_speed(&self) -> f64 {
        self.base_movement_speed
            + self
                .movement_speed_bonus
                .min(PassiveBonusKind::MovementSpeed.max())
    }

    pub fn effective_damage(&self) -> f64 {
        self.base_damage + self.damage_bonus.min(PassiveBonusKind::Damage.max())
    }

    pub fn effective_attack_cooldown(&self) -> f64 {
        let speed = self.attack_speed_bonus.min(PassiveBonusKind::AttackSpeed.max());
        (self.base_attack_cooldown / (1.0 + speed)).max(MIN_ATTACK_COOLDOWN)
    }

    pub fn xp_multiplier(&self) -> f64 {
        1.0 + self.xp_bonus.min(PassiveBonusKind::XpGain.max())
    }
}

// ---------------------------------------------------------------------------
// Projectiles, loot, timers
// ---------------------------------------------------------------------------

/// Which side fired a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectileKind {
    Bullet,
    Spit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projectile {
    pub damage: f64,
    pub source_id: Option<EntityId>,
    pub speed: f64,
    /// Seconds left before the projectile is removed.
    pub lifetime: f64,
    pub kind: ProjectileKind,
}

/// XP orb dropped by a killed enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    pub xp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DespawnTimer {
    pub ttl: f64,
}

/// Marks the entity controlled by the local player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Player;

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    DamageOverTime,
    HealOverTime,
    SpeedBoost,
    Slow,
}

/// One independently timed effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectEntry {
    pub kind: EffectKind,
    /// Hit points per tick for over-time kinds; fraction for speed kinds.
    pub value: f64,
    pub duration: f64,
    pub elapsed: f64,
    pub tick_rate: f64,
    pub tick_timer: f64,
    /// Entity that applied the effect, used to refresh instead of stack.
    #[serde(default)]
    pub source: Option<EntityId>,
}

impl EffectEntry {
    pub fn new(kind: EffectKind, value: f64, duration: f64, tick_rate: f64) -> Self {
        Self {
            kind,
            value,
            duration,
            elapsed: 0.0,
            tick_rate,
            tick_timer: 0.0,
            source: None,
        }
    }

    pub fn from_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Effects {
    pub entries: Vec<EffectEntry>,
}

impl Effects {
    pub fn with(entry: EffectEntry) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    /// Restart an entry of the same kind and source, or add `entry`.
    pub fn refresh(&mut self, entry: EffectEntry) {
        let existing = self
            .entries
            .iter_mut()
            .find(|e| e.kind == entry.kind && e.source.is_some() && e.source == entry.source);
        match existing {
            Some(e) => {
                e.elapsed = 0.0;
                e.duration = entry.duration;
                e.value = entry.value;
            }
            None => self.entries.push(entry),
        }
    }

    /// Flat multiplier of all live speed entries. Held for each entry's
    /// duration, never compounded across ticks.
    pub fn speed_factor(&self) -> f64 {
        self.entries
            .iter()
            .filter(|e| !e.is_expired())
            .fold(1.0, |factor, e| match e.kind {
                EffectKind::SpeedBoost => factor * (1.0 + e.value),
                EffectKind::Slow => factor * (1.0 - e.value).max(0.0),
                EffectKind::DamageOverTime | EffectKind::HealOverTime => factor,
            })
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Sprite-sheet drawing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprite {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub frame: u32,
    /// Seconds per animation frame.
    pub frame_duration: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub alpha: f64,
    pub z_index: i32,
    pub source: String,
    pub columns: u32,
    pub rows: u32,
    pub direction_row: u32,
    pub animation_timer: f64,
    pub padding: f64,
}

impl Sprite {
    pub fn new(name: &str, source: &str, width: f64, height: f64) -> Self {
        Self {
            name: name.to_owned(),
            width,
            height,
            scale: 1.0,
            frame: 0,
            frame_duration: 0.1,
            looping: true,
            alpha: 1.0,
            z_index: 0,
            source: source.to_owned(),
            columns: 1,
            rows: 1,
            direction_row: 0,
            animation_timer: 0.0,
            padding: 0.0,
        }
    }

    pub fn with_grid(mut self, columns: u32, rows: u32) -> Self {
        self.columns = columns.max(1);
        self.rows = rows.max(1);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_frame_duration(mut self, frame_duration: f64) -> Self {
        self.frame_duration = frame_duration;
        self
    }

    pub fn non_looping(mut self) -> Self {
        self.looping = false;
        self
    }

    /// Drawn size in world units.
    pub fn scaled_size(&self) -> (f64, f64) {
        (self.width * self.scale, self.height * self.scale)
    }
}

// ---------------------------------------------------------------------------
// Map features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpawnType {
    Zombie,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPoint {
    pub spawn_type: SpawnType,
    pub radius: f64,
    /// Seconds between spawns.
    pub interval: f64,
    pub max_entities: usize,
    pub auto_spawn: bool,
    #[serde(rename = "_timer", default)]
    pub timer: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObstacleKind {
    Rock,
    Tree,
    Bush,
    Water,
    ToxicPuddle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obstacle {
    pub width: f64,
    pub height: f64,
    pub kind: ObstacleKind,
    pub is_blocking: bool,
    pub speed_reducing: bool,
    pub damaging: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
