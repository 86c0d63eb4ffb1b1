//! Application-visible state rebuilt from bus events.
//!
//! [`MirroredState::apply`] is a pure reducer: it never touches the bus or
//! the world, so the same state can be rebuilt from a recorded event list.
//!
//! A removed entity stays in the index, marked dead with the sequence number
//! of its removal, until it falls out of the window of the most recent
//! `max_removed` removals. Projectiles and loot churn constantly, so the
//! index stays proportional to the live world plus that window.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use deadlands_ecs::component::ComponentKind;
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::events::{GameEvent, LevelUpRewardsAvailable, PassiveBonusApplied};

// ---------------------------------------------------------------------------
// EntityEntry
// ---------------------------------------------------------------------------

/// Coarse classification of an entity for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityRole {
    Player,
    Enemy,
    Boss,
    Projectile,
    Loot,
    Obstacle,
    SpawnPoint,
    Other,
}

impl EntityRole {
    /// Role implied by a component set. Bosses look like enemies until a
    /// `bossSpawned` event says otherwise.
    pub fn from_kinds(kinds: &[ComponentKind]) -> Self {
        let has = |kind| kinds.contains(&kind);
        if has(ComponentKind::Player) {
            EntityRole::Player
        } else if has(ComponentKind::Enemy) {
            EntityRole::Enemy
        } else if has(ComponentKind::Projectile) {
            EntityRole::Projectile
        } else if has(ComponentKind::Loot) {
            EntityRole::Loot
        } else if has(ComponentKind::Obstacle) {
            EntityRole::Obstacle
        } else if has(ComponentKind::SpawnPoint) {
            EntityRole::SpawnPoint
        } else {
            EntityRole::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEntry {
    pub entity: EntityId,
    pub role: EntityRole,
    pub kinds: Vec<ComponentKind>,
    pub alive: bool,
    /// Sequence number of the `entityAdded` event.
    pub added_at: u64,
    pub removed_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub entity: Option<EntityId>,
    pub level: u32,
    pub killed: bool,
    pub killed_by: Option<EntityId>,
}

impl Default for PlayerSummary {
    fn default() -> Self {
        Self {
            entity: None,
            level: 1,
            killed: false,
            killed_by: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BossSummary {
    pub entity: EntityId,
    pub variant_id: String,
    pub wave: u32,
}

/// One event as the mirror saw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub seq: u64,
    pub event: GameEvent,
}

// ---------------------------------------------------------------------------
// MirroredState
// ---------------------------------------------------------------------------

/// Everything the UI reads, serializable as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredState {
    /// Number of events applied so far.
    pub seq: u64,
    pub entities: BTreeMap<EntityId, EntityEntry>,
    pub player: PlayerSummary,
    pub kills: u64,
    pub xp_from_kills: f64,
    pub boss_active: bool,
    pub boss: Option<BossSummary>,
    /// The latest reward catalog still waiting for a selection.
    pub pending_rewards: Option<LevelUpRewardsAvailable>,
    pub applied_bonuses: Vec<PassiveBonusApplied>,
    /// Most recent events, oldest first.
    pub history: VecDeque<HistoryEntry>,
    #[serde(skip)]
    max_history: usize,
    /// Dead entries still indexed, in removal order.
    #[serde(skip)]
    removed: VecDeque<EntityId>,
    #[serde(skip)]
    max_removed: usize,
}

impl Default for MirroredState {
    fn default() -> Self {
        Self::with_max_history(Self::DEFAULT_HISTORY)
    }
}

impl MirroredState {
    pub const DEFAULT_HISTORY: usize = 64;
    pub const DEFAULT_REMOVED: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_history` events in [`history`](Self::history).
    pub fn with_max_history(max_history: usize) -> Self {
        Self::with_limits(max_history, Self::DEFAULT_REMOVED)
    }

    /// Keep at most `max_history` events and `max_removed` dead entries.
    pub fn with_limits(max_history: usize, max_removed: usize) -> Self {
        Self {
            seq: 0,
            entities: BTreeMap::new(),
            player: PlayerSummary::default(),
            kills: 0,
            xp_from_kills: 0.0,
            boss_active: false,
            boss: None,
            pending_rewards: None,
            applied_bonuses: Vec::new(),
            history: VecDeque::new(),
            max_history,
            removed: VecDeque::new(),
            max_removed,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn max_removed(&self) -> usize {
        self.max_removed
    }

    /// Entries whose entity has not been removed.
    pub fn live_entities(&self) -> impl Iterator<Item = &EntityEntry> {
        self.entities.values().filter(|e| e.alive)
    }

    pub fn live_count(&self, role: EntityRole) -> usize {
        self.live_entities().filter(|e| e.role == role).count()
    }

    /// Drop every index entry of a removed entity.
    pub fn prune_removed(&mut self) -> usize {
        self.removed.clear();
        let before = self.entities.len();
        self.entities.retain(|_, e| e.alive);
        before - self.entities.len()
    }

    fn evict_removed(&mut self) {
        while self.removed.len() > self.max_removed {
            if let Some(old) = self.removed.pop_front() {
                self.entities.remove(&old);
            }
        }
    }

    /// Fold one event into the state.
    pub fn apply(&mut self, event: &GameEvent) {
        self.seq += 1;
        let seq = self.seq;

        match event {
            GameEvent::EntityAdded(change) => {
                let role = EntityRole::from_kinds(&change.kinds);
                if role == EntityRole::Player {
                    self.player = PlayerSummary {
                        entity: Some(change.entity),
                        ..PlayerSummary::default()
                    };
                }
                self.entities.insert(
                    change.entity,
                    EntityEntry {
                        entity: change.entity,
                        role,
                        kinds: change.kinds.clone(),
                        alive: true,
                        added_at: seq,
                        removed_at: None,
                    },
                );
            }
            GameEvent::EntityRemoved(change) => {
                match self.entities.get_mut(&change.entity) {
                    Some(entry) if entry.alive => {
                        entry.alive = false;
                        entry.removed_at = Some(seq);
                        self.removed.push_back(change.entity);
                        self.evict_removed();
                    }
                    Some(_) => {}
                    None => tracing::debug!(entity = %change.entity, "removal of unmirrored entity"),
                }
                if self.boss.as_ref().map(|b| b.entity) == Some(change.entity) {
                    self.boss_active = false;
                }
                if self.player.entity == Some(change.entity) {
                    self.player.entity = None;
                }
                if self.pending_rewards.as_ref().map(|r| r.entity) == Some(change.entity) {
                    self.pending_rewards = None;
                }
            }
            GameEvent::BossSpawned(spawned) => {
                if let Some(entry) = self.entities.get_mut(&spawned.entity) {
                    entry.role = EntityRole::Boss;
                }
                self.boss_active = true;
                self.boss = Some(BossSummary {
                    entity: spawned.entity,
                    variant_id: spawned.variant_id.clone(),
                    wave: spawned.wave,
                });
            }
            GameEvent::PlayerLevelUp(up) => {
                if self.player.entity.map_or(true, |p| p == up.entity) {
                    self.player.level = self.player.level.max(up.level);
                }
            }
            GameEvent::EnemyKilled(killed) => {
                self.kills += 1;
                self.xp_from_kills += killed.xp_reward;
                if self.boss.as_ref().map(|b| b.entity) == Some(killed.entity) {
                    self.boss_active = false;
                }
            }
            GameEvent::PassiveBonusApplied(applied) => {
                self.applied_bonuses.push(*applied);
                let spent = match self.pending_rewards.as_mut() {
                    Some(rewards) if rewards.entity == applied.entity => {
                        rewards.pending = applied.pending;
                        applied.pending == 0
                    }
                    _ => false,
                };
                if spent {
                    self.pending_rewards = None;
                }
            }
            GameEvent::LevelUpRewardsAvailable(rewards) => {
                self.pending_rewards = Some(rewards.clone());
            }
            GameEvent::PlayerKilled(killed) => {
                self.player.killed = true;
                self.player.killed_by = killed.source_id;
            }
            GameEvent::PassiveBonusSelected(_) | GameEvent::XpCollected(_) => {}
        }

        if self.max_history > 0 {
            self.history.push_back(HistoryEntry {
                seq,
                event: event.clone(),
            });
            while self.history.len() > self.max_history {
                self.history.pop_front();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
