//! Level-up rewards.
//!
//! Each `playerLevelUp` adds one pending reward for the entity and schedules a
//! `levelUpRewardsAvailable` catalog. A `passiveBonusSelected` spends one
//! pending reward on one bonus. Both are applied in
//! [`apply_deferred`](System::apply_deferred) so a choice made while the
//! engine is paused still lands.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use deadlands_ecs::bus::{EventBus, HandlerId};
use deadlands_ecs::components::{Attack, Health, PassiveBonusKind, PassiveBonuses};
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::events::{
    BonusChoice, GameEvent, LevelUpRewardsAvailable, PassiveBonusApplied, Topic,
};
use deadlands_ecs::world::World;

use crate::config::EngineConfig;

use super::System;

/// Every bonus kind with its current value and whether it can still be taken.
pub fn bonus_catalog(bonuses: &PassiveBonuses) -> Vec<BonusChoice> {
    PassiveBonusKind::ALL
        .iter()
        .map(|&bonus| BonusChoice {
            bonus,
            current: bonuses.value(bonus),
            max: bonus.max(),
            step: bonus.step(),
            available: !bonuses.is_maxed(bonus),
        })
        .collect()
}

struct Selection {
    entity: Option<EntityId>,
    bonus: PassiveBonusKind,
}

#[derive(Default)]
struct Inbox {
    pending: HashMap<EntityId, u32>,
    catalogs_due: Vec<EntityId>,
    selections: VecDeque<Selection>,
}

pub struct ProgressionSystem {
    bus: EventBus,
    heal_fraction: f64,
    inbox: Rc<RefCell<Inbox>>,
    handlers: Vec<HandlerId>,
}

impl ProgressionSystem {
    pub const NAME: &'static str = "progression";

    pub fn new(config: &EngineConfig, bus: EventBus) -> Self {
        Self {
            bus,
            heal_fraction: config.progression.heal_fraction,
            inbox: Rc::new(RefCell::new(Inbox::default())),
            handlers: Vec::new(),
        }
    }

    /// Unspent rewards of `entity`.
    pub fn pending_rewards(&self, entity: EntityId) -> u32 {
        self.inbox
            .borrow()
            .pending
            .get(&entity)
            .copied()
            .unwrap_or(0)
    }

    fn apply_selection(&self, world: &mut World, entity: EntityId, bonus: PassiveBonusKind) {
        if self.pending_rewards(entity) == 0 {
            tracing::debug!(entity = %entity, ?bonus, "bonus selected with no pending reward");
            return;
        }
        let Some(bonuses) = world.get_mut::<PassiveBonuses>(entity) else {
            tracing::warn!(entity = %entity, "bonus target has no passive bonuses");
            return;
        };
        let before = bonuses.value(bonus);
        if !bonuses.bump(bonus) {
            tracing::debug!(entity = %entity, ?bonus, "bonus already at maximum");
            return;
        }
        let value = bonuses.value(bonus);
        let damage = bonuses.effective_damage();
        let cooldown = bonuses.effective_attack_cooldown();

        let remaining = {
            let mut inbox = self.inbox.borrow_mut();
            let count = inbox.pending.entry(entity).or_insert(0);
            *count = count.saturating_sub(1);
            let remaining = *count;
            if remaining > 0 {
                inbox.catalogs_due.push(entity);
            }
            remaining
        };

        if let Some(attack) = world.get_mut::<Attack>(entity) {
            attack.damage = damage;
            attack.cooldown = cooldown;
            attack.cooldown_timer = attack.cooldown_timer.min(cooldown);
        }
        if let Some(health) = world.get_mut::<Health>(entity) {
            match bonus {
                PassiveBonusKind::Health => {
                    let gained = value - before;
                    health.max_hp += gained;
                    if health.hp > 0.0 {
                        health.hp += gained;
                    }
                }
                PassiveBonusKind::Heal if health.hp > 0.0 => {
                    health.hp = (health.hp + health.max_hp * self.heal_fraction).min(health.max_hp);
                }
                _ => {}
            }
        }

        tracing::info!(entity = %entity, ?bonus, value, pending = remaining, "bonus applied");
        self.bus.emit(GameEvent::PassiveBonusApplied(PassiveBonusApplied {
            entity,
            bonus,
            value,
            pending: remaining,
        }));
    }

    fn publish_catalog(&self, world: &World, entity: EntityId) {
        let pending = self.pending_rewards(entity);
        if pending == 0 {
            return;
        }
        let Some(bonuses) = world.get::<PassiveBonuses>(entity) else {
            tracing::warn!(entity = %entity, "level-up target has no passive bonuses");
            return;
        };
        self.bus
            .emit(GameEvent::LevelUpRewardsAvailable(LevelUpRewardsAvailable {
                entity,
                pending,
                choices: bonus_catalog(bonuses),
            }));
    }
}

impl System for ProgressionSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, _world: &mut World) {
        let inbox = Rc::clone(&self.inbox);
        let level_up = self.bus.on(Topic::PlayerLevelUp, move |event| {
            let GameEvent::PlayerLevelUp(up) = event else {
                return;
            };
            let mut inbox = inbox.borrow_mut();
            *inbox.pending.entry(up.entity).or_insert(0) += 1;
            if !inbox.catalogs_due.contains(&up.entity) {
                inbox.catalogs_due.push(up.entity);
            }
        });

        let inbox = Rc::clone(&self.inbox);
        let selected = self.bus.on(Topic::PassiveBonusSelected, move |event| {
            let GameEvent::PassiveBonusSelected(selection) = event else {
                return;
            };
            let Some(bonus) = selection.bonus else {
                tracing::warn!("bonus selection without a bonus; discarding");
                return;
            };
            inbox.borrow_mut().selections.push_back(Selection {
                entity: selection.entity,
                bonus,
            });
        });

        self.handlers = vec![level_up, selected];
    }

    fn update(&mut self, _world: &mut World, _dt: f64) {}

    fn apply_deferred(&mut self, world: &mut World) {
        let selections: Vec<Selection> = self.inbox.borrow_mut().selections.drain(..).collect();
        for selection in selections {
            match selection.entity.or_else(|| world.player()) {
                Some(entity) => self.apply_selection(world, entity, selection.bonus),
                None => tracing::warn!(bonus = ?selection.bonus, "bonus selection with no target"),
            }
        }

        let due = std::mem::take(&mut self.inbox.borrow_mut().catalogs_due);
        for entity in due {
            self.publish_catalog(world, entity);
        }
    }

    fn teardown(&mut self, _world: &mut World) {
        for id in self.handlers.drain(..) {
            self.bus.off(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
