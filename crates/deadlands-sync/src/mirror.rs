//! Bus subscription and inbound publishing.

use std::cell::RefCell;
use std::rc::Rc;

use deadlands_ecs::bus::{EventBus, HandlerId};
use deadlands_ecs::components::PassiveBonusKind;
use deadlands_ecs::entity::EntityId;
use deadlands_ecs::events::{GameEvent, PassiveBonusSelected, Topic, XpCollected};

use crate::state::MirroredState;
use crate::SyncError;

/// Topics folded into the mirrored state.
pub const MIRRORED_TOPICS: [Topic; 8] = [
    Topic::EntityAdded,
    Topic::EntityRemoved,
    Topic::BossSpawned,
    Topic::PlayerLevelUp,
    Topic::EnemyKilled,
    Topic::PassiveBonusApplied,
    Topic::LevelUpRewardsAvailable,
    Topic::PlayerKilled,
];

/// Topics the application side may publish.
pub const INBOUND_TOPICS: [Topic; 2] = [Topic::PassiveBonusSelected, Topic::XpCollected];

/// Keeps a [`MirroredState`] in step with the bus.
///
/// Events published through the mirror go straight onto the bus. The engine
/// picks up a bonus selection in the deferred phase of its next frame (which
/// also runs while paused) and XP on its next unpaused update.
pub struct StateMirror {
    bus: EventBus,
    state: Rc<RefCell<MirroredState>>,
    handlers: Vec<HandlerId>,
}

impl StateMirror {
    /// Subscribe to every mirrored topic on `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        Self::attach_with(bus, MirroredState::new())
    }

    pub fn with_max_history(bus: &EventBus, max_history: usize) -> Self {
        Self::attach_with(bus, MirroredState::with_max_history(max_history))
    }

    /// Attach with explicit history and dead-entry windows.
    pub fn with_limits(bus: &EventBus, max_history: usize, max_removed: usize) -> Self {
        Self::attach_with(bus, MirroredState::with_limits(max_history, max_removed))
    }

    fn attach_with(bus: &EventBus, state: MirroredState) -> Self {
        let state = Rc::new(RefCell::new(state));
        let handlers = MIRRORED_TOPICS
            .iter()
            .map(|&topic| {
                let state = Rc::clone(&state);
                bus.on(topic, move |event| state.borrow_mut().apply(event))
            })
            .collect();
        tracing::debug!(topics = MIRRORED_TOPICS.len(), "state mirror attached");
        Self {
            bus: bus.clone(),
            state,
            handlers,
        }
    }

    /// Unsubscribe. The state keeps its last contents. Returns the number of
    /// handlers removed.
    pub fn detach(&mut self) -> usize {
        let removed = self
            .handlers
            .drain(..)
            .filter(|&id| self.bus.off(id))
            .count();
        if removed > 0 {
            tracing::debug!(removed, "state mirror detached");
        }
        removed
    }

    pub fn is_attached(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> MirroredState {
        self.state.borrow().clone()
    }

    /// Read the state in place.
    pub fn with_state<R>(&self, f: impl FnOnce(&MirroredState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, SyncError> {
        Ok(serde_json::to_value(&*self.state.borrow())?)
    }

    // -- inbound ------------------------------------------------------------

    /// Ask for one step of `bonus`. A missing `entity` means the player.
    pub fn publish_bonus_selection(&self, entity: Option<EntityId>, bonus: PassiveBonusKind) {
        self.bus.emit(GameEvent::PassiveBonusSelected(PassiveBonusSelected {
            entity,
            bonus: Some(bonus),
        }));
    }

    /// Award `amount` XP. A missing `entity` means the player.
    pub fn publish_xp_collected(&self, entity: Option<EntityId>, amount: f64) -> Result<(), SyncError> {
        check_amount(amount)?;
        self.bus
            .emit(GameEvent::XpCollected(XpCollected { entity, amount }));
        Ok(())
    }

    /// Publish a payload from the application side.
    ///
    /// Only the inbound topics are accepted. Anything else, an unknown topic
    /// or a payload that does not parse is logged and discarded.
    pub fn publish_json(&self, topic: &str, payload: serde_json::Value) -> Result<(), SyncError> {
        let result = parse_inbound(topic, payload);
        match result {
            Ok(event) => {
                self.bus.emit(event);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(topic, error = %err, "discarding inbound payload");
                Err(err)
            }
        }
    }
}

fn check_amount(amount: f64) -> Result<(), SyncError> {
    if amount > 0.0 && amount.is_finite() {
        Ok(())
    } else {
        Err(SyncError::InvalidAmount { amount })
    }
}

fn parse_inbound(topic: &str, payload: serde_json::Value) -> Result<GameEvent, SyncError> {
    let parsed = Topic::parse(topic)?;
    if !INBOUND_TOPICS.contains(&parsed) {
        return Err(SyncError::NotInbound {
            topic: topic.to_owned(),
        });
    }
    let event = GameEvent::from_json(topic, payload)?;
    if let GameEvent::XpCollected(xp) = &event {
        check_amount(xp.amount)?;
    }
    Ok(event)
}

impl Drop for StateMirror {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for StateMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMirror")
            .field("attached", &self.is_attached())
            .field("seq", &self.state.borrow().seq)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use deadlands_ecs::components::{Player, Position};
    use deadlands_ecs::world::{EntityBundle, World};
    use serde_json::json;

    fn capture(bus: &EventBus, topic: Topic) -> Rc<RefCell<Vec<GameEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        bus.on(topic, move |e| sink.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn attach_subscribes_every_mirrored_topic() {
        let bus = EventBus::new();
        let mut mirror = StateMirror::attach(&bus);
        for topic in MIRRORED_TOPICS {
            assert_eq!(bus.listener_count(topic), 1);
        }
        for topic in INBOUND_TOPICS {
            assert_eq!(bus.listener_count(topic), 0);
        }

        assert_eq!(mirror.detach(), MIRRORED_TOPICS.len());
        assert_eq!(mirror.detach(), 0);
        assert!(!mirror.is_attached());
        for topic in MIRRORED_TOPICS {
            assert_eq!(bus.listener_count(topic), 0);
        }
    }

    #[test]
    fn drop_detaches() {
        let bus = EventBus::new();
        drop(StateMirror::attach(&bus));
        assert_eq!(bus.listener_count(Topic::EntityAdded), 0);
    }

    #[test]
    fn detached_state_is_frozen() {
        let bus = EventBus::new();
        let mut world = World::new(bus.clone());
        let mut mirror = StateMirror::attach(&bus);
        world.add_entity(EntityBundle::new().with(Player).with(Position::new(0.0, 0.0)));
        mirror.detach();
        world.add_entity(EntityBundle::new().with(Position::new(1.0, 1.0)));
        assert_eq!(mirror.with_state(|s| s.entities.len()), 1);
    }

    #[test]
    fn typed_publishers_reach_the_bus() {
        let bus = EventBus::new();
        let mirror = StateMirror::attach(&bus);
        let picks = capture(&bus, Topic::PassiveBonusSelected);
        let xp = capture(&bus, Topic::XpCollected);

        mirror.publish_bonus_selection(None, PassiveBonusKind::Heal);
        mirror.publish_xp_collected(None, 12.5).unwrap();
        assert!(matches!(
            mirror.publish_xp_collected(None, -1.0),
            Err(SyncError::InvalidAmount { .. })
        ));

        assert_eq!(
            picks.borrow().as_slice(),
            &[GameEvent::PassiveBonusSelected(PassiveBonusSelected {
                entity: None,
                bonus: Some(PassiveBonusKind::Heal),
            })]
        );
        assert_eq!(xp.borrow().len(), 1);
    }

    #[test]
    fn json_publishing_accepts_only_inbound_topics() {
        let bus = EventBus::new();
        let mirror = StateMirror::attach(&bus);
        let xp = capture(&bus, Topic::XpCollected);

        mirror.publish_json("xpCollected", json!({ "amount": 40 })).unwrap();
        assert!(matches!(
            mirror.publish_json("playerLevelUp", json!({ "entity": 0, "level": 2 })),
            Err(SyncError::NotInbound { .. })
        ));
        assert!(matches!(
            mirror.publish_json("nope", json!({})),
            Err(SyncError::Event(_))
        ));
        assert!(matches!(
            mirror.publish_json("xpCollected", json!({})),
            Err(SyncError::Event(_))
        ));
        assert!(matches!(
            mirror.publish_json("xpCollected", json!({ "amount": 0 })),
            Err(SyncError::InvalidAmount { .. })
        ));
        assert_eq!(xp.borrow().len(), 1);
        assert_eq!(mirror.state().player.level, 1);
    }

    #[test]
    fn to_json_matches_state() {
        let bus = EventBus::new();
        let mut world = World::new(bus.clone());
        let mirror = StateMirror::attach(&bus);
        world.add_entity(EntityBundle::new().with(Player));
        let json = mirror.to_json().unwrap();
        assert_eq!(json["seq"], json!(1));
        assert_eq!(json["player"]["level"], json!(1));
    }
}
