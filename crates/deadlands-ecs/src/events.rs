//! Event topics and payloads carried by the [`EventBus`](crate::bus::EventBus).
//!
//! Topic names and payload field names are the contract with the state-sync
//! layer; both serialize in camelCase. A [`GameEvent`] serializes as
//! `{"topic": "...", "payload": {...}}`.

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;
use crate::components::{PassiveBonusKind, Position};
use crate::entity::EntityId;
use crate::EventError;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// Every topic the simulation publishes or accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    EntityAdded,
    EntityRemoved,
    BossSpawned,
    PlayerLevelUp,
    EnemyKilled,
    PassiveBonusApplied,
    LevelUpRewardsAvailable,
    PassiveBonusSelected,
    XpCollected,
    /// Internal: freezes the engine.
    PlayerKilled,
}

impl Topic {
    pub const ALL: [Topic; 10] = [
        Topic::EntityAdded,
        Topic::EntityRemoved,
        Topic::BossSpawned,
        Topic::PlayerLevelUp,
        Topic::EnemyKilled,
        Topic::PassiveBonusApplied,
        Topic::LevelUpRewardsAvailable,
        Topic::PassiveBonusSelected,
        Topic::XpCollected,
        Topic::PlayerKilled,
    ];

    /// Wire name of the topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::EntityAdded => "entityAdded",
            Topic::EntityRemoved => "entityRemoved",
            Topic::BossSpawned => "bossSpawned",
            Topic::PlayerLevelUp => "playerLevelUp",
            Topic::EnemyKilled => "enemyKilled",
            Topic::PassiveBonusApplied => "passiveBonusApplied",
            Topic::LevelUpRewardsAvailable => "levelUpRewardsAvailable",
            Topic::PassiveBonusSelected => "passiveBonusSelected",
            Topic::XpCollected => "xpCollected",
            Topic::PlayerKilled => "playerKilled",
        }
    }

    /// Look a topic up by wire name.
    pub fn parse(name: &str) -> Result<Topic, EventError> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| EventError::UnknownTopic {
                topic: name.to_owned(),
            })
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `entityAdded` / `entityRemoved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    pub entity: EntityId,
    pub kinds: Vec<ComponentKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossSpawned {
    pub entity: EntityId,
    pub variant_id: String,
    pub wave: u32,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerLevelUp {
    pub entity: EntityId,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyKilled {
    pub entity: EntityId,
    pub source_id: Option<EntityId>,
    pub xp_reward: f64,
    pub variant_id: Option<String>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassiveBonusApplied {
    pub entity: EntityId,
    pub bonus: PassiveBonusKind,
    pub value: f64,
    pub pending: u32,
}

/// One offered bonus in a `levelUpRewardsAvailable` catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusChoice {
    pub bonus: PassiveBonusKind,
    pub current: f64,
    pub max: f64,
    pub step: f64,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpRewardsAvailable {
    pub entity: EntityId,
    pub pending: u32,
    pub choices: Vec<BonusChoice>,
}

/// Published from outside the simulation. Both fields may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveBonusSelected {
    #[serde(default)]
    pub entity: Option<EntityId>,
    #[serde(default)]
    pub bonus: Option<PassiveBonusKind>,
}

/// XP reward. A missing entity means "the player".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpCollected {
    #[serde(default)]
    pub entity: Option<EntityId>,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerKilled {
    pub entity: EntityId,
    pub source_id: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// A published event: a topic plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "camelCase")]
pub enum GameEvent {
    EntityAdded(EntityChange),
    EntityRemoved(EntityChange),
    BossSpawned(BossSpawned),
    PlayerLevelUp(PlayerLevelUp),
    EnemyKilled(EnemyKilled),
    PassiveBonusApplied(PassiveBonusApplied),
    LevelUpRewardsAvailable(LevelUpRewardsAvailable),
    PassiveBonusSelected(PassiveBonusSelected),
    XpCollected(XpCollected),
    PlayerKilled(PlayerKilled),
}

impl GameEvent {
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::EntityAdded(_) => Topic::EntityAdded,
            GameEvent::EntityRemoved(_) => Topic::EntityRemoved,
            GameEvent::BossSpawned(_) => Topic::BossSpawned,
            GameEvent::PlayerLevelUp(_) => Topic::PlayerLevelUp,
            GameEvent::EnemyKilled(_) => Topic::EnemyKilled,
            GameEvent::PassiveBonusApplied(_) => Topic::PassiveBonusApplied,
            GameEvent::LevelUpRewardsAvailable(_) => Topic::LevelUpRewardsAvailable,
            GameEvent::PassiveBonusSelected(_) => Topic::PassiveBonusSelected,
            GameEvent::XpCollected(_) => Topic::XpCollected,
            GameEvent::PlayerKilled(_) => Topic::PlayerKilled,
        }
    }

    /// Build an event from a topic name and a JSON payload.
    pub fn from_json(topic: &str, payload: serde_json::Value) -> Result<GameEvent, EventError> {
        let topic = Topic::parse(topic)?;
        let envelope = serde_json::json!({ "topic": topic.as_str(), "payload": payload });
        serde_json::from_value(envelope).map_err(|e| EventError::MalformedPayload {
            topic: topic.as_str().to_owned(),
            details: e.to_string(),
        })
    }

    /// The payload alone, as JSON.
    pub fn payload_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("payload").unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_names_round_trip() {
        for topic in Topic::ALL {
            assert_eq!(Topic::parse(topic.as_str()).unwrap(), topic);
            assert_eq!(
                serde_json::to_value(topic).unwrap(),
                json!(topic.as_str())
            );
        }
        assert!(matches!(
            Topic::parse("nope"),
            Err(EventError::UnknownTopic { .. })
        ));
    }

    #[test]
    fn enemy_killed_payload_shape() {
        let event = GameEvent::EnemyKilled(EnemyKilled {
            entity: EntityId::new(4, 1),
            source_id: Some(EntityId::new(0, 0)),
            xp_reward: 12.0,
            variant_id: Some("walker".into()),
            position: Position::new(1.0, 2.0),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["topic"], json!("enemyKilled"));
        assert_eq!(value["payload"]["xpReward"], json!(12.0));
        assert_eq!(value["payload"]["sourceId"], json!(0));
        assert_eq!(value["payload"]["variantId"], json!("walker"));
        assert_eq!(event.payload_json()["position"], json!({"x": 1.0, "y": 2.0}));
    }

    #[test]
    fn selection_accepts_missing_fields() {
        let event = GameEvent::from_json("passiveBonusSelected", json!({})).unwrap();
        assert_eq!(
            event,
            GameEvent::PassiveBonusSelected(PassiveBonusSelected::default())
        );
        let event =
            GameEvent::from_json("passiveBonusSelected", json!({"entity": 3, "bonus": "xpGain"}))
                .unwrap();
        assert_eq!(
            event,
            GameEvent::PassiveBonusSelected(PassiveBonusSelected {
                entity: Some(EntityId::from_raw(3)),
                bonus: Some(PassiveBonusKind::XpGain),
            })
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = GameEvent::from_json("playerLevelUp", json!({"level": 2})).unwrap_err();
        assert!(matches!(err, EventError::MalformedPayload { .. }));
        let err = GameEvent::from_json("xpCollected", json!({"amount": "lots"})).unwrap_err();
        assert!(matches!(err, EventError::MalformedPayload { .. }));
    }
}
