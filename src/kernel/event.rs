use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Snapshot of one entity's state as carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(alias = "value")]
    pub state: String,
    #[serde(alias = "entered_at")]
    pub last_changed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangedData {
    pub entity_id: String,
    #[serde(default)]
    pub old_state: Option<EntityState>,
    #[serde(default)]
    pub new_state: Option<EntityState>,
}

/// Payload of `home_mind_event`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceData {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRegistryUpdatedData {
    #[serde(default)]
    pub action: Option<String>,
    pub device_id: String,
    #[serde(default)]
    pub changes: Option<Map<String, Value>>,
}

impl DeviceRegistryUpdatedData {
    pub fn changes_name_by_user(&self) -> bool {
        self.changes
            .as_ref()
            .is_some_and(|changes| changes.contains_key("name_by_user"))
    }
}

/// Inbound bus events, validated once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data")]
pub enum HomeEvent {
    #[serde(rename = "state_changed")]
    StateChanged(StateChangedData),
    #[serde(rename = "home_mind_event")]
    Sentence(SentenceData),
    #[serde(rename = "device_registry_updated")]
    DeviceRegistryUpdated(DeviceRegistryUpdatedData),
}

impl HomeEvent {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn event_type(&self) -> &'static str {
        use crate::consts::{EVENT_DEVICE_REGISTRY_UPDATED, EVENT_HOME_MIND, EVENT_STATE_CHANGED};

        match self {
            HomeEvent::StateChanged(_) => EVENT_STATE_CHANGED,
            HomeEvent::Sentence(_) => EVENT_HOME_MIND,
            HomeEvent::DeviceRegistryUpdated(_) => EVENT_DEVICE_REGISTRY_UPDATED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_state_change_with_spec_field_names() {
        let raw = r#"{
            "event_type": "state_changed",
            "data": {
                "entity_id": "assist_satellite.kitchen",
                "old_state": {"value": "idle", "entered_at": "2025-06-01T12:00:00Z"},
                "new_state": {"state": "listening", "last_changed": "2025-06-01T12:00:30Z"}
            }
        }"#;
        let HomeEvent::StateChanged(data) = HomeEvent::from_json(raw).unwrap() else {
            panic!("expected state change");
        };
        assert_eq!(data.entity_id, "assist_satellite.kitchen");
        assert_eq!(data.old_state.unwrap().state, "idle");
        assert_eq!(data.new_state.unwrap().state, "listening");
    }

    #[test]
    fn sentence_without_text_is_accepted() {
        let event = HomeEvent::from_json(r#"{"event_type": "home_mind_event", "data": {}}"#).unwrap();
        assert_eq!(event, HomeEvent::Sentence(SentenceData { text: None }));
        assert_eq!(event.event_type(), "home_mind_event");
    }

    #[test]
    fn device_update_detects_name_change() {
        let event = HomeEvent::from_json(
            r#"{"event_type": "device_registry_updated",
                "data": {"action": "update", "device_id": "dev1", "changes": {"name_by_user": null}}}"#,
        )
        .unwrap();
        let HomeEvent::DeviceRegistryUpdated(data) = event else {
            panic!("expected device update");
        };
        assert!(data.changes_name_by_user());
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(HomeEvent::from_json(r#"{"event_type": "call_service", "data": {}}"#).is_err());
        assert!(HomeEvent::from_json("not json").is_err());
    }
}
