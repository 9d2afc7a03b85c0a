//! Configuration surface.
//!
//! Settings live in a host-style config entry: `data` written at setup,
//! `options` edited afterwards (options win), and typed subentries. The
//! coordinator only ever sees the resolved, immutable [`CoordinatorConfig`].

use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::consts::{
    CONF_ASSIST_SATELLITE_ENTITY, CONF_GENERATION_TIMEOUT_SECS, CONF_HOLD_OFF_TIME_MINUTES,
    CONF_LAST_RECOGNIZED_FACE_ENTITY, GENERATION_TIMEOUT_SECS, HOLD_OFF_TIME_MINUTES, NAME,
    SUBENTRY_CONVERSATION,
};
use crate::error::{HomeMindError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSubentry {
    pub subentry_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub subentries: Vec<ConfigSubentry>,
}

fn default_title() -> String {
    NAME.to_string()
}

/// Options take precedence over the data captured at setup.
pub fn get_parameter<'a>(entry: &'a ConfigEntry, parameter: &str) -> Option<&'a Value> {
    entry
        .options
        .get(parameter)
        .or_else(|| entry.data.get(parameter))
}

/// Reads `parameter` from the first subentry of `subentry_type`.
pub fn get_subentry_parameter<'a>(
    entry: &'a ConfigEntry,
    subentry_type: &str,
    parameter: &str,
) -> Option<&'a Value> {
    entry
        .subentries
        .iter()
        .find(|sub| sub.subentry_type == subentry_type)
        .and_then(|sub| sub.data.get(parameter))
}

pub fn is_float(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

fn lookup<'a>(entry: &'a ConfigEntry, key: &str) -> Option<&'a Value> {
    get_subentry_parameter(entry, SUBENTRY_CONVERSATION, key).or_else(|| get_parameter(entry, key))
}

fn required_entity(entry: &ConfigEntry, key: &str) -> Result<String> {
    match lookup(entry, key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(other) if !other.is_null() && !other.is_string() => Err(HomeMindError::InvalidParameter {
            key: key.to_string(),
            reason: format!("expected an entity id, got {other}"),
        }),
        _ => Err(HomeMindError::MissingParameter(key.to_string())),
    }
}

/// About 100 years.
const MAX_HOLD_OFF_MILLIS: i64 = 100 * 366 * 24 * 60 * 60 * 1000;

fn numeric(entry: &ConfigEntry, key: &str, default: f64) -> Result<f64> {
    let Some(value) = lookup(entry, key) else {
        return Ok(default);
    };
    if !is_float(value) {
        return Err(HomeMindError::InvalidParameter {
            key: key.to_string(),
            reason: format!("{value} is not a number"),
        });
    }
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(default),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(default),
        _ => default,
    };
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(HomeMindError::InvalidParameter {
            key: key.to_string(),
            reason: format!("{parsed} must be a non-negative number"),
        });
    }
    Ok(parsed)
}

fn hold_off_from_minutes(minutes: f64) -> Option<TimeDelta> {
    let millis = (minutes * 60_000.0).round();
    if millis > MAX_HOLD_OFF_MILLIS as f64 {
        return None;
    }
    TimeDelta::try_milliseconds(millis as i64)
}

fn out_of_range(key: &str, value: f64) -> HomeMindError {
    HomeMindError::InvalidParameter {
        key: key.to_string(),
        reason: format!("{value} is out of range"),
    }
}

/// Resolved settings for one coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub entry_id: String,
    pub last_recognized_face_entity_id: String,
    pub assist_satellite_entity_id: String,
    pub hold_off: TimeDelta,
    pub generation_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new(
        entry_id: impl Into<String>,
        last_recognized_face_entity_id: impl Into<String>,
        assist_satellite_entity_id: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            last_recognized_face_entity_id: last_recognized_face_entity_id.into(),
            assist_satellite_entity_id: assist_satellite_entity_id.into(),
            hold_off: TimeDelta::minutes(HOLD_OFF_TIME_MINUTES),
            generation_timeout: Duration::from_secs(GENERATION_TIMEOUT_SECS),
        }
    }

    pub fn from_entry(entry: &ConfigEntry) -> Result<Self> {
        let face = required_entity(entry, CONF_LAST_RECOGNIZED_FACE_ENTITY)?;
        let satellite = required_entity(entry, CONF_ASSIST_SATELLITE_ENTITY)?;

        let minutes = numeric(entry, CONF_HOLD_OFF_TIME_MINUTES, HOLD_OFF_TIME_MINUTES as f64)?;
        let timeout_secs = numeric(
            entry,
            CONF_GENERATION_TIMEOUT_SECS,
            GENERATION_TIMEOUT_SECS as f64,
        )?;

        let hold_off = hold_off_from_minutes(minutes)
            .ok_or_else(|| out_of_range(CONF_HOLD_OFF_TIME_MINUTES, minutes))?;
        let generation_timeout = Duration::try_from_secs_f64(timeout_secs)
            .map_err(|_| out_of_range(CONF_GENERATION_TIMEOUT_SECS, timeout_secs))?;

        let config = Self {
            entry_id: entry.entry_id.clone(),
            last_recognized_face_entity_id: face,
            assist_satellite_entity_id: satellite,
            hold_off,
            generation_timeout,
        };
        debug!(?config, "Resolved coordinator config");
        Ok(config)
    }
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeAssistantConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// The device created for this integration, if the host registered one.
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Daemon configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub home_assistant: HomeAssistantConfig,
    pub entry: ConfigEntry,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::parse(&raw)?;
        if let Ok(token) = std::env::var("HOME_MIND_TOKEN") {
            config.home_assistant.token = Some(token);
        }
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        CoordinatorConfig::from_entry(&config.entry)?;
        Ok(config)
    }
}
