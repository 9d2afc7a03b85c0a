#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use home_mind::config::CoordinatorConfig;
use home_mind::kernel::assistant::AssistantState;
use home_mind::kernel::time::ManualClock;
use home_mind::services::{AssistantSatellite, DeviceEntry, GenerationService, Registry, Services};
use home_mind::DecisionCoordinator;

pub const ENTRY_ID: &str = "entry_1";
pub const FACE: &str = "sensor.last_recognized_face";
pub const SATELLITE: &str = "assist_satellite.kitchen";
pub const OWN_DEVICE: &str = "device_home_mind";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 7, 30, 0).unwrap()
}

/// In-memory stand-in for the generation service, satellite and registry.
pub struct FakeHost {
    pub reply: Mutex<String>,
    pub prompts: Mutex<Vec<String>>,
    pub fail_generation: AtomicBool,
    pub generation_delay: Mutex<Option<Duration>>,
    pub satellite_state: Mutex<Option<AssistantState>>,
    pub fail_start: AtomicBool,
    pub conversations: Mutex<Vec<(String, String, bool)>>,
    pub interrupts: AtomicUsize,
    pub own_device: Mutex<Option<String>>,
    pub devices: Mutex<HashMap<String, DeviceEntry>>,
    pub title: Mutex<String>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new("Hi Alice".into()),
            prompts: Mutex::new(Vec::new()),
            fail_generation: AtomicBool::new(false),
            generation_delay: Mutex::new(None),
            satellite_state: Mutex::new(Some(AssistantState::Idle)),
            fail_start: AtomicBool::new(false),
            conversations: Mutex::new(Vec::new()),
            interrupts: AtomicUsize::new(0),
            own_device: Mutex::new(Some(OWN_DEVICE.into())),
            devices: Mutex::new(HashMap::new()),
            title: Mutex::new("Home Mind".into()),
        })
    }

    pub fn set_reply(&self, text: &str) {
        *self.reply.lock().unwrap() = text.into();
    }

    pub fn set_satellite_state(&self, state: Option<AssistantState>) {
        *self.satellite_state.lock().unwrap() = state;
    }

    pub fn add_device(&self, id: &str, name_by_user: Option<&str>) {
        self.devices.lock().unwrap().insert(
            id.into(),
            DeviceEntry {
                id: id.into(),
                name: Some("Home Mind".into()),
                name_by_user: name_by_user.map(str::to_string),
            },
        );
    }

    pub fn generation_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn conversations(&self) -> Vec<(String, String, bool)> {
        self.conversations.lock().unwrap().clone()
    }

    pub fn title(&self) -> String {
        self.title.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for FakeHost {
    async fn generate_content(&self, prompt: &str, config_entry_id: &str) -> Result<String> {
        assert_eq!(config_entry_id, ENTRY_ID);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let delay = *self.generation_delay.lock().unwrap();
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            // Give concurrently triggered handlers a chance to run.
            None => {
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                }
            }
        }

        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(anyhow!("generation service unavailable"));
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

#[async_trait]
impl AssistantSatellite for FakeHost {
    async fn state(&self, entity_id: &str) -> Result<Option<AssistantState>> {
        assert_eq!(entity_id, SATELLITE);
        Ok(self.satellite_state.lock().unwrap().clone())
    }

    async fn start_conversation(
        &self,
        entity_id: &str,
        start_message: &str,
        preannounce: bool,
    ) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(anyhow!("satellite offline"));
        }
        self.conversations.lock().unwrap().push((
            entity_id.to_string(),
            start_message.to_string(),
            preannounce,
        ));
        Ok(())
    }

    async fn interrupt_conversation(&self, _entity_id: &str) -> Result<()> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Registry for FakeHost {
    async fn own_device_id(&self, entry_id: &str) -> Result<Option<String>> {
        assert_eq!(entry_id, ENTRY_ID);
        Ok(self.own_device.lock().unwrap().clone())
    }

    async fn device(&self, device_id: &str) -> Result<Option<DeviceEntry>> {
        Ok(self.devices.lock().unwrap().get(device_id).cloned())
    }

    async fn entry_title(&self, _entry_id: &str) -> Result<String> {
        Ok(self.title())
    }

    async fn update_entry_title(&self, _entry_id: &str, title: &str) -> Result<()> {
        *self.title.lock().unwrap() = title.to_string();
        Ok(())
    }
}

pub fn config() -> CoordinatorConfig {
    CoordinatorConfig::new(ENTRY_ID, FACE, SATELLITE)
}

pub fn coordinator(host: &Arc<FakeHost>, clock: &Arc<ManualClock>) -> DecisionCoordinator {
    DecisionCoordinator::new(config(), Services::from_host(host.clone()), clock.clone())
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
