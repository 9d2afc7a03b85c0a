//! Collaborators the decision core calls out to.
//!
//! Each trait is a black box owned by the host platform; the core only sees
//! these request/response shapes. Every call is an await point.

pub mod home_assistant;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::kernel::assistant::AssistantState;

/// Turns a prompt into a short spoken message.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_content(&self, prompt: &str, config_entry_id: &str) -> Result<String>;
}

/// The voice assistant satellite driver.
#[async_trait]
pub trait AssistantSatellite: Send + Sync {
    /// Current state, or `None` when the entity is not known to the host.
    async fn state(&self, entity_id: &str) -> Result<Option<AssistantState>>;

    async fn start_conversation(
        &self,
        entity_id: &str,
        start_message: &str,
        preannounce: bool,
    ) -> Result<()>;

    /// Available on the device but never issued by the decision core. This is
    /// where taking over a user-initiated conversation would hook in.
    async fn interrupt_conversation(&self, entity_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub id: String,
    pub name: Option<String>,
    pub name_by_user: Option<String>,
}

/// Entity/device registry plus the config entry store.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Device owning this config entry's entities, if any.
    async fn own_device_id(&self, entry_id: &str) -> Result<Option<String>>;

    async fn device(&self, device_id: &str) -> Result<Option<DeviceEntry>>;

    async fn entry_title(&self, entry_id: &str) -> Result<String>;

    async fn update_entry_title(&self, entry_id: &str, title: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct Services {
    pub generation: Arc<dyn GenerationService>,
    pub satellite: Arc<dyn AssistantSatellite>,
    pub registry: Arc<dyn Registry>,
}

impl Services {
    /// All three roles served by one host connection.
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: GenerationService + AssistantSatellite + Registry + 'static,
    {
        Self {
            generation: host.clone(),
            satellite: host.clone(),
            registry: host,
        }
    }
}
