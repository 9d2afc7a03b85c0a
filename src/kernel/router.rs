use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::coordinator::DecisionCoordinator;
use super::event::{HomeEvent, StateChangedData};

/// Hands each inbound event to the matching coordinator handler.
pub struct EventRouter {
    coordinator: Arc<DecisionCoordinator>,
}

impl EventRouter {
    pub fn new(coordinator: Arc<DecisionCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<DecisionCoordinator> {
        &self.coordinator
    }

    pub async fn dispatch(&self, event: HomeEvent) -> Result<()> {
        match event {
            HomeEvent::StateChanged(data) => self.handle_state_change(data).await,
            HomeEvent::Sentence(payload) => {
                self.coordinator.on_external_sentence_event(&payload);
                Ok(())
            }
            HomeEvent::DeviceRegistryUpdated(data) => {
                self.coordinator.on_device_metadata_changed(&data).await?;
                Ok(())
            }
        }
    }

    async fn handle_state_change(&self, data: StateChangedData) -> Result<()> {
        debug!(entity_id = %data.entity_id, "State changed");
        let config = self.coordinator.config();

        if data.entity_id == config.last_recognized_face_entity_id {
            let face = data.new_state.as_ref().map(|s| s.state.as_str()).unwrap_or_default();
            self.coordinator.on_recognized_identity_changed(face).await?;
        } else if data.entity_id == config.assist_satellite_entity_id {
            self.coordinator
                .on_assistant_state_changed(data.old_state.as_ref(), data.new_state.as_ref());
        } else {
            warn!(entity_id = %data.entity_id, "Unknown entity_id");
        }
        Ok(())
    }
}
