use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use super::assistant::{ActivityClassifier, AssistantState, TransitionKind};
use super::cooldown::{is_sentinel, IdentityCooldownTracker};
use super::event::{DeviceRegistryUpdatedData, EntityState, SentenceData};
use super::time::{local_time_of_day, Clock};
use crate::config::CoordinatorConfig;
use crate::error::HomeMindError;
use crate::services::Services;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GreetingOutcome {
    /// Nobody recognized.
    Ignored,
    /// Greeted recently; nothing was generated.
    HoldingOff { remaining: TimeDelta },
    /// Text was generated but the satellite was not idle. Nothing recorded.
    AssistantBusy { state: Option<AssistantState> },
    Greeted { text: String },
}

pub fn greeting_prompt(name: &str, time_of_day: &str) -> String {
    format!(
        "Give a short message to {name}. Use the name of the person you are talking with. \
         Adjust the wording to the time of the day, which is {time_of_day}."
    )
}

/// Decides when to greet a recognized person through the assist satellite.
///
/// Greeting decisions are serialized per instance: the cooldown lock is held
/// from the eligibility check, across generation and the satellite command,
/// until the greeting is recorded. Two notifications for the same person can
/// therefore never both pass the check.
pub struct DecisionCoordinator {
    config: CoordinatorConfig,
    services: Services,
    clock: Arc<dyn Clock>,
    cooldowns: Mutex<IdentityCooldownTracker>,
}

impl DecisionCoordinator {
    pub fn new(config: CoordinatorConfig, services: Services, clock: Arc<dyn Clock>) -> Self {
        let cooldowns = Mutex::new(IdentityCooldownTracker::new(config.hold_off));
        Self {
            config,
            services,
            clock,
            cooldowns,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Waits for any in-flight greeting decision.
    pub async fn is_eligible(&self, identity: &str) -> bool {
        self.cooldowns.lock().await.is_eligible(identity, self.clock.now())
    }

    pub async fn cooldowns(&self) -> IdentityCooldownTracker {
        self.cooldowns.lock().await.clone()
    }

    pub async fn on_recognized_identity_changed(&self, identity: &str) -> Result<GreetingOutcome> {
        debug!(face = identity, "Recognized face changed");

        let name = identity.trim();
        if is_sentinel(name) {
            return Ok(GreetingOutcome::Ignored);
        }

        let mut cooldowns = self.cooldowns.lock().await;
        let now = self.clock.now();

        if let Some(last) = cooldowns.last_greeted(name) {
            debug!(
                face = name,
                seconds = (now - last).num_seconds(),
                "Time since last conversation"
            );
        }
        if !cooldowns.is_eligible(name, now) {
            let remaining = cooldowns.remaining(name, now).unwrap_or_else(TimeDelta::zero);
            debug!(
                face = name,
                hold_off_minutes = cooldowns.hold_off().num_minutes(),
                remaining_seconds = remaining.num_seconds(),
                "Holding off"
            );
            return Ok(GreetingOutcome::HoldingOff { remaining });
        }

        let prompt = greeting_prompt(name, &local_time_of_day(now));
        let text = self.generate(&prompt).await?;

        let satellite = &self.config.assist_satellite_entity_id;
        let state = self
            .services
            .satellite
            .state(satellite)
            .await
            .with_context(|| format!("failed to read state of {satellite}"))?;

        if !state.as_ref().is_some_and(AssistantState::is_idle) {
            debug!(
                face = name,
                state = state.as_ref().map(AssistantState::as_str).unwrap_or("missing"),
                "Satellite busy, discarding greeting"
            );
            return Ok(GreetingOutcome::AssistantBusy { state });
        }

        self.services
            .satellite
            .start_conversation(satellite, &text, false)
            .await
            .with_context(|| format!("failed to start conversation on {satellite}"))?;
        cooldowns.record_greeting(name, now);

        info!(face = name, "Started conversation");
        Ok(GreetingOutcome::Greeted { text })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let timeout = self.config.generation_timeout;
        let call = self
            .services
            .generation
            .generate_content(prompt, &self.config.entry_id);

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result.context("content generation failed"),
            Err(_) => Err(HomeMindError::GenerationTimeout {
                secs: timeout.as_secs(),
            }
            .into()),
        }
    }

    pub fn on_assistant_state_changed(
        &self,
        old: Option<&EntityState>,
        new: Option<&EntityState>,
    ) -> TransitionKind {
        let (Some(old), Some(new)) = (old, new) else {
            return TransitionKind::Other;
        };
        let old_state = AssistantState::parse(&old.state);
        let new_state = AssistantState::parse(&new.state);
        debug!(from = %old_state, to = %new_state, "Assist satellite changed");

        if old_state != new_state && !ActivityClassifier::is_conversation_step(&old_state, &new_state) {
            trace!(from = %old_state, to = %new_state, "Transition outside known conversation shapes");
        }

        let kind = ActivityClassifier::classify_transition(
            &old_state,
            old.last_changed,
            &new_state,
            self.clock.now(),
        );
        if let TransitionKind::LikelyUserInitiated { idle_for } = kind {
            debug!(
                idle_secs = idle_for.num_seconds(),
                "Likely user initiated conversation, leaving it alone"
            );
        }
        kind
    }

    pub fn on_external_sentence_event(&self, payload: &SentenceData) {
        debug!(
            text = payload.text.as_deref().unwrap_or_default(),
            "Received home_mind_event"
        );
    }

    /// Mirrors a user-assigned device name into the entry title.
    /// Returns the new title when it changed.
    pub async fn on_device_metadata_changed(
        &self,
        event: &DeviceRegistryUpdatedData,
    ) -> Result<Option<String>> {
        debug!(device_id = %event.device_id, "Device updated");

        let registry = &self.services.registry;
        let entry_id = &self.config.entry_id;

        let Some(own_device) = registry.own_device_id(entry_id).await? else {
            return Ok(None);
        };
        if event.device_id != own_device || !event.changes_name_by_user() {
            return Ok(None);
        }
        let Some(device) = registry.device(&own_device).await? else {
            return Ok(None);
        };
        let Some(name) = device.name_by_user.filter(|n| !n.trim().is_empty()) else {
            return Ok(None);
        };

        let title = registry.entry_title(entry_id).await?;
        if name == title {
            return Ok(None);
        }
        registry
            .update_entry_title(entry_id, &name)
            .await
            .context("failed to update entry title")?;
        info!(
            from = %title,
            to = %name,
            device = device.name.as_deref().unwrap_or_default(),
            "Renamed integration after its device"
        );
        Ok(Some(name))
    }
}
