//! Setup and teardown of one Home Mind instance.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigEntry, CoordinatorConfig};
use crate::consts::{startup_message, EVENT_DEVICE_REGISTRY_UPDATED, EVENT_HOME_MIND};
use crate::error::Result;
use crate::kernel::bus::{EventBus, EventFilter, Subscription};
use crate::kernel::coordinator::DecisionCoordinator;
use crate::kernel::router::EventRouter;
use crate::kernel::time::Clock;
use crate::services::Services;

pub struct Integration {
    coordinator: Arc<DecisionCoordinator>,
    listeners: Vec<Subscription>,
}

impl Integration {
    pub fn setup(
        entry: &ConfigEntry,
        services: Services,
        clock: Arc<dyn Clock>,
        bus: &EventBus,
    ) -> Result<Self> {
        info!("{}", startup_message());
        let config = CoordinatorConfig::from_entry(entry)?;
        Ok(Self::with_config(config, services, clock, bus))
    }

    pub fn with_config(
        config: CoordinatorConfig,
        services: Services,
        clock: Arc<dyn Clock>,
        bus: &EventBus,
    ) -> Self {
        // Face and satellite get separate listeners so a suspended greeting
        // does not hold up satellite transitions.
        let filters = [
            EventFilter::StateChanged(vec![config.last_recognized_face_entity_id.clone()]),
            EventFilter::StateChanged(vec![config.assist_satellite_entity_id.clone()]),
            EventFilter::EventType(EVENT_HOME_MIND.to_string()),
            EventFilter::EventType(EVENT_DEVICE_REGISTRY_UPDATED.to_string()),
        ];

        info!(
            face = %config.last_recognized_face_entity_id,
            satellite = %config.assist_satellite_entity_id,
            "Setting up coordinator"
        );
        let coordinator = Arc::new(DecisionCoordinator::new(config, services, clock));
        let router = Arc::new(EventRouter::new(coordinator.clone()));

        let listeners = filters
            .into_iter()
            .map(|filter| {
                let router = router.clone();
                let subscription = bus.listen(filter.clone(), move |event| {
                    let router = router.clone();
                    async move { router.dispatch(event).await }
                });
                debug!(subscription = %subscription.id(), ?filter, "Listening");
                subscription
            })
            .collect();

        Self {
            coordinator,
            listeners,
        }
    }

    pub fn coordinator(&self) -> &Arc<DecisionCoordinator> {
        &self.coordinator
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.iter().filter(|l| l.is_active()).count()
    }

    /// Stops accepting events, then waits for in-flight handlers.
    pub async fn unload(self) {
        for listener in &self.listeners {
            listener.unsubscribe();
        }
        for listener in &self.listeners {
            listener.finished().await;
        }
        debug!("Home Mind unloaded");
    }
}
