use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::event::HomeEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Which events a listener wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// State changes of exactly these entities.
    StateChanged(Vec<String>),
    /// Every event of this type.
    EventType(String),
}

impl EventFilter {
    pub fn matches(&self, event: &HomeEvent) -> bool {
        match (self, event) {
            (EventFilter::StateChanged(ids), HomeEvent::StateChanged(data)) => {
                ids.iter().any(|id| *id == data.entity_id)
            }
            (EventFilter::StateChanged(_), _) => false,
            (EventFilter::EventType(kind), event) => kind == event.event_type(),
        }
    }
}

/// Disposer returned by [`EventBus::listen`].
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops delivery. Handlers already running are left to finish.
    pub fn unsubscribe(&self) {
        debug!(subscription = %self.id, "Unsubscribing listener");
        self.token.cancel();
        self.tracker.close();
    }

    /// Resolves once unsubscribed and the handler in flight, if any, has returned.
    pub async fn finished(&self) {
        self.tracker.wait().await;
    }
}

/// In-process broadcast bus standing in for the host's event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HomeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many listeners saw the event.
    pub fn publish(&self, event: HomeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Runs `handler` for every matching event.
    ///
    /// Invocations for one subscription run one at a time, in bus order.
    /// Separate subscriptions run concurrently. Once unsubscribed, no further
    /// event reaches `handler`, even one already queued.
    pub fn listen<F, Fut>(&self, filter: EventFilter, handler: F) -> Subscription
    where
        F: Fn(HomeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let subscription = Subscription {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        };

        let mut rx = self.tx.subscribe();
        let token = subscription.token.clone();
        let id = subscription.id;

        subscription.tracker.spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(subscription = %id, skipped, "Listener lagged behind the bus");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };
                if token.is_cancelled() {
                    break;
                }
                if !filter.matches(&event) {
                    continue;
                }

                let event_type = event.event_type();
                if let Err(err) = handler(event).await {
                    error!(subscription = %id, event_type, error = ?err, "Event handler failed");
                }
            }
            debug!(subscription = %id, "Listener stopped");
        });

        subscription
    }
}
