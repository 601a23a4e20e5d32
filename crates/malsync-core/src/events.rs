use async_trait::async_trait;
use futures::FutureExt;
use malsync_models::{ErrorKind, SourceReference, UpdateOutcome};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Facts published once an activity has been resolved or applied
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ResolutionSucceeded {
        event_id: String,
        reference: SourceReference,
        target_id: u64,
        episode: u32,
    },
    ResolutionFailed {
        event_id: String,
        title: String,
        error: ErrorKind,
        detail: String,
    },
    UpdateSucceeded(UpdateOutcome),
    UpdateFailed(UpdateOutcome),
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ResolutionSucceeded { .. } => "resolution_succeeded",
            DomainEvent::ResolutionFailed { .. } => "resolution_failed",
            DomainEvent::UpdateSucceeded(_) => "update_succeeded",
            DomainEvent::UpdateFailed(_) => "update_failed",
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            DomainEvent::ResolutionSucceeded { event_id, .. } | DomainEvent::ResolutionFailed { event_id, .. } => {
                event_id
            }
            DomainEvent::UpdateSucceeded(outcome) | DomainEvent::UpdateFailed(outcome) => &outcome.event_id,
        }
    }

    /// Final outcome, for the two update events
    pub fn outcome(&self) -> Option<&UpdateOutcome> {
        match self {
            DomainEvent::UpdateSucceeded(outcome) | DomainEvent::UpdateFailed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Receiver of domain events
///
/// Errors are logged by the bus and never reach the publisher.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

struct Worker {
    name: String,
    sender: mpsc::UnboundedSender<Arc<DomainEvent>>,
}

#[derive(Default)]
struct BusInner {
    workers: Mutex<Vec<Worker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Fan-out of domain events to independent subscribers
///
/// Every subscriber runs on its own task behind an unbounded queue: it sees events in
/// publish order, and a slow or failing subscriber never holds up the publisher or
/// the other subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and start its worker task (requires a tokio runtime)
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Arc<DomainEvent>>();
        let name = subscriber.name().to_string();

        let worker_name = name.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match AssertUnwindSafe(subscriber.handle(&event)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(
                        subscriber = %worker_name,
                        event_type = event.event_type(),
                        event_id = %event.event_id(),
                        "Event subscriber failed: {:#}",
                        e
                    ),
                    Err(_) => error!(
                        subscriber = %worker_name,
                        event_type = event.event_type(),
                        event_id = %event.event_id(),
                        "Event subscriber panicked"
                    ),
                }
            }
            debug!(subscriber = %worker_name, "Event subscriber drained");
        });

        debug!(subscriber = %name, "Subscribed to domain events");
        lock(&self.inner.workers).push(Worker { name, sender });
        lock(&self.inner.handles).push(handle);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.workers).len()
    }

    /// Queue an event for every subscriber and return immediately
    pub fn publish(&self, event: DomainEvent) {
        let event = Arc::new(event);
        let workers = lock(&self.inner.workers);
        debug!(
            event_type = event.event_type(),
            event_id = %event.event_id(),
            subscribers = workers.len(),
            "Publishing domain event"
        );
        for worker in workers.iter() {
            if worker.sender.send(event.clone()).is_err() {
                warn!(subscriber = %worker.name, "Event subscriber stopped, dropping {}", event.event_type());
            }
        }
    }

    /// Close every queue and wait until the workers have handled what was already published
    pub async fn shutdown(&self) {
        lock(&self.inner.workers).clear();
        let handles: Vec<JoinHandle<()>> = lock(&self.inner.handles).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Event subscriber task ended abnormally: {}", e);
            }
        }
    }
}
