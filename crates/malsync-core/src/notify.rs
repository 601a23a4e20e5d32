use crate::events::{DomainEvent, EventSubscriber};
use crate::guid::format_hama_guid;
use anyhow::Result;
use async_trait::async_trait;
use malsync_models::{ErrorKind, UpdateAction, UpdateOutcome};
use serde::Serialize;
use tracing::{error, info, warn};

/// Language tag used when echoing a source reference back as a GUID
const GUID_LANG: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
}

/// Delivery channel for operator notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Emits notifications through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<()> {
        match notification.level {
            NotificationLevel::Info => info!(notification = %notification.title, "{}", notification.body),
            NotificationLevel::Warning => warn!(notification = %notification.title, "{}", notification.body),
            NotificationLevel::Error => error!(notification = %notification.title, "{}", notification.body),
        }
        Ok(())
    }
}

/// Build the operator-facing notification for a finished activity
///
/// No-op outcomes produce nothing.
pub fn compose(outcome: &UpdateOutcome) -> Option<Notification> {
    let detail = outcome.error_detail.as_deref().unwrap_or("no details");

    if let Some(kind) = outcome.error {
        let notification = match kind {
            ErrorKind::MalAuthFailed => Notification {
                level: NotificationLevel::Error,
                title: "MyAnimeList authorization required".to_string(),
                body: format!(
                    "Updates are failing until the application is re-authorized with MyAnimeList ({})",
                    detail
                ),
            },
            kind if kind.is_mapping_problem() => {
                let seen_as = outcome
                    .source_reference
                    .and_then(|reference| format_hama_guid(&reference, GUID_LANG))
                    .map(|guid| format!(" Source GUID {}.", guid))
                    .unwrap_or_default();
                Notification {
                    level: NotificationLevel::Warning,
                    title: format!("Mapping fix needed for '{}'", outcome.title),
                    body: format!(
                        "{}: {}.{} Add or correct this title in the user mapping file, then reload the mappings.",
                        kind, detail, seen_as
                    ),
                }
            }
            kind => Notification {
                level: NotificationLevel::Warning,
                title: format!("Could not update '{}'", outcome.title),
                body: format!("{}: {}", kind, detail),
            },
        };
        return Some(notification);
    }

    let target = outcome
        .target_id
        .map(|id| format!(" (MyAnimeList {})", id))
        .unwrap_or_default();
    let body = match outcome.action {
        UpdateAction::Progress => {
            let status = outcome.new_status.map(|s| s.as_str()).unwrap_or("watching");
            format!(
                "Episode {} marked as watched, status {}",
                outcome.applied_episode.unwrap_or_default(),
                status
            )
        }
        UpdateAction::Rewatch => format!(
            "Rewatch recorded, {} rewatches in total",
            outcome.times_rewatched.unwrap_or_default()
        ),
        UpdateAction::Rating => format!("Rated {}", outcome.applied_rating.unwrap_or_default()),
        UpdateAction::NoOp | UpdateAction::None => return None,
    };
    Some(Notification {
        level: NotificationLevel::Info,
        title: format!("Updated '{}'{}", outcome.title, target),
        body,
    })
}

/// Turns finished activities into notifications
pub struct Notifier<N: NotificationSink> {
    sink: N,
}

impl<N: NotificationSink> Notifier<N> {
    pub fn new(sink: N) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<N: NotificationSink> EventSubscriber for Notifier<N> {
    fn name(&self) -> &str {
        "notifier"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let Some(notification) = event.outcome().and_then(compose) else {
            return Ok(());
        };
        self.sink.send(&notification).await
    }
}
