use crate::error::SyncError;
use crate::events::{DomainEvent, EventBus};
use crate::guid;
use crate::id_index::IdentifierIndex;
use crate::mapping::{MappingStore, MappingTable};
use malsync_models::{
    Activity, ActivityKind, ErrorKind, ListStatus, ListUpdate, RemoteListEntry, SourceReference, UpdateAction, UpdateOutcome,
};
use malsync_sources::{ListClient, SourceError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Lifecycle of one processed activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Resolving,
    Deciding,
    Applying,
    Succeeded,
    Failed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateState::Idle => "idle",
            UpdateState::Resolving => "resolving",
            UpdateState::Deciding => "deciding",
            UpdateState::Applying => "applying",
            UpdateState::Succeeded => "succeeded",
            UpdateState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the activity asks for, once resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Target-side episode number that was just watched
    Progress { episode: u32 },
    /// Score in `0..=10`
    Rating { score: u8 },
}

impl Intent {
    pub fn from_activity(activity: &Activity, episode: u32) -> Result<Self, SyncError> {
        match activity.kind {
            ActivityKind::Progress if episode == 0 => Err(SyncError::ExtractionFailed {
                guid: activity.guid.clone(),
                reason: "no episode number to record".to_string(),
            }),
            ActivityKind::Progress => Ok(Intent::Progress { episode }),
            ActivityKind::Rating => {
                let rating = activity.rating.ok_or_else(|| SyncError::ExtractionFailed {
                    guid: activity.guid.clone(),
                    reason: "rating activity carries no rating value".to_string(),
                })?;
                Ok(Intent::Rating {
                    score: score_from_rating(rating),
                })
            }
        }
    }
}

/// Round a rating onto the remote 0-10 scale
pub fn score_from_rating(rating: f32) -> u8 {
    if rating.is_nan() {
        return 0;
    }
    rating.round().clamp(0.0, 10.0) as u8
}

/// Result of the decision step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Write { action: UpdateAction, update: ListUpdate },
    NoOp,
}

/// The source reports an episode past what the remote entry can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeMismatch {
    pub computed_episode: u32,
    pub remote_episodes: u32,
}

/// Decide which write, if any, an intent needs given the current remote entry
pub fn decide(intent: Intent, entry: &RemoteListEntry) -> Result<Decision, EpisodeMismatch> {
    let computed = match intent {
        Intent::Rating { score } => {
            if entry.status.is_some() && entry.score == score {
                return Ok(Decision::NoOp);
            }
            return Ok(Decision::Write {
                action: UpdateAction::Rating,
                update: ListUpdate::score(score),
            });
        }
        Intent::Progress { episode: 0 } => return Ok(Decision::NoOp),
        Intent::Progress { episode } => episode,
    };

    if entry.is_completed() {
        if entry.episodes_watched == computed {
            return Ok(Decision::Write {
                action: UpdateAction::Rewatch,
                update: ListUpdate::rewatch(entry.times_rewatched + 1),
            });
        }
        if computed > entry.episodes_watched {
            return Err(EpisodeMismatch {
                computed_episode: computed,
                remote_episodes: entry.total_episodes.max(entry.episodes_watched),
            });
        }
        // Older episode of a completed show
        return Ok(Decision::NoOp);
    }

    let new_status = if entry.total_episodes > 0 && computed == entry.total_episodes {
        ListStatus::Completed
    } else {
        ListStatus::Watching
    };
    if entry.episodes_watched == computed && entry.status == Some(new_status) {
        return Ok(Decision::NoOp);
    }
    // Progress never moves backwards
    if computed < entry.episodes_watched {
        return Ok(Decision::NoOp);
    }
    if entry.total_episodes > 0 && computed > entry.total_episodes {
        return Err(EpisodeMismatch {
            computed_episode: computed,
            remote_episodes: entry.total_episodes,
        });
    }
    Ok(Decision::Write {
        action: UpdateAction::Progress,
        update: ListUpdate::progress(computed, new_status),
    })
}

/// Resolved target for one activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub reference: SourceReference,
    pub target_id: u64,
    pub episode: u32,
}

struct EngineInner {
    client: Arc<dyn ListClient>,
    mappings: Arc<MappingStore>,
    index: Arc<dyn IdentifierIndex>,
    events: EventBus,
    timeout: Duration,
}

/// Applies activities to the remote list
///
/// Cheap to clone and holds no per-activity state; run one `apply` per activity,
/// each on its own task if needed.
#[derive(Clone)]
pub struct UpdateEngine {
    inner: Arc<EngineInner>,
}

/// State tracking for a single `apply`
struct Run<'a> {
    event_id: &'a str,
    state: UpdateState,
}

impl<'a> Run<'a> {
    fn new(event_id: &'a str) -> Self {
        Self {
            event_id,
            state: UpdateState::Idle,
        }
    }

    fn transition(&mut self, next: UpdateState) {
        debug!(event_id = %self.event_id, from = %self.state, to = %next, "Update state transition");
        self.state = next;
    }
}

impl UpdateEngine {
    pub fn new(
        client: Arc<dyn ListClient>,
        mappings: Arc<MappingStore>,
        index: Arc<dyn IdentifierIndex>,
        events: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                client,
                mappings,
                index,
                events,
                timeout,
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Process one activity end to end
    ///
    /// Always returns an outcome; failures are reported in it and through the
    /// `UpdateFailed` event, never as an error to the caller.
    pub async fn apply(&self, activity: Activity) -> UpdateOutcome {
        let mut run = Run::new(&activity.event_id);
        run.transition(UpdateState::Resolving);

        let mappings = self.inner.mappings.snapshot().await;
        let resolved = match self.resolve(&activity, &mappings) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.inner.events.publish(DomainEvent::ResolutionFailed {
                    event_id: activity.event_id.clone(),
                    title: activity.title.clone(),
                    error: e.kind().unwrap_or(ErrorKind::ExtractionFailed),
                    detail: e.to_string(),
                });
                return self.fail(&mut run, &activity, None, e);
            }
        };
        debug!(
            event_id = %activity.event_id,
            reference = %resolved.reference,
            target_id = resolved.target_id,
            episode = resolved.episode,
            "Resolved activity"
        );
        self.inner.events.publish(DomainEvent::ResolutionSucceeded {
            event_id: activity.event_id.clone(),
            reference: resolved.reference,
            target_id: resolved.target_id,
            episode: resolved.episode,
        });

        let intent = match Intent::from_activity(&activity, resolved.episode) {
            Ok(intent) => intent,
            Err(e) => return self.fail(&mut run, &activity, Some(&resolved), e),
        };

        run.transition(UpdateState::Deciding);
        let entry = match self.fetch_entry(resolved.target_id).await {
            Ok(entry) => entry,
            Err(e) => return self.fail(&mut run, &activity, Some(&resolved), e),
        };

        let (action, update) = match decide(intent, &entry) {
            Ok(Decision::Write { action, update }) => (action, update),
            Ok(Decision::NoOp) => {
                debug!(event_id = %activity.event_id, target_id = resolved.target_id, "Nothing to update");
                let outcome = self.base_outcome(&activity, Some(&resolved), UpdateAction::NoOp);
                return self.succeed(&mut run, outcome);
            }
            Err(mismatch) => {
                let e = SyncError::EpisodeCountMismatch {
                    title: activity.title.clone(),
                    reference: resolved.reference,
                    target_id: resolved.target_id,
                    computed_episode: mismatch.computed_episode,
                    remote_episodes: mismatch.remote_episodes,
                };
                return self.fail(&mut run, &activity, Some(&resolved), e);
            }
        };

        run.transition(UpdateState::Applying);
        if let Err(e) = self.write_entry(resolved.target_id, &update).await {
            return self.fail(&mut run, &activity, Some(&resolved), e);
        }

        let mut outcome = self.base_outcome(&activity, Some(&resolved), action);
        outcome.applied_episode = update.episodes_watched;
        outcome.new_status = update.status;
        outcome.times_rewatched = update.times_rewatched;
        if action == UpdateAction::Rating {
            outcome.applied_rating = update.score.map(f32::from);
        }
        info!(
            event_id = %activity.event_id,
            service = self.inner.client.service_name(),
            target_id = resolved.target_id,
            action = ?action,
            "Applied activity to remote list"
        );
        self.succeed(&mut run, outcome)
    }

    /// Turn the activity's GUID into a target id and target-side episode
    pub fn resolve(&self, activity: &Activity, mappings: &MappingTable) -> Result<ResolvedTarget, SyncError> {
        let reference = guid::resolve(&activity.guid, activity.metadata_type)?;
        let resolved = |target_id: u64, episode: u32| ResolvedTarget {
            reference,
            target_id,
            episode,
        };

        // A movie is a single episode on the remote side
        if reference.is_direct() {
            let episode = if reference.is_movie { 1 } else { reference.episode };
            return Ok(resolved(reference.source_id, episode));
        }

        let not_in_db = || SyncError::AnimeNotInDb {
            source_db: reference.source_db,
            source_id: reference.source_id,
        };

        if reference.is_movie {
            if let Some(target_id) = self.inner.index.get_target_id(reference.source_db, reference.source_id) {
                return Ok(resolved(target_id, 1));
            }
            return match mappings.lookup(&reference, &activity.title) {
                Ok(mapping) => Ok(resolved(mapping.target_id, 1)),
                Err(_) => Err(not_in_db()),
            };
        }

        match mappings.lookup(&reference, &activity.title) {
            Ok(mapping) => Ok(resolved(mapping.target_id, mapping.episode)),
            Err(SyncError::MappingNotFound { .. }) if reference.is_first_season() => self
                .inner
                .index
                .get_target_id(reference.source_db, reference.source_id)
                .map(|target_id| resolved(target_id, reference.episode))
                .ok_or_else(not_in_db),
            Err(e) => Err(e),
        }
    }

    async fn fetch_entry(&self, target_id: u64) -> Result<RemoteListEntry, SyncError> {
        let client = &self.inner.client;
        let fetch_failed = |e: SourceError| classify(e, |message| SyncError::MalApiFetchFailed { target_id, message });

        self.bounded(client.authenticate()).await.map_err(fetch_failed)?;
        self.bounded(client.get_list_entry(target_id)).await.map_err(fetch_failed)
    }

    async fn write_entry(&self, target_id: u64, update: &ListUpdate) -> Result<RemoteListEntry, SyncError> {
        debug!(service = self.inner.client.service_name(), target_id, ?update, "Writing list entry");
        self.bounded(self.inner.client.update_list_entry(target_id, update))
            .await
            .map_err(|e| classify(e, |message| SyncError::MalApiUpdateFailed { target_id, message }))
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        match tokio::time::timeout(self.inner.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::new(format!("timed out after {:?}", self.inner.timeout))),
        }
    }

    fn base_outcome(&self, activity: &Activity, resolved: Option<&ResolvedTarget>, action: UpdateAction) -> UpdateOutcome {
        UpdateOutcome {
            event_id: activity.event_id.clone(),
            title: activity.title.clone(),
            source_reference: resolved.map(|r| r.reference),
            target_id: resolved.map(|r| r.target_id),
            action,
            applied_episode: None,
            applied_rating: None,
            new_status: None,
            times_rewatched: None,
            error: None,
            error_detail: None,
        }
    }

    fn succeed(&self, run: &mut Run<'_>, outcome: UpdateOutcome) -> UpdateOutcome {
        run.transition(UpdateState::Succeeded);
        self.inner.events.publish(DomainEvent::UpdateSucceeded(outcome.clone()));
        outcome
    }

    fn fail(
        &self,
        run: &mut Run<'_>,
        activity: &Activity,
        resolved: Option<&ResolvedTarget>,
        error: SyncError,
    ) -> UpdateOutcome {
        run.transition(UpdateState::Failed);
        warn!(event_id = %activity.event_id, title = %activity.title, "Activity failed: {}", error);

        let mut outcome = self.base_outcome(activity, resolved, UpdateAction::None);
        if outcome.target_id.is_none() {
            outcome.target_id = error.target_id();
        }
        if let SyncError::MappingNotFound { reference, .. } = &error {
            outcome.source_reference = Some(*reference);
        }
        outcome.error = error.kind();
        outcome.error_detail = Some(error.to_string());
        self.inner.events.publish(DomainEvent::UpdateFailed(outcome.clone()));
        outcome
    }
}

/// Authentication problems win over the call-specific failure
fn classify(error: SourceError, otherwise: impl FnOnce(String) -> SyncError) -> SyncError {
    if error.is_auth() {
        SyncError::MalAuthFailed {
            message: error.to_string(),
        }
    } else {
        otherwise(error.to_string())
    }
}
