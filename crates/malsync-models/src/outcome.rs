use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::list_entry::ListStatus;
use crate::source_ref::SourceReference;

/// Failure classification carried by outcomes and status records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedAgent,
    ExtractionFailed,
    MappingNotFound,
    AnimeNotInDb,
    MalAuthFailed,
    MalApiFetchFailed,
    MalApiUpdateFailed,
    EpisodeCountMismatch,
}

impl ErrorKind {
    /// Failures an operator fixes by editing the mapping file rather than re-running
    pub fn is_mapping_problem(&self) -> bool {
        matches!(
            self,
            ErrorKind::MappingNotFound | ErrorKind::AnimeNotInDb | ErrorKind::EpisodeCountMismatch
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedAgent => "UnsupportedAgent",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::MappingNotFound => "MappingNotFound",
            ErrorKind::AnimeNotInDb => "AnimeNotInDB",
            ErrorKind::MalAuthFailed => "MALAuthFailed",
            ErrorKind::MalApiFetchFailed => "MALAPIFetchFailed",
            ErrorKind::MalApiUpdateFailed => "MALAPIUpdateFailed",
            ErrorKind::EpisodeCountMismatch => "EpisodeCountMismatch",
        };
        f.write_str(name)
    }
}

/// What the decision step did with the remote entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    Progress,
    Rewatch,
    Rating,
    /// Nothing to write (stale or repeated signal)
    NoOp,
    /// Processing stopped before a decision was made
    None,
}

/// Result of processing one activity; never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateOutcome {
    pub event_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<SourceReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<u64>,
    pub action: UpdateAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_episode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<ListStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_rewatched: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Persisted row for one processed activity, keyed by `event_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    pub event_id: String,
    pub recorded_at: DateTime<Utc>,
    pub outcome: UpdateOutcome,
}

impl StatusRecord {
    pub fn new(outcome: UpdateOutcome) -> Self {
        Self {
            event_id: outcome.event_id.clone(),
            recorded_at: Utc::now(),
            outcome,
        }
    }
}
