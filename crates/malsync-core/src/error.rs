use malsync_models::{ErrorKind, SourceDb, SourceReference};
use thiserror::Error;

/// Terminal failure for one processed activity
///
/// Every variant carries enough context to fix a mapping file without replaying the request.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unsupported metadata agent '{scheme}'")]
    UnsupportedAgent { scheme: String },

    #[error("could not extract ids from '{guid}': {reason}")]
    ExtractionFailed { guid: String, reason: String },

    #[error("no mapping for '{title}' covers {reference}")]
    MappingNotFound {
        title: String,
        reference: SourceReference,
    },

    #[error("{source_db}:{source_id} is not in the identifier index and has no mapping")]
    AnimeNotInDb { source_db: SourceDb, source_id: u64 },

    #[error("MyAnimeList authentication failed, re-authorize the application: {message}")]
    MalAuthFailed { message: String },

    #[error("failed to fetch MyAnimeList entry {target_id}: {message}")]
    MalApiFetchFailed { target_id: u64, message: String },

    #[error("failed to update MyAnimeList entry {target_id}: {message}")]
    MalApiUpdateFailed { target_id: u64, message: String },

    #[error(
        "'{title}' ({reference}) maps to episode {computed_episode} of MyAnimeList entry {target_id}, \
         which only has {remote_episodes} episodes; fix the mapping (season start offsets) for this title"
    )]
    EpisodeCountMismatch {
        title: String,
        reference: SourceReference,
        target_id: u64,
        computed_episode: u32,
        remote_episodes: u32,
    },

    #[error("failed to load {kind} mapping table from {source_name}: {message}")]
    MappingLoad {
        kind: &'static str,
        source_name: String,
        message: String,
    },
}

impl SyncError {
    /// Classification stored in outcomes; `None` for load errors, which never reach an outcome
    pub fn kind(&self) -> Option<ErrorKind> {
        let kind = match self {
            SyncError::UnsupportedAgent { .. } => ErrorKind::UnsupportedAgent,
            SyncError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            SyncError::MappingNotFound { .. } => ErrorKind::MappingNotFound,
            SyncError::AnimeNotInDb { .. } => ErrorKind::AnimeNotInDb,
            SyncError::MalAuthFailed { .. } => ErrorKind::MalAuthFailed,
            SyncError::MalApiFetchFailed { .. } => ErrorKind::MalApiFetchFailed,
            SyncError::MalApiUpdateFailed { .. } => ErrorKind::MalApiUpdateFailed,
            SyncError::EpisodeCountMismatch { .. } => ErrorKind::EpisodeCountMismatch,
            SyncError::MappingLoad { .. } => return None,
        };
        Some(kind)
    }

    /// Target id the failure is about, when one was known
    pub fn target_id(&self) -> Option<u64> {
        match self {
            SyncError::MalApiFetchFailed { target_id, .. }
            | SyncError::MalApiUpdateFailed { target_id, .. }
            | SyncError::EpisodeCountMismatch { target_id, .. } => Some(*target_id),
            _ => None,
        }
    }
}
