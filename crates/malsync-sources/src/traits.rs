use async_trait::async_trait;
use malsync_models::{ListUpdate, MappingKind, RemoteListEntry};
use crate::error::SourceError;

/// Authenticated client for the remote list-tracking service
///
/// Implementations are shared between concurrently processed activities and must make
/// any token refresh safe under concurrency.
#[async_trait]
pub trait ListClient: Send + Sync {
    fn service_name(&self) -> &str;

    /// Make sure a usable credential is available
    async fn authenticate(&self) -> Result<(), SourceError>;

    async fn get_list_entry(&self, target_id: u64) -> Result<RemoteListEntry, SourceError>;

    async fn update_list_entry(&self, target_id: u64, update: &ListUpdate) -> Result<RemoteListEntry, SourceError>;
}

/// Provider of raw mapping table bytes (community table or user overrides)
#[async_trait]
pub trait MappingSource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Fetch the table for `kind`; `Ok(None)` when this provider has no table for it
    async fn fetch(&self, kind: MappingKind) -> Result<Option<Vec<u8>>, SourceError>;
}
