use crate::error::SourceError;
use crate::mal::api;
use crate::mal::auth::TokenManager;
use crate::traits::ListClient;
use async_trait::async_trait;
use malsync_models::{ListUpdate, RemoteListEntry};
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

/// MyAnimeList API v2 client
///
/// Cheap to clone; clones share the HTTP connection pool and the token manager.
#[derive(Clone)]
pub struct MalClient {
    client: Arc<Client>,
    api_base: String,
    tokens: Arc<TokenManager>,
}

impl MalClient {
    pub fn new(client: Client, api_base: String, tokens: Arc<TokenManager>) -> Self {
        Self {
            client: Arc::new(client),
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    async fn on_error(&self, token: &str, error: SourceError) -> SourceError {
        if error.is_auth() {
            // Next call refreshes instead of reusing the rejected token
            warn!("MyAnimeList rejected the access token: {}", error);
            self.tokens.invalidate(token).await;
        }
        error
    }
}

#[async_trait]
impl ListClient for MalClient {
    fn service_name(&self) -> &str {
        "myanimelist"
    }

    async fn authenticate(&self) -> Result<(), SourceError> {
        self.tokens.access_token().await.map(|_| ())
    }

    async fn get_list_entry(&self, target_id: u64) -> Result<RemoteListEntry, SourceError> {
        let token = self.tokens.access_token().await?;
        match api::get_list_status(&self.client, &self.api_base, &token, target_id).await {
            Ok(entry) => Ok(entry),
            Err(e) => Err(self.on_error(&token, e).await),
        }
    }

    async fn update_list_entry(&self, target_id: u64, update: &ListUpdate) -> Result<RemoteListEntry, SourceError> {
        let token = self.tokens.access_token().await?;
        match api::update_list_status(&self.client, &self.api_base, &token, target_id, update).await {
            Ok(entry) => {
                info!("Updated MyAnimeList entry {}: {:?}", target_id, update);
                Ok(entry)
            }
            Err(e) => Err(self.on_error(&token, e).await),
        }
    }
}
