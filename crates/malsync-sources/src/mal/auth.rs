use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use malsync_config::CredentialStore;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::error::SourceError;

/// Tokens are refreshed this long before they actually expire
const EXPIRY_MARGIN_SECONDS: i64 = 300;

pub fn create_mal_client(timeout: std::time::Duration) -> Client {
    Client::builder()
        .user_agent(concat!("malsync/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECONDS)
    }
}

/// Exchanges a refresh token for a new token pair
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, SourceError>;
}

/// OAuth2 refresh against the MyAnimeList token endpoint
pub struct MalTokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl MalTokenRefresher {
    pub fn new(client: Client, token_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl TokenRefresher for MalTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, SourceError> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!(
                "token refresh failed: {} - {}",
                status, error_text
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::decode("token response", e))?;
        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in as i64);

        Ok(TokenInfo {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at,
        })
    }
}

/// Shared access token with single-flight refresh
///
/// The refresh runs while the state lock is held, so concurrent callers that find an
/// expired token wait for the one refresh in progress and then reuse its result.
pub struct TokenManager {
    state: Mutex<Option<TokenInfo>>,
    refresher: Arc<dyn TokenRefresher>,
    credentials_path: Option<PathBuf>,
}

impl TokenManager {
    pub fn new(initial: Option<TokenInfo>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state: Mutex::new(initial),
            refresher,
            credentials_path: None,
        }
    }

    /// Load the current token pair from the credential file and write refreshed pairs back to it
    pub fn from_credentials(path: PathBuf, refresher: Arc<dyn TokenRefresher>) -> anyhow::Result<Self> {
        let mut store = CredentialStore::new(path.clone());
        store.load()?;

        let initial = match (store.get_mal_access_token(), store.get_mal_refresh_token()) {
            (Some(access), Some(refresh)) => Some(TokenInfo {
                access_token: access.clone(),
                refresh_token: refresh.clone(),
                // No expiry recorded: force a refresh on first use
                expires_at: store.get_mal_token_expires().unwrap_or_else(Utc::now),
            }),
            _ => {
                warn!("No MyAnimeList tokens found in {:?}; remote calls will fail until authorized", path);
                None
            }
        };

        Ok(Self {
            state: Mutex::new(initial),
            refresher,
            credentials_path: Some(path),
        })
    }

    /// Current access token, refreshing it first if it is about to expire
    pub async fn access_token(&self) -> Result<String, SourceError> {
        let mut state = self.state.lock().await;
        let current = state
            .as_ref()
            .ok_or_else(|| SourceError::Auth("no MyAnimeList token available, authorize first".to_string()))?;

        if !current.needs_refresh(Utc::now()) {
            return Ok(current.access_token.clone());
        }

        debug!("MyAnimeList access token expires at {}, refreshing", current.expires_at);
        let refreshed = self
            .refresher
            .refresh(&current.refresh_token)
            .await
            .map_err(|e| match e {
                SourceError::Auth(_) => e,
                other => SourceError::Auth(other.to_string()),
            })?;

        self.persist(&refreshed).await;
        info!("Refreshed MyAnimeList access token (expires at {})", refreshed.expires_at);

        let token = refreshed.access_token.clone();
        *state = Some(refreshed);
        Ok(token)
    }

    /// Force a refresh on next use, unless another task already replaced `stale_token`
    pub async fn invalidate(&self, stale_token: &str) {
        let mut state = self.state.lock().await;
        if let Some(current) = state.as_mut() {
            if current.access_token == stale_token {
                current.expires_at = Utc::now() - Duration::seconds(1);
            }
        }
    }

    /// Write a refreshed pair back to the credential file on the blocking pool
    async fn persist(&self, token: &TokenInfo) {
        let Some(path) = self.credentials_path.clone() else {
            return;
        };

        let token = token.clone();
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut store = CredentialStore::new(target);
            store.load()?;
            store.set_mal_access_token(token.access_token);
            store.set_mal_refresh_token(token.refresh_token);
            store.set_mal_token_expires(token.expires_at);
            store.save()
        })
        .await
        .map_err(anyhow::Error::from)
        .and_then(|written| written);
        if let Err(e) = result {
            warn!("Failed to store refreshed MyAnimeList tokens in {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRefresher {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, SourceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail {
                return Err(SourceError::Status {
                    context: "token".to_string(),
                    status: 400,
                    body: "invalid_grant".to_string(),
                });
            }
            Ok(TokenInfo {
                access_token: format!("access-{}", n),
                refresh_token: format!("{}-next", refresh_token),
                expires_at: Utc::now() + Duration::hours(1),
            })
        }
    }

    fn expired_token() -> TokenInfo {
        TokenInfo {
            access_token: "old".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
        }
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let valid = TokenInfo {
            access_token: "current".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(2),
        };
        let manager = TokenManager::new(Some(valid), refresher.clone());

        assert_eq!(manager.access_token().await.unwrap(), "current");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let manager = Arc::new(TokenManager::new(Some(expired_token()), refresher.clone()));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.access_token().await })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap(), "access-1");
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_auth_error() {
        let refresher = Arc::new(CountingRefresher::new(true));
        let manager = TokenManager::new(Some(expired_token()), refresher);

        let err = manager.access_token().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        let manager = TokenManager::new(None, Arc::new(CountingRefresher::new(false)));
        assert!(manager.access_token().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_invalidate_only_affects_stale_token() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let manager = TokenManager::new(Some(expired_token()), refresher.clone());

        let fresh = manager.access_token().await.unwrap();
        manager.invalidate("old").await;
        assert_eq!(manager.access_token().await.unwrap(), fresh);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        manager.invalidate(&fresh).await;
        assert_eq!(manager.access_token().await.unwrap(), "access-2");
    }

    #[tokio::test]
    async fn test_refreshed_tokens_are_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        let mut store = CredentialStore::new(path.clone());
        store.set_mal_access_token("old".to_string());
        store.set_mal_refresh_token("refresh".to_string());
        store.save().unwrap();

        let manager = TokenManager::from_credentials(path.clone(), Arc::new(CountingRefresher::new(false))).unwrap();
        assert_eq!(manager.access_token().await.unwrap(), "access-1");

        let mut reloaded = CredentialStore::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get_mal_access_token(), Some(&"access-1".to_string()));
        assert_eq!(reloaded.get_mal_refresh_token(), Some(&"refresh-next".to_string()));
        assert!(reloaded.get_mal_token_expires().is_some());
    }

    #[tokio::test]
    async fn test_unwritable_credentials_keep_refreshed_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        let mut store = CredentialStore::new(path.clone());
        store.set_mal_access_token("old".to_string());
        store.set_mal_refresh_token("refresh".to_string());
        store.save().unwrap();

        let manager = TokenManager::from_credentials(path.clone(), Arc::new(CountingRefresher::new(false))).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert_eq!(manager.access_token().await.unwrap(), "access-1");
        assert_eq!(manager.access_token().await.unwrap(), "access-1");
    }
}
