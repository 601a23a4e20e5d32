use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const MAL_ACCESS_TOKEN: &str = "mal_access_token";
const MAL_REFRESH_TOKEN: &str = "mal_refresh_token";
const MAL_TOKEN_EXPIRES: &str = "mal_token_expires";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Flat key/value credential file (`credentials.toml`)
///
/// Tokens are written here by whatever performs the authorization; the sync engine
/// only reads them and stores refreshed ones back.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_mal_access_token(&self) -> Option<&String> {
        self.get(MAL_ACCESS_TOKEN)
    }

    pub fn set_mal_access_token(&mut self, token: String) {
        self.set(MAL_ACCESS_TOKEN.to_string(), token);
    }

    pub fn get_mal_refresh_token(&self) -> Option<&String> {
        self.get(MAL_REFRESH_TOKEN)
    }

    pub fn set_mal_refresh_token(&mut self, token: String) {
        self.set(MAL_REFRESH_TOKEN.to_string(), token);
    }

    pub fn get_mal_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get(MAL_TOKEN_EXPIRES)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_mal_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set(MAL_TOKEN_EXPIRES.to_string(), expires.to_rfc3339());
    }

    pub fn clear_mal_tokens(&mut self) {
        self.remove(MAL_ACCESS_TOKEN);
        self.remove(MAL_REFRESH_TOKEN);
        self.remove(MAL_TOKEN_EXPIRES);
    }
}
