use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAL_API_BASE: &str = "https://api.myanimelist.net/v2";
pub const DEFAULT_MAL_TOKEN_URL: &str = "https://myanimelist.net/v1/oauth2/token";
pub const DEFAULT_TV_MAPPING_URL: &str =
    "https://raw.githubusercontent.com/malsync/mappings/main/tv_mappings.json";
pub const DEFAULT_MOVIE_MAPPING_URL: &str =
    "https://raw.githubusercontent.com/malsync/mappings/main/movie_mappings.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub mal: MalConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MalConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_mal_api_base")]
    pub api_base: String,
    #[serde(default = "default_mal_token_url")]
    pub token_url: String,
}

/// How a user-supplied mapping table combines with the community table
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserMappingPolicy {
    /// The user table replaces the community table for its category
    #[default]
    Replace,
    /// Both tables are loaded; user entries win on conflicting title or source id
    Overlay,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MappingConfig {
    #[serde(default = "default_tv_mapping_url")]
    pub tv_url: String,
    #[serde(default = "default_movie_mapping_url")]
    pub movie_url: String,
    /// Directory holding `tv_mappings.json` / `movie_mappings.json` overrides
    #[serde(default)]
    pub user_dir: Option<PathBuf>,
    #[serde(default)]
    pub policy: UserMappingPolicy,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            tv_url: default_tv_mapping_url(),
            movie_url: default_movie_mapping_url(),
            user_dir: None,
            policy: UserMappingPolicy::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// Upper bound for every outbound call (mapping fetch, list read/write)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StatusConfig {
    /// JSON-lines file receiving one status record per processed activity
    #[serde(default)]
    pub records_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    pub file: Option<PathBuf>,
}

fn default_mal_api_base() -> String {
    DEFAULT_MAL_API_BASE.to_string()
}

fn default_mal_token_url() -> String {
    DEFAULT_MAL_TOKEN_URL.to_string()
}

fn default_tv_mapping_url() -> String {
    DEFAULT_TV_MAPPING_URL.to_string()
}

fn default_movie_mapping_url() -> String {
    DEFAULT_MOVIE_MAPPING_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mal.client_id.is_empty() || self.mal.client_id == "YOUR_CLIENT_ID" {
            return Err(anyhow::anyhow!("mal.client_id is not configured"));
        }
        if self.mal.client_secret.is_empty() || self.mal.client_secret == "YOUR_CLIENT_SECRET" {
            return Err(anyhow::anyhow!("mal.client_secret is not configured"));
        }
        if self.client.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("client.request_timeout_secs must be greater than zero"));
        }
        if self.mapping.tv_url.is_empty() || self.mapping.movie_url.is_empty() {
            return Err(anyhow::anyhow!("mapping URLs cannot be empty"));
        }
        if let Some(ref dir) = self.mapping.user_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(anyhow::anyhow!("mapping.user_dir {:?} is not a directory", dir));
            }
        }
        Ok(())
    }

    pub fn is_mal_configured(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_config(client_id: &str, client_secret: &str) -> Config {
        Config {
            mal: MalConfig {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                api_base: default_mal_api_base(),
                token_url: default_mal_token_url(),
            },
            mapping: MappingConfig::default(),
            client: ClientConfig::default(),
            status: StatusConfig::default(),
            logging: None,
        }
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = test_config("test_id", "test_secret");
        config.mapping.policy = UserMappingPolicy::Overlay;
        config.mapping.user_dir = Some(PathBuf::from("/tmp/mappings"));

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.mal.client_id, "test_id");
        assert_eq!(loaded.mal.client_secret, "test_secret");
        assert_eq!(loaded.mapping.policy, UserMappingPolicy::Overlay);
        assert_eq!(loaded.mapping.user_dir, Some(PathBuf::from("/tmp/mappings")));
        assert_eq!(loaded.client.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_minimal_toml_uses_defaults() {
        let toml_str = r#"
[mal]
client_id = "abc"
client_secret = "def"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mal.api_base, DEFAULT_MAL_API_BASE);
        assert_eq!(config.mapping.tv_url, DEFAULT_TV_MAPPING_URL);
        assert_eq!(config.mapping.policy, UserMappingPolicy::Replace);
        assert_eq!(config.client.request_timeout(), std::time::Duration::from_secs(30));
        assert!(config.status.records_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate() {
        let mut config = test_config("YOUR_CLIENT_ID", "YOUR_CLIENT_SECRET");
        assert!(config.validate().is_err());
        assert!(!config.is_mal_configured());

        config.mal.client_id = "real_id".to_string();
        config.mal.client_secret = "real_secret".to_string();
        assert!(config.validate().is_ok());
        assert!(config.is_mal_configured());

        config.client.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
