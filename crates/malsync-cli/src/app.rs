use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use malsync_config::{Config, PathManager};
use malsync_core::{
    EventBus, IdIndex, IdIndexStorage, JsonLinesStatusStore, LogNotificationSink, MappingSources, MappingStore,
    Notifier, StatusRecorder, UpdateEngine,
};
use malsync_sources::mal::create_mal_client;
use malsync_sources::{FileMappingSource, MalClient, MalTokenRefresher, MappingSource, RemoteMappingSource, TokenManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded configuration plus the resolved on-disk layout
pub struct App {
    pub config: Config,
    pub paths: PathManager,
}

impl App {
    /// Read the config without validating it, so logging can be set up first
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let paths = PathManager::default();
        let config_file = config_path.unwrap_or_else(|| paths.config_file());
        let config = if config_file.exists() {
            Config::load_from_file(&config_file)
                .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?
        } else {
            return Err(eyre!(
                "Configuration file not found at {}. Create it with a [mal] section holding client_id and client_secret.",
                config_file.display()
            ));
        };
        Ok(Self { config, paths })
    }

    pub fn validate(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| eyre!("Invalid configuration: {}", e))
    }

    pub fn user_mapping_dir(&self) -> PathBuf {
        self.config
            .mapping
            .user_dir
            .clone()
            .unwrap_or_else(|| self.paths.mapping_dir())
    }

    pub fn mapping_sources(&self) -> MappingSources {
        let client = create_mal_client(self.config.client.request_timeout());
        let community: Arc<dyn MappingSource> = Arc::new(RemoteMappingSource::new(
            client,
            self.config.mapping.tv_url.clone(),
            self.config.mapping.movie_url.clone(),
        ));
        let user_dir = self.user_mapping_dir();
        let user: Option<Arc<dyn MappingSource>> = if user_dir.is_dir() {
            debug!("Using user mapping directory {}", user_dir.display());
            Some(Arc::new(FileMappingSource::new(user_dir)))
        } else {
            None
        };
        MappingSources::new(community, user)
    }

    pub async fn mapping_store(&self) -> Result<MappingStore> {
        MappingStore::load(self.mapping_sources(), self.config.mapping.policy)
            .await
            .wrap_err("Failed to load mapping tables")
    }

    pub fn index_storage(&self) -> IdIndexStorage {
        IdIndexStorage::new(&self.paths.id_index_dir())
    }

    pub fn load_index(&self) -> Result<IdIndex> {
        self.index_storage()
            .load()
            .map_err(|e| eyre!("Failed to load identifier index: {}", e))
    }

    pub fn status_store(&self) -> JsonLinesStatusStore {
        let path = self
            .config
            .status
            .records_file
            .clone()
            .unwrap_or_else(|| self.paths.status_records_file());
        JsonLinesStatusStore::new(path)
    }

    /// Build the update engine with the status recorder and notifier subscribed
    pub async fn engine(&self) -> Result<UpdateEngine> {
        self.validate()?;
        self.paths
            .ensure_directories()
            .map_err(|e| eyre!("Failed to create data directories: {}", e))?;

        let timeout = self.config.client.request_timeout();
        let http = create_mal_client(timeout);
        let refresher = Arc::new(MalTokenRefresher::new(
            http.clone(),
            self.config.mal.token_url.clone(),
            self.config.mal.client_id.clone(),
            self.config.mal.client_secret.clone(),
        ));
        let tokens = TokenManager::from_credentials(self.paths.credentials_file(), refresher)
            .map_err(|e| eyre!("Failed to read stored MyAnimeList tokens: {}", e))?;
        let client = MalClient::new(http, self.config.mal.api_base.clone(), Arc::new(tokens));

        let mappings = self.mapping_store().await?;
        let index = self.load_index()?;
        info!("Identifier index holds {} entries", index.len());

        let events = EventBus::new();
        events.subscribe(Arc::new(StatusRecorder::new(self.status_store())));
        events.subscribe(Arc::new(Notifier::new(LogNotificationSink)));

        Ok(UpdateEngine::new(
            Arc::new(client),
            Arc::new(mappings),
            Arc::new(index),
            events,
            timeout,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malsync_models::{SourceDb, SourceReference};
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        let content = format!(
            "[mal]\nclient_id = \"id\"\nclient_secret = \"secret\"\n{}",
            extra
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    fn app_in(dir: &TempDir, extra: &str) -> App {
        let config = Config::load_from_file(&write_config(dir, extra)).unwrap();
        App {
            config,
            paths: PathManager::with_base(dir.path()),
        }
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let err = App::load(Some(dir.path().join("absent.toml"))).err().unwrap();
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_default_locations_under_base() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "");

        app.validate().unwrap();
        assert_eq!(app.user_mapping_dir(), dir.path().join("mappings"));
        assert_eq!(app.status_store().path(), dir.path().join("data").join("status.jsonl"));
        assert!(app.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_configured_overrides() {
        let dir = TempDir::new().unwrap();
        let records = dir.path().join("records.jsonl");
        let user_dir = dir.path().join("custom");
        let app = app_in(
            &dir,
            &format!(
                "[mapping]\nuser_dir = {:?}\n[status]\nrecords_file = {:?}\n",
                user_dir.display().to_string(),
                records.display().to_string()
            ),
        );

        assert_eq!(app.user_mapping_dir(), user_dir);
        assert_eq!(app.status_store().path(), records.as_path());
    }

    #[tokio::test]
    async fn test_user_tables_replace_community() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, "");
        let mapping_dir = app.user_mapping_dir();
        std::fs::create_dir_all(&mapping_dir).unwrap();
        std::fs::write(
            mapping_dir.join("tv_mappings.json"),
            r#"[{"title": "Tokyo Ghoul", "seasons": [{"season": 1, "mal-id": 22319}]}]"#,
        )
        .unwrap();
        std::fs::write(
            mapping_dir.join("movie_mappings.json"),
            r#"[{"title": "Akira", "source-id": 149, "mal-id": 47}]"#,
        )
        .unwrap();

        // Both categories come from the user directory, so the community URLs are never hit
        let store = app.mapping_store().await.unwrap();
        let table = store.snapshot().await;
        assert_eq!(table.tv_len(), 1);
        assert_eq!(table.movie_len(), 1);

        let episode = SourceReference::episode(SourceDb::Tvdb, 0, 1, 5);
        let resolution = table.lookup(&episode, "tokyo ghoul").unwrap();
        assert_eq!(resolution.target_id, 22319);
        assert_eq!(resolution.episode, 5);
    }
}
