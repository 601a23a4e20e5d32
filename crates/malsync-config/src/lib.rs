pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{ClientConfig, Config, LoggingConfig, MalConfig, MappingConfig, StatusConfig, UserMappingPolicy, DEFAULT_MAL_API_BASE, DEFAULT_MAL_TOKEN_URL, DEFAULT_MOVIE_MAPPING_URL, DEFAULT_TV_MAPPING_URL};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
