use async_trait::async_trait;
use malsync_models::MappingKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::SourceError;
use crate::traits::MappingSource;

/// User-supplied mapping files in a directory
///
/// `tv_mappings.json` and `movie_mappings.json`; a missing file means "no override".
pub struct FileMappingSource {
    dir: PathBuf,
}

impl FileMappingSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(kind: MappingKind) -> &'static str {
        match kind {
            MappingKind::Tv => "tv_mappings.json",
            MappingKind::Movie => "movie_mappings.json",
        }
    }

    pub fn path_for(&self, kind: MappingKind) -> PathBuf {
        self.dir.join(Self::file_name(kind))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MappingSource for FileMappingSource {
    fn source_name(&self) -> &str {
        "user"
    }

    async fn fetch(&self, kind: MappingKind) -> Result<Option<Vec<u8>>, SourceError> {
        let path = self.path_for(kind);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Loaded user {} mapping file {:?} ({} bytes)", kind.as_str(), path, bytes.len());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SourceError::Io(e)),
        }
    }
}
