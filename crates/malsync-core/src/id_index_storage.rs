use crate::id_index::{AnimeIds, IdIndex};
use anyhow::{Context, Result};
use bincode::{deserialize, serialize};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk identifier index: bincode rows, gzip-compressed
pub struct IdIndexStorage {
    index_path: PathBuf,
}

impl IdIndexStorage {
    pub fn new(index_dir: &Path) -> Self {
        Self {
            index_path: index_dir.join("id_index.bin"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.index_path
    }

    /// Load the index; a missing file yields an empty index
    ///
    /// An unreadable file (format change) is backed up and replaced by an empty index.
    pub fn load(&self) -> Result<IdIndex> {
        if !self.index_path.exists() {
            debug!("Identifier index {:?} does not exist, starting empty", self.index_path);
            return Ok(IdIndex::new());
        }

        let start = std::time::Instant::now();
        let data = std::fs::read(&self.index_path)
            .with_context(|| format!("Failed to read identifier index {:?}", self.index_path))?;

        let mut decoded = Vec::new();
        let rows: Vec<AnimeIds> = match GzDecoder::new(&data[..])
            .read_to_end(&mut decoded)
            .map_err(anyhow::Error::from)
            .and_then(|_| deserialize(&decoded).map_err(anyhow::Error::from))
        {
            Ok(rows) => rows,
            Err(e) => {
                let backup_path = self.index_path.with_extension("bin.bak");
                match std::fs::copy(&self.index_path, &backup_path) {
                    Ok(_) => info!(
                        "Identifier index unreadable ({}), backed up to {:?} and starting empty",
                        e, backup_path
                    ),
                    Err(backup_err) => warn!(
                        "Identifier index unreadable ({}) and backup failed: {}",
                        e, backup_err
                    ),
                }
                return Ok(IdIndex::new());
            }
        };

        let mut index = IdIndex::new();
        for ids in rows {
            index.insert(ids);
        }
        index.mark_clean();

        info!("Loaded identifier index: {} entries in {:?}", index.len(), start.elapsed());
        Ok(index)
    }

    /// Write the index atomically (temp file, then rename)
    pub fn save(&self, index: &IdIndex) -> Result<()> {
        let start = std::time::Instant::now();

        let serialized = serialize(&index.all_entries())?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&serialized)?;
        let encoded = encoder.finish()?;

        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.index_path.with_extension("tmp");
        std::fs::write(&temp_path, encoded)?;
        std::fs::rename(&temp_path, &self.index_path)
            .with_context(|| format!("Failed to replace identifier index {:?}", self.index_path))?;

        info!("Saved identifier index: {} entries in {:?}", index.len(), start.elapsed());
        Ok(())
    }

    pub fn size(&self) -> Result<u64> {
        if self.index_path.exists() {
            Ok(std::fs::metadata(&self.index_path)?.len())
        } else {
            Ok(0)
        }
    }
}

/// Read a JSON array of id rows, e.g. an exported anime id list
pub fn read_json_rows(path: &Path) -> Result<Vec<AnimeIds>> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let rows: Vec<AnimeIds> =
        serde_json::from_slice(&data).with_context(|| format!("Failed to parse id rows in {:?}", path))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use malsync_models::SourceDb;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let storage = IdIndexStorage::new(dir.path());

        let mut index = IdIndex::new();
        index.insert(AnimeIds {
            mal_id: 1,
            anidb_id: Some(23),
            tvdb_id: Some(76885),
            tmdb_id: None,
            title: Some("Cowboy Bebop".to_string()),
        });
        storage.save(&index).unwrap();
        assert!(storage.size().unwrap() > 0);

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.find(SourceDb::AniDb, 23).unwrap().title.as_deref(), Some("Cowboy Bebop"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = IdIndexStorage::new(dir.path());
        assert!(storage.load().unwrap().is_empty());
        assert_eq!(storage.size().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let storage = IdIndexStorage::new(dir.path());
        std::fs::write(storage.path(), b"not gzip").unwrap();

        assert!(storage.load().unwrap().is_empty());
        assert!(dir.path().join("id_index.bin.bak").exists());
    }

    #[test]
    fn test_read_json_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.json");
        std::fs::write(&path, r#"[{"mal_id": 5, "anidb_id": 7}, {"mal_id": 6}]"#).unwrap();

        let rows = read_json_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].anidb_id, Some(7));
        assert_eq!(rows[1].tvdb_id, None);
    }
}
