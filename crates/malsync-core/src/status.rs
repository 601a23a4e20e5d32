use crate::events::{DomainEvent, EventSubscriber};
use anyhow::{Context, Result};
use async_trait::async_trait;
use malsync_models::StatusRecord;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Append-only store of per-activity status records
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn append(&self, record: &StatusRecord) -> Result<()>;
}

/// One JSON `StatusRecord` per line
pub struct JsonLinesStatusStore {
    path: PathBuf,
    // Serializes appends so concurrent writers never interleave lines
    write_lock: Mutex<()>,
}

impl JsonLinesStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record; a missing file has no records
    pub async fn read_all(&self) -> Result<Vec<StatusRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Invalid status record on line {} of {:?}", idx + 1, self.path))
            })
            .collect()
    }
}

#[async_trait]
impl StatusStore for JsonLinesStatusStore {
    async fn append(&self, record: &StatusRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open status records {:?}", self.path))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Writes a status record for every finished activity
pub struct StatusRecorder<S: StatusStore> {
    store: S,
}

impl<S: StatusStore> StatusRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: StatusStore> EventSubscriber for StatusRecorder<S> {
    fn name(&self) -> &str {
        "status-recorder"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let Some(outcome) = event.outcome() else {
            return Ok(());
        };
        let record = StatusRecord::new(outcome.clone());
        self.store.append(&record).await?;
        debug!(event_id = %record.event_id, "Recorded status");
        Ok(())
    }
}
