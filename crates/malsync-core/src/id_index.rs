use malsync_models::SourceDb;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Cross-database ids known for one MyAnimeList entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeIds {
    pub mal_id: u64,
    #[serde(default)]
    pub anidb_id: Option<u64>,
    #[serde(default)]
    pub tvdb_id: Option<u64>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl AnimeIds {
    /// Fill ids missing here from `other`; existing values are kept
    pub fn merge(&mut self, other: &AnimeIds) {
        if self.anidb_id.is_none() {
            self.anidb_id = other.anidb_id;
        }
        if self.tvdb_id.is_none() {
            self.tvdb_id = other.tvdb_id;
        }
        if self.tmdb_id.is_none() {
            self.tmdb_id = other.tmdb_id;
        }
        if self.title.is_none() {
            self.title = other.title.clone();
        }
    }
}

/// Direct source-id -> target-id lookup used when no season mapping is needed
pub trait IdentifierIndex: Send + Sync {
    fn get_target_id(&self, source_db: SourceDb, source_id: u64) -> Option<u64>;
}

/// In-memory identifier index with one map per source database
///
/// Every map points at the same `Arc<AnimeIds>`. A source id shared by several
/// target entries (a tvdb show split into several MAL entries) keeps the first
/// entry registered for it, which is the first season in catalog order.
#[derive(Debug, Default)]
pub struct IdIndex {
    by_mal: HashMap<u64, Arc<AnimeIds>>,
    by_anidb: HashMap<u64, Arc<AnimeIds>>,
    by_tvdb: HashMap<u64, Arc<AnimeIds>>,
    by_tmdb: HashMap<u64, Arc<AnimeIds>>,
    dirty: bool,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge ids for one target entry; rows with a zero MAL id are ignored
    pub fn insert(&mut self, ids: AnimeIds) -> bool {
        if ids.mal_id == 0 {
            return false;
        }

        let canonical = match self.by_mal.get(&ids.mal_id) {
            Some(existing) => {
                let mut merged = (**existing).clone();
                merged.merge(&ids);
                Arc::new(merged)
            }
            None => Arc::new(ids),
        };

        self.by_mal.insert(canonical.mal_id, canonical.clone());
        if let Some(anidb) = canonical.anidb_id {
            Self::index_secondary(&mut self.by_anidb, anidb, &canonical);
        }
        if let Some(tvdb) = canonical.tvdb_id {
            Self::index_secondary(&mut self.by_tvdb, tvdb, &canonical);
        }
        if let Some(tmdb) = canonical.tmdb_id {
            Self::index_secondary(&mut self.by_tmdb, tmdb, &canonical);
        }

        self.dirty = true;
        true
    }

    fn index_secondary(map: &mut HashMap<u64, Arc<AnimeIds>>, key: u64, canonical: &Arc<AnimeIds>) {
        match map.get(&key) {
            Some(existing) if existing.mal_id != canonical.mal_id => {}
            _ => {
                map.insert(key, canonical.clone());
            }
        }
    }

    pub fn find(&self, source_db: SourceDb, source_id: u64) -> Option<Arc<AnimeIds>> {
        let map = match source_db {
            SourceDb::AniDb => &self.by_anidb,
            SourceDb::Tvdb => &self.by_tvdb,
            SourceDb::Tmdb => &self.by_tmdb,
            SourceDb::Native => &self.by_mal,
        };
        map.get(&source_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_mal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mal.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// All entries ordered by MAL id (for serialization)
    pub fn all_entries(&self) -> Vec<AnimeIds> {
        let mut entries: Vec<AnimeIds> = self.by_mal.values().map(|ids| (**ids).clone()).collect();
        entries.sort_by_key(|ids| ids.mal_id);
        entries
    }
}

impl IdentifierIndex for IdIndex {
    fn get_target_id(&self, source_db: SourceDb, source_id: u64) -> Option<u64> {
        self.find(source_db, source_id).map(|ids| ids.mal_id)
    }
}
