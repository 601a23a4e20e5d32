use crate::error::SyncError;
use malsync_config::UserMappingPolicy;
use malsync_models::{MappingKind, MappingResolution, MovieMappingEntry, SeasonMapping, SourceReference, TvMappingEntry};
use malsync_sources::MappingSource;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};


/// Normalize a title for matching (trim, lowercase)
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Immutable, indexed set of TV and movie mappings
///
/// Built once per load and shared as an `Arc` snapshot; never mutated after construction.
#[derive(Debug, Default)]
pub struct MappingTable {
    tv: Vec<TvMappingEntry>,
    movies: Vec<MovieMappingEntry>,
    /// Normalized title or synonym -> index into `tv` (first entry wins)
    tv_by_title: HashMap<String, usize>,
    /// Movie source id -> index into `movies` (first entry wins)
    movie_by_source_id: HashMap<u64, usize>,
}

impl MappingTable {
    pub fn new(tv: Vec<TvMappingEntry>, movies: Vec<MovieMappingEntry>) -> Self {
        let mut tv_by_title = HashMap::new();
        for (idx, entry) in tv.iter().enumerate() {
            for title in entry.titles() {
                let key = normalize_title(title);
                if key.is_empty() {
                    continue;
                }
                tv_by_title.entry(key).or_insert(idx);
            }
        }

        let mut movie_by_source_id = HashMap::new();
        for (idx, entry) in movies.iter().enumerate() {
            movie_by_source_id.entry(entry.source_id).or_insert(idx);
        }

        Self {
            tv,
            movies,
            tv_by_title,
            movie_by_source_id,
        }
    }

    pub fn tv_len(&self) -> usize {
        self.tv.len()
    }

    pub fn movie_len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tv.is_empty() && self.movies.is_empty()
    }

    pub fn find_tv(&self, title: &str) -> Option<&TvMappingEntry> {
        self.tv_by_title
            .get(&normalize_title(title))
            .map(|&idx| &self.tv[idx])
    }

    pub fn find_movie(&self, source_id: u64) -> Option<&MovieMappingEntry> {
        self.movie_by_source_id
            .get(&source_id)
            .map(|&idx| &self.movies[idx])
    }

    /// Resolve a reference to a target id and target-side episode number
    pub fn lookup(&self, reference: &SourceReference, title: &str) -> Result<MappingResolution, SyncError> {
        let not_found = || SyncError::MappingNotFound {
            title: title.to_string(),
            reference: *reference,
        };

        if reference.is_movie {
            let entry = self.find_movie(reference.source_id).ok_or_else(not_found)?;
            return Ok(MappingResolution {
                target_id: entry.mal_id,
                episode: 0,
                start: 0,
            });
        }

        let entry = self.find_tv(title).ok_or_else(not_found)?;
        translate_episode(entry, reference).ok_or_else(not_found)
    }
}

/// Map a source season/episode onto the entry's target numbering
///
/// Stored offsets of `0` are treated as `1`. Season `0` falls back to season `1`
/// records when the entry has no season `0` records.
pub fn translate_episode(entry: &TvMappingEntry, reference: &SourceReference) -> Option<MappingResolution> {
    let season = if reference.season == 0 && !entry.seasons.iter().any(|s| s.season == 0) {
        1
    } else {
        reference.season
    };
    let mut records = entry.seasons.iter().filter(|s| s.season == season);

    if entry.is_multi_season() {
        // One target id for the whole franchise, episodes numbered absolutely
        let record = records.next()?;
        if records.next().is_some() {
            warn!(
                title = %entry.title,
                season,
                "Cumulative mapping has several records for one season, using the first"
            );
        }
        let start = record.effective_start();
        let episode = start.checked_add(reference.episode.saturating_sub(1))?;
        return Some(MappingResolution {
            target_id: record.mal_id,
            episode,
            start,
        });
    }

    let record = records
        .filter(|s| s.effective_start() <= reference.episode)
        .fold(None::<&SeasonMapping>, |best, candidate| match best {
            Some(b) if b.effective_start() >= candidate.effective_start() => Some(b),
            _ => Some(candidate),
        })?;
    let start = record.effective_start();
    Some(MappingResolution {
        target_id: record.mal_id,
        episode: reference.episode - start + 1,
        start,
    })
}

fn validate_tv_entry(entry: &TvMappingEntry) -> Result<(), String> {
    if entry.title.trim().is_empty() {
        return Err("empty title".to_string());
    }
    if entry.seasons.is_empty() {
        return Err("no season records".to_string());
    }
    if let Some(s) = entry.seasons.iter().find(|s| s.mal_id == 0) {
        return Err(format!("season {} has mal-id 0", s.season));
    }
    if !entry.is_multi_season() {
        let seasons: HashSet<u32> = entry.seasons.iter().map(|s| s.season).collect();
        for season in seasons {
            let has_default = entry
                .seasons
                .iter()
                .any(|s| s.season == season && s.effective_start() == 1);
            if !has_default {
                return Err(format!("season {} has no record starting at episode 1", season));
            }
        }
    }
    Ok(())
}

fn validate_movie_entry(entry: &MovieMappingEntry) -> Result<(), String> {
    if entry.title.trim().is_empty() {
        return Err("empty title".to_string());
    }
    if entry.source_id == 0 {
        return Err("source-id 0".to_string());
    }
    if entry.mal_id == 0 {
        return Err("mal-id 0".to_string());
    }
    Ok(())
}

/// Parse a JSON array of entries, skipping entries that fail to decode or validate
///
/// Only a document that is not a JSON array fails the load.
fn parse_entries<T: DeserializeOwned>(
    bytes: &[u8],
    kind: MappingKind,
    source_name: &str,
    validate: fn(&T) -> Result<(), String>,
) -> Result<Vec<T>, SyncError> {
    let raw: Vec<serde_json::Value> = serde_json::from_slice(bytes).map_err(|e| SyncError::MappingLoad {
        kind: kind.as_str(),
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;

    let total = raw.len();
    let mut entries = Vec::with_capacity(total);
    for (idx, value) in raw.into_iter().enumerate() {
        let entry: T = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(kind = kind.as_str(), source = source_name, index = idx, "Skipping malformed mapping entry: {}", e);
                continue;
            }
        };
        if let Err(reason) = validate(&entry) {
            warn!(kind = kind.as_str(), source = source_name, index = idx, "Skipping invalid mapping entry: {}", reason);
            continue;
        }
        entries.push(entry);
    }

    if entries.len() < total {
        info!(
            "Loaded {} of {} {} mapping entries from {} ({} skipped)",
            entries.len(),
            total,
            kind.as_str(),
            source_name,
            total - entries.len()
        );
    }
    Ok(entries)
}

/// Community provider plus optional user override provider
#[derive(Clone)]
pub struct MappingSources {
    pub community: Arc<dyn MappingSource>,
    pub user: Option<Arc<dyn MappingSource>>,
}

impl MappingSources {
    pub fn new(community: Arc<dyn MappingSource>, user: Option<Arc<dyn MappingSource>>) -> Self {
        Self { community, user }
    }
}

async fn fetch_from(source: &dyn MappingSource, kind: MappingKind) -> Result<Option<Vec<u8>>, SyncError> {
    source.fetch(kind).await.map_err(|e| SyncError::MappingLoad {
        kind: kind.as_str(),
        source_name: source.source_name().to_string(),
        message: e.to_string(),
    })
}

/// Load one category: user bytes when present, community otherwise (or both for overlay)
async fn load_category<T: DeserializeOwned>(
    sources: &MappingSources,
    kind: MappingKind,
    policy: UserMappingPolicy,
    validate: fn(&T) -> Result<(), String>,
) -> Result<(Vec<T>, Vec<T>), SyncError> {
    let user_entries = match &sources.user {
        Some(user) => match fetch_from(user.as_ref(), kind).await? {
            Some(bytes) => Some(parse_entries(&bytes, kind, user.source_name(), validate)?),
            None => None,
        },
        None => None,
    };

    if policy == UserMappingPolicy::Replace {
        if let Some(user_entries) = user_entries {
            debug!("User {} mapping table replaces the community table", kind.as_str());
            return Ok((user_entries, Vec::new()));
        }
    }

    let community_name = sources.community.source_name().to_string();
    let bytes = fetch_from(sources.community.as_ref(), kind)
        .await?
        .ok_or_else(|| SyncError::MappingLoad {
            kind: kind.as_str(),
            source_name: community_name.clone(),
            message: "provider returned no table".to_string(),
        })?;
    let community_entries = parse_entries(&bytes, kind, &community_name, validate)?;
    Ok((user_entries.unwrap_or_default(), community_entries))
}

/// Build a mapping table from the configured providers
pub async fn build_map(sources: &MappingSources, policy: UserMappingPolicy) -> Result<MappingTable, SyncError> {
    let (user_tv, community_tv) = load_category(sources, MappingKind::Tv, policy, validate_tv_entry).await?;
    let (user_movies, community_movies) =
        load_category(sources, MappingKind::Movie, policy, validate_movie_entry).await?;

    // User entries first; community entries that conflict with a user entry are dropped
    let user_titles: HashSet<String> = user_tv
        .iter()
        .flat_map(|e| e.titles().map(normalize_title))
        .collect();
    let mut tv = user_tv;
    tv.extend(
        community_tv
            .into_iter()
            .filter(|e| !user_titles.contains(&normalize_title(&e.title))),
    );

    let user_ids: HashSet<u64> = user_movies.iter().map(|e| e.source_id).collect();
    let mut movies = user_movies;
    movies.extend(
        community_movies
            .into_iter()
            .filter(|e| !user_ids.contains(&e.source_id)),
    );

    let table = MappingTable::new(tv, movies);
    info!(
        "Built mapping table: {} tv entries, {} movie entries",
        table.tv_len(),
        table.movie_len()
    );
    Ok(table)
}

/// Current mapping table snapshot plus the providers used to rebuild it
pub struct MappingStore {
    current: RwLock<Arc<MappingTable>>,
    sources: MappingSources,
    policy: UserMappingPolicy,
}

impl MappingStore {
    /// Create a store serving an empty table until the first `reload`
    pub fn new(sources: MappingSources, policy: UserMappingPolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(MappingTable::default())),
            sources,
            policy,
        }
    }

    /// Create a store and load the initial table
    pub async fn load(sources: MappingSources, policy: UserMappingPolicy) -> Result<Self, SyncError> {
        let store = Self::new(sources, policy);
        store.reload().await?;
        Ok(store)
    }

    pub async fn snapshot(&self) -> Arc<MappingTable> {
        self.current.read().await.clone()
    }

    /// Rebuild the table and swap it in; on failure the previous snapshot stays current
    pub async fn reload(&self) -> Result<Arc<MappingTable>, SyncError> {
        match build_map(&self.sources, self.policy).await {
            Ok(table) => {
                let table = Arc::new(table);
                *self.current.write().await = table.clone();
                Ok(table)
            }
            Err(e) => {
                warn!("Mapping reload failed, keeping previous table: {}", e);
                Err(e)
            }
        }
    }
}
