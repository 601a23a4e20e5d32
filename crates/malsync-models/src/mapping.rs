use serde::{Deserialize, Serialize};

/// One season (or split-cour segment) of a show mapped to a MyAnimeList id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonMapping {
    pub season: u32,
    #[serde(rename = "mal-id")]
    pub mal_id: u64,
    /// First episode (absolute or season-relative) covered by this record; 0 means "from the start"
    #[serde(default)]
    pub start: u32,
}

impl SeasonMapping {
    /// Stored offsets of 0 are treated as 1
    pub fn effective_start(&self) -> u32 {
        self.start.max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TvMappingEntry {
    pub title: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub seasons: Vec<SeasonMapping>,
}

impl TvMappingEntry {
    /// Whether the remote service tracks the franchise under one cumulative id
    ///
    /// Derived from the records: true when more than one record shares the id of the
    /// first record for season 0 or 1.
    pub fn is_multi_season(&self) -> bool {
        let Some(first) = self.seasons.iter().find(|s| s.season <= 1) else {
            return false;
        };
        self.seasons
            .iter()
            .filter(|s| s.mal_id == first.mal_id)
            .count()
            > 1
    }

    /// Every title this entry answers to (main title first)
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieMappingEntry {
    pub title: String,
    #[serde(rename = "source-id")]
    pub source_id: u64,
    #[serde(rename = "mal-id")]
    pub mal_id: u64,
}

/// Category of mapping table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Tv,
    Movie,
}

impl MappingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKind::Tv => "tv",
            MappingKind::Movie => "movie",
        }
    }
}

/// Result of a successful mapping lookup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingResolution {
    pub target_id: u64,
    /// Episode number as the remote service counts it (0 for movies)
    pub episode: u32,
    /// Stored start offset of the record that matched
    pub start: u32,
}
