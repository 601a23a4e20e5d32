use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata database a source reference points into
///
/// `Native` means the id is already a MyAnimeList id (the MyAnimeList Plex agent),
/// so no mapping is required to address the remote list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceDb {
    AniDb,
    Tvdb,
    Tmdb,
    Native,
}

impl SourceDb {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDb::AniDb => "anidb",
            SourceDb::Tvdb => "tvdb",
            SourceDb::Tmdb => "tmdb",
            SourceDb::Native => "mal",
        }
    }

    /// Parse the database prefix used in GUIDs and index files
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "anidb" => Some(SourceDb::AniDb),
            "tvdb" => Some(SourceDb::Tvdb),
            "tmdb" => Some(SourceDb::Tmdb),
            "mal" | "myanimelist" => Some(SourceDb::Native),
            _ => None,
        }
    }
}

impl fmt::Display for SourceDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plex metadata type of the item the activity refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetadataType {
    Episode,
    Movie,
}

/// Normalized reference extracted from a media server metadata GUID
///
/// `season == 0` is a sentinel some agents use for "unspecified/first season".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceReference {
    pub source_db: SourceDb,
    pub source_id: u64,
    pub season: u32,
    pub episode: u32,
    pub is_movie: bool,
}

impl SourceReference {
    pub fn episode(source_db: SourceDb, source_id: u64, season: u32, episode: u32) -> Self {
        Self {
            source_db,
            source_id,
            season,
            episode,
            is_movie: false,
        }
    }

    pub fn movie(source_db: SourceDb, source_id: u64) -> Self {
        Self {
            source_db,
            source_id,
            season: 0,
            episode: 0,
            is_movie: true,
        }
    }

    /// True when the id already addresses the remote list directly
    pub fn is_direct(&self) -> bool {
        self.source_db == SourceDb::Native
    }

    /// Season 0 and 1 may be addressed through the identifier index when no mapping covers them
    pub fn is_first_season(&self) -> bool {
        self.season <= 1
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_movie {
            write!(f, "{}:{}", self.source_db, self.source_id)
        } else {
            write!(
                f,
                "{}:{} S{:02}E{:02}",
                self.source_db, self.source_id, self.season, self.episode
            )
        }
    }
}
