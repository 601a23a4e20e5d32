use crate::error::SyncError;
use malsync_models::{MetadataType, SourceDb, SourceReference};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Body after `com.plexapp.agents.hama://`, e.g. `tvdb-289882/4/22?lang=en`
static HAMA_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<db>anidb|tvdb)-(?P<id>\d+)(?:/(?P<season>\d+)/(?P<episode>\d+))?(?:\?lang=(?P<lang>[A-Za-z]{2}))?$")
        .expect("hama GUID pattern")
});

/// Body of the myanimelist and themoviedb agents, e.g. `21/1/1000?lang=en`
static NUMERIC_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<id>\d+)(?:/(?P<season>\d+)/(?P<episode>\d+))?(?:\?lang=(?P<lang>[A-Za-z]{2}))?$")
        .expect("numeric GUID pattern")
});

/// Metadata agents whose GUIDs can be turned into a source reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    Hama,
    MyAnimeList,
    TheMovieDb,
}

impl Agent {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "com.plexapp.agents.hama" => Some(Agent::Hama),
            "com.plexapp.agents.myanimelist" => Some(Agent::MyAnimeList),
            "com.plexapp.agents.themoviedb" => Some(Agent::TheMovieDb),
            _ => None,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Agent::Hama => "com.plexapp.agents.hama",
            Agent::MyAnimeList => "com.plexapp.agents.myanimelist",
            Agent::TheMovieDb => "com.plexapp.agents.themoviedb",
        }
    }
}

/// Extract a normalized source reference from a metadata GUID
///
/// Season and episode default to `0` when the GUID carries neither. For movies
/// any season/episode segments are accepted and ignored.
pub fn resolve(guid: &str, metadata_type: MetadataType) -> Result<SourceReference, SyncError> {
    let guid = guid.trim();
    let Some((scheme, body)) = guid.split_once("://") else {
        return Err(extraction_failed(guid, "missing '://' after the agent scheme"));
    };
    let agent = Agent::from_scheme(scheme).ok_or_else(|| SyncError::UnsupportedAgent {
        scheme: scheme.to_string(),
    })?;
    let is_movie = metadata_type == MetadataType::Movie;

    match agent {
        Agent::Hama => {
            let caps = HAMA_BODY
                .captures(body)
                .ok_or_else(|| extraction_failed(guid, "expected {anidb|tvdb}-<id>[/<season>/<episode>]"))?;
            let source_db = SourceDb::from_prefix(&caps["db"])
                .ok_or_else(|| extraction_failed(guid, "unknown id prefix"))?;
            build_reference(guid, &caps, source_db, is_movie)
        }
        Agent::MyAnimeList => {
            let caps = NUMERIC_BODY
                .captures(body)
                .ok_or_else(|| extraction_failed(guid, "expected <mal id>[/<season>/<episode>]"))?;
            build_reference(guid, &caps, SourceDb::Native, is_movie)
        }
        Agent::TheMovieDb => {
            if !is_movie {
                return Err(extraction_failed(guid, "themoviedb agent GUIDs are only supported for movies"));
            }
            let caps = NUMERIC_BODY
                .captures(body)
                .ok_or_else(|| extraction_failed(guid, "expected <tmdb id>"))?;
            build_reference(guid, &caps, SourceDb::Tmdb, true)
        }
    }
}

/// Render a reference in the hama agent's GUID shape
///
/// Returns `None` for databases the hama agent does not emit.
pub fn format_hama_guid(reference: &SourceReference, lang: &str) -> Option<String> {
    let prefix = match reference.source_db {
        SourceDb::AniDb | SourceDb::Tvdb => reference.source_db.as_str(),
        SourceDb::Tmdb | SourceDb::Native => return None,
    };
    let path = if reference.is_movie || (reference.season == 0 && reference.episode == 0) {
        String::new()
    } else {
        format!("/{}/{}", reference.season, reference.episode)
    };
    Some(format!(
        "{}://{}-{}{}?lang={}",
        Agent::Hama.scheme(),
        prefix,
        reference.source_id,
        path,
        lang
    ))
}

fn build_reference(
    guid: &str,
    caps: &Captures<'_>,
    source_db: SourceDb,
    is_movie: bool,
) -> Result<SourceReference, SyncError> {
    let source_id: u64 = parse_number(guid, &caps["id"], "id")?;
    if source_id == 0 {
        return Err(extraction_failed(guid, "id must be greater than zero"));
    }
    if is_movie {
        return Ok(SourceReference::movie(source_db, source_id));
    }

    let season = match caps.name("season") {
        Some(m) => parse_number(guid, m.as_str(), "season")?,
        None => 0,
    };
    let episode = match caps.name("episode") {
        Some(m) => parse_number(guid, m.as_str(), "episode")?,
        None => 0,
    };
    Ok(SourceReference::episode(source_db, source_id, season, episode))
}

fn parse_number<T: std::str::FromStr>(guid: &str, value: &str, field: &str) -> Result<T, SyncError> {
    value
        .parse()
        .map_err(|_| extraction_failed(guid, &format!("{} '{}' is out of range", field, value)))
}

fn extraction_failed(guid: &str, reason: &str) -> SyncError {
    SyncError::ExtractionFailed {
        guid: guid.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malsync_models::ErrorKind;

    #[test]
    fn test_hama_tvdb_episode() {
        let reference = resolve("com.plexapp.agents.hama://tvdb-289882/4/22?lang=en", MetadataType::Episode).unwrap();
        assert_eq!(reference, SourceReference::episode(SourceDb::Tvdb, 289882, 4, 22));
    }

    #[test]
    fn test_hama_anidb_without_season() {
        let reference = resolve("com.plexapp.agents.hama://anidb-5?lang=ja", MetadataType::Episode).unwrap();
        assert_eq!(reference.source_db, SourceDb::AniDb);
        assert_eq!(reference.source_id, 5);
        assert_eq!(reference.season, 0);
        assert_eq!(reference.episode, 0);
        assert!(!reference.is_movie);
    }

    #[test]
    fn test_myanimelist_agent_is_direct() {
        let reference = resolve("com.plexapp.agents.myanimelist://21/1/1000?lang=en", MetadataType::Episode).unwrap();
        assert!(reference.is_direct());
        assert_eq!(reference.source_id, 21);
        assert_eq!(reference.episode, 1000);
    }

    #[test]
    fn test_movie_ignores_segments() {
        let reference = resolve("com.plexapp.agents.hama://anidb-5/1/1?lang=en", MetadataType::Movie).unwrap();
        assert_eq!(reference, SourceReference::movie(SourceDb::AniDb, 5));

        let tmdb = resolve("com.plexapp.agents.themoviedb://129?lang=en", MetadataType::Movie).unwrap();
        assert_eq!(tmdb, SourceReference::movie(SourceDb::Tmdb, 129));
    }

    #[test]
    fn test_themoviedb_rejects_episodes() {
        let err = resolve("com.plexapp.agents.themoviedb://129?lang=en", MetadataType::Episode).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ExtractionFailed));
    }

    #[test]
    fn test_unsupported_agent() {
        let err = resolve("com.plexapp.agents.imdb://tt0111161?lang=en", MetadataType::Movie).unwrap_err();
        match err {
            SyncError::UnsupportedAgent { scheme } => assert_eq!(scheme, "com.plexapp.agents.imdb"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_bodies() {
        for guid in [
            "com.plexapp.agents.hama://imdb-5?lang=en",
            "com.plexapp.agents.hama://anidb-abc?lang=en",
            "com.plexapp.agents.hama://anidb-0?lang=en",
            "com.plexapp.agents.hama://tvdb-12/4?lang=en",
            "com.plexapp.agents.myanimelist://?lang=en",
            "com.plexapp.agents.hama://anidb-99999999999999999999999?lang=en",
            "no-scheme-here",
        ] {
            let err = resolve(guid, MetadataType::Episode).unwrap_err();
            assert_eq!(err.kind(), Some(ErrorKind::ExtractionFailed), "{}", guid);
        }
    }

    #[test]
    fn test_format_round_trip() {
        let references = [
            SourceReference::episode(SourceDb::Tvdb, 289882, 4, 22),
            SourceReference::episode(SourceDb::AniDb, 5, 0, 0),
            SourceReference::episode(SourceDb::AniDb, 5, 0, 3),
        ];
        for reference in references {
            let guid = format_hama_guid(&reference, "en").unwrap();
            assert_eq!(resolve(&guid, MetadataType::Episode).unwrap(), reference);
        }

        let movie = SourceReference::movie(SourceDb::AniDb, 5);
        let guid = format_hama_guid(&movie, "en").unwrap();
        assert_eq!(guid, "com.plexapp.agents.hama://anidb-5?lang=en");
        assert_eq!(resolve(&guid, MetadataType::Movie).unwrap(), movie);
    }

    #[test]
    fn test_format_rejects_other_databases() {
        assert!(format_hama_guid(&SourceReference::movie(SourceDb::Tmdb, 1), "en").is_none());
    }
}
