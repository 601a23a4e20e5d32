use super::*;
use crate::events::EventSubscriber;
use crate::mapping::MappingSources;
use async_trait::async_trait;
use malsync_config::UserMappingPolicy;
use malsync_models::{MappingKind, MetadataType, SourceDb};
use malsync_sources::MappingSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const TV: &str = r#"[
    {"title": "Split Show", "seasons": [
        {"season": 1, "mal-id": 100, "start": 0},
        {"season": 1, "mal-id": 200, "start": 12}
    ]},
    {"title": "One Piece", "seasons": [
        {"season": 1, "mal-id": 21, "start": 0},
        {"season": 2, "mal-id": 21, "start": 62},
        {"season": 21, "mal-id": 21, "start": 892}
    ]},
    {"title": "Three Seasons", "seasons": [
        {"season": 1, "mal-id": 301},
        {"season": 2, "mal-id": 302},
        {"season": 3, "mal-id": 303}
    ]}
]"#;

const MOVIES: &str = r#"[
    {"title": "Movie Five", "source-id": 5, "mal-id": 555},
    {"title": "Movie Six", "source-id": 6, "mal-id": 666}
]"#;

struct StaticSource;

#[async_trait]
impl MappingSource for StaticSource {
    fn source_name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, kind: MappingKind) -> Result<Option<Vec<u8>>, SourceError> {
        let body = match kind {
            MappingKind::Tv => TV,
            MappingKind::Movie => MOVIES,
        };
        Ok(Some(body.as_bytes().to_vec()))
    }
}

#[derive(Default)]
struct FakeIndex(HashMap<(SourceDb, u64), u64>);

impl FakeIndex {
    fn with(mut self, source_db: SourceDb, source_id: u64, target_id: u64) -> Self {
        self.0.insert((source_db, source_id), target_id);
        self
    }
}

impl IdentifierIndex for FakeIndex {
    fn get_target_id(&self, source_db: SourceDb, source_id: u64) -> Option<u64> {
        self.0.get(&(source_db, source_id)).copied()
    }
}

/// In-memory list service that counts every call
#[derive(Default)]
struct FakeClient {
    entries: Mutex<HashMap<u64, RemoteListEntry>>,
    auth_error: bool,
    fetch_status: Option<u16>,
    update_status: Option<u16>,
    delay: Option<Duration>,
    authentications: AtomicUsize,
    fetches: AtomicUsize,
    updates: Mutex<Vec<(u64, ListUpdate)>>,
}

impl FakeClient {
    fn with_entry(self, entry: RemoteListEntry) -> Self {
        self.entries.lock().unwrap().insert(entry.target_id, entry);
        self
    }

    fn remote_calls(&self) -> usize {
        self.authentications.load(Ordering::SeqCst) + self.fetches.load(Ordering::SeqCst) + self.updates().len()
    }

    fn updates(&self) -> Vec<(u64, ListUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    fn status_error(status: u16) -> SourceError {
        SourceError::Status {
            context: "fake".to_string(),
            status,
            body: String::new(),
        }
    }
}

#[async_trait]
impl ListClient for FakeClient {
    fn service_name(&self) -> &str {
        "fake"
    }

    async fn authenticate(&self) -> Result<(), SourceError> {
        self.authentications.fetch_add(1, Ordering::SeqCst);
        if self.auth_error {
            return Err(SourceError::Auth("refresh token revoked".to_string()));
        }
        Ok(())
    }

    async fn get_list_entry(&self, target_id: u64) -> Result<RemoteListEntry, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.fetch_status {
            return Err(Self::status_error(status));
        }
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(&target_id)
            .cloned()
            .unwrap_or_else(|| entry(target_id, None, 0, 0, 0)))
    }

    async fn update_list_entry(&self, target_id: u64, update: &ListUpdate) -> Result<RemoteListEntry, SourceError> {
        self.updates.lock().unwrap().push((target_id, update.clone()));
        if let Some(status) = self.update_status {
            return Err(Self::status_error(status));
        }
        let mut entries = self.entries.lock().unwrap();
        let stored = entries
            .entry(target_id)
            .or_insert_with(|| entry(target_id, None, 0, 0, 0));
        if let Some(status) = update.status {
            stored.status = Some(status);
        }
        if let Some(episodes) = update.episodes_watched {
            stored.episodes_watched = episodes;
        }
        if let Some(times) = update.times_rewatched {
            stored.times_rewatched = times;
        }
        if let Some(score) = update.score {
            stored.score = score;
        }
        Ok(stored.clone())
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

#[async_trait]
impl EventSubscriber for EventLog {
    fn name(&self) -> &str {
        "event-log"
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(event.event_type().to_string());
        Ok(())
    }
}

fn entry(target_id: u64, status: Option<ListStatus>, watched: u32, total: u32, rewatched: u32) -> RemoteListEntry {
    RemoteListEntry {
        target_id,
        status,
        episodes_watched: watched,
        total_episodes: total,
        times_rewatched: rewatched,
        score: 0,
    }
}

fn hama(body: &str) -> String {
    format!("com.plexapp.agents.hama://{}?lang=en", body)
}

fn progress(guid: &str, title: &str) -> Activity {
    Activity::progress("evt-1", guid, MetadataType::Episode, title)
}

async fn engine_with(client: Arc<FakeClient>, index: FakeIndex, timeout: Duration) -> UpdateEngine {
    let sources = MappingSources::new(Arc::new(StaticSource), None);
    let mappings = MappingStore::load(sources, UserMappingPolicy::Replace).await.unwrap();
    UpdateEngine::new(client, Arc::new(mappings), Arc::new(index), EventBus::new(), timeout)
}

async fn engine(client: Arc<FakeClient>, index: FakeIndex) -> UpdateEngine {
    engine_with(client, index, Duration::from_secs(5)).await
}

#[test]
fn test_decide_progress_and_completion() {
    let watching = entry(1, Some(ListStatus::Watching), 10, 12, 0);
    assert_eq!(
        decide(Intent::Progress { episode: 11 }, &watching).unwrap(),
        Decision::Write {
            action: UpdateAction::Progress,
            update: ListUpdate::progress(11, ListStatus::Watching),
        }
    );
    assert_eq!(
        decide(Intent::Progress { episode: 12 }, &watching).unwrap(),
        Decision::Write {
            action: UpdateAction::Progress,
            update: ListUpdate::progress(12, ListStatus::Completed),
        }
    );

    // Unknown total (still airing) never completes
    let airing = entry(1, Some(ListStatus::Watching), 3, 0, 0);
    assert_eq!(
        decide(Intent::Progress { episode: 40 }, &airing).unwrap(),
        Decision::Write {
            action: UpdateAction::Progress,
            update: ListUpdate::progress(40, ListStatus::Watching),
        }
    );
}

#[test]
fn test_decide_is_idempotent_for_same_episode() {
    let watching = entry(1, Some(ListStatus::Watching), 5, 12, 0);
    assert_eq!(decide(Intent::Progress { episode: 5 }, &watching).unwrap(), Decision::NoOp);

    // Same count but the status still has to change
    let planned = entry(1, Some(ListStatus::PlanToWatch), 5, 12, 0);
    assert!(matches!(
        decide(Intent::Progress { episode: 5 }, &planned).unwrap(),
        Decision::Write { .. }
    ));
}

#[test]
fn test_decide_never_lowers_progress() {
    let watching = entry(1, Some(ListStatus::Watching), 7, 12, 0);
    assert_eq!(decide(Intent::Progress { episode: 3 }, &watching).unwrap(), Decision::NoOp);
    assert_eq!(decide(Intent::Progress { episode: 0 }, &watching).unwrap(), Decision::NoOp);

    let fresh = entry(1, None, 0, 12, 0);
    assert_eq!(decide(Intent::Progress { episode: 0 }, &fresh).unwrap(), Decision::NoOp);
}

#[test]
fn test_decide_completed_entry() {
    let completed = entry(1, Some(ListStatus::Completed), 12, 12, 2);
    assert_eq!(
        decide(Intent::Progress { episode: 12 }, &completed).unwrap(),
        Decision::Write {
            action: UpdateAction::Rewatch,
            update: ListUpdate::rewatch(3),
        }
    );
    assert_eq!(decide(Intent::Progress { episode: 4 }, &completed).unwrap(), Decision::NoOp);
    assert_eq!(
        decide(Intent::Progress { episode: 13 }, &completed).unwrap_err(),
        EpisodeMismatch {
            computed_episode: 13,
            remote_episodes: 12,
        }
    );
}

#[test]
fn test_decide_rejects_episode_past_total() {
    let watching = entry(1, Some(ListStatus::Watching), 10, 12, 0);
    let mismatch = decide(Intent::Progress { episode: 14 }, &watching).unwrap_err();
    assert_eq!(mismatch.computed_episode, 14);
    assert_eq!(mismatch.remote_episodes, 12);
}

#[test]
fn test_decide_rating() {
    let rated = RemoteListEntry {
        score: 8,
        ..entry(1, Some(ListStatus::Completed), 12, 12, 0)
    };
    assert_eq!(decide(Intent::Rating { score: 8 }, &rated).unwrap(), Decision::NoOp);
    assert_eq!(
        decide(Intent::Rating { score: 9 }, &rated).unwrap(),
        Decision::Write {
            action: UpdateAction::Rating,
            update: ListUpdate::score(9),
        }
    );
}

#[test]
fn test_score_from_rating() {
    assert_eq!(score_from_rating(7.6), 8);
    assert_eq!(score_from_rating(7.4), 7);
    assert_eq!(score_from_rating(-2.0), 0);
    assert_eq!(score_from_rating(12.0), 10);
    assert_eq!(score_from_rating(f32::NAN), 0);
}

#[tokio::test]
async fn test_split_cour_progress_targets_second_part() {
    let client = Arc::new(FakeClient::default().with_entry(entry(200, Some(ListStatus::Watching), 0, 12, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-1000/1/12"), "Split Show")).await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.target_id, Some(200));
    assert_eq!(outcome.applied_episode, Some(1));
    assert_eq!(client.updates(), vec![(200, ListUpdate::progress(1, ListStatus::Watching))]);
}

#[tokio::test]
async fn test_cumulative_progress_uses_absolute_episode() {
    let client = Arc::new(FakeClient::default().with_entry(entry(21, Some(ListStatus::Watching), 1052, 0, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-81797/21/162"), "One Piece")).await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.applied_episode, Some(1053));
    assert_eq!(client.updates(), vec![(21, ListUpdate::progress(1053, ListStatus::Watching))]);
}

#[tokio::test]
async fn test_repeated_progress_writes_once() {
    let client = Arc::new(FakeClient::default().with_entry(entry(302, Some(ListStatus::Watching), 4, 12, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;
    let activity = progress(&hama("tvdb-2000/2/5"), "Three Seasons");

    let first = engine.apply(activity.clone()).await;
    let second = engine.apply(activity).await;

    assert_eq!(first.action, UpdateAction::Progress);
    assert_eq!(second.action, UpdateAction::NoOp);
    assert!(second.is_success());
    assert_eq!(client.updates().len(), 1);
}

#[tokio::test]
async fn test_rewatch_increments_by_one() {
    let client = Arc::new(FakeClient::default().with_entry(entry(303, Some(ListStatus::Completed), 12, 12, 4)));
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-2000/3/12"), "Three Seasons")).await;
    assert_eq!(outcome.action, UpdateAction::Rewatch);
    assert_eq!(outcome.times_rewatched, Some(5));

    let updates = client.updates();
    assert_eq!(updates.len(), 1);
    let (_, update) = &updates[0];
    assert_eq!(update, &ListUpdate::rewatch(5));
    assert!(update.episodes_watched.is_none());
    assert!(update.status.is_none());
}

#[tokio::test]
async fn test_episode_past_total_is_mismatch_without_write() {
    let client = Arc::new(FakeClient::default().with_entry(entry(302, Some(ListStatus::Watching), 10, 12, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-2000/2/14"), "Three Seasons")).await;
    assert_eq!(outcome.error, Some(ErrorKind::EpisodeCountMismatch));
    assert_eq!(outcome.target_id, Some(302));
    let detail = outcome.error_detail.unwrap();
    assert!(detail.contains("Three Seasons"));
    assert!(detail.contains("tvdb:2000 S02E14"));
    assert!(client.updates().is_empty());
}

#[tokio::test]
async fn test_uncovered_later_season_makes_no_remote_call() {
    let client = Arc::new(FakeClient::default());
    let index = FakeIndex::default().with(SourceDb::Tvdb, 289882, 999);
    let engine = engine(client.clone(), index).await;
    let log = Arc::new(EventLog::default());
    engine.events().subscribe(log.clone());

    let outcome = engine.apply(progress(&hama("tvdb-289882/4/22"), "Three Seasons")).await;
    engine.events().shutdown().await;

    assert_eq!(outcome.error, Some(ErrorKind::MappingNotFound));
    assert_eq!(
        outcome.source_reference,
        Some(SourceReference::episode(SourceDb::Tvdb, 289882, 4, 22))
    );
    assert_eq!(client.remote_calls(), 0);
    assert_eq!(
        log.0.lock().unwrap().clone(),
        vec!["resolution_failed".to_string(), "update_failed".to_string()]
    );
}

#[tokio::test]
async fn test_first_season_falls_back_to_index() {
    let client = Arc::new(FakeClient::default().with_entry(entry(4200, Some(ListStatus::Watching), 2, 12, 0)));
    let index = FakeIndex::default().with(SourceDb::AniDb, 42, 4200);
    let engine = engine(client.clone(), index).await;

    let outcome = engine.apply(progress(&hama("anidb-42/1/3"), "Not Mapped")).await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.target_id, Some(4200));
    assert_eq!(client.updates(), vec![(4200, ListUpdate::progress(3, ListStatus::Watching))]);

    let missing = engine.apply(progress(&hama("anidb-43/1/3"), "Not Mapped")).await;
    assert_eq!(missing.error, Some(ErrorKind::AnimeNotInDb));
}

#[tokio::test]
async fn test_movie_prefers_identifier_index() {
    let client = Arc::new(FakeClient::default());
    let index = FakeIndex::default().with(SourceDb::AniDb, 5, 777);
    let engine = engine(client.clone(), index).await;
    let activity = Activity::progress("evt-m", hama("anidb-5"), MetadataType::Movie, "Movie Five");

    let outcome = engine.apply(activity).await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.target_id, Some(777));
    assert_eq!(outcome.applied_episode, Some(1));
    assert!(outcome.source_reference.unwrap().is_movie);
}

#[tokio::test]
async fn test_movie_falls_back_to_mapping_then_fails() {
    let client = Arc::new(FakeClient::default());
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let mapped = engine
        .apply(Activity::progress("evt-a", hama("anidb-6"), MetadataType::Movie, "Movie Six"))
        .await;
    assert_eq!(mapped.target_id, Some(666));

    let unknown = engine
        .apply(Activity::progress("evt-b", hama("anidb-7"), MetadataType::Movie, "Movie Seven"))
        .await;
    assert_eq!(unknown.error, Some(ErrorKind::AnimeNotInDb));
}

#[tokio::test]
async fn test_myanimelist_agent_bypasses_mapping() {
    let client = Arc::new(FakeClient::default().with_entry(entry(52991, Some(ListStatus::Watching), 4, 28, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine
        .apply(progress("com.plexapp.agents.myanimelist://52991/1/5?lang=en", "Anything"))
        .await;
    assert_eq!(outcome.target_id, Some(52991));
    assert_eq!(outcome.applied_episode, Some(5));
}

#[tokio::test]
async fn test_myanimelist_agent_movie_marks_completed() {
    let client = Arc::new(FakeClient::default().with_entry(entry(199, None, 0, 1, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;
    let activity = Activity::progress(
        "evt-m",
        "com.plexapp.agents.myanimelist://199?lang=en",
        MetadataType::Movie,
        "Some Movie",
    );

    let outcome = engine.apply(activity).await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.applied_episode, Some(1));
    assert_eq!(outcome.new_status, Some(ListStatus::Completed));
    assert_eq!(client.updates(), vec![(199, ListUpdate::progress(1, ListStatus::Completed))]);
}

#[tokio::test]
async fn test_cumulative_episode_overflow_is_not_found() {
    let client = Arc::new(FakeClient::default());
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-81797/21/4294967295"), "One Piece")).await;
    assert_eq!(outcome.error, Some(ErrorKind::MappingNotFound));
    assert_eq!(client.remote_calls(), 0);
    assert!(client.updates().is_empty());
}

#[tokio::test]
async fn test_guid_without_episode_keeps_remote_progress() {
    let client = Arc::new(FakeClient::default().with_entry(entry(900, Some(ListStatus::Watching), 7, 12, 0)));
    let index = FakeIndex::default().with(SourceDb::AniDb, 5, 900);
    let engine = engine(client.clone(), index).await;

    let outcome = engine.apply(progress(&hama("anidb-5"), "Not Mapped")).await;
    assert_eq!(outcome.error, Some(ErrorKind::ExtractionFailed));
    assert_eq!(outcome.target_id, Some(900));
    assert_eq!(client.remote_calls(), 0);
    assert!(client.updates().is_empty());
}

#[tokio::test]
async fn test_older_episode_does_not_lower_progress() {
    let client = Arc::new(FakeClient::default().with_entry(entry(303, Some(ListStatus::Watching), 7, 12, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-2000/3/3"), "Three Seasons")).await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.action, UpdateAction::NoOp);
    assert!(client.updates().is_empty());
}

#[tokio::test]
async fn test_unsupported_agent() {
    let client = Arc::new(FakeClient::default());
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine
        .apply(progress("com.plexapp.agents.thetvdb://81797/1/1?lang=en", "One Piece"))
        .await;
    assert_eq!(outcome.error, Some(ErrorKind::UnsupportedAgent));
    assert_eq!(outcome.action, UpdateAction::None);
    assert_eq!(client.remote_calls(), 0);
}

#[tokio::test]
async fn test_auth_failure_is_distinguished() {
    let client = Arc::new(FakeClient {
        auth_error: true,
        ..FakeClient::default()
    });
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let outcome = engine.apply(progress(&hama("tvdb-2000/2/5"), "Three Seasons")).await;
    assert_eq!(outcome.error, Some(ErrorKind::MalAuthFailed));
    assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_failures_are_classified() {
    let fetch = Arc::new(FakeClient {
        fetch_status: Some(500),
        ..FakeClient::default()
    });
    let outcome = engine(fetch, FakeIndex::default())
        .await
        .apply(progress(&hama("tvdb-2000/2/5"), "Three Seasons"))
        .await;
    assert_eq!(outcome.error, Some(ErrorKind::MalApiFetchFailed));

    let update = Arc::new(FakeClient {
        update_status: Some(500),
        ..FakeClient::default()
    });
    let outcome = engine(update, FakeIndex::default())
        .await
        .apply(progress(&hama("tvdb-2000/2/5"), "Three Seasons"))
        .await;
    assert_eq!(outcome.error, Some(ErrorKind::MalApiUpdateFailed));
    assert_eq!(outcome.target_id, Some(302));

    let rejected = Arc::new(FakeClient {
        update_status: Some(401),
        ..FakeClient::default()
    });
    let outcome = engine(rejected, FakeIndex::default())
        .await
        .apply(progress(&hama("tvdb-2000/2/5"), "Three Seasons"))
        .await;
    assert_eq!(outcome.error, Some(ErrorKind::MalAuthFailed));
}

#[tokio::test]
async fn test_slow_fetch_times_out() {
    let client = Arc::new(FakeClient {
        delay: Some(Duration::from_secs(30)),
        ..FakeClient::default()
    });
    let engine = engine_with(client.clone(), FakeIndex::default(), Duration::from_millis(20)).await;

    let outcome = engine.apply(progress(&hama("tvdb-2000/2/5"), "Three Seasons")).await;
    assert_eq!(outcome.error, Some(ErrorKind::MalApiFetchFailed));
    assert!(outcome.error_detail.unwrap().contains("timed out"));
    assert!(client.updates().is_empty());
}

#[tokio::test]
async fn test_rating_writes_score_only() {
    let client = Arc::new(FakeClient::default().with_entry(entry(302, Some(ListStatus::Completed), 12, 12, 0)));
    let engine = engine(client.clone(), FakeIndex::default()).await;
    let activity = Activity::rating("evt-r", hama("tvdb-2000/2/12"), MetadataType::Episode, "Three Seasons", 7.6);

    let outcome = engine.apply(activity).await;
    assert_eq!(outcome.action, UpdateAction::Rating);
    assert_eq!(outcome.applied_rating, Some(8.0));
    assert_eq!(client.updates(), vec![(302, ListUpdate::score(8))]);
}

#[tokio::test]
async fn test_rating_without_value_makes_no_remote_call() {
    let client = Arc::new(FakeClient::default());
    let engine = engine(client.clone(), FakeIndex::default()).await;
    let mut activity = Activity::rating("evt-r", hama("tvdb-2000/2/12"), MetadataType::Episode, "Three Seasons", 5.0);
    activity.rating = None;

    let outcome = engine.apply(activity).await;
    assert_eq!(outcome.error, Some(ErrorKind::ExtractionFailed));
    assert_eq!(client.remote_calls(), 0);
}

#[tokio::test]
async fn test_success_publishes_resolution_then_update() {
    let client = Arc::new(FakeClient::default().with_entry(entry(302, Some(ListStatus::Watching), 4, 12, 0)));
    let engine = engine(client, FakeIndex::default()).await;
    let log = Arc::new(EventLog::default());
    engine.events().subscribe(log.clone());

    engine.apply(progress(&hama("tvdb-2000/2/5"), "Three Seasons")).await;
    engine.events().shutdown().await;

    assert_eq!(
        log.0.lock().unwrap().clone(),
        vec!["resolution_succeeded".to_string(), "update_succeeded".to_string()]
    );
}

#[tokio::test]
async fn test_concurrent_activities_are_independent() {
    let client = Arc::new(FakeClient::default());
    let engine = engine(client.clone(), FakeIndex::default()).await;

    let handles: Vec<_> = (1..=10u32)
        .map(|ep| {
            let engine = engine.clone();
            let mut activity = progress(&hama(&format!("tvdb-2000/3/{}", ep)), "Three Seasons");
            activity.event_id = format!("evt-{}", ep);
            tokio::spawn(async move { engine.apply(activity).await })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.is_success(), "{:?}", outcome);
        assert_eq!(outcome.target_id, Some(303));
    }
    assert_eq!(client.fetches.load(Ordering::SeqCst), 10);
}
