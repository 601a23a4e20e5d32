use malsync_models::{ListStatus, ListUpdate, RemoteListEntry};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use crate::error::SourceError;

const LIST_STATUS_FIELDS: &str =
    "num_episodes,my_list_status{status,num_episodes_watched,num_times_rewatched,score}";

#[derive(Debug, Deserialize)]
struct MalAnime {
    id: u64,
    #[serde(default)]
    num_episodes: u32,
    #[serde(default)]
    my_list_status: Option<MalListStatus>,
}

#[derive(Debug, Deserialize)]
struct MalListStatus {
    #[serde(default)]
    status: Option<ListStatus>,
    #[serde(default)]
    num_episodes_watched: u32,
    #[serde(default)]
    num_times_rewatched: u32,
    #[serde(default)]
    score: u8,
}

fn entry_from_anime(anime: MalAnime) -> RemoteListEntry {
    let status = anime.my_list_status.unwrap_or(MalListStatus {
        status: None,
        num_episodes_watched: 0,
        num_times_rewatched: 0,
        score: 0,
    });
    RemoteListEntry {
        target_id: anime.id,
        status: status.status,
        episodes_watched: status.num_episodes_watched,
        total_episodes: anime.num_episodes,
        times_rewatched: status.num_times_rewatched,
        score: status.score,
    }
}

/// Form fields for `PATCH /anime/{id}/my_list_status`
pub(crate) fn update_form(update: &ListUpdate) -> Vec<(&'static str, String)> {
    let mut form = Vec::new();
    if let Some(status) = update.status {
        form.push(("status", status.as_str().to_string()));
    }
    if let Some(episodes) = update.episodes_watched {
        form.push(("num_watched_episodes", episodes.to_string()));
    }
    if let Some(times) = update.times_rewatched {
        form.push(("num_times_rewatched", times.to_string()));
    }
    if let Some(score) = update.score {
        form.push(("score", score.to_string()));
    }
    form
}

async fn check_status(response: Response, context: String) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 => Err(SourceError::Auth(format!("{} rejected the access token: {}", context, body))),
        404 => Err(SourceError::NotFound(context)),
        code => Err(SourceError::Status {
            context,
            status: code,
            body,
        }),
    }
}

/// Fetch an anime together with the user's list status
pub async fn get_list_status(
    client: &Client,
    api_base: &str,
    access_token: &str,
    anime_id: u64,
) -> Result<RemoteListEntry, SourceError> {
    let url = format!("{}/anime/{}", api_base, anime_id);
    let response = client
        .get(&url)
        .query(&[("fields", LIST_STATUS_FIELDS)])
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()
        .await?;

    let response = check_status(response, format!("GET anime {}", anime_id)).await?;
    let anime: MalAnime = response
        .json()
        .await
        .map_err(|e| SourceError::decode(format!("anime {}", anime_id), e))?;

    let entry = entry_from_anime(anime);
    debug!(
        "MAL anime {}: status={:?}, watched={}/{}, rewatched={}",
        entry.target_id, entry.status, entry.episodes_watched, entry.total_episodes, entry.times_rewatched
    );
    Ok(entry)
}

/// Write the given fields to the user's list entry
///
/// The response carries no episode total, so the returned entry has `total_episodes == 0`.
pub async fn update_list_status(
    client: &Client,
    api_base: &str,
    access_token: &str,
    anime_id: u64,
    update: &ListUpdate,
) -> Result<RemoteListEntry, SourceError> {
    if update.is_empty() {
        return Err(SourceError::new(format!("no fields to write for anime {}", anime_id)));
    }
    let url = format!("{}/anime/{}/my_list_status", api_base, anime_id);
    let response = client
        .patch(&url)
        .form(&update_form(update))
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()
        .await?;

    let response = check_status(response, format!("PATCH my_list_status {}", anime_id)).await?;
    let status: MalListStatus = response
        .json()
        .await
        .map_err(|e| SourceError::decode(format!("list status {}", anime_id), e))?;

    Ok(entry_from_anime(MalAnime {
        id: anime_id,
        num_episodes: 0,
        my_list_status: Some(status),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_anime_on_list() {
        let json = r#"{
            "id": 21,
            "title": "One Piece",
            "num_episodes": 0,
            "my_list_status": {
                "status": "watching",
                "score": 9,
                "num_episodes_watched": 1052,
                "is_rewatching": false,
                "num_times_rewatched": 0,
                "updated_at": "2023-01-01T00:00:00+00:00"
            }
        }"#;
        let anime: MalAnime = serde_json::from_str(json).unwrap();
        let entry = entry_from_anime(anime);
        assert_eq!(entry.target_id, 21);
        assert_eq!(entry.status, Some(ListStatus::Watching));
        assert_eq!(entry.episodes_watched, 1052);
        assert_eq!(entry.total_episodes, 0);
        assert_eq!(entry.score, 9);
    }

    #[test]
    fn test_entry_from_anime_not_on_list() {
        let json = r#"{"id": 5114, "title": "Fullmetal Alchemist: Brotherhood", "num_episodes": 64}"#;
        let anime: MalAnime = serde_json::from_str(json).unwrap();
        let entry = entry_from_anime(anime);
        assert_eq!(entry.status, None);
        assert_eq!(entry.total_episodes, 64);
        assert_eq!(entry.episodes_watched, 0);
        assert!(!entry.is_completed());
    }

    #[test]
    fn test_update_form_only_carries_set_fields() {
        let form = update_form(&ListUpdate::progress(12, ListStatus::Completed));
        assert_eq!(
            form,
            vec![
                ("status", "completed".to_string()),
                ("num_watched_episodes", "12".to_string()),
            ]
        );

        let form = update_form(&ListUpdate::rewatch(2));
        assert_eq!(form, vec![("num_times_rewatched", "2".to_string())]);

        let form = update_form(&ListUpdate::score(8));
        assert_eq!(form, vec![("score", "8".to_string())]);
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected_before_request() {
        let client = Client::new();
        let err = update_list_status(&client, "http://127.0.0.1:9", "token", 21, &ListUpdate::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no fields to write for anime 21"));
        assert!(!err.is_auth());
    }
}
