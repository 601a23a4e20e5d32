use serde::{Deserialize, Serialize};

/// MyAnimeList list status values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Watching => "watching",
            ListStatus::Completed => "completed",
            ListStatus::OnHold => "on_hold",
            ListStatus::Dropped => "dropped",
            ListStatus::PlanToWatch => "plan_to_watch",
        }
    }
}

/// Current state of one anime on the user's remote list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteListEntry {
    pub target_id: u64,
    /// `None` when the anime is not on the list yet
    pub status: Option<ListStatus>,
    pub episodes_watched: u32,
    /// 0 when the remote service does not know the total yet
    pub total_episodes: u32,
    pub times_rewatched: u32,
    pub score: u8,
}

impl RemoteListEntry {
    pub fn is_completed(&self) -> bool {
        self.status == Some(ListStatus::Completed)
    }
}

/// Fields written to the remote list; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes_watched: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_rewatched: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl ListUpdate {
    pub fn progress(episodes_watched: u32, status: ListStatus) -> Self {
        Self {
            status: Some(status),
            episodes_watched: Some(episodes_watched),
            ..Self::default()
        }
    }

    pub fn rewatch(times_rewatched: u32) -> Self {
        Self {
            times_rewatched: Some(times_rewatched),
            ..Self::default()
        }
    }

    pub fn score(score: u8) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.episodes_watched.is_none()
            && self.times_rewatched.is_none()
            && self.score.is_none()
    }
}
