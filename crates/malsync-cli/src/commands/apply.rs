use crate::app::App;
use crate::output::{key_value_table, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use malsync_models::{Activity, ActivityKind, MetadataType, UpdateOutcome};
use tracing::info;

pub struct ApplyRequest {
    pub guid: String,
    pub title: String,
    pub metadata_type: MetadataType,
    pub kind: ActivityKind,
    pub rating: Option<f32>,
    pub event_id: Option<String>,
}

impl ApplyRequest {
    fn into_activity(self) -> Activity {
        let event_id = self
            .event_id
            .unwrap_or_else(|| format!("cli-{}", chrono::Utc::now().timestamp_millis()));
        Activity {
            event_id,
            kind: self.kind,
            guid: self.guid,
            metadata_type: self.metadata_type,
            title: self.title,
            rating: self.rating,
        }
    }
}

pub async fn run_apply(app: &App, request: ApplyRequest, output: &Output) -> Result<()> {
    let engine = app.engine().await?;
    let activity = request.into_activity();
    info!(event_id = %activity.event_id, guid = %activity.guid, "Applying activity from command line");

    let outcome = engine.apply(activity).await;
    // Flush the status recorder and notifier before reporting
    engine.events().shutdown().await;

    let data = serde_json::to_value(&outcome)?;
    output.result(&data, outcome_table(&outcome));

    match outcome.error {
        None => Ok(()),
        Some(kind) => Err(eyre!(
            "Update failed ({}): {}",
            kind,
            outcome.error_detail.as_deref().unwrap_or("no detail")
        )),
    }
}

fn outcome_table(outcome: &UpdateOutcome) -> comfy_table::Table {
    let dash = || "-".to_string();
    let mut rows = vec![
        ("Event", outcome.event_id.clone()),
        ("Title", outcome.title.clone()),
        ("Action", format!("{:?}", outcome.action)),
        (
            "Source",
            outcome.source_reference.map(|r| r.to_string()).unwrap_or_else(dash),
        ),
        (
            "MyAnimeList id",
            outcome.target_id.map(|id| id.to_string()).unwrap_or_else(dash),
        ),
    ];
    if let Some(episode) = outcome.applied_episode {
        rows.push(("Episode", episode.to_string()));
    }
    if let Some(rating) = outcome.applied_rating {
        rows.push(("Rating", rating.to_string()));
    }
    if let Some(status) = outcome.new_status {
        rows.push(("List status", status.as_str().to_string()));
    }
    if let Some(times) = outcome.times_rewatched {
        rows.push(("Times rewatched", times.to_string()));
    }
    if let Some(kind) = outcome.error {
        rows.push(("Error", kind.to_string()));
        if let Some(detail) = &outcome.error_detail {
            rows.push(("Detail", detail.clone()));
        }
    }
    key_value_table("Update", &rows)
}
