use crate::app::App;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use malsync_models::StatusRecord;

pub async fn run_status(app: &App, limit: usize, output: &Output) -> Result<()> {
    let store = app.status_store();
    let records = store
        .read_all()
        .await
        .map_err(|e| eyre!("Failed to read status records from {}: {}", store.path().display(), e))?;

    if records.is_empty() {
        output.info(format!("No status records in {}", store.path().display()));
        return Ok(());
    }

    let skip = records.len().saturating_sub(limit);
    let recent = &records[skip..];
    let data = serde_json::to_value(recent)?;
    output.result(&data, records_table(recent));
    Ok(())
}

fn records_table(records: &[StatusRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Recorded", "Title", "Action", "MAL id", "Episode", "Result"]);

    for record in records {
        let outcome = &record.outcome;
        let result = match outcome.error {
            Some(kind) => kind.to_string(),
            None => "ok".to_string(),
        };
        table.add_row(vec![
            record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            outcome.title.clone(),
            format!("{:?}", outcome.action),
            outcome.target_id.map(|id| id.to_string()).unwrap_or_default(),
            outcome.applied_episode.map(|e| e.to_string()).unwrap_or_default(),
            result,
        ]);
    }
    table
}
