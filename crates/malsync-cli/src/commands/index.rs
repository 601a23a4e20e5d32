use crate::app::App;
use crate::output::{key_value_table, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use malsync_core::id_index_storage::read_json_rows;
use serde_json::json;
use std::path::Path;
use tracing::info;

pub fn run_import(app: &App, file: &Path, output: &Output) -> Result<()> {
    let rows = read_json_rows(file).map_err(|e| eyre!("{}", e))?;
    let storage = app.index_storage();
    let mut index = app.load_index()?;

    let total = rows.len();
    let added = rows.into_iter().map(|row| index.insert(row)).filter(|accepted| *accepted).count();
    info!("Imported {} of {} rows from {}", added, total, file.display());

    if index.is_dirty() {
        storage.save(&index).map_err(|e| eyre!("Failed to save identifier index: {}", e))?;
        index.mark_clean();
    }

    output.success(format!(
        "Imported {} of {} rows ({} entries in index)",
        added,
        total,
        index.len()
    ));
    Ok(())
}

pub fn run_stats(app: &App, output: &Output) -> Result<()> {
    let storage = app.index_storage();
    let index = app.load_index()?;
    let size = storage.size().map_err(|e| eyre!("{}", e))?;

    let data = json!({
        "entries": index.len(),
        "bytes": size,
        "path": storage.path(),
    });
    let rows = [
        ("Entries", index.len().to_string()),
        ("Size on disk", format!("{} bytes", size)),
        ("Location", storage.path().display().to_string()),
    ];
    output.result(&data, key_value_table("Identifier index", &rows));
    Ok(())
}
