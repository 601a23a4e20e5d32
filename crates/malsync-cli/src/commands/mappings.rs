use crate::app::App;
use crate::output::{key_value_table, Output};
use color_eyre::Result;
use malsync_models::{SourceDb, SourceReference};
use serde_json::json;

pub async fn run_mappings(
    app: &App,
    title: Option<String>,
    season: u32,
    episode: u32,
    movie_id: Option<u64>,
    output: &Output,
) -> Result<()> {
    let store = app.mapping_store().await?;
    let table = store.snapshot().await;

    let (reference, title) = match (title, movie_id) {
        (Some(title), _) => (SourceReference::episode(SourceDb::Tvdb, 0, season, episode), title),
        (None, Some(id)) => (SourceReference::movie(SourceDb::Tmdb, id), String::new()),
        (None, None) => {
            let data = json!({
                "tv_entries": table.tv_len(),
                "movie_entries": table.movie_len(),
                "policy": app.config.mapping.policy,
            });
            let rows = [
                ("TV entries", table.tv_len().to_string()),
                ("Movie entries", table.movie_len().to_string()),
                ("User mappings", app.user_mapping_dir().display().to_string()),
            ];
            output.result(&data, key_value_table("Mappings", &rows));
            return Ok(());
        }
    };

    match table.lookup(&reference, &title) {
        Ok(resolution) => {
            let data = json!({
                "title": title,
                "reference": reference,
                "target_id": resolution.target_id,
                "episode": resolution.episode,
                "start": resolution.start,
            });
            let mut rows = vec![("MyAnimeList id", resolution.target_id.to_string())];
            if !reference.is_movie {
                rows.insert(0, ("Source", format!("S{:02}E{:02}", season, episode)));
                rows.push(("Target episode", resolution.episode.to_string()));
                rows.push(("Offset start", resolution.start.to_string()));
            }
            output.result(&data, key_value_table("Mapping", &rows));
        }
        Err(e) => output.warn(e.to_string()),
    }
    Ok(())
}
