use crate::app::App;
use crate::commands::prompts::{prompt_password, prompt_seconds};
use crate::output::Output;
use chrono::{Duration, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use malsync_config::CredentialStore;
use std::path::Path;

/// Lifetime MyAnimeList gives access tokens, used as the prompt default
const DEFAULT_EXPIRES_IN: u64 = 2_678_400;

pub fn run_auth(
    app: &App,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    output: &Output,
) -> Result<()> {
    let access_token = match access_token {
        Some(token) => token,
        None => prompt_password("MyAnimeList access token")?,
    };
    let refresh_token = match refresh_token {
        Some(token) => token,
        None => prompt_password("MyAnimeList refresh token")?,
    };
    let expires_in = match expires_in {
        Some(secs) => secs,
        None => prompt_seconds("Seconds until expiry", DEFAULT_EXPIRES_IN, output)?,
    };

    if access_token.trim().is_empty() || refresh_token.trim().is_empty() {
        return Err(eyre!("Access and refresh tokens must not be empty"));
    }
    let expires_at = i64::try_from(expires_in)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| eyre!("Expiry of {} seconds is out of range", expires_in))?;

    let path = app.paths.credentials_file();
    let mut store = CredentialStore::new(path.clone());
    store.load().map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    store.set_mal_access_token(access_token.trim().to_string());
    store.set_mal_refresh_token(refresh_token.trim().to_string());
    store.set_mal_token_expires(expires_at);
    store.save().map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

    output.success(format!("Stored MyAnimeList tokens in {}", path.display()));
    Ok(())
}

/// Remove stored MyAnimeList tokens so the next run has to be re-authorized
pub fn run_clear(app: &App, output: &Output) -> Result<()> {
    let path = app.paths.credentials_file();
    if clear_tokens(&path)? {
        output.success(format!("Removed MyAnimeList tokens from {}", path.display()));
    } else {
        output.info("No MyAnimeList tokens stored");
    }
    Ok(())
}

/// Returns whether any token was stored
fn clear_tokens(path: &Path) -> Result<bool> {
    let mut store = CredentialStore::new(path.to_path_buf());
    store.load().map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    if store.get_mal_access_token().is_none() && store.get_mal_refresh_token().is_none() {
        return Ok(false);
    }
    store.clear_mal_tokens();
    store.save().map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
    Ok(true)
}
