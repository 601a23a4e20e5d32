use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::eyre;
use commands::{apply, auth, index, mappings, status};
use logging::LogOptions;
use malsync_models::{ActivityKind, MetadataType};
use std::path::PathBuf;

mod app;
mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "malsync")]
#[command(about = "malsync - Keep your MyAnimeList list in step with what you watch")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr (rotated daily)
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MediaType {
    Episode,
    Movie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ActivityType {
    Progress,
    Rating,
}

impl From<MediaType> for MetadataType {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Episode => MetadataType::Episode,
            MediaType::Movie => MetadataType::Movie,
        }
    }
}

impl From<ActivityType> for ActivityKind {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Progress => ActivityKind::Progress,
            ActivityType::Rating => ActivityKind::Rating,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one playback or rating activity to MyAnimeList
    #[command(long_about = "Resolve a media server GUID to a MyAnimeList entry and update episode progress or score. Failures are reported, recorded in the status log and exit with a non-zero code.")]
    Apply {
        /// Metadata GUID, e.g. com.plexapp.agents.hama://tvdb-289882/1/3?lang=en
        #[arg(long)]
        guid: String,

        /// Show or movie title, used for mapping lookups
        #[arg(long)]
        title: String,

        /// Metadata type of the item
        #[arg(long = "type", value_enum, default_value = "episode")]
        media_type: MediaType,

        /// Activity kind
        #[arg(long, value_enum, default_value = "progress")]
        kind: ActivityType,

        /// Rating on a 0-10 scale (required with --kind rating)
        #[arg(long, required_if_eq("kind", "rating"))]
        rating: Option<f32>,

        /// Event identifier for correlation (generated when omitted)
        #[arg(long)]
        event_id: Option<String>,
    },
    /// Inspect the loaded mapping tables
    #[command(long_about = "Load the community and user mapping tables. Without arguments prints table sizes; with --title translates a season/episode, with --movie-id looks up a movie.")]
    Mappings {
        /// Series title to translate
        #[arg(long, conflicts_with = "movie_id")]
        title: Option<String>,

        /// Source season number
        #[arg(long, default_value_t = 1)]
        season: u32,

        /// Source episode number
        #[arg(long, default_value_t = 1)]
        episode: u32,

        /// Source movie id to look up
        #[arg(long)]
        movie_id: Option<u64>,
    },
    /// Manage the local identifier index
    Index {
        #[command(subcommand)]
        cmd: IndexCommands,
    },
    /// Show recent update outcomes
    Status {
        /// Number of most recent records to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Store or remove MyAnimeList OAuth tokens
    #[command(long_about = "Store MyAnimeList OAuth tokens obtained from an authorization flow. Values not given as flags are prompted for. With --clear, removes the stored tokens instead.")]
    Auth {
        /// Remove the stored tokens
        #[arg(long, conflicts_with_all = ["access_token", "refresh_token", "expires_in"])]
        clear: bool,

        /// Access token (if not provided, will prompt)
        #[arg(long)]
        access_token: Option<String>,

        /// Refresh token (if not provided, will prompt)
        #[arg(long)]
        refresh_token: Option<String>,

        /// Seconds until the access token expires (if not provided, will prompt)
        #[arg(long)]
        expires_in: Option<u64>,
    },
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Merge id rows from a JSON file into the index
    Import {
        /// JSON array of {mal_id, anidb_id, tvdb_id, tmdb_id, title} rows
        file: PathBuf,
    },
    /// Show index size and location
    Stats,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let app = app::App::load(cli.config.clone());
    let logging_config = app.as_ref().ok().and_then(|a| a.config.logging.as_ref());
    let _guard = logging::init_logging(LogOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.log_file.clone(),
        config: logging_config,
    })
    .map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let app = app?;

    match cli.command {
        Commands::Apply {
            guid,
            title,
            media_type,
            kind,
            rating,
            event_id,
        } => {
            let request = apply::ApplyRequest {
                guid,
                title,
                metadata_type: media_type.into(),
                kind: kind.into(),
                rating,
                event_id,
            };
            apply::run_apply(&app, request, &output).await
        }
        Commands::Mappings {
            title,
            season,
            episode,
            movie_id,
        } => mappings::run_mappings(&app, title, season, episode, movie_id, &output).await,
        Commands::Index { cmd } => match cmd {
            IndexCommands::Import { file } => index::run_import(&app, &file, &output),
            IndexCommands::Stats => index::run_stats(&app, &output),
        },
        Commands::Status { limit } => status::run_status(&app, limit, &output).await,
        Commands::Auth { clear: true, .. } => auth::run_clear(&app, &output),
        Commands::Auth {
            access_token,
            refresh_token,
            expires_in,
            ..
        } => auth::run_auth(&app, access_token, refresh_token, expires_in, &output),
    }
}
