use anyhow::Result;
use malsync_config::LoggingConfig;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc, writer::BoxMakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub struct LogOptions<'a> {
    pub verbose: u8,
    pub quiet: bool,
    /// `--log-file`, overriding the config file
    pub file: Option<PathBuf>,
    pub config: Option<&'a LoggingConfig>,
}

fn build_filter(options: &LogOptions<'_>) -> EnvFilter {
    if options.quiet {
        return EnvFilter::new("error");
    }
    // 0 = config level (info), 1 = debug without HTTP internals, 2+ = trace
    let fallback = match options.verbose {
        0 => options
            .config
            .map(|c| c.level.clone())
            .unwrap_or_else(|| "info".to_string()),
        1 => "debug,hyper=warn,reqwest=info,rustls=warn".to_string(),
        _ => "trace".to_string(),
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn json_enabled(options: &LogOptions<'_>) -> bool {
    match std::env::var("RUST_LOG_JSON") {
        Ok(value) => value == "true",
        Err(_) => options
            .config
            .map(|c| c.json)
            .unwrap_or_else(|| !io::stdout().is_terminal()),
    }
}

/// Install the global subscriber
///
/// Returns the guard of the background file writer; keep it alive until exit or
/// buffered lines are lost.
pub fn init_logging(options: LogOptions<'_>) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(&options);
    let json = json_enabled(&options);
    let log_path = options
        .file
        .clone()
        .or_else(|| options.config.and_then(|c| c.file.clone()));

    let (writer, guard) = match log_path {
        Some(log_path) => {
            let log_dir = log_path
                .parent()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no parent directory"))?;
            std::fs::create_dir_all(log_dir)?;
            let log_filename = log_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;
            // malsync.log rotates into malsync.2026-10-16 etc.
            let log_prefix = log_filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(log_filename);

            let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(io::stderr), None),
    };
    let ansi = guard.is_none() && io::stderr().is_terminal();

    let registry = Registry::default().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()?;
    }

    Ok(guard)
}
