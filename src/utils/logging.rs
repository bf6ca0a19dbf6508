//! Structured logging setup on top of `tracing-subscriber`.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use crate::config::LoggingConfig;
use crate::error::{IndexerError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{info, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global subscriber described by `config`.
///
/// Calling this again once a subscriber is installed is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(config.log_level).into())
    });

    let console = config
        .log_to_console
        .then(|| format_layer(config.json_format, true, std::io::stdout));

    let file = match (config.log_to_file, config.log_file_path.as_deref()) {
        (true, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    IndexerError::ConfigError(format!("Failed to open log file {path}: {e}"))
                })?;
            Some(format_layer(config.json_format, false, Mutex::new(file)))
        }
        _ => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .is_ok();

    if installed {
        info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    }
    Ok(())
}

fn format_layer<S, W>(json: bool, ansi: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed()
    }
}
