use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Where log lines go for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// The terminal UI owns stdout/stderr; log to `LOG_FILE` or not at all.
    Interactive,
    /// Command-line runs log to stderr.
    Stderr,
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

pub fn init_tracing(config: &Config, target: LogTarget) -> Result<()> {
    let filter = env_filter(config);

    match (target, config.log_file.as_deref()) {
        (_, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()?;
        }
        (LogTarget::Stderr, None) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()?;
        }
        // Nothing may write to the screen while the UI is drawn.
        (LogTarget::Interactive, None) => {}
    }

    Ok(())
}
