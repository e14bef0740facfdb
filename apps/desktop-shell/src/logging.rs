//! Logging setup using `tracing-subscriber`
//!
//! The terminal belongs to the UI, so logs go to a file. `RUST_LOG` wins
//! over the configured default level.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ShellError;

fn build_env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, appending to `path`
///
/// With no path, logging stays disabled.
pub fn init_logging(path: Option<&Path>, default_level: &str) -> Result<(), ShellError> {
    let Some(path) = path else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_env_filter(default_level))
        .with(layer)
        .try_init()
        .map_err(|e| ShellError::Logging(e.to_string()))?;

    tracing::info!(path = %path.display(), "Logging initialized");
    Ok(())
}
