use shell_dispatch::StoreError;
use thiserror::Error;

use crate::preferences::PreferenceError;

/// Errors that end the shell
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not load preferences: {0}")]
    Preferences(#[from] PreferenceError),
    #[error("could not initialize logging: {0}")]
    Logging(String),
}
