//! Desktop shell
//!
//! The store, reducers and collaborators behind a single-window desktop
//! shell: auth sync, lock screen gating, and a time-gated rating prompt.
//! `desktop-shell` (the binary) renders it in a terminal.

pub mod action;
pub mod auth;
pub mod auth_sync;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod listeners;
pub mod logging;
pub mod platform;
pub mod preferences;
pub mod rating;
pub mod reducer;
pub mod render_gate;
pub mod runtime;
pub mod state;
pub mod ui;

pub use action::{AppAction, AppDispatcher, AppStore, AppThunk};
pub use context::{Services, ShellContext};
pub use error::ShellError;
pub use state::AppState;
