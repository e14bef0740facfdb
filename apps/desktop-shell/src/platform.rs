//! Platform and window collaborator
//!
//! [`Platform`] is everything the shell asks of its host: what it runs on,
//! modal confirm dialogs, opening URLs, and feeds of window and theme events.
//! [`TerminalPlatform`] implements it for the terminal shell, where dialogs are
//! answered by key press and window events come from the key map.

use std::fmt;
use std::pin::Pin;
use std::process::Command;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use clap::ValueEnum;
use shell_dispatch::ListenerError;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

const EVENT_CAPACITY: usize = 32;

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformKind {
    Mac,
    Windows,
    Linux,
}

impl PlatformKind {
    /// The platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            PlatformKind::Mac
        } else if cfg!(target_os = "windows") {
            PlatformKind::Windows
        } else {
            PlatformKind::Linux
        }
    }
}

/// Which window this process renders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum WindowMode {
    #[default]
    Main,
    About,
    Preferences,
}

impl WindowMode {
    pub fn title(self) -> &'static str {
        match self {
            WindowMode::Main => "Main",
            WindowMode::About => "About",
            WindowMode::Preferences => "Preferences",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub kind: PlatformKind,
    pub window_mode: WindowMode,
    pub use_system_title_bar: bool,
}

/// A modal confirm dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub buttons: Vec<String>,
    pub message: String,
    pub detail: String,
    /// Button reported when the dialog is dismissed
    pub cancel_id: usize,
    /// Button reported on Enter
    pub default_id: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    FullScreenChanged(bool),
    LockChanged(bool),
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("dialog was closed without a response")]
    DialogRejected,
    #[error("another dialog is already open")]
    DialogBusy,
    #[error("could not open {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait Platform: Send + Sync {
    fn info(&self) -> PlatformInfo;

    /// Whether this build ships through the store that hosts reviews
    fn is_restricted_distribution_channel(&self) -> bool;

    /// Show a modal dialog; resolves with the index of the chosen button
    async fn show_confirm_dialog(&self, dialog: ConfirmDialog) -> Result<usize, PlatformError>;

    fn open_external(&self, url: &str) -> Result<(), PlatformError>;

    fn window_events(&self) -> Result<EventStream<WindowEvent>, ListenerError>;

    /// Feed of "should use dark colors" changes
    fn theme_events(&self) -> Result<EventStream<bool>, ListenerError>;
}

fn broadcast_stream<T: Clone + Send + 'static>(rx: broadcast::Receiver<T>) -> EventStream<T> {
    Box::pin(BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(error = %e, "Platform event feed lagged");
            None
        }
    }))
}

struct PendingDialog {
    dialog: ConfirmDialog,
    reply: oneshot::Sender<usize>,
}

/// [`Platform`] for the terminal shell
pub struct TerminalPlatform {
    info: PlatformInfo,
    restricted_channel: bool,
    open_urls: bool,
    window_tx: broadcast::Sender<WindowEvent>,
    theme_tx: broadcast::Sender<bool>,
    pending: Mutex<Option<PendingDialog>>,
    dialog_tx: watch::Sender<Option<ConfirmDialog>>,
}

impl fmt::Debug for TerminalPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalPlatform")
            .field("info", &self.info)
            .field("restricted_channel", &self.restricted_channel)
            .field("dialog_open", &self.pending_dialog().is_some())
            .finish()
    }
}

impl TerminalPlatform {
    pub fn new(info: PlatformInfo, restricted_channel: bool) -> Self {
        let (window_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (theme_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (dialog_tx, _) = watch::channel(None);
        Self {
            info,
            restricted_channel,
            open_urls: true,
            window_tx,
            theme_tx,
            pending: Mutex::new(None),
            dialog_tx,
        }
    }

    /// Log URLs instead of handing them to the OS opener
    pub fn without_opener(mut self) -> Self {
        self.open_urls = false;
        self
    }

    /// Inject a window event, as the window manager would
    pub fn emit_window_event(&self, event: WindowEvent) {
        if self.window_tx.send(event).is_err() {
            tracing::debug!(?event, "No window event listener");
        }
    }

    /// Inject an OS theme change
    pub fn emit_dark_colors(&self, dark: bool) {
        if self.theme_tx.send(dark).is_err() {
            tracing::debug!(dark, "No theme listener");
        }
    }

    /// The dialog waiting for an answer, if any
    pub fn pending_dialog(&self) -> Option<ConfirmDialog> {
        self.lock_pending().as_ref().map(|p| p.dialog.clone())
    }

    /// Watch the open dialog; changes whenever one opens or closes
    pub fn dialog_watch(&self) -> watch::Receiver<Option<ConfirmDialog>> {
        self.dialog_tx.subscribe()
    }

    /// Answer the open dialog with a button index. Returns false if no
    /// dialog was open.
    pub fn resolve_dialog(&self, button: usize) -> bool {
        let Some(pending) = self.lock_pending().take() else {
            return false;
        };
        self.dialog_tx.send_replace(None);
        // The asker may have given up; nothing to report then
        let _ = pending.reply.send(button);
        true
    }

    /// Close the open dialog without an answer
    pub fn dismiss_dialog(&self) -> bool {
        let closed = self.lock_pending().take().is_some();
        if closed {
            self.dialog_tx.send_replace(None);
        }
        closed
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingDialog>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn opener_command(kind: PlatformKind, url: &str) -> Command {
    match kind {
        PlatformKind::Mac => {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        }
        PlatformKind::Windows => {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        }
        PlatformKind::Linux => {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

#[async_trait]
impl Platform for TerminalPlatform {
    fn info(&self) -> PlatformInfo {
        self.info
    }

    fn is_restricted_distribution_channel(&self) -> bool {
        self.restricted_channel
    }

    async fn show_confirm_dialog(&self, dialog: ConfirmDialog) -> Result<usize, PlatformError> {
        let rx = {
            let mut pending = self.lock_pending();
            if pending.is_some() {
                return Err(PlatformError::DialogBusy);
            }
            let (reply, rx) = oneshot::channel();
            self.dialog_tx.send_replace(Some(dialog.clone()));
            *pending = Some(PendingDialog { dialog, reply });
            rx
        };
        rx.await.map_err(|_| PlatformError::DialogRejected)
    }

    fn open_external(&self, url: &str) -> Result<(), PlatformError> {
        if !self.open_urls {
            tracing::info!(%url, "Open external (opener disabled)");
            return Ok(());
        }
        opener_command(self.info.kind, url)
            .spawn()
            .map(|_child| ())
            .map_err(|source| PlatformError::Open {
                url: url.to_string(),
                source,
            })
    }

    fn window_events(&self) -> Result<EventStream<WindowEvent>, ListenerError> {
        Ok(broadcast_stream(self.window_tx.subscribe()))
    }

    fn theme_events(&self) -> Result<EventStream<bool>, ListenerError> {
        Ok(broadcast_stream(self.theme_tx.subscribe()))
    }
}
