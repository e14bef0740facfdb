//! Fakes shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use desktop_shell::auth::{AuthBackend, AuthError, AuthProvider, AuthUser};
use desktop_shell::platform::{
    ConfirmDialog, EventStream, Platform, PlatformError, PlatformInfo, PlatformKind, WindowEvent,
    WindowMode,
};
use desktop_shell::state::UserProfile;
use ratatui::{backend::TestBackend, Frame, Terminal};
use shell_dispatch::{Callback, ListenerError, Unsubscribe};
use tokio::sync::{broadcast, Notify};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub fn char_key(c: char) -> KeyEvent {
    key(KeyCode::Char(c))
}

/// Draw one frame into an in-memory terminal and return the screen as text,
/// one line per row with trailing spaces trimmed
pub fn render_plain(width: u16, height: u16, draw: impl FnOnce(&mut Frame)) -> String {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(draw).unwrap();
    let buf = terminal.backend().buffer();
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let line: String = (area.left()..area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn user(uid: &str) -> AuthUser {
    AuthUser {
        display_name: Some(format!("User {uid}")),
        ..AuthUser::new(uid)
    }
}

/// Auth provider that only reports when told to
///
/// With `honor_unsubscribe` off it keeps calling the observer after
/// unsubscribe, like a provider that resolves a pending request late.
pub struct ManualProvider {
    observer: Arc<Mutex<Option<Callback<Option<AuthUser>>>>>,
    honor_unsubscribe: bool,
    subscriptions: Mutex<usize>,
}

impl ManualProvider {
    pub fn new() -> Self {
        Self::with_unsubscribe(true)
    }

    pub fn with_unsubscribe(honor_unsubscribe: bool) -> Self {
        Self {
            observer: Arc::new(Mutex::new(None)),
            honor_unsubscribe,
            subscriptions: Mutex::new(0),
        }
    }

    pub fn fire(&self, user: Option<AuthUser>) {
        if let Some(observer) = self.observer.lock().unwrap().as_ref() {
            observer(user);
        }
    }

    pub fn has_observer(&self) -> bool {
        self.observer.lock().unwrap().is_some()
    }

    pub fn subscriptions(&self) -> usize {
        *self.subscriptions.lock().unwrap()
    }
}

impl AuthProvider for ManualProvider {
    fn on_auth_state_changed(&self, callback: Callback<Option<AuthUser>>) -> Unsubscribe {
        *self.subscriptions.lock().unwrap() += 1;
        *self.observer.lock().unwrap() = Some(callback);
        if !self.honor_unsubscribe {
            return Unsubscribe::noop();
        }
        let observer = Arc::clone(&self.observer);
        Unsubscribe::new(move || {
            observer.lock().unwrap().take();
        })
    }
}

/// Backend whose profile fetches for chosen uids wait for [`GatedBackend::release`]
#[derive(Default)]
pub struct GatedBackend {
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl GatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self, uid: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(uid.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, uid: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(uid) {
            gate.notify_one();
        }
    }

    pub fn fail(&self, uid: &str) {
        self.failing.lock().unwrap().push(uid.to_string());
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthBackend for GatedBackend {
    async fn fetch_user(&self, user: &AuthUser) -> Result<UserProfile, AuthError> {
        self.fetched.lock().unwrap().push(user.uid.clone());
        let gate = self.gates.lock().unwrap().get(&user.uid).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().unwrap().contains(&user.uid) {
            return Err(AuthError::Decode(format!("no profile for {}", user.uid)));
        }
        Ok(UserProfile {
            uid: user.uid.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
        })
    }

    async fn check_auth(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Platform that answers dialogs with a scripted button
pub struct ScriptedPlatform {
    pub info: PlatformInfo,
    pub restricted: bool,
    /// `None` closes the dialog without an answer
    pub answer: Mutex<Option<usize>>,
    pub dialogs: Mutex<Vec<ConfirmDialog>>,
    pub opened: Mutex<Vec<String>>,
    pub window_available: bool,
    window_tx: broadcast::Sender<WindowEvent>,
    theme_tx: broadcast::Sender<bool>,
}

impl ScriptedPlatform {
    pub fn new(restricted: bool) -> Self {
        let (window_tx, _) = broadcast::channel(16);
        let (theme_tx, _) = broadcast::channel(16);
        Self {
            info: PlatformInfo {
                kind: PlatformKind::Mac,
                window_mode: WindowMode::Main,
                use_system_title_bar: false,
            },
            restricted,
            answer: Mutex::new(Some(1)),
            dialogs: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            window_available: true,
            window_tx,
            theme_tx,
        }
    }

    /// A platform whose window feed cannot be subscribed
    pub fn without_window_feed(mut self) -> Self {
        self.window_available = false;
        self
    }

    pub fn answer_with(&self, answer: Option<usize>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn emit_window(&self, event: WindowEvent) {
        let _ = self.window_tx.send(event);
    }

    pub fn emit_theme(&self, dark: bool) {
        let _ = self.theme_tx.send(dark);
    }
}

fn feed<T: Clone + Send + 'static>(rx: broadcast::Receiver<T>) -> EventStream<T> {
    Box::pin(BroadcastStream::new(rx).filter_map(Result::ok))
}

#[async_trait]
impl Platform for ScriptedPlatform {
    fn info(&self) -> PlatformInfo {
        self.info
    }

    fn is_restricted_distribution_channel(&self) -> bool {
        self.restricted
    }

    async fn show_confirm_dialog(&self, dialog: ConfirmDialog) -> Result<usize, PlatformError> {
        self.dialogs.lock().unwrap().push(dialog);
        let answer = *self.answer.lock().unwrap();
        answer.ok_or(PlatformError::DialogRejected)
    }

    fn open_external(&self, url: &str) -> Result<(), PlatformError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn window_events(&self) -> Result<EventStream<WindowEvent>, ListenerError> {
        if !self.window_available {
            return Err(ListenerError::Unavailable("no window server".into()));
        }
        Ok(feed(self.window_tx.subscribe()))
    }

    fn theme_events(&self) -> Result<EventStream<bool>, ListenerError> {
        Ok(feed(self.theme_tx.subscribe()))
    }
}
