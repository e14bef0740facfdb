//! Terminal event loop
//!
//! One task owns the store. It waits on terminal input, queued dispatches,
//! the platform's dialog slot and a periodic tick, and redraws when any of
//! them changed something visible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::{backend::Backend, Frame, Terminal};
use shell_dispatch::{ActionSummary, Dispatched, Middleware, Subscription};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::AppAction;
use crate::auth::{AuthUser, LocalAuthProvider};
use crate::context::ShellContext;
use crate::error::ShellError;
use crate::platform::{TerminalPlatform, WindowEvent};
use crate::ui::{AppWrapper, AppWrapperProps, Component, ShellCommand};

/// Eligibility for the rating prompt is time based, so redraw now and then
/// even when nothing was dispatched.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Terminal input the shell reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Forward crossterm input to `tx` until `cancel_token` fires
pub fn spawn_event_poller(
    tx: mpsc::UnboundedSender<RawEvent>,
    poll_timeout: Duration,
    loop_sleep: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        const MAX_EVENTS_PER_BATCH: usize = 16;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    while event::poll(Duration::ZERO).unwrap_or(false) {
                        let _ = event::read();
                    }
                    tracing::debug!("Input poller stopped");
                    break;
                }
                _ = tokio::time::sleep(loop_sleep) => {
                    for _ in 0..MAX_EVENTS_PER_BATCH {
                        if !event::poll(poll_timeout).unwrap_or(false) {
                            break;
                        }
                        let raw = match event::read() {
                            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => RawEvent::Key(key),
                            Ok(Event::Resize(w, h)) => RawEvent::Resize(w, h),
                            _ => continue,
                        };
                        if tx.send(raw).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
}

/// Collaborators the UI drives directly
///
/// Key presses never touch the store. They go to the platform and the auth
/// provider, whose events come back through the listeners.
#[derive(Clone)]
pub struct ShellHandles {
    pub platform: Arc<TerminalPlatform>,
    pub auth: Arc<LocalAuthProvider>,
    pub app_name: String,
    /// Who "sign in" signs in as
    pub local_user: AuthUser,
}

enum Step {
    Stop,
    Input(RawEvent),
    Applied(Result<Dispatched<AppAction>, shell_dispatch::StoreError>),
    Redraw,
}

pub struct Shell<M> {
    ctx: ShellContext<M>,
    handles: ShellHandles,
    ui: AppWrapper,
    dirty: Arc<AtomicBool>,
    _observer: Subscription,
}

impl<M: Middleware<AppAction>> Shell<M> {
    pub fn new(mut ctx: ShellContext<M>, handles: ShellHandles) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        let observer = ctx
            .store
            .subscribe(move |_| flag.store(true, Ordering::Release));
        Self {
            ctx,
            handles,
            ui: AppWrapper::default(),
            dirty,
            _observer: observer,
        }
    }

    pub fn context(&self) -> &ShellContext<M> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ShellContext<M> {
        &mut self.ctx
    }

    /// Whether something visible changed since the last draw
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let dialog = self.handles.platform.pending_dialog();
        let props = AppWrapperProps {
            state: self.ctx.state(),
            decision: self.ctx.render_decision(),
            window_mode: self.ctx.platform_info().window_mode,
            app_name: &self.handles.app_name,
            rating_visible: self.ctx.rating_visible(),
            dialog: dialog.as_ref(),
        };
        let area = frame.area();
        self.ui.render(frame, area, props);
        self.dirty.store(false, Ordering::Release);
    }

    /// Route a key press. Returns false when the shell should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let dialog = self.handles.platform.pending_dialog();
        let props = AppWrapperProps {
            state: self.ctx.state(),
            decision: self.ctx.render_decision(),
            window_mode: self.ctx.platform_info().window_mode,
            app_name: &self.handles.app_name,
            rating_visible: self.ctx.rating_visible(),
            dialog: dialog.as_ref(),
        };
        let commands: Vec<ShellCommand> = self.ui.handle_event(&key, props).into_iter().collect();
        commands.into_iter().all(|command| self.apply(command))
    }

    /// Carry out one command. Returns false on [`ShellCommand::Quit`].
    pub fn apply(&mut self, command: ShellCommand) -> bool {
        tracing::debug!(?command, "Shell command");
        let platform = &self.handles.platform;
        let general = &self.ctx.state().general;
        match command {
            ShellCommand::Quit => return false,
            ShellCommand::ToggleFullScreen => {
                platform.emit_window_event(WindowEvent::FullScreenChanged(!general.is_full_screen))
            }
            ShellCommand::ToggleDarkColors => platform.emit_dark_colors(!general.should_use_dark_colors),
            ShellCommand::Lock => platform.emit_window_event(WindowEvent::LockChanged(true)),
            ShellCommand::Unlock => platform.emit_window_event(WindowEvent::LockChanged(false)),
            ShellCommand::SignIn => self.handles.auth.sign_in(self.handles.local_user.clone()),
            ShellCommand::SignOut => self.handles.auth.sign_out(),
            ShellCommand::Rate => {
                if self.ctx.rating_visible() {
                    let scheduler = self.ctx.scheduler();
                    match Handle::try_current() {
                        Ok(runtime) => {
                            runtime.spawn(async move {
                                scheduler.prompt_and_respond().await;
                            });
                        }
                        Err(_) => tracing::warn!("No tokio runtime to show the rating dialog on"),
                    }
                }
            }
            ShellCommand::DialogSelect(button) => {
                if !platform.resolve_dialog(button) {
                    tracing::debug!(button, "No dialog to answer");
                }
            }
        }
        self.dirty.store(true, Ordering::Release);
        true
    }

    /// Run until quit, `shutdown`, or a reducer error, then tear the context
    /// down
    pub async fn run<B: Backend>(
        mut self,
        terminal: &mut Terminal<B>,
        shutdown: CancellationToken,
    ) -> Result<(), ShellError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop_input = shutdown.child_token();
        let poller = spawn_event_poller(
            tx,
            Duration::from_millis(10),
            Duration::from_millis(16),
            stop_input.clone(),
        );

        let result = self.event_loop(terminal, rx, &shutdown).await;

        stop_input.cancel();
        let _ = poller.await;
        self.ctx.shutdown();
        result
    }

    async fn event_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut input: mpsc::UnboundedReceiver<RawEvent>,
        shutdown: &CancellationToken,
    ) -> Result<(), ShellError> {
        let mut dialog_rx = self.handles.platform.dialog_watch();
        let mut refresh = tokio::time::interval(REFRESH_INTERVAL);

        loop {
            if self.is_dirty() {
                terminal.draw(|frame| self.render(frame))?;
            }

            let step = tokio::select! {
                _ = shutdown.cancelled() => Step::Stop,
                Some(raw) = input.recv() => Step::Input(raw),
                applied = self.ctx.store.next_queued() => Step::Applied(applied),
                Ok(()) = dialog_rx.changed() => Step::Redraw,
                _ = refresh.tick() => Step::Redraw,
            };

            match step {
                Step::Stop => return Ok(()),
                Step::Input(RawEvent::Key(key)) => {
                    if !self.handle_key(key) {
                        return Ok(());
                    }
                }
                Step::Input(RawEvent::Resize(..)) | Step::Redraw => {
                    self.dirty.store(true, Ordering::Release);
                }
                Step::Applied(applied) => {
                    if let Dispatched::Action { action, changed } = applied? {
                        tracing::trace!(action = %action.summary(), changed, "Applied");
                    }
                }
            }
        }
    }
}
