use std::io;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use desktop_shell::auth::{AuthBackend, AuthUser, HttpAuthBackend, LocalAuthBackend, LocalAuthProvider};
use desktop_shell::clock::SystemClock;
use desktop_shell::config::ShellConfig;
use desktop_shell::logging::init_logging;
use desktop_shell::platform::TerminalPlatform;
use desktop_shell::preferences::{JsonFilePreferences, MemoryPreferences, PreferenceStore};
use desktop_shell::runtime::{Shell, ShellHandles};
use desktop_shell::state::GeneralState;
use desktop_shell::{Services, ShellContext, ShellError};
use ratatui::{backend::CrosstermBackend, Terminal};
use shell_dispatch::LoggingMiddleware;
use tokio_util::sync::CancellationToken;

fn local_user() -> AuthUser {
    let name = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    AuthUser {
        display_name: Some(name.clone()),
        ..AuthUser::new(name)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ShellError> {
    let config = ShellConfig::parse();
    init_logging(config.log_path().as_deref(), &config.log_level)?;

    let preferences: Arc<dyn PreferenceStore> = match config.preferences_path() {
        Some(path) => Arc::new(JsonFilePreferences::open(path)?),
        None => Arc::new(MemoryPreferences::new()),
    };
    let backend: Arc<dyn AuthBackend> = match &config.auth_url {
        Some(url) => Arc::new(HttpAuthBackend::new(url.as_str())),
        None => Arc::new(LocalAuthBackend),
    };
    let platform = Arc::new(TerminalPlatform::new(
        config.platform_info(),
        config.restricted_channel,
    ));
    let auth = Arc::new(LocalAuthProvider::new());

    let services = Services {
        auth_provider: auth.clone(),
        auth_backend: backend,
        preferences,
        platform: platform.clone(),
        clock: Arc::new(SystemClock),
    };
    let general = GeneralState {
        should_use_dark_colors: config.dark,
        ..GeneralState::default()
    };
    let ctx = ShellContext::new(services, general, config.rating_config(), LoggingMiddleware::new())?;
    let shell = Shell::new(
        ctx,
        ShellHandles {
            platform,
            auth,
            app_name: config.app_name.clone(),
            local_user: local_user(),
        },
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = shell.run(&mut terminal, CancellationToken::new()).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
