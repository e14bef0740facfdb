//! External event sources bound to the store
//!
//! Installed once, right after the store is built. Each source maps its
//! events to actions; a source that cannot be subscribed is skipped without
//! affecting the others.

use std::sync::Arc;

use shell_dispatch::{Binding, ListenerRegistry, StoreError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::action::{AppAction, AppDispatcher};
use crate::platform::{Platform, WindowEvent};
use crate::preferences::PreferenceStore;
use crate::state::AppState;

pub const WINDOW_BINDING: &str = "window";
pub const THEME_BINDING: &str = "theme";
pub const PREFERENCES_BINDING: &str = "preferences";

impl From<WindowEvent> for AppAction {
    fn from(event: WindowEvent) -> Self {
        match event {
            WindowEvent::FullScreenChanged(on) => AppAction::GeneralFullScreenSet(on),
            WindowEvent::LockChanged(on) => AppAction::GeneralLockSet(on),
        }
    }
}

/// The fixed binding list for the shell
pub fn app_bindings(
    platform: Arc<dyn Platform>,
    preferences: Arc<dyn PreferenceStore>,
) -> Vec<Binding<AppState, AppAction>> {
    let window = {
        let platform = Arc::clone(&platform);
        Binding::new(WINDOW_BINDING, move || {
            Ok(platform.window_events()?.map(AppAction::from))
        })
    };

    let theme = Binding::new(THEME_BINDING, move || {
        Ok(platform.theme_events()?.map(AppAction::GeneralDarkColorsSet))
    });

    let preferences = Binding::new(PREFERENCES_BINDING, move || {
        let feed = BroadcastStream::new(preferences.changes()).filter_map(|change| match change {
            Ok(change) => Some(AppAction::PreferenceDidChange {
                key: change.key,
                value: change.value,
            }),
            Err(e) => {
                tracing::warn!(binding = PREFERENCES_BINDING, error = %e, "Preference feed lagged");
                None
            }
        });
        Ok(feed)
    });

    vec![window, theme, preferences]
}

/// Install [`app_bindings`] against `dispatcher`
pub fn install_app_listeners(
    dispatcher: AppDispatcher,
    platform: Arc<dyn Platform>,
    preferences: Arc<dyn PreferenceStore>,
) -> Result<ListenerRegistry, StoreError> {
    let registry = ListenerRegistry::install(dispatcher, app_bindings(platform, preferences))?;
    if !registry.failed().is_empty() {
        tracing::warn!(
            failed = registry.failed().len(),
            active = registry.len(),
            "Some listeners are unavailable"
        );
    }
    Ok(registry)
}
