//! Composition root
//!
//! [`ShellContext`] owns the store and everything attached to it. It is built
//! once at startup, passed by reference to whoever needs it, and torn down
//! with [`ShellContext::shutdown`].

use std::sync::Arc;

use shell_dispatch::{ListenerRegistry, Middleware, Store};

use crate::action::{AppAction, AppStore};
use crate::auth::{AuthBackend, AuthProvider};
use crate::auth_sync::{AuthSyncController, AuthSyncHandle};
use crate::clock::Clock;
use crate::error::ShellError;
use crate::listeners::install_app_listeners;
use crate::platform::{Platform, PlatformInfo};
use crate::preferences::{load_preferences_state, PreferenceStore};
use crate::rating::{RatingConfig, ReengagementScheduler};
use crate::render_gate::{render_decision, RenderDecision, RenderInputs};
use crate::state::{AppState, GeneralState};

/// External collaborators the shell is wired to
#[derive(Clone)]
pub struct Services {
    pub auth_provider: Arc<dyn AuthProvider>,
    pub auth_backend: Arc<dyn AuthBackend>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub platform: Arc<dyn Platform>,
    pub clock: Arc<dyn Clock>,
}

pub struct ShellContext<M> {
    pub store: AppStore<M>,
    listeners: ListenerRegistry,
    auth: AuthSyncHandle,
    scheduler: Arc<ReengagementScheduler>,
    platform_info: PlatformInfo,
}

impl<M: Middleware<AppAction>> ShellContext<M> {
    /// Build the store and attach listeners and auth sync
    ///
    /// Fails with [`StoreError::NoRuntime`](shell_dispatch::StoreError::NoRuntime)
    /// outside a tokio runtime.
    pub fn new(
        services: Services,
        general: GeneralState,
        rating: RatingConfig,
        middleware: M,
    ) -> Result<Self, ShellError> {
        let preferences = load_preferences_state(services.preferences.as_ref());
        let store: AppStore<M> =
            Store::with_middleware(AppState::new(general, preferences), middleware)?;

        let listeners = install_app_listeners(
            store.dispatcher(),
            Arc::clone(&services.platform),
            Arc::clone(&services.preferences),
        )?;

        let auth = AuthSyncController::new(
            Arc::clone(&services.auth_provider),
            Arc::clone(&services.auth_backend),
        )
        .mount(store.dispatcher())?;

        let platform_info = services.platform.info();
        let scheduler = Arc::new(ReengagementScheduler::new(
            rating,
            services.platform,
            services.preferences,
            services.clock,
        ));

        tracing::info!(
            listeners = listeners.len(),
            window_mode = ?platform_info.window_mode,
            "Shell context ready"
        );

        Ok(Self {
            store,
            listeners,
            auth,
            scheduler,
            platform_info,
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        self.store.state()
    }

    pub fn platform_info(&self) -> PlatformInfo {
        self.platform_info
    }

    pub fn render_decision(&self) -> RenderDecision {
        render_decision(&RenderInputs::from_state(self.state(), &self.platform_info))
    }

    /// Whether the rating button is offered right now
    pub fn rating_visible(&self) -> bool {
        self.scheduler.evaluate(&self.state().preferences)
    }

    pub fn scheduler(&self) -> Arc<ReengagementScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn auth(&self) -> &AuthSyncHandle {
        &self.auth
    }

    /// Unmount auth sync and release every listener
    pub fn shutdown(&mut self) {
        self.auth.unmount();
        self.listeners.release_all();
        tracing::info!("Shell context shut down");
    }
}
