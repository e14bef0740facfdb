//! Keeps the `user` slice in step with the auth provider
//!
//! While mounted, every provider signal becomes a dispatch:
//!
//! - no authenticated user: `AppAction::UserClear`
//! - authenticated user: one `user/update` thunk that fetches the profile and
//!   dispatches `AppAction::UserDidLoad` on success
//!
//! Mounting also fires a single background `check_auth` call.
//!
//! Every signal (and unmount) advances a generation counter. A fetch only
//! reports back if no newer signal arrived while it was in flight, so a slow
//! fetch for a previous sign-in cannot overwrite a later sign-out. The
//! counter is a mutex rather than an atomic: a signal bumps it and queues its
//! dispatch under the lock, and a fetch checks it and queues `UserDidLoad`
//! under the same lock, so a stale result can never be queued behind a newer
//! signal's dispatch, whichever threads the two run on.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shell_dispatch::{StoreError, Thunk, Unsubscribe};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::action::{AppAction, AppDispatcher, AppThunk};
use crate::auth::{AuthBackend, AuthProvider, AuthUser};

/// Name of the profile fetch thunk
pub const UPDATE_USER_THUNK: &str = "user/update";

type Generation = Arc<Mutex<u64>>;

fn lock_generation(counter: &Mutex<u64>) -> MutexGuard<'_, u64> {
    counter.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of the generation counter taken when a fetch starts
#[derive(Debug, Clone)]
pub struct GenerationGuard {
    counter: Generation,
    generation: u64,
}

impl GenerationGuard {
    pub fn is_current(&self) -> bool {
        *lock_generation(&self.counter) == self.generation
    }

    /// Run `report` only if no newer signal has arrived, holding the counter
    /// so none can arrive while it runs. Returns whether it ran.
    pub fn run_if_current(&self, report: impl FnOnce()) -> bool {
        let current = lock_generation(&self.counter);
        if *current != self.generation {
            return false;
        }
        report();
        true
    }
}

/// Thunk that fetches `user`'s profile and loads it into the `user` slice
///
/// Failures are logged and leave the slice as it was. No retry.
pub fn update_user(
    backend: Arc<dyn AuthBackend>,
    user: AuthUser,
    guard: GenerationGuard,
) -> AppThunk {
    Thunk::new(UPDATE_USER_THUNK, move |ctx| async move {
        match backend.fetch_user(&user).await {
            Ok(profile) => {
                let reported = guard.run_if_current(|| {
                    ctx.dispatch(AppAction::UserDidLoad(profile));
                });
                if !reported {
                    tracing::debug!(uid = %user.uid, "Discarding superseded profile fetch");
                }
            }
            Err(error) => {
                tracing::warn!(uid = %user.uid, %error, "Profile fetch failed");
            }
        }
    })
}

pub struct AuthSyncController {
    provider: Arc<dyn AuthProvider>,
    backend: Arc<dyn AuthBackend>,
}

impl fmt::Debug for AuthSyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSyncController").finish_non_exhaustive()
    }
}

impl AuthSyncController {
    pub fn new(provider: Arc<dyn AuthProvider>, backend: Arc<dyn AuthBackend>) -> Self {
        Self { provider, backend }
    }

    /// Start observing the provider
    ///
    /// Outside a tokio runtime nothing is subscribed and
    /// [`StoreError::NoRuntime`] is returned.
    pub fn mount(&self, dispatcher: AppDispatcher) -> Result<AuthSyncHandle, StoreError> {
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("Auth sync mounted outside a tokio runtime");
            return Err(StoreError::NoRuntime("auth sync"));
        };

        let generation: Generation = Arc::new(Mutex::new(0));
        let mounted = Arc::new(AtomicBool::new(true));

        let check = {
            let backend = Arc::clone(&self.backend);
            runtime.spawn(async move {
                match backend.check_auth().await {
                    Ok(()) => tracing::debug!("Auth check passed"),
                    Err(error) => tracing::warn!(%error, "Auth check failed"),
                }
            })
        };

        let callback = {
            let backend = Arc::clone(&self.backend);
            let generation = Arc::clone(&generation);
            let mounted = Arc::clone(&mounted);
            move |user: Option<AuthUser>| {
                let mut counter = lock_generation(&generation);
                if !mounted.load(Ordering::SeqCst) {
                    return;
                }
                *counter += 1;
                let current = *counter;
                match user {
                    None => {
                        dispatcher.dispatch(AppAction::UserClear);
                    }
                    Some(user) => {
                        let guard = GenerationGuard {
                            counter: Arc::clone(&generation),
                            generation: current,
                        };
                        dispatcher.dispatch(update_user(Arc::clone(&backend), user, guard));
                    }
                }
            }
        };

        let unsubscribe = self.provider.on_auth_state_changed(Box::new(callback));
        tracing::debug!("Auth sync mounted");

        Ok(AuthSyncHandle {
            unsubscribe: Some(unsubscribe),
            generation,
            mounted,
            check: Some(check),
        })
    }
}

/// A mounted [`AuthSyncController`]; unmounts on drop
#[must_use = "dropping the handle unmounts the controller"]
pub struct AuthSyncHandle {
    unsubscribe: Option<Unsubscribe>,
    generation: Generation,
    mounted: Arc<AtomicBool>,
    check: Option<JoinHandle<()>>,
}

impl AuthSyncHandle {
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Stop observing the provider
    ///
    /// In-flight fetches are left to finish; their results are discarded.
    pub fn unmount(&mut self) {
        {
            let mut counter = lock_generation(&self.generation);
            if !self.mounted.swap(false, Ordering::SeqCst) {
                return;
            }
            *counter += 1;
        }
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe.unsubscribe();
        }
        tracing::debug!("Auth sync unmounted");
    }

    /// The mount-time auth check, for callers that want to await it
    pub fn take_check(&mut self) -> Option<JoinHandle<()>> {
        self.check.take()
    }
}

impl fmt::Debug for AuthSyncHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSyncHandle")
            .field("mounted", &self.is_mounted())
            .field("generation", &*lock_generation(&self.generation))
            .finish()
    }
}

impl Drop for AuthSyncHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}
