//! Auth collaborators
//!
//! - [`AuthProvider`]: push-style signal of the authenticated user
//!   (`Some(user)` after sign-in, `None` after sign-out)
//! - [`AuthBackend`]: request/response calls that need an authenticated user

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use shell_dispatch::{Callback, Unsubscribe};
use thiserror::Error;

use crate::state::UserProfile;

/// What the auth provider knows about the signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Bearer token for backend calls
    pub id_token: Option<String>,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            id_token: None,
        }
    }
}

pub trait AuthProvider: Send + Sync {
    /// Observe auth state changes until the returned guard is released
    fn on_auth_state_changed(&self, callback: Callback<Option<AuthUser>>) -> Unsubscribe;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("auth backend answered {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected auth response: {0}")]
    Decode(String),
    #[error("no signed-in user")]
    NotSignedIn,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Load the account profile of `user`
    async fn fetch_user(&self, user: &AuthUser) -> Result<UserProfile, AuthError>;

    /// Validate the locally stored auth state with the backend
    async fn check_auth(&self) -> Result<(), AuthError>;
}

type Observer = Arc<dyn Fn(Option<AuthUser>) + Send + Sync>;

#[derive(Default)]
struct ProviderInner {
    current: Option<AuthUser>,
    observers: Vec<(u64, Observer)>,
    next_id: u64,
}

/// In-process auth provider
///
/// Like hosted auth SDKs, a new observer is immediately told the current
/// state, then every later change.
///
/// Deliveries are serialized: a state change and a new observer's replay
/// never interleave, so an observer's last call is always the current state.
/// Observers may unsubscribe from inside the callback, but must not sign in,
/// sign out or subscribe there.
#[derive(Clone, Default)]
pub struct LocalAuthProvider {
    inner: Arc<Mutex<ProviderInner>>,
    delivery: Arc<Mutex<()>>,
}

impl fmt::Debug for LocalAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("LocalAuthProvider")
            .field("current", &inner.current)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LocalAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        lock(&self.inner).current.clone()
    }

    pub fn sign_in(&self, user: AuthUser) {
        tracing::info!(uid = %user.uid, "Signed in");
        self.set_current(Some(user));
    }

    pub fn sign_out(&self) {
        tracing::info!("Signed out");
        self.set_current(None);
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        lock(&self.inner).observers.len()
    }

    fn set_current(&self, user: Option<AuthUser>) {
        let _delivery = lock(&self.delivery);
        let observers: Vec<Observer> = {
            let mut inner = lock(&self.inner);
            inner.current = user.clone();
            inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        // Called without the state lock so observers may unsubscribe
        for observer in observers {
            observer(user.clone());
        }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn on_auth_state_changed(&self, callback: Callback<Option<AuthUser>>) -> Unsubscribe {
        let observer: Observer = Arc::from(callback);
        let delivery = lock(&self.delivery);
        let (id, current) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Arc::clone(&observer)));
            (id, inner.current.clone())
        };
        observer(current);
        drop(delivery);

        let weak: Weak<Mutex<ProviderInner>> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).observers.retain(|(other, _)| *other != id);
            }
        })
    }
}

/// Backend that answers from the auth user itself, no network
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAuthBackend;

#[async_trait]
impl AuthBackend for LocalAuthBackend {
    async fn fetch_user(&self, user: &AuthUser) -> Result<UserProfile, AuthError> {
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

/// HTTP account backend
///
/// - `GET {base}/user` with the user's bearer token returns the profile JSON
/// - `POST {base}/auth/check` validates the stored auth state
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn user_url(&self) -> String {
        format!("{}/user", self.base_url)
    }

    pub fn check_url(&self) -> String {
        format!("{}/auth/check", self.base_url)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn fetch_user(&self, user: &AuthUser) -> Result<UserProfile, AuthError> {
        let token = user.id_token.as_deref().ok_or(AuthError::NotSignedIn)?;

        let response = self
            .client
            .get(self.user_url())
            .bearer_auth(token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Status(response.status()));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        if profile.uid != user.uid {
            return Err(AuthError::Decode(format!(
                "profile uid {} does not match signed-in uid {}",
                profile.uid, user.uid
            )));
        }
        Ok(profile)
    }

    async fn check_auth(&self) -> Result<(), AuthError> {
        let response = self.client.post(self.check_url()).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthError::Status(response.status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording() -> (Arc<Mutex<Vec<Option<String>>>>, Callback<Option<AuthUser>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Callback<Option<AuthUser>> = Box::new(move |user: Option<AuthUser>| {
            sink.lock().unwrap().push(user.map(|u| u.uid));
        });
        (seen, callback)
    }

    #[test]
    fn test_new_observer_gets_current_state() {
        let provider = LocalAuthProvider::new();
        provider.sign_in(AuthUser::new("u1"));

        let (seen, callback) = recording();
        let _guard = provider.on_auth_state_changed(callback);

        assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
    }

    #[test]
    fn test_observer_sees_changes_until_unsubscribed() {
        let provider = LocalAuthProvider::new();
        let (seen, callback) = recording();
        let guard = provider.on_auth_state_changed(callback);

        provider.sign_in(AuthUser::new("u1"));
        provider.sign_out();
        guard.unsubscribe();
        provider.sign_in(AuthUser::new("u2"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("u1".to_string()), None]
        );
        assert_eq!(provider.observer_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_provider_dropped() {
        let provider = LocalAuthProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = provider.on_auth_state_changed(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        drop(provider);
        guard.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replay_waits_for_delivery_in_progress() {
        use std::sync::mpsc;
        use std::time::Duration;

        let provider = LocalAuthProvider::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);

        let o = Arc::clone(&order);
        let _first = provider.on_auth_state_changed(Box::new(move |user: Option<AuthUser>| {
            if let Some(user) = user {
                entered_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
                o.lock().unwrap().push(format!("first:{}", user.uid));
            }
        }));

        let signer = {
            let provider = provider.clone();
            std::thread::spawn(move || provider.sign_in(AuthUser::new("u2")))
        };
        entered_rx.recv().unwrap();

        let subscriber = {
            let provider = provider.clone();
            let o = Arc::clone(&order);
            std::thread::spawn(move || {
                provider.on_auth_state_changed(Box::new(move |user: Option<AuthUser>| {
                    let uid = user.map(|u| u.uid).unwrap_or_default();
                    o.lock().unwrap().push(format!("second:{uid}"));
                }))
            })
        };

        // The new observer must not be replayed to while the change is
        // still being delivered
        std::thread::sleep(Duration::from_millis(20));
        assert!(order.lock().unwrap().is_empty());

        release_tx.send(()).unwrap();
        signer.join().unwrap();
        let _second = subscriber.join().unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec!["first:u2".to_string(), "second:u2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_local_backend_profile() {
        let mut user = AuthUser::new("u1");
        user.display_name = Some("Ada".into());
        let profile = LocalAuthBackend.fetch_user(&user).await.unwrap();
        assert_eq!(profile.uid, "u1");
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert!(LocalAuthBackend.check_auth().await.is_ok());
    }

    #[tokio::test]
    async fn test_http_backend_requires_token() {
        let backend = HttpAuthBackend::new("http://127.0.0.1:9/");
        assert_eq!(backend.user_url(), "http://127.0.0.1:9/user");
        assert_eq!(backend.check_url(), "http://127.0.0.1:9/auth/check");

        let err = backend
            .fetch_user(&AuthUser::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotSignedIn));
    }
}
