//! External-event bindings installed once alongside the store
//!
//! A [`Binding`] pairs a key with a subscribe function that opens a stream
//! from some external source (window manager, OS theme, persistence change
//! feed). [`ListenerRegistry::install`] opens every binding in a fixed list
//! and forwards each stream item to the store as a dispatch.
//!
//! # Example
//!
//! ```ignore
//! use shell_dispatch::listeners::{Binding, ListenerRegistry};
//!
//! let registry = ListenerRegistry::install(store.dispatcher(), vec![
//!     Binding::new("window", move || {
//!         Ok(platform.window_events()?.map(AppAction::from))
//!     }),
//!     Binding::new("theme", move || {
//!         Ok(platform.theme_events()?.map(AppAction::GeneralDarkColorsSet))
//!     }),
//! ])?;
//!
//! // One unavailable source does not stop the others
//! for (key, error) in registry.failed() {
//!     tracing::warn!(binding = %key.name(), %error, "listener not installed");
//! }
//! ```

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

use crate::effect::{Dispatch, Dispatcher};
use crate::store::StoreError;
use crate::Action;

/// Why a binding could not be installed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// The external source is not available on this platform or right now
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Another binding already uses this key
    #[error("binding `{0}` is already installed")]
    Duplicate(String),
}

/// Identifies a binding for release and diagnostics
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerKey(String);

impl ListenerKey {
    /// Create a new listener key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ListenerKey {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ListenerKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stream of dispatches produced by one binding
pub type DispatchStream<S, A> = Pin<Box<dyn Stream<Item = Dispatch<S, A>> + Send + 'static>>;

type SubscribeFn<S, A> =
    Box<dyn FnOnce() -> Result<DispatchStream<S, A>, ListenerError> + Send + 'static>;

/// One external-event binding: a key and the function that subscribes to
/// the source
pub struct Binding<S, A> {
    key: ListenerKey,
    subscribe: SubscribeFn<S, A>,
}

impl<S: 'static, A: Action> Binding<S, A> {
    /// Create a binding. `subscribe` runs once, during install.
    ///
    /// The returned stream is the subscription: dropping it must release the
    /// external source (see [`callback_stream`]).
    pub fn new<F, St, T>(key: impl Into<ListenerKey>, subscribe: F) -> Self
    where
        F: FnOnce() -> Result<St, ListenerError> + Send + 'static,
        St: Stream<Item = T> + Send + 'static,
        T: Into<Dispatch<S, A>> + 'static,
    {
        Self {
            key: key.into(),
            subscribe: Box::new(move || {
                let stream = subscribe()?.map(|item: T| -> Dispatch<S, A> { item.into() });
                Ok(Box::pin(stream) as DispatchStream<S, A>)
            }),
        }
    }

    /// Binding key
    pub fn key(&self) -> &ListenerKey {
        &self.key
    }
}

impl<S, A> fmt::Debug for Binding<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("key", &self.key).finish()
    }
}

/// Installed external-event bindings
///
/// The registry lives as long as the store it feeds. Dropping it releases
/// every binding.
pub struct ListenerRegistry {
    handles: Vec<(ListenerKey, JoinHandle<()>)>,
    failed: Vec<(ListenerKey, ListenerError)>,
}

impl ListenerRegistry {
    const RUNTIME_USER: &'static str = "listener registry";

    /// Install a fixed list of bindings
    ///
    /// Each binding is installed independently: a failing source or a
    /// duplicate key is logged and recorded in [`failed`](Self::failed), and
    /// the rest still install. Failed bindings are not retried.
    ///
    /// Outside a tokio runtime nothing is subscribed and
    /// [`StoreError::NoRuntime`] is returned.
    pub fn install<S, A>(
        dispatcher: Dispatcher<S, A>,
        bindings: impl IntoIterator<Item = Binding<S, A>>,
    ) -> Result<Self, StoreError>
    where
        S: Send + Sync + 'static,
        A: Action,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("Listener registry installed outside a tokio runtime");
            return Err(StoreError::NoRuntime(Self::RUNTIME_USER));
        };

        let mut registry = Self {
            handles: Vec::new(),
            failed: Vec::new(),
        };

        for binding in bindings {
            let Binding { key, subscribe } = binding;

            if registry.is_active(&key) {
                let error = ListenerError::Duplicate(key.name().to_string());
                tracing::warn!(binding = %key, %error, "Listener not installed");
                registry.failed.push((key, error));
                continue;
            }

            let stream = match subscribe() {
                Ok(stream) => stream,
                Err(error) => {
                    tracing::warn!(binding = %key, %error, "Listener not installed");
                    registry.failed.push((key, error));
                    continue;
                }
            };

            let dispatcher = dispatcher.clone();
            let name = key.clone();
            let handle = runtime.spawn(async move {
                tokio::pin!(stream);
                while let Some(dispatch) = stream.next().await {
                    if !dispatcher.dispatch(dispatch) {
                        // Store dropped, stop the binding
                        break;
                    }
                }
                tracing::debug!(binding = %name, "Listener source ended");
            });

            tracing::debug!(binding = %key, "Listener installed");
            registry.handles.push((key, handle));
        }

        Ok(registry)
    }

    /// Bindings that failed to install, in install order
    pub fn failed(&self) -> &[(ListenerKey, ListenerError)] {
        &self.failed
    }

    /// Release one binding, dropping its stream
    ///
    /// If no binding exists with the given key, this is a no-op.
    pub fn release(&mut self, key: &ListenerKey) {
        if let Some(index) = self.handles.iter().position(|(k, _)| k == key) {
            let (_, handle) = self.handles.remove(index);
            handle.abort();
        }
    }

    /// Release every binding.
    pub fn release_all(&mut self) {
        for (_, handle) in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Check if a binding with the given key is installed.
    pub fn is_active(&self, key: &ListenerKey) -> bool {
        self.handles.iter().any(|(k, _)| k == key)
    }

    /// Get the number of installed bindings.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if there are no installed bindings.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Get the keys of all installed bindings, in install order.
    pub fn active_keys(&self) -> impl Iterator<Item = &ListenerKey> {
        self.handles.iter().map(|(k, _)| k)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("active", &self.active_keys().collect::<Vec<_>>())
            .field("failed", &self.failed)
            .finish()
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// The unsubscribe half of an external subscription
///
/// Runs its release function at most once: on [`unsubscribe`](Self::unsubscribe)
/// or on drop, whichever comes first.
#[must_use = "dropping an Unsubscribe releases the subscription immediately"]
pub struct Unsubscribe {
    release: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Unsubscribe {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// An unsubscribe with nothing to release
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the subscription now
    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("pending", &self.release.is_some())
            .finish()
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.run();
    }
}

/// Callback handed to a callback-style external API
pub type Callback<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

/// Adapt a callback-style source (`subscribe(callback) -> Unsubscribe`)
/// into a stream
///
/// The source's unsubscribe runs exactly once, when the stream is dropped.
pub fn callback_stream<T, F>(subscribe: F) -> CallbackStream<T>
where
    T: Send + 'static,
    F: FnOnce(Callback<T>) -> Unsubscribe,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let sender = Arc::clone(&tx);
    let unsubscribe = subscribe(Box::new(move |value| {
        if let Ok(guard) = sender.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(value);
            }
        }
    }));
    CallbackStream {
        rx,
        tx,
        _unsubscribe: unsubscribe,
    }
}

/// Stream produced by [`callback_stream`]
pub struct CallbackStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<T>>>>,
    _unsubscribe: Unsubscribe,
}

impl<T> CallbackStream<T> {
    /// Stop accepting values; the stream ends once buffered values are read
    pub fn close(&mut self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

impl<T> Stream for CallbackStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
