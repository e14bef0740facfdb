//! Centralized state store composing slices into one tree
//!
//! The store holds the current tree as an `Arc`, applies every dispatch
//! through the middleware chain, replaces the tree wholesale when a slice
//! changed, and notifies subscribers in registration order.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::effect::{Dispatch, Dispatched, Dispatcher, StateReader, ThunkContext};
use crate::slice::{duplicate_slice_key, ReducerError, StateTree};
use crate::Action;

/// Errors raised by the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Two slices in the tree claim the same key
    #[error("slice key `{0}` is registered more than once")]
    DuplicateSlice(&'static str),

    /// A slice reducer violated its contract; the dispatch was aborted
    #[error(transparent)]
    Reducer(#[from] ReducerError),

    /// Work that needs a tokio runtime (a thunk, listener tasks) was started
    /// outside one; carries the thunk or component name
    #[error("no tokio runtime to run `{0}` on")]
    NoRuntime(&'static str),
}

type ObserverFn<S> = Box<dyn FnMut(&Arc<S>) + Send + 'static>;

struct Observer<S> {
    active: Arc<AtomicBool>,
    callback: ObserverFn<S>,
}

/// Handle returned by [`Store::subscribe`]
///
/// Dropping the handle cancels the subscription. Call [`detach`](Self::detach)
/// to keep the observer for the lifetime of the store.
#[must_use = "dropping a Subscription cancels it immediately"]
#[derive(Debug)]
pub struct Subscription {
    active: Option<Arc<AtomicBool>>,
}

impl Subscription {
    /// Stop notifications for this observer
    pub fn cancel(mut self) {
        self.release();
    }

    /// Keep the observer registered until the store is dropped
    pub fn detach(mut self) {
        self.active = None;
    }

    /// Returns true while the observer will still be notified
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    fn release(&mut self) {
        if let Some(flag) = self.active.take() {
            flag.store(false, Ordering::Release);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Centralized state store with Redux-like slice composition
///
/// # Type Parameters
/// * `S` - The state tree (implements [`StateTree`])
/// * `A` - The plain action type
/// * `M` - Middleware chain
///
/// # Example
/// ```ignore
/// let mut store = Store::new(AppState::default())?;
/// let _sub = store.subscribe(|state| tracing::debug!(?state, "tree replaced"));
///
/// store.dispatch(AppAction::GeneralLockSet(true))?;
/// assert!(store.state().general.locked);
///
/// // Listeners, controllers and thunks dispatch through a handle
/// let dispatcher = store.dispatcher();
/// dispatcher.dispatch(AppAction::GeneralLockSet(false));
/// store.process_pending()?;
/// ```
pub struct Store<S, A, M = NoopMiddleware> {
    state: Arc<S>,
    snapshot: watch::Sender<Arc<S>>,
    middleware: M,
    observers: Vec<Observer<S>>,
    queue_tx: mpsc::UnboundedSender<Dispatch<S, A>>,
    queue_rx: mpsc::UnboundedReceiver<Dispatch<S, A>>,
}

impl<S: StateTree<A>, A: Action> Store<S, A, NoopMiddleware> {
    /// Create a store from the initial tree
    pub fn new(state: S) -> Result<Self, StoreError> {
        Self::with_middleware(state, NoopMiddleware)
    }
}

impl<S: StateTree<A>, A: Action, M: Middleware<A>> Store<S, A, M> {
    /// Create a store with a middleware chain
    pub fn with_middleware(state: S, middleware: M) -> Result<Self, StoreError> {
        let keys = S::slice_keys();
        if let Some(key) = duplicate_slice_key(&keys) {
            return Err(StoreError::DuplicateSlice(key));
        }

        let state = Arc::new(state);
        let (snapshot, _) = watch::channel(Arc::clone(&state));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        tracing::debug!(slices = ?keys, "Store created");

        Ok(Self {
            state,
            snapshot,
            middleware,
            observers: Vec::new(),
            queue_tx,
            queue_rx,
        })
    }

    /// Dispatch an action or thunk
    ///
    /// A plain action is reduced by every slice against the same tree. If any
    /// slice changed, the tree is replaced and subscribers are notified.
    ///
    /// A thunk runs inline up to its first suspension point. Everything it
    /// dispatched in that synchronous part (and anything else already queued)
    /// is applied before this returns. The rest of the thunk continues as a
    /// task on the current tokio runtime; without a runtime the thunk is not
    /// started and [`StoreError::NoRuntime`] is returned.
    ///
    /// A reducer error aborts the dispatch: the tree is kept, nobody is
    /// notified, and the error is returned.
    pub fn dispatch(
        &mut self,
        dispatch: impl Into<Dispatch<S, A>>,
    ) -> Result<Dispatched<A>, StoreError> {
        match dispatch.into() {
            Dispatch::Action(action) => {
                self.middleware.before(&action);
                let next = match self.state.reduce(&action) {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::error!(action = %action.name(), error = %e, "Reducer failed");
                        return Err(e.into());
                    }
                };
                let changed = next.is_some();
                if let Some(next) = next {
                    self.replace(next);
                }
                self.middleware.after(&action, changed);
                Ok(Dispatched::Action { action, changed })
            }
            Dispatch::Thunk(thunk) => {
                let name = thunk.name();
                let Ok(runtime) = Handle::try_current() else {
                    tracing::error!(thunk = %name, "Thunk dispatched outside a tokio runtime");
                    return Err(StoreError::NoRuntime(name));
                };
                self.middleware.thunk(name);

                let ctx = ThunkContext::new(self.dispatcher(), self.reader());
                let mut task = thunk.start(ctx);
                // The spawned task re-polls with its own waker, so the no-op
                // waker registered here is never the one left waiting
                let mut cx = Context::from_waker(Waker::noop());
                let handle = match task.as_mut().poll(&mut cx) {
                    Poll::Ready(()) => None,
                    Poll::Pending => Some(runtime.spawn(task)),
                };

                self.process_pending()?;
                Ok(Dispatched::Thunk { name, handle })
            }
        }
    }

    fn replace(&mut self, next: S) {
        let next = Arc::new(next);
        self.state = Arc::clone(&next);
        self.snapshot.send_replace(Arc::clone(&next));

        self.observers
            .retain(|observer| observer.active.load(Ordering::Acquire));
        for observer in &mut self.observers {
            // An earlier observer may have cancelled this one mid-notification
            if observer.active.load(Ordering::Acquire) {
                (observer.callback)(&next);
            }
        }
    }

    /// Register an observer, called once after every dispatch that replaced
    /// the tree
    pub fn subscribe<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&Arc<S>) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        self.observers.push(Observer {
            active: Arc::clone(&active),
            callback: Box::new(observer),
        });
        Subscription {
            active: Some(active),
        }
    }

    /// Number of observers still registered
    pub fn subscriber_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|observer| observer.active.load(Ordering::Acquire))
            .count()
    }

    /// Apply everything queued through [`Dispatcher`] handles
    ///
    /// Returns how many dispatches were applied. Stops at the first reducer
    /// error; later queued dispatches stay queued.
    pub fn process_pending(&mut self) -> Result<usize, StoreError> {
        let mut applied = 0;
        while let Ok(dispatch) = self.queue_rx.try_recv() {
            self.dispatch(dispatch)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Wait for the next queued dispatch and apply it
    pub async fn next_queued(&mut self) -> Result<Dispatched<A>, StoreError> {
        // The store keeps its own sender, so the queue never closes here
        loop {
            if let Some(dispatch) = self.queue_rx.recv().await {
                return self.dispatch(dispatch);
            }
        }
    }

    /// Apply queued dispatches until `shutdown` is cancelled
    ///
    /// A reducer error ends the loop and is returned.
    pub async fn run_until(&mut self, shutdown: CancellationToken) -> Result<(), StoreError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Store loop cancelled");
                    return Ok(());
                }
                Some(dispatch) = self.queue_rx.recv() => {
                    self.dispatch(dispatch)?;
                }
            }
        }
    }
}

impl<S, A: Action, M> Store<S, A, M> {
    /// Get the current tree
    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    /// Snapshot of the current tree
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&self.state)
    }

    /// Cloneable dispatch handle for listeners, controllers and thunks
    pub fn dispatcher(&self) -> Dispatcher<S, A> {
        Dispatcher::new(self.queue_tx.clone())
    }

    /// Cloneable state reader
    pub fn reader(&self) -> StateReader<S> {
        StateReader::new(self.snapshot.subscribe())
    }

    /// Get a reference to the middleware
    pub fn middleware(&self) -> &M {
        &self.middleware
    }

    /// Get a mutable reference to the middleware
    pub fn middleware_mut(&mut self) -> &mut M {
        &mut self.middleware
    }
}

/// Middleware trait for intercepting dispatches
///
/// Implement this trait to add logging, recording, or other
/// cross-cutting concerns to your store.
pub trait Middleware<A: Action> {
    /// Called before the action is reduced
    fn before(&mut self, action: &A);

    /// Called after the action is reduced (not called if a reducer failed)
    fn after(&mut self, action: &A, state_changed: bool);

    /// Called when a thunk is about to start
    #[allow(unused_variables)]
    fn thunk(&mut self, name: &'static str) {}
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<A: Action> Middleware<A> for NoopMiddleware {
    fn before(&mut self, _action: &A) {}
    fn after(&mut self, _action: &A, _state_changed: bool) {}
}

/// Middleware that logs dispatches through `tracing`
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before dispatch
    pub log_before: bool,
    /// Whether to log after dispatch
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<A: Action> Middleware<A> for LoggingMiddleware {
    fn before(&mut self, action: &A) {
        if self.log_before {
            tracing::debug!(action = %action.name(), "Dispatching action");
        }
    }

    fn after(&mut self, action: &A, state_changed: bool) {
        if self.log_after {
            tracing::debug!(
                action = %action.name(),
                state_changed = state_changed,
                "Action processed"
            );
        }
    }

    fn thunk(&mut self, name: &'static str) {
        if self.log_after {
            tracing::debug!(thunk = %name, "Thunk started");
        }
    }
}

/// Compose multiple middleware into a single middleware
pub struct ComposedMiddleware<A: Action> {
    middlewares: Vec<Box<dyn Middleware<A> + Send>>,
}

impl<A: Action> std::fmt::Debug for ComposedMiddleware<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl<A: Action> Default for ComposedMiddleware<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> ComposedMiddleware<A> {
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware<A> + Send + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Add a middleware, builder style
    pub fn with<M: Middleware<A> + Send + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Box::new(middleware));
        self
    }
}

impl<A: Action> Middleware<A> for ComposedMiddleware<A> {
    fn before(&mut self, action: &A) {
        for middleware in &mut self.middlewares {
            middleware.before(action);
        }
    }

    fn after(&mut self, action: &A, state_changed: bool) {
        // Call in reverse order for proper nesting
        for middleware in self.middlewares.iter_mut().rev() {
            middleware.after(action, state_changed);
        }
    }

    fn thunk(&mut self, name: &'static str) {
        for middleware in &mut self.middlewares {
            middleware.thunk(name);
        }
    }
}
