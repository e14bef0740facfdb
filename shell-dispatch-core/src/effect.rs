//! Tagged dispatch: plain actions and async effect requests (thunks)
//!
//! Everything dispatched to a store is a [`Dispatch`]: either a plain
//! [`Action`] that runs through the slice reducers, or a [`Thunk`], a named
//! deferred computation that receives a [`ThunkContext`] and may dispatch zero
//! or more times, before or after suspending.
//!
//! # Example
//!
//! ```ignore
//! use shell_dispatch::{Dispatch, Thunk};
//!
//! fn update_user(api: Api, uid: String) -> Thunk<AppState, AppAction> {
//!     Thunk::new("user/update", move |ctx| async move {
//!         match api.fetch_profile(&uid).await {
//!             Ok(profile) => {
//!                 ctx.dispatch(AppAction::UserDidLoad(profile));
//!             }
//!             Err(e) => tracing::warn!(error = %e, "profile fetch failed"),
//!         }
//!     })
//! }
//!
//! store.dispatch(Dispatch::Thunk(update_user(api, uid)))?;
//! store.dispatch(AppAction::UserClear)?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::Action;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type ThunkFn<S, A> = Box<dyn FnOnce(ThunkContext<S, A>) -> BoxFuture + Send + 'static>;

/// Anything that can be dispatched to a store
pub enum Dispatch<S, A> {
    /// Plain action, reduced synchronously by every slice
    Action(A),
    /// Async effect request, run inline by the store until it first
    /// suspends, then as its own task
    Thunk(Thunk<S, A>),
}

impl<S, A: Action> Dispatch<S, A> {
    /// Action name or thunk name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Dispatch::Action(action) => action.name(),
            Dispatch::Thunk(thunk) => thunk.name(),
        }
    }

    /// Returns true if this is a thunk
    pub fn is_thunk(&self) -> bool {
        matches!(self, Dispatch::Thunk(_))
    }
}

impl<S, A: Action> From<A> for Dispatch<S, A> {
    fn from(action: A) -> Self {
        Dispatch::Action(action)
    }
}

impl<S, A> From<Thunk<S, A>> for Dispatch<S, A> {
    fn from(thunk: Thunk<S, A>) -> Self {
        Dispatch::Thunk(thunk)
    }
}

impl<S, A: fmt::Debug> fmt::Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Dispatch::Thunk(thunk) => f.debug_tuple("Thunk").field(&thunk.name).finish(),
        }
    }
}

/// A named deferred computation with access to dispatch and the current state
///
/// The name shows up in logs and in recorded dispatch logs, so keep it stable
/// (`"<slice>/<verb>"` reads well).
pub struct Thunk<S, A> {
    name: &'static str,
    run: ThunkFn<S, A>,
}

impl<S, A> Thunk<S, A> {
    /// Create a thunk from an async closure
    pub fn new<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: FnOnce(ThunkContext<S, A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            run: Box::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Thunk name
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn start(self, ctx: ThunkContext<S, A>) -> BoxFuture {
        (self.run)(ctx)
    }
}

impl<S, A> fmt::Debug for Thunk<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk").field("name", &self.name).finish()
    }
}

/// What a thunk receives when it starts: dispatch plus a state reader
pub struct ThunkContext<S, A> {
    dispatcher: Dispatcher<S, A>,
    state: StateReader<S>,
}

impl<S, A: Action> ThunkContext<S, A> {
    pub(crate) fn new(dispatcher: Dispatcher<S, A>, state: StateReader<S>) -> Self {
        Self { dispatcher, state }
    }

    /// Dispatch an action or another thunk.
    ///
    /// Returns false if the store is gone; that is not an error.
    pub fn dispatch(&self, dispatch: impl Into<Dispatch<S, A>>) -> bool {
        self.dispatcher.dispatch(dispatch)
    }

    /// Snapshot of the current tree
    ///
    /// This is the tree as last applied by the store owner. A thunk's own
    /// dispatches show up here once the owner has applied them: the ones made
    /// before the first `.await` are applied before the store's `dispatch`
    /// returns, later ones when the owner next drains its queue. Reading state right
    /// after dispatching, within the same synchronous stretch, still sees the
    /// tree from before that dispatch.
    pub fn get_state(&self) -> Arc<S> {
        self.state.get()
    }

    /// Clone of the dispatcher, for handing to further tasks
    pub fn dispatcher(&self) -> Dispatcher<S, A> {
        self.dispatcher.clone()
    }
}

/// Cloneable, `Send` dispatch handle
///
/// Dispatches are queued and applied by whoever owns the store, in arrival
/// order. Dispatching into a store that has been dropped is a no-op.
pub struct Dispatcher<S, A> {
    tx: mpsc::UnboundedSender<Dispatch<S, A>>,
}

impl<S, A> Clone for Dispatcher<S, A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S, A> fmt::Debug for Dispatcher<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S, A: Action> Dispatcher<S, A> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Dispatch<S, A>>) -> Self {
        Self { tx }
    }

    /// Queue a dispatch. Returns false if the store has been dropped.
    pub fn dispatch(&self, dispatch: impl Into<Dispatch<S, A>>) -> bool {
        let dispatch = dispatch.into();
        let name = dispatch.name();
        match self.tx.send(dispatch) {
            Ok(()) => true,
            Err(_) => {
                tracing::trace!(action = %name, "Store dropped, dispatch ignored");
                false
            }
        }
    }

    /// Returns true once the store has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Cloneable read-only view of the store's current tree
pub struct StateReader<S> {
    rx: watch::Receiver<Arc<S>>,
}

impl<S> Clone for StateReader<S> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<S> StateReader<S> {
    pub(crate) fn new(rx: watch::Receiver<Arc<S>>) -> Self {
        Self { rx }
    }

    /// Snapshot of the current tree
    pub fn get(&self) -> Arc<S> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for the next tree replacement.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<S>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }
}

/// Result of a single dispatch
#[derive(Debug)]
pub enum Dispatched<A> {
    /// A plain action was reduced
    Action {
        /// The dispatched action, handed back to the caller
        action: A,
        /// Whether any slice changed
        changed: bool,
    },
    /// A thunk was started
    Thunk {
        name: &'static str,
        /// The task running the rest of the thunk, or `None` if it finished
        /// without suspending
        handle: Option<JoinHandle<()>>,
    },
}

impl<A> Dispatched<A> {
    /// Whether the tree was replaced. Always false for thunks, whose
    /// dispatches are reported separately.
    pub fn changed(&self) -> bool {
        matches!(self, Dispatched::Action { changed: true, .. })
    }

    /// The still-running thunk, if this was one that suspended
    pub fn into_handle(self) -> Option<JoinHandle<()>> {
        match self {
            Dispatched::Thunk { handle, .. } => handle,
            Dispatched::Action { .. } => None,
        }
    }
}
