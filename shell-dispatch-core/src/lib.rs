//! Core traits and types for shell-dispatch
//!
//! This crate provides the state container behind a desktop shell: one
//! composed state tree, a single dispatch entry point, and long-lived
//! listeners that turn outside events into dispatches.
//!
//! # Core Concepts
//!
//! - **Action**: Plain descriptions of what happened
//! - **Slice**: One named subtree of state plus the reducer that owns it
//! - **StateTree**: The composition of all slices held by the store
//! - **Thunk**: A named async effect that may dispatch any number of times
//! - **Store**: Holds the tree, runs reducers, notifies observers
//! - **Listeners**: Keyed bindings from event sources to dispatches
//!
//! # Basic Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use shell_dispatch_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum AppAction {
//!     GeneralLockSet(bool),
//! }
//!
//! #[derive(Clone, Debug, Default)]
//! struct General { locked: bool }
//!
//! impl Slice<AppAction> for General {
//!     const KEY: &'static str = "general";
//!
//!     fn reduce(&mut self, action: &AppAction) -> Result<bool, ReducerError> {
//!         match action {
//!             AppAction::GeneralLockSet(locked) if *locked != self.locked => {
//!                 self.locked = *locked;
//!                 Ok(true)
//!             }
//!             _ => Ok(false),
//!         }
//!     }
//! }
//!
//! let mut store = Store::new(AppState { general: Arc::new(General::default()) })?;
//! store.dispatch(AppAction::GeneralLockSet(true))?;
//! ```
//!
//! # Async Effects
//!
//! Anything that needs to wait is a [`Thunk`]. It is dispatched like an action,
//! started by the store on the tokio runtime, and reports back through a
//! [`ThunkContext`]:
//!
//! ```ignore
//! store.dispatch(Thunk::new("user/update", move |ctx| async move {
//!     if let Ok(profile) = backend.fetch_user(&uid).await {
//!         ctx.dispatch(AppAction::UserDidLoad(profile));
//!     }
//! }))?;
//!
//! // The owner loop applies queued dispatches in arrival order
//! store.run_until(shutdown).await?;
//! ```
//!
//! The `Did*` naming convention identifies result actions. With
//! `#[action(infer_categories)]`, `UserUpdate` and `UserDidLoad` both get
//! category `"user"`.

pub mod action;
pub mod effect;
pub mod listeners;
pub mod slice;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionCategory, ActionSummary};
pub use slice::{reduce_slice, ReducerError, Slice, StateTree};

// Store exports
pub use store::{
    ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Store, StoreError,
    Subscription,
};

// Effect exports
pub use effect::{Dispatch, Dispatched, Dispatcher, StateReader, Thunk, ThunkContext};

// Listener exports
pub use listeners::{
    callback_stream, Binding, Callback, CallbackStream, DispatchStream, ListenerError,
    ListenerKey, ListenerRegistry, Unsubscribe,
};

// Testing exports
pub use testing::{wait_until, DispatchLog, DispatchRecord, RecordingMiddleware};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionCategory};
    pub use crate::effect::{Dispatch, Dispatched, Dispatcher, StateReader, Thunk, ThunkContext};
    pub use crate::listeners::{
        callback_stream, Binding, Callback, ListenerError, ListenerKey, ListenerRegistry,
        Unsubscribe,
    };
    pub use crate::slice::{reduce_slice, ReducerError, Slice, StateTree};
    pub use crate::store::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Store, StoreError,
        Subscription,
    };
}
