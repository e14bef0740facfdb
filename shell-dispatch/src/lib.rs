//! shell-dispatch: Centralized state management for desktop shells
//!
//! Like Redux, but for Rust. All state lives in one tree composed of
//! independently owned slices, every mutation goes through a dispatched
//! action, and external event sources feed the store through keyed listener
//! bindings.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use shell_dispatch::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(infer_categories)]
//! enum AppAction {
//!     UserClear,
//!     UserDidLoad(String),
//! }
//!
//! #[derive(Clone, Debug, Default, StateTree)]
//! struct AppState {
//!     user: Arc<UserState>,
//! }
//!
//! let mut store = Store::new(AppState::default())?;
//! store.dispatch(AppAction::UserClear)?;
//! ```

// Re-export everything from core
pub use shell_dispatch_core::*;

// Re-export derive macros
pub use shell_dispatch_macros::{Action, StateTree};

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use shell_dispatch_core::{Action, ActionCategory, ActionSummary, Slice, StateTree};

    // Store
    pub use shell_dispatch_core::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, ReducerError, Store,
        StoreError, Subscription,
    };

    // Effects
    pub use shell_dispatch_core::{Dispatch, Dispatched, Dispatcher, StateReader, Thunk, ThunkContext};

    // Listeners
    pub use shell_dispatch_core::{
        callback_stream, Binding, Callback, ListenerError, ListenerKey, ListenerRegistry,
        Unsubscribe,
    };

    // Derive macros
    pub use shell_dispatch_macros::{Action, StateTree};
}
