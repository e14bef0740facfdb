//! Action traits for type-safe state mutations

use std::fmt::Debug;

/// Marker trait for plain actions that can be dispatched to the store
///
/// Actions represent intents to change state. They should be:
/// - Clone: Actions may be logged, replayed, or observed by middleware
/// - Debug: For debugging and logging
/// - Send + 'static: Listener bindings and thunks dispatch from spawned tasks
///
/// Use `#[derive(Action)]` from `shell-dispatch-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;
}

/// Category of an action, usually the slice it targets
///
/// Generated by `#[derive(Action)]` with `#[action(infer_categories)]`:
/// `UserClear` and `UserDidLoad` both belong to `"user"`.
pub trait ActionCategory: Action {
    /// Category name, or `None` for uncategorized actions
    fn category(&self) -> Option<&'static str>;
}

/// Short human-readable form of an action for log lines
///
/// The default uses `Debug`; override it for actions carrying large payloads.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}
