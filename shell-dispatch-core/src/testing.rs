//! Test utilities for shell-dispatch stores
//!
//! - [`RecordingMiddleware`]: records every dispatch (plain actions and
//!   thunk names) in order, into a shared [`DispatchLog`]
//! - [`wait_until`]: drive a store's queue until a condition holds
//! - Assertion macros for verifying recorded actions
//!
//! # Example
//!
//! ```ignore
//! use shell_dispatch::testing::{DispatchLog, RecordingMiddleware};
//! use shell_dispatch::{assert_emitted, Store};
//!
//! let log = DispatchLog::new();
//! let mut store = Store::with_middleware(AppState::default(), RecordingMiddleware::new(&log))?;
//!
//! store.dispatch(AppAction::UserClear)?;
//!
//! let actions = log.actions();
//! assert_emitted!(actions, AppAction::UserClear);
//! assert_eq!(log.thunks(), Vec::<&str>::new());
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::slice::StateTree;
use crate::store::{Middleware, Store, StoreError};
use crate::Action;

/// One recorded dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchRecord<A> {
    /// A plain action and whether it changed the tree
    Action { action: A, changed: bool },
    /// A thunk start
    Thunk(&'static str),
}

/// Shared, cloneable log of recorded dispatches
#[derive(Debug)]
pub struct DispatchLog<A> {
    records: Arc<Mutex<Vec<DispatchRecord<A>>>>,
}

impl<A> Clone for DispatchLog<A> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<A> Default for DispatchLog<A> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<A: Clone> DispatchLog<A> {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in dispatch order
    pub fn records(&self) -> Vec<DispatchRecord<A>> {
        self.lock().clone()
    }

    /// Plain actions only, in dispatch order
    pub fn actions(&self) -> Vec<A> {
        self.lock()
            .iter()
            .filter_map(|record| match record {
                DispatchRecord::Action { action, .. } => Some(action.clone()),
                DispatchRecord::Thunk(_) => None,
            })
            .collect()
    }

    /// Thunk names only, in dispatch order
    pub fn thunks(&self) -> Vec<&'static str> {
        self.lock()
            .iter()
            .filter_map(|record| match record {
                DispatchRecord::Thunk(name) => Some(*name),
                DispatchRecord::Action { .. } => None,
            })
            .collect()
    }

    /// Take all records, leaving the log empty
    pub fn drain(&self) -> Vec<DispatchRecord<A>> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, record: DispatchRecord<A>) {
        self.lock().push(record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DispatchRecord<A>>> {
        // A panicking test thread must not hide the records from the others
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Middleware that records every dispatch into a [`DispatchLog`]
#[derive(Debug, Clone)]
pub struct RecordingMiddleware<A> {
    log: DispatchLog<A>,
}

impl<A: Clone> RecordingMiddleware<A> {
    /// Record into `log`
    pub fn new(log: &DispatchLog<A>) -> Self {
        Self { log: log.clone() }
    }
}

impl<A: Action> Middleware<A> for RecordingMiddleware<A> {
    fn before(&mut self, _action: &A) {}

    fn after(&mut self, action: &A, state_changed: bool) {
        self.log.push(DispatchRecord::Action {
            action: action.clone(),
            changed: state_changed,
        });
    }

    fn thunk(&mut self, name: &'static str) {
        self.log.push(DispatchRecord::Thunk(name));
    }
}

/// Apply queued dispatches until `done` holds or `timeout` elapses
///
/// Returns whether the condition was met. Useful when listener bindings or
/// thunks dispatch from other tasks.
pub async fn wait_until<S, A, M, F>(
    store: &mut Store<S, A, M>,
    timeout: Duration,
    mut done: F,
) -> Result<bool, StoreError>
where
    S: StateTree<A>,
    A: Action,
    M: Middleware<A>,
    F: FnMut(&S) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        store.process_pending()?;
        if done(store.state()) {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Assert that a specific action was emitted.
///
/// # Example
///
/// ```ignore
/// use shell_dispatch::assert_emitted;
///
/// let actions = log.actions();
/// assert_emitted!(actions, AppAction::UserClear);
/// assert_emitted!(actions, AppAction::GeneralLockSet(true));
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be emitted, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that a specific action was NOT emitted.
///
/// # Example
///
/// ```ignore
/// use shell_dispatch::assert_not_emitted;
///
/// let actions = log.actions();
/// assert_not_emitted!(actions, AppAction::UserDidLoad(_));
/// ```
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be emitted, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Find and return the first action matching a pattern.
///
/// # Example
///
/// ```ignore
/// use shell_dispatch::find_emitted;
///
/// let actions = log.actions();
/// if let Some(AppAction::UserDidLoad(profile)) = find_emitted!(actions, AppAction::UserDidLoad(_)) {
///     assert_eq!(profile.uid, "u1");
/// }
/// ```
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count how many actions match a pattern.
///
/// # Example
///
/// ```ignore
/// use shell_dispatch::count_emitted;
///
/// let actions = log.actions();
/// assert_eq!(count_emitted!(actions, AppAction::UserClear), 1);
/// ```
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Thunk, ThunkContext};
    use crate::slice::ReducerError;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Set(u8),
        Ignored,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Set(_) => "Set",
                TestAction::Ignored => "Ignored",
            }
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Value(u8);

    impl StateTree<TestAction> for Value {
        fn slice_keys() -> Vec<&'static str> {
            vec!["value"]
        }

        fn reduce(&self, action: &TestAction) -> Result<Option<Self>, ReducerError> {
            match action {
                TestAction::Set(v) if *v != self.0 => Ok(Some(Value(*v))),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_recording_middleware_order() {
        let log = DispatchLog::new();
        let mut store =
            Store::with_middleware(Value::default(), RecordingMiddleware::new(&log)).unwrap();

        store.dispatch(TestAction::Set(1)).unwrap();
        store
            .dispatch(Thunk::new("value/later", |_ctx: ThunkContext<Value, TestAction>| async {}))
            .unwrap();
        store.dispatch(TestAction::Ignored).unwrap();

        assert_eq!(
            log.records(),
            vec![
                DispatchRecord::Action {
                    action: TestAction::Set(1),
                    changed: true
                },
                DispatchRecord::Thunk("value/later"),
                DispatchRecord::Action {
                    action: TestAction::Ignored,
                    changed: false
                },
            ]
        );
        assert_eq!(log.thunks(), vec!["value/later"]);
        assert_eq!(log.actions().len(), 2);

        let actions = log.actions();
        assert_emitted!(actions, TestAction::Set(1));
        assert_not_emitted!(actions, TestAction::Set(2));
        assert_eq!(count_emitted!(actions, TestAction::Set(_)), 1);
        assert!(find_emitted!(actions, TestAction::Ignored).is_some());

        assert_eq!(log.drain().len(), 3);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_wait_until() {
        let mut store = Store::new(Value::default()).unwrap();
        let dispatcher = store.dispatcher();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            dispatcher.dispatch(TestAction::Set(9));
        });

        let met = wait_until(&mut store, Duration::from_secs(2), |v| v.0 == 9)
            .await
            .unwrap();
        assert!(met);

        let met = wait_until(&mut store, Duration::from_millis(5), |v| v.0 == 1)
            .await
            .unwrap();
        assert!(!met);
    }
}
