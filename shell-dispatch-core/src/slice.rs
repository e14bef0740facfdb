//! Independently owned state slices and their composition into one tree
//!
//! A [`Slice`] owns one named subtree of state and the reducer that mutates it.
//! A [`StateTree`] composes slices into the single tree held by the store.
//! Slices are stored behind `Arc` so a slice that did not change keeps the
//! exact same allocation in the next tree:
//!
//! ```ignore
//! use std::sync::Arc;
//! use shell_dispatch::prelude::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct Counter { value: i32 }
//!
//! impl Slice<AppAction> for Counter {
//!     const KEY: &'static str = "counter";
//!
//!     fn reduce(&mut self, action: &AppAction) -> Result<bool, ReducerError> {
//!         match action {
//!             AppAction::CounterIncrement => { self.value += 1; Ok(true) }
//!             _ => Ok(false),
//!         }
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default, StateTree)]
//! struct AppState {
//!     counter: Arc<Counter>,
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::Action;

/// A reducer rejected an action it is responsible for
///
/// This is a contract violation: the dispatch is aborted and the error is
/// surfaced to the caller. Actions a slice does not handle are never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("slice `{slice}` rejected action `{action}`: {reason}")]
pub struct ReducerError {
    /// Key of the slice whose reducer failed
    pub slice: &'static str,
    /// Name of the action being reduced
    pub action: &'static str,
    /// What invariant the action would have broken
    pub reason: String,
}

impl ReducerError {
    pub fn new(slice: &'static str, action: &'static str, reason: impl Into<String>) -> Self {
        Self {
            slice,
            action,
            reason: reason.into(),
        }
    }
}

/// One named subtree of the state plus the reducer that owns it
///
/// `reduce` mutates `self` in place and reports whether anything changed.
/// It must return `Ok(false)` (and leave `self` as it was) for actions it
/// does not recognize, so slices can evolve independently.
pub trait Slice<A: Action>: Clone + Send + Sync + 'static {
    /// Key of this slice inside the state tree
    const KEY: &'static str;

    /// Apply an action. Returns `Ok(true)` if the slice changed.
    fn reduce(&mut self, action: &A) -> Result<bool, ReducerError>;
}

/// Run a slice reducer against a shared slice
///
/// Returns `Ok(None)` when the slice is unchanged, so the caller can keep the
/// original `Arc`. A reducer that reports "unchanged" has its scratch copy
/// discarded even if it touched it.
pub fn reduce_slice<A, T>(slice: &Arc<T>, action: &A) -> Result<Option<Arc<T>>, ReducerError>
where
    A: Action,
    T: Slice<A>,
{
    let mut next = T::clone(slice);
    if next.reduce(action)? {
        Ok(Some(Arc::new(next)))
    } else {
        Ok(None)
    }
}

/// The composed state tree held by a store
///
/// Usually derived with `#[derive(StateTree)]` on a struct whose fields are
/// `Arc<impl Slice<A>>`. Every slice reducer sees the same pre-dispatch tree
/// and the same action.
pub trait StateTree<A: Action>: Send + Sync + Sized + 'static {
    /// Keys of all slices in declaration order
    fn slice_keys() -> Vec<&'static str>;

    /// Run every slice reducer. Returns `Ok(None)` if no slice changed,
    /// otherwise a new tree sharing the unchanged slices.
    fn reduce(&self, action: &A) -> Result<Option<Self>, ReducerError>;
}

/// Find the first slice key that appears more than once
pub fn duplicate_slice_key(keys: &[&'static str]) -> Option<&'static str> {
    let mut seen = HashSet::new();
    keys.iter().copied().find(|key| !seen.insert(*key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum TestAction {
        Add(i32),
        Reject,
        Other,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Add(_) => "Add",
                TestAction::Reject => "Reject",
                TestAction::Other => "Other",
            }
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Total {
        value: i32,
    }

    impl Slice<TestAction> for Total {
        const KEY: &'static str = "total";

        fn reduce(&mut self, action: &TestAction) -> Result<bool, ReducerError> {
            match action {
                TestAction::Add(n) => {
                    self.value += n;
                    Ok(*n != 0)
                }
                TestAction::Reject => Err(ReducerError::new(Self::KEY, action.name(), "nope")),
                TestAction::Other => Ok(false),
            }
        }
    }

    #[test]
    fn test_reduce_slice_changed() {
        let slice = Arc::new(Total::default());
        let next = reduce_slice(&slice, &TestAction::Add(2)).unwrap();
        assert_eq!(next.map(|s| s.value), Some(2));
        assert_eq!(slice.value, 0);
    }

    #[test]
    fn test_reduce_slice_unchanged_keeps_nothing() {
        let slice = Arc::new(Total::default());
        assert!(reduce_slice(&slice, &TestAction::Other).unwrap().is_none());
        // Touched but reported unchanged: the scratch copy is dropped
        assert!(reduce_slice(&slice, &TestAction::Add(0)).unwrap().is_none());
    }

    #[test]
    fn test_reduce_slice_error() {
        let slice = Arc::new(Total::default());
        let err = reduce_slice(&slice, &TestAction::Reject).unwrap_err();
        assert_eq!(err.slice, "total");
        assert_eq!(err.action, "Reject");
        assert_eq!(err.to_string(), "slice `total` rejected action `Reject`: nope");
    }

    #[test]
    fn test_duplicate_slice_key() {
        assert_eq!(duplicate_slice_key(&["user", "general"]), None);
        assert_eq!(
            duplicate_slice_key(&["user", "general", "user"]),
            Some("user")
        );
        assert_eq!(duplicate_slice_key(&[]), None);
    }
}
