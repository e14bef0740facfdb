//! Actions - what can happen to the tree
//!
//! `Did*` variants carry the outcome of async work. Window, theme and
//! preference actions are the echo of external events; nothing else mutates
//! those slices.

use shell_dispatch::{Action, ActionSummary, Dispatcher, Store, Thunk};

use crate::state::{AppState, UserProfile};

#[derive(Action, Clone, Debug, PartialEq)]
#[action(infer_categories)]
pub enum AppAction {
    /// The auth provider reported no authenticated user
    UserClear,
    /// Profile fetched for the authenticated user
    UserDidLoad(UserProfile),

    #[action(category = "general")]
    GeneralFullScreenSet(bool),
    #[action(category = "general")]
    GeneralLockSet(bool),
    #[action(category = "general")]
    GeneralDarkColorsSet(bool),

    /// A persisted preference was written
    PreferenceDidChange {
        key: String,
        value: serde_json::Value,
    },
}

impl ActionSummary for AppAction {
    fn summary(&self) -> String {
        match self {
            // Keep account details out of the log
            AppAction::UserDidLoad(profile) => format!("UserDidLoad(uid={})", profile.uid),
            other => format!("{:?}", other),
        }
    }
}

pub type AppThunk = Thunk<AppState, AppAction>;
pub type AppDispatcher = Dispatcher<AppState, AppAction>;
pub type AppStore<M = shell_dispatch::NoopMiddleware> = Store<AppState, AppAction, M>;
