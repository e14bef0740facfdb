//! Slice reducers
//!
//! Each slice reduces every action against its own copy and reports whether
//! it changed. Actions a slice does not own are `Ok(false)`. A known action
//! carrying data that would break the slice is a `ReducerError`.

use serde_json::Value;
use shell_dispatch::{Action, ReducerError, Slice};

use crate::action::AppAction;
use crate::state::{
    GeneralState, PreferencesState, UserState, RATING_DID_RATE, RATING_LAST_CLICKED,
};

impl Slice<AppAction> for UserState {
    const KEY: &'static str = "user";

    fn reduce(&mut self, action: &AppAction) -> Result<bool, ReducerError> {
        match action {
            AppAction::UserClear => {
                if *self == UserState::SignedOut {
                    return Ok(false);
                }
                *self = UserState::SignedOut;
                Ok(true)
            }
            AppAction::UserDidLoad(profile) => {
                if profile.uid.is_empty() {
                    return Err(ReducerError::new(
                        Self::KEY,
                        action.name(),
                        "profile has an empty uid",
                    ));
                }
                if self.profile() == Some(profile) {
                    return Ok(false);
                }
                *self = UserState::SignedIn(profile.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn set_flag(flag: &mut bool, value: bool) -> bool {
    let changed = *flag != value;
    *flag = value;
    changed
}

impl Slice<AppAction> for GeneralState {
    const KEY: &'static str = "general";

    fn reduce(&mut self, action: &AppAction) -> Result<bool, ReducerError> {
        let changed = match action {
            AppAction::GeneralFullScreenSet(on) => set_flag(&mut self.is_full_screen, *on),
            AppAction::GeneralLockSet(on) => set_flag(&mut self.locked, *on),
            AppAction::GeneralDarkColorsSet(on) => set_flag(&mut self.should_use_dark_colors, *on),
            _ => false,
        };
        Ok(changed)
    }
}

impl Slice<AppAction> for PreferencesState {
    const KEY: &'static str = "preferences";

    fn reduce(&mut self, action: &AppAction) -> Result<bool, ReducerError> {
        let AppAction::PreferenceDidChange { key, value } = action else {
            return Ok(false);
        };

        let invalid = |expected: &str| {
            ReducerError::new(
                Self::KEY,
                action.name(),
                format!("`{key}` must be {expected}, got {value}"),
            )
        };

        match key.as_str() {
            RATING_LAST_CLICKED => {
                // A removed preference falls back to its default
                let next = match value {
                    Value::Null => 0,
                    other => other.as_i64().ok_or_else(|| invalid("an integer"))?,
                };
                let changed = self.rating_last_clicked != next;
                self.rating_last_clicked = next;
                Ok(changed)
            }
            RATING_DID_RATE => {
                let next = match value {
                    Value::Null => false,
                    other => other.as_bool().ok_or_else(|| invalid("a boolean"))?,
                };
                Ok(set_flag(&mut self.rating_did_rate, next))
            }
            _ => Ok(false),
        }
    }
}
