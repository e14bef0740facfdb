//! State tree: one slice per concern
//!
//! The tree is immutable from the outside. Every slice sits behind an `Arc`
//! and is only replaced by its own reducer (see `reducer.rs`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shell_dispatch::StateTree;

/// Persisted preference key: last time the rating prompt was answered (ms epoch)
pub const RATING_LAST_CLICKED: &str = "ratingLastClicked";
/// Persisted preference key: whether the user chose to rate
pub const RATING_DID_RATE: &str = "ratingDidRate";

/// Account profile loaded from the auth backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Best label for the title bar
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// The `user` slice
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum UserState {
    /// Nothing heard from the auth provider yet
    #[default]
    Unresolved,
    /// The provider reported no authenticated user
    SignedOut,
    SignedIn(UserProfile),
}

impl UserState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            UserState::SignedIn(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, UserState::SignedIn(_))
    }
}

/// The `general` slice: window and OS level flags
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneralState {
    pub is_full_screen: bool,
    pub locked: bool,
    pub should_use_dark_colors: bool,
}

/// The `preferences` slice: mirror of the persisted rating preferences
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreferencesState {
    pub rating_last_clicked: i64,
    pub rating_did_rate: bool,
}

/// The whole tree held by the store
#[derive(Clone, Debug, Default, StateTree)]
pub struct AppState {
    pub user: Arc<UserState>,
    pub general: Arc<GeneralState>,
    pub preferences: Arc<PreferencesState>,
}

impl AppState {
    /// Initial tree: user unresolved, the rest seeded by the caller
    pub fn new(general: GeneralState, preferences: PreferencesState) -> Self {
        Self {
            user: Arc::new(UserState::Unresolved),
            general: Arc::new(general),
            preferences: Arc::new(preferences),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_label_fallbacks() {
        let mut profile = UserProfile {
            uid: "u1".into(),
            display_name: None,
            email: None,
        };
        assert_eq!(profile.label(), "u1");

        profile.email = Some("ada@example.com".into());
        assert_eq!(profile.label(), "ada@example.com");

        profile.display_name = Some("Ada".into());
        assert_eq!(profile.label(), "Ada");
    }

    #[test]
    fn test_profile_json_shape() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"uid":"u1","displayName":"Ada"}"#).unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(profile.email, None);
    }

    #[test]
    fn test_new_state_starts_unresolved() {
        let state = AppState::new(
            GeneralState {
                should_use_dark_colors: true,
                ..Default::default()
            },
            PreferencesState {
                rating_last_clicked: 5,
                rating_did_rate: true,
            },
        );
        assert_eq!(*state.user, UserState::Unresolved);
        assert!(state.general.should_use_dark_colors);
        assert_eq!(state.preferences.rating_last_clicked, 5);
    }
}
