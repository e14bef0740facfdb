//! Time-gated "rate this app" prompt
//!
//! The prompt is only offered on the store-distributed build, and at most
//! once per cooldown: 7 days after a "Later", 90 days after a "Rate".
//! Answers are written to the preference store; the `preferences` slice
//! picks them up through its listener.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::clock::Clock;
use crate::platform::{ConfirmDialog, Platform};
use crate::preferences::PreferenceStore;
use crate::state::{PreferencesState, RATING_DID_RATE, RATING_LAST_CLICKED};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
pub const RATED_COOLDOWN_DAYS: i64 = 90;
pub const UNRATED_COOLDOWN_DAYS: i64 = 7;

pub fn cooldown_ms(did_rate: bool) -> i64 {
    if did_rate {
        RATED_COOLDOWN_DAYS * DAY_MS
    } else {
        UNRATED_COOLDOWN_DAYS * DAY_MS
    }
}

/// Strictly after the cooldown has elapsed since the last answer
pub fn is_eligible(did_rate: bool, last_clicked: i64, now: i64) -> bool {
    now > last_clicked.saturating_add(cooldown_ms(did_rate))
}

pub fn should_prompt(restricted_channel: bool, prefs: &PreferencesState, now: i64) -> bool {
    restricted_channel && is_eligible(prefs.rating_did_rate, prefs.rating_last_clicked, now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingResponse {
    Rate,
    Later,
}

impl RatingResponse {
    /// Button 0 rates; any other button (including cancel) is "later"
    pub fn from_button(index: usize) -> Self {
        if index == 0 {
            RatingResponse::Rate
        } else {
            RatingResponse::Later
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingConfig {
    pub app_name: String,
    pub mac_app_store_id: String,
}

impl RatingConfig {
    pub fn dialog(&self) -> ConfirmDialog {
        let name = &self.app_name;
        ConfirmDialog {
            buttons: vec![format!("Rate {name} on Mac App Store"), "Later".to_string()],
            message: format!("Enjoying {name}?"),
            detail: format!(
                "If you enjoy using {name}, would you mind taking a moment to review it?"
            ),
            cancel_id: 1,
            default_id: 0,
        }
    }

    pub fn review_url(&self) -> String {
        format!(
            "macappstore://apps.apple.com/app/id{}?action=write-review",
            self.mac_app_store_id
        )
    }
}

pub struct ReengagementScheduler {
    config: RatingConfig,
    platform: Arc<dyn Platform>,
    preferences: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ReengagementScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReengagementScheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReengagementScheduler {
    pub fn new(
        config: RatingConfig,
        platform: Arc<dyn Platform>,
        preferences: Arc<dyn PreferenceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            platform,
            preferences,
            clock,
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Whether the rating button should be shown right now
    pub fn evaluate(&self, prefs: &PreferencesState) -> bool {
        should_prompt(
            self.platform.is_restricted_distribution_channel(),
            prefs,
            self.clock.now_ms(),
        )
    }

    /// Show the confirm dialog. `None` if it was closed without an answer.
    pub async fn prompt(&self) -> Option<RatingResponse> {
        match self.platform.show_confirm_dialog(self.config.dialog()).await {
            Ok(index) => Some(RatingResponse::from_button(index)),
            Err(error) => {
                tracing::warn!(%error, "Rating dialog failed");
                None
            }
        }
    }

    /// Record the answer, and send the user to the review page on "Rate"
    pub fn respond(&self, response: RatingResponse) {
        let now = self.clock.now_ms();
        tracing::info!(?response, "Rating prompt answered");

        self.persist(RATING_LAST_CLICKED, json!(now));
        if response == RatingResponse::Rate {
            self.persist(RATING_DID_RATE, json!(true));
            let url = self.config.review_url();
            if let Err(error) = self.platform.open_external(&url) {
                tracing::warn!(%error, "Could not open review page");
            }
        }
    }

    pub async fn prompt_and_respond(&self) -> Option<RatingResponse> {
        let response = self.prompt().await?;
        self.respond(response);
        Some(response)
    }

    fn persist(&self, key: &str, value: serde_json::Value) {
        if let Err(error) = self.preferences.set(key, value) {
            tracing::warn!(key, %error, "Could not persist rating preference");
        }
    }
}
