mod common;

use std::sync::Arc;
use std::time::Duration;

use common::ScriptedPlatform;
use desktop_shell::clock::FixedClock;
use desktop_shell::context::{Services, ShellContext};
use desktop_shell::preferences::{load_preferences_state, MemoryPreferences, PreferenceStore};
use desktop_shell::rating::{RatingConfig, RatingResponse, ReengagementScheduler, DAY_MS};
use desktop_shell::state::{GeneralState, RATING_DID_RATE, RATING_LAST_CLICKED};
use desktop_shell::auth::LocalAuthBackend;
use serde_json::json;
use shell_dispatch::testing::wait_until;
use shell_dispatch::NoopMiddleware;

fn config() -> RatingConfig {
    RatingConfig {
        app_name: "Notes".into(),
        mac_app_store_id: "42".into(),
    }
}

struct Fixture {
    platform: Arc<ScriptedPlatform>,
    preferences: Arc<MemoryPreferences>,
    clock: Arc<FixedClock>,
    scheduler: ReengagementScheduler,
}

fn fixture(restricted: bool, now: i64) -> Fixture {
    let platform = Arc::new(ScriptedPlatform::new(restricted));
    let preferences = Arc::new(MemoryPreferences::new());
    let clock = Arc::new(FixedClock::new(now));
    let scheduler = ReengagementScheduler::new(
        config(),
        platform.clone(),
        preferences.clone(),
        clock.clone(),
    );
    Fixture {
        platform,
        preferences,
        clock,
        scheduler,
    }
}

#[tokio::test]
async fn test_later_waits_a_week() {
    let now = 8 * DAY_MS;
    let f = fixture(true, now);
    let prefs = load_preferences_state(f.preferences.as_ref());
    assert!(f.scheduler.evaluate(&prefs));

    f.platform.answer_with(Some(1));
    assert_eq!(f.scheduler.prompt_and_respond().await, Some(RatingResponse::Later));

    assert_eq!(f.preferences.get(RATING_LAST_CLICKED), Some(json!(now)));
    let prefs = load_preferences_state(f.preferences.as_ref());
    assert_eq!(prefs.rating_last_clicked, now);
    assert!(!prefs.rating_did_rate);
    assert!(!f.scheduler.evaluate(&prefs));
    assert!(f.platform.opened.lock().unwrap().is_empty());

    f.clock.advance(7 * DAY_MS);
    assert!(!f.scheduler.evaluate(&prefs));
    f.clock.advance(1);
    assert!(f.scheduler.evaluate(&prefs));
}

#[tokio::test]
async fn test_rate_opens_review_page_and_waits_ninety_days() {
    let now = 8 * DAY_MS;
    let f = fixture(true, now);
    f.platform.answer_with(Some(0));

    assert_eq!(f.scheduler.prompt_and_respond().await, Some(RatingResponse::Rate));

    assert_eq!(f.preferences.get(RATING_DID_RATE), Some(json!(true)));
    assert_eq!(
        *f.platform.opened.lock().unwrap(),
        vec![config().review_url()]
    );
    let dialogs = f.platform.dialogs.lock().unwrap().clone();
    assert_eq!(dialogs, vec![config().dialog()]);

    let prefs = load_preferences_state(f.preferences.as_ref());
    f.clock.advance(30 * DAY_MS);
    assert!(!f.scheduler.evaluate(&prefs));
    f.clock.set(now + 90 * DAY_MS + 1);
    assert!(f.scheduler.evaluate(&prefs));
}

#[tokio::test]
async fn test_closed_dialog_persists_nothing() {
    let f = fixture(true, 8 * DAY_MS);
    f.platform.answer_with(None);

    assert_eq!(f.scheduler.prompt_and_respond().await, None);
    assert_eq!(f.preferences.get(RATING_LAST_CLICKED), None);
    assert_eq!(f.preferences.get(RATING_DID_RATE), None);
}

#[tokio::test]
async fn test_unrestricted_channel_never_prompts() {
    let f = fixture(false, 400 * DAY_MS);
    let prefs = load_preferences_state(f.preferences.as_ref());
    assert!(!f.scheduler.evaluate(&prefs));
}

#[tokio::test]
async fn test_answer_reaches_store_through_preference_listener() {
    let now = 8 * DAY_MS;
    let platform = Arc::new(ScriptedPlatform::new(true));
    let preferences = Arc::new(MemoryPreferences::new());
    let services = Services {
        auth_provider: Arc::new(desktop_shell::auth::LocalAuthProvider::new()),
        auth_backend: Arc::new(LocalAuthBackend),
        preferences: preferences.clone(),
        platform: platform.clone(),
        clock: Arc::new(FixedClock::new(now)),
    };
    let mut ctx =
        ShellContext::new(services, GeneralState::default(), config(), NoopMiddleware).unwrap();
    assert!(ctx.rating_visible());

    platform.answer_with(Some(1));
    ctx.scheduler().prompt_and_respond().await;

    let updated = wait_until(&mut ctx.store, Duration::from_secs(1), |s| {
        s.preferences.rating_last_clicked == now
    })
    .await
    .unwrap();
    assert!(updated);
    assert!(!ctx.rating_visible());
    ctx.shutdown();
}
