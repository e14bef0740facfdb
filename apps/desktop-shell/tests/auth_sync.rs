mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{user, GatedBackend, ManualProvider};
use desktop_shell::auth_sync::{AuthSyncController, UPDATE_USER_THUNK};
use desktop_shell::state::{AppState, UserState};
use desktop_shell::{AppAction, AppStore};
use shell_dispatch::testing::{wait_until, DispatchLog, RecordingMiddleware};
use shell_dispatch::{assert_not_emitted, Store};

type RecordingStore = AppStore<RecordingMiddleware<AppAction>>;

fn recording_store() -> (RecordingStore, DispatchLog<AppAction>) {
    let log = DispatchLog::new();
    let store: RecordingStore =
        Store::with_middleware(AppState::default(), RecordingMiddleware::new(&log)).unwrap();
    (store, log)
}

fn signed_in_as(state: &AppState, uid: &str) -> bool {
    state.user.profile().is_some_and(|profile| profile.uid == uid)
}

#[tokio::test]
async fn test_no_user_dispatches_exactly_one_clear() {
    let (mut store, log) = recording_store();
    let provider = Arc::new(ManualProvider::new());
    let controller = AuthSyncController::new(provider.clone(), Arc::new(GatedBackend::new()));
    let _handle = controller.mount(store.dispatcher()).unwrap();

    provider.fire(None);
    store.process_pending().unwrap();

    assert_eq!(log.actions(), vec![AppAction::UserClear]);
    assert!(log.thunks().is_empty());
    assert_eq!(*store.state().user, UserState::SignedOut);
}

#[tokio::test]
async fn test_user_dispatches_exactly_one_update_thunk() {
    let (mut store, log) = recording_store();
    let provider = Arc::new(ManualProvider::new());
    let backend = Arc::new(GatedBackend::new());
    let controller = AuthSyncController::new(provider.clone(), backend.clone());
    let _handle = controller.mount(store.dispatcher()).unwrap();

    provider.fire(Some(user("u1")));
    store.process_pending().unwrap();
    assert_eq!(log.thunks(), vec![UPDATE_USER_THUNK]);
    assert_not_emitted!(log.actions(), AppAction::UserClear);

    let loaded = wait_until(&mut store, Duration::from_secs(1), |s| signed_in_as(s, "u1"))
        .await
        .unwrap();
    assert!(loaded);
    assert_eq!(backend.fetched(), vec!["u1"]);
    assert_eq!(log.thunks(), vec![UPDATE_USER_THUNK]);
}

#[tokio::test]
async fn test_resolution_after_unmount_is_ignored() {
    let (mut store, log) = recording_store();
    let provider = Arc::new(ManualProvider::with_unsubscribe(false));
    let controller = AuthSyncController::new(provider.clone(), Arc::new(GatedBackend::new()));
    let mut handle = controller.mount(store.dispatcher()).unwrap();

    handle.unmount();
    provider.fire(Some(user("late")));
    provider.fire(None);
    store.process_pending().unwrap();

    assert!(log.is_empty());
    assert_eq!(provider.subscriptions(), 1);
    assert_eq!(*store.state().user, UserState::Unresolved);
}

#[tokio::test]
async fn test_unmount_during_fetch_discards_result() {
    let (mut store, log) = recording_store();
    let provider = Arc::new(ManualProvider::with_unsubscribe(false));
    let backend = Arc::new(GatedBackend::new());
    backend.gate("u1");
    let controller = AuthSyncController::new(provider.clone(), backend.clone());
    let mut handle = controller.mount(store.dispatcher()).unwrap();

    provider.fire(Some(user("u1")));
    store.process_pending().unwrap();
    assert_eq!(backend.fetched(), vec!["u1"]);

    handle.unmount();
    backend.release("u1");
    let loaded = wait_until(&mut store, Duration::from_millis(100), |s| s.user.is_signed_in())
        .await
        .unwrap();

    assert!(!loaded);
    assert_eq!(log.thunks(), vec![UPDATE_USER_THUNK]);
    assert_not_emitted!(log.actions(), AppAction::UserDidLoad(_));
    assert_eq!(provider.subscriptions(), 1);
    assert_eq!(*store.state().user, UserState::Unresolved);
}

#[tokio::test]
async fn test_unmount_releases_provider_subscription() {
    let (store, _log) = recording_store();
    let provider = Arc::new(ManualProvider::new());
    let controller = AuthSyncController::new(provider.clone(), Arc::new(GatedBackend::new()));

    let handle = controller.mount(store.dispatcher()).unwrap();
    assert!(provider.has_observer());
    drop(handle);
    assert!(!provider.has_observer());
}

#[tokio::test]
async fn test_superseded_fetch_is_discarded() {
    let (mut store, log) = recording_store();
    let provider = Arc::new(ManualProvider::new());
    let backend = Arc::new(GatedBackend::new());
    backend.gate("slow");
    let controller = AuthSyncController::new(provider.clone(), backend.clone());
    let _handle = controller.mount(store.dispatcher()).unwrap();

    provider.fire(Some(user("slow")));
    store.process_pending().unwrap();
    provider.fire(Some(user("fast")));
    store.process_pending().unwrap();

    assert!(wait_until(&mut store, Duration::from_secs(1), |s| signed_in_as(s, "fast"))
        .await
        .unwrap());

    backend.release("slow");
    let overwritten = wait_until(&mut store, Duration::from_millis(100), |s| {
        signed_in_as(s, "slow")
    })
    .await
    .unwrap();

    assert!(!overwritten);
    let mut fetched = backend.fetched();
    fetched.sort();
    assert_eq!(fetched, vec!["fast", "slow"]);
    assert_eq!(log.thunks(), vec![UPDATE_USER_THUNK, UPDATE_USER_THUNK]);
}

#[tokio::test]
async fn test_sign_out_supersedes_pending_fetch() {
    let (mut store, _log) = recording_store();
    let provider = Arc::new(ManualProvider::new());
    let backend = Arc::new(GatedBackend::new());
    backend.gate("u1");
    let controller = AuthSyncController::new(provider.clone(), backend.clone());
    let _handle = controller.mount(store.dispatcher()).unwrap();

    provider.fire(Some(user("u1")));
    provider.fire(None);
    store.process_pending().unwrap();
    assert_eq!(*store.state().user, UserState::SignedOut);

    backend.release("u1");
    let overwritten = wait_until(&mut store, Duration::from_millis(100), |s| {
        s.user.is_signed_in()
    })
    .await
    .unwrap();
    assert!(!overwritten);
}

#[tokio::test]
async fn test_failed_fetch_leaves_user_untouched() {
    let (mut store, log) = recording_store();
    let provider = Arc::new(ManualProvider::new());
    let backend = Arc::new(GatedBackend::new());
    backend.fail("u1");
    let controller = AuthSyncController::new(provider.clone(), backend.clone());
    let _handle = controller.mount(store.dispatcher()).unwrap();

    provider.fire(Some(user("u1")));
    let loaded = wait_until(&mut store, Duration::from_millis(100), |s| s.user.is_signed_in())
        .await
        .unwrap();

    assert!(!loaded);
    assert_eq!(backend.fetched(), vec!["u1"]);
    assert_not_emitted!(log.actions(), AppAction::UserDidLoad(_));
    assert_eq!(*store.state().user, UserState::Unresolved);
}
