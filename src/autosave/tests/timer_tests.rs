use super::*;
use crate::autosave::SaveStatus;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_timer_saves_after_one_interval() {
    let store = Arc::new(MemoryStore::new());
    let saver = saver_with(store.clone());
    let _task = AutoSaver::spawn(&saver);

    saver.update(&form("Edited")).await.unwrap();
    sleep(Duration::from_secs(29)).await;
    assert_eq!(store.draft_saves(), 0);
    assert!(saver.state().await.has_unsaved_changes);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(store.draft_saves(), 1);
    assert_eq!(saver.state().await.status, SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_clean_form_is_not_saved_by_timer() {
    let store = Arc::new(MemoryStore::new());
    let saver = saver_with(store.clone());
    let _task = AutoSaver::spawn(&saver);

    sleep(Duration::from_secs(95)).await;
    assert_eq!(store.draft_saves(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_next_tick_retries_then_backs_off() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next_drafts(2);
    let saver = saver_with(store.clone());
    let _task = AutoSaver::spawn(&saver);
    saver.update(&form("Edited")).await.unwrap();

    // t=30 fails, retry allowed from t=60
    sleep(Duration::from_secs(31)).await;
    let state = saver.state().await;
    assert_eq!(state.status, SaveStatus::Failed);
    assert!(state.has_unsaved_changes);
    assert!(state.error.is_some());

    // t=60 fails again, retry allowed from t=120
    sleep(Duration::from_secs(30)).await;
    assert_eq!(saver.state().await.failed_attempts, 2);

    // t=90 is inside the backoff window
    sleep(Duration::from_secs(30)).await;
    assert_eq!(saver.state().await.failed_attempts, 2);
    assert_eq!(store.draft_saves(), 0);

    // t=120 succeeds
    sleep(Duration::from_secs(30)).await;
    let state = saver.state().await;
    assert_eq!(state.status, SaveStatus::Saved);
    assert!(state.error.is_none());
    assert_eq!(store.draft_saves(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_failure_still_retries_on_next_tick() {
    let store = Arc::new(SlowStore::new(Duration::from_secs(1)));
    store.inner.fail_next_drafts(1);
    let saver = saver_with(store.clone());
    let _task = AutoSaver::spawn(&saver);
    saver.update(&form("Edited")).await.unwrap();

    // t=30 tick fails once its response lands at t=31
    sleep(Duration::from_secs(32)).await;
    assert_eq!(saver.state().await.status, SaveStatus::Failed);
    assert_eq!(store.inner.draft_saves(), 0);

    // t=60 tick retries and lands at t=61
    sleep(Duration::from_secs(30)).await;
    let state = saver.state().await;
    assert_eq!(state.status, SaveStatus::Saved);
    assert_eq!(store.inner.draft_saves(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_task_stops_the_timer() {
    let store = Arc::new(MemoryStore::new());
    let saver = saver_with(store.clone());
    let task = AutoSaver::spawn(&saver);
    task.stop();

    saver.update(&form("Edited")).await.unwrap();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(store.draft_saves(), 0);
    assert!(saver.state().await.has_unsaved_changes);
}
