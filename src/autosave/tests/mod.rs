mod timer_tests;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use super::{AutoSaveState, AutoSaver};
use crate::client::{DraftStore, MemoryStore};
use crate::config::{AutosaveConfig, RetryPolicy};
use crate::error::Result;
use crate::metadata::DraftReceipt;
use crate::slug::Slug;

/// Draft store whose saves block until a permit is released
struct GatedStore {
    inner: MemoryStore,
    gate: Semaphore,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
        }
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl DraftStore for GatedStore {
    async fn save_draft(&self, slug: &Slug, data: &Value, user: &str) -> Result<DraftReceipt> {
        self.gate
            .acquire()
            .await
            .expect("gate never closes")
            .forget();
        self.inner.save_draft(slug, data, user).await
    }
}

/// Draft store that takes `delay` to answer each save
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl DraftStore for SlowStore {
    async fn save_draft(&self, slug: &Slug, data: &Value, user: &str) -> Result<DraftReceipt> {
        tokio::time::sleep(self.delay).await;
        self.inner.save_draft(slug, data, user).await
    }
}

fn config() -> AutosaveConfig {
    AutosaveConfig {
        enabled: true,
        interval_secs: 30,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff_secs: 30,
            multiplier: 2.0,
            max_backoff_secs: 600,
        },
    }
}

fn form(title: &str) -> Value {
    json!({ "title": title, "description": "" })
}

fn saver_with(store: Arc<dyn DraftStore>) -> Arc<AutoSaver> {
    AutoSaver::new("/services/seo", &form("Initial"), store, "editor", &config()).unwrap()
}

/// Yield until `pred` holds for the coordinator state
async fn wait_for(saver: &AutoSaver, pred: impl Fn(&AutoSaveState) -> bool) -> AutoSaveState {
    for _ in 0..1000 {
        let state = saver.state().await;
        if pred(&state) {
            return state;
        }
        tokio::task::yield_now().await;
    }
    panic!("state never reached: {:?}", saver.state().await);
}
