//! Timer-driven draft persistence for a single editor
//!
//! The coordinator compares a serialised snapshot of the form against the
//! last snapshot that reached the backend. A fixed-interval timer saves
//! dirty forms; the save shortcut and the unload hook save out of band.
//! Failed saves are retried on later ticks following a [`RetryPolicy`]
//! until it is exhausted, at which point the coordinator parks in
//! [`SaveStatus::GaveUp`] until the next edit or a manual save.
//!
//! There is no mutual exclusion around a save: a manual save issued while a
//! timer save is in flight sends a second request, and whichever response
//! lands last decides the published state.

pub mod shortcut;

#[cfg(test)]
mod tests;

pub use shortcut::KeyChord;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::DraftStore;
use crate::config::{AutosaveConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::metadata::DraftReceipt;
use crate::slug::Slug;

/// Where the coordinator is in its save cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveStatus {
    /// Nothing edited since the editor opened
    Idle,
    /// Local edits not yet saved
    Dirty,
    /// At least one save request in flight
    Saving,
    /// Backend holds the current content
    Saved,
    /// Last save failed; a later tick retries
    Failed,
    /// Retry budget spent; waiting for an edit or a manual save
    GaveUp,
}

/// Observable coordinator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSaveState {
    pub status: SaveStatus,
    pub last_saved: Option<DateTime<Utc>>,
    pub is_saving: bool,
    pub has_unsaved_changes: bool,
    pub error: Option<String>,
    pub failed_attempts: u32,
}

/// What the unload hook should do with the navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnloadPrompt {
    /// Warn the user before leaving
    pub prevent_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Timer,
    Manual,
    Unload,
}

struct Inner {
    slug: Option<Slug>,
    enabled: bool,
    current: Value,
    current_snapshot: String,
    saved_snapshot: String,
    phase: SaveStatus,
    in_flight: usize,
    last_saved: Option<DateTime<Utc>>,
    error: Option<String>,
    failed_attempts: u32,
    retry_at: Option<Instant>,
}

impl Inner {
    fn is_dirty(&self) -> bool {
        self.enabled && self.current_snapshot != self.saved_snapshot
    }

    fn settled_phase(&self) -> SaveStatus {
        if self.is_dirty() {
            SaveStatus::Dirty
        } else if self.last_saved.is_some() {
            SaveStatus::Saved
        } else {
            SaveStatus::Idle
        }
    }

    fn snapshot(&self) -> AutoSaveState {
        AutoSaveState {
            status: if self.in_flight > 0 {
                SaveStatus::Saving
            } else {
                self.phase
            },
            last_saved: self.last_saved,
            is_saving: self.in_flight > 0,
            has_unsaved_changes: self.is_dirty(),
            error: self.error.clone(),
            failed_attempts: self.failed_attempts,
        }
    }
}

/// Autosave coordinator for one slug
pub struct AutoSaver {
    store: Arc<dyn DraftStore>,
    user: String,
    interval: Duration,
    policy: RetryPolicy,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AutoSaveState>,
}

impl AutoSaver {
    /// Create a coordinator whose baseline is `initial`
    ///
    /// The slug must be valid when autosave is enabled; a disabled
    /// coordinator tolerates a missing one until [`AutoSaver::set_enabled`].
    pub fn new<T: Serialize>(
        slug: &str,
        initial: &T,
        store: Arc<dyn DraftStore>,
        user: impl Into<String>,
        config: &AutosaveConfig,
    ) -> Result<Arc<Self>> {
        let slug = if config.enabled {
            Some(Slug::parse(slug)?)
        } else {
            Slug::parse(slug).ok()
        };

        let current = serde_json::to_value(initial)?;
        let snapshot = current.to_string();
        let inner = Inner {
            slug,
            enabled: config.enabled,
            current,
            current_snapshot: snapshot.clone(),
            saved_snapshot: snapshot,
            phase: SaveStatus::Idle,
            in_flight: 0,
            last_saved: None,
            error: None,
            failed_attempts: 0,
            retry_at: None,
        };
        let (state_tx, _) = watch::channel(inner.snapshot());

        Ok(Arc::new(Self {
            store,
            user: user.into(),
            interval: config.interval(),
            policy: config.retry.clone(),
            inner: Mutex::new(inner),
            state_tx,
        }))
    }

    /// Current state
    pub async fn state(&self) -> AutoSaveState {
        self.inner.lock().await.snapshot()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<AutoSaveState> {
        self.state_tx.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record the latest form content
    ///
    /// Content is tracked while disabled too, so re-enabling picks up edits
    /// made in the meantime.
    pub async fn update<T: Serialize>(&self, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        let mut inner = self.inner.lock().await;
        inner.current_snapshot = value.to_string();
        inner.current = value;
        if !inner.enabled {
            self.publish(&inner);
            return Ok(());
        }

        if inner.is_dirty() {
            if inner.phase == SaveStatus::GaveUp {
                ::log::info!("New edit re-arms autosave retries");
                inner.failed_attempts = 0;
                inner.retry_at = None;
            }
            inner.phase = SaveStatus::Dirty;
        } else {
            ::log::trace!("Form matches last saved content");
            inner.error = None;
            inner.failed_attempts = 0;
            inner.retry_at = None;
            inner.phase = inner.settled_phase();
        }

        self.publish(&inner);
        Ok(())
    }

    /// Timer callback: save if dirty and any backoff has elapsed
    pub async fn tick(&self) -> Result<Option<DraftReceipt>> {
        self.attempt(Trigger::Timer).await
    }

    /// Save immediately, ignoring the timer and any backoff
    ///
    /// Returns `Ok(None)` when there is nothing to save.
    pub async fn save_now(&self) -> Result<Option<DraftReceipt>> {
        self.attempt(Trigger::Manual).await
    }

    /// Unload hook
    ///
    /// Starts a background save when there are unsaved changes and asks the
    /// caller to warn the user while anything is pending. The save is not
    /// awaited and may not finish before the process goes away.
    pub async fn before_unload(self: &Arc<Self>) -> UnloadPrompt {
        let (dirty, in_flight) = {
            let inner = self.inner.lock().await;
            (inner.is_dirty(), inner.in_flight > 0)
        };

        if dirty {
            let saver = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = saver.attempt(Trigger::Unload).await {
                    ::log::warn!("Save on unload failed: {}", e);
                }
            });
        }

        UnloadPrompt {
            prevent_default: dirty || in_flight,
        }
    }

    /// Save and wait for the outcome, as the last thing before exiting
    pub async fn flush(&self) -> Result<Option<DraftReceipt>> {
        self.attempt(Trigger::Unload).await
    }

    /// Adopt `data` as saved, e.g. after the page itself was published
    ///
    /// Publishes carry no backend timestamp, so `last_saved` becomes the
    /// local time of the call.
    pub async fn mark_saved<T: Serialize>(&self, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        let mut inner = self.inner.lock().await;
        inner.saved_snapshot = value.to_string();
        inner.last_saved = Some(Utc::now());
        inner.error = None;
        inner.failed_attempts = 0;
        inner.retry_at = None;
        inner.phase = inner.settled_phase();
        self.publish(&inner);
        Ok(())
    }

    /// Turn autosave on or off
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if enabled && inner.slug.is_none() {
            return Err(Error::InvalidSlug(String::new()));
        }
        inner.enabled = enabled;
        inner.phase = inner.settled_phase();
        self.publish(&inner);
        Ok(())
    }

    async fn attempt(&self, trigger: Trigger) -> Result<Option<DraftReceipt>> {
        let (slug, data, snapshot) = {
            let mut inner = self.inner.lock().await;
            if !inner.is_dirty() {
                return Ok(None);
            }
            if trigger == Trigger::Timer {
                if inner.phase == SaveStatus::GaveUp {
                    return Ok(None);
                }
                if inner.retry_at.is_some_and(|at| Instant::now() < at) {
                    ::log::trace!("Autosave backing off");
                    return Ok(None);
                }
            }
            let Some(slug) = inner.slug.clone() else {
                return Ok(None);
            };

            inner.in_flight += 1;
            self.publish(&inner);
            (slug, inner.current.clone(), inner.current_snapshot.clone())
        };

        ::log::debug!("Saving draft for {} ({:?})", slug, trigger);
        // Backoff counts from the start of the attempt
        let started = Instant::now();
        let result = self.store.save_draft(&slug, &data, &self.user).await;

        let mut inner = self.inner.lock().await;
        inner.in_flight -= 1;
        match result {
            Ok(receipt) => {
                inner.saved_snapshot = snapshot;
                inner.last_saved = Some(receipt.saved_at);
                inner.error = None;
                inner.failed_attempts = 0;
                inner.retry_at = None;
                inner.phase = inner.settled_phase();
                ::log::info!("Draft for {} saved at {}", slug, receipt.saved_at);
                self.publish(&inner);
                Ok(Some(receipt))
            }
            Err(e) if !inner.is_dirty() => {
                // A concurrent save already stored the current content
                ::log::warn!("Superseded draft save for {} failed: {}", slug, e);
                inner.phase = inner.settled_phase();
                self.publish(&inner);
                Err(e)
            }
            Err(e) => {
                inner.error = Some(e.to_string());
                inner.failed_attempts += 1;
                if self.policy.is_exhausted(inner.failed_attempts) {
                    inner.phase = SaveStatus::GaveUp;
                    inner.retry_at = None;
                    ::log::error!(
                        "Giving up autosave for {} after {} failed attempts: {}",
                        slug,
                        inner.failed_attempts,
                        e
                    );
                } else {
                    let delay = self.policy.backoff(inner.failed_attempts);
                    inner.phase = SaveStatus::Failed;
                    inner.retry_at = Some(started + delay);
                    ::log::warn!(
                        "Draft save for {} failed (attempt {}), retrying in {:?}: {}",
                        slug,
                        inner.failed_attempts,
                        delay,
                        e
                    );
                }
                self.publish(&inner);
                Err(e)
            }
        }
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.snapshot());
    }

    /// Run the fixed-interval timer until the returned task is dropped
    pub fn spawn(saver: &Arc<AutoSaver>) -> AutoSaveTask {
        let saver = Arc::clone(saver);
        let period = saver.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = saver.tick().await {
                    ::log::debug!("Autosave tick failed: {}", e);
                }
            }
        });
        AutoSaveTask { handle }
    }
}

/// Handle on a running autosave timer; dropping it stops the timer
pub struct AutoSaveTask {
    handle: JoinHandle<()>,
}

impl AutoSaveTask {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for AutoSaveTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
