use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{DraftStore, PageStore};
use crate::error::{Error, Result};
use crate::metadata::{DraftReceipt, GlobalSeoSettings, PageReceipt, PageSeoMetadata};
use crate::slug::Slug;

#[derive(Default)]
struct State {
    pages: BTreeMap<Slug, (PageSeoMetadata, u64)>,
    drafts: BTreeMap<Slug, (Value, DateTime<Utc>)>,
    global: GlobalSeoSettings,
    last_saved_at: Option<DateTime<Utc>>,
    fail_drafts: usize,
    fail_pages: usize,
    draft_saves: usize,
    page_updates: usize,
}

/// In-process backend used for offline sessions and tests
///
/// Mirrors the hosted backend's observable behaviour: page versions count
/// up from 1 on every publish and draft timestamps are strictly increasing.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing page records
    pub fn with_pages(pages: impl IntoIterator<Item = PageSeoMetadata>) -> Result<Self> {
        let store = Self::new();
        {
            let mut state = store.lock();
            for page in pages {
                let slug = Slug::parse(&page.slug)?;
                state.pages.insert(slug, (page, 1));
            }
        }
        Ok(store)
    }

    /// Make the next `n` draft saves fail
    pub fn fail_next_drafts(&self, n: usize) {
        self.lock().fail_drafts = n;
    }

    /// Make the next `n` page updates fail
    pub fn fail_next_pages(&self, n: usize) {
        self.lock().fail_pages = n;
    }

    /// Successful draft saves so far
    pub fn draft_saves(&self) -> usize {
        self.lock().draft_saves
    }

    pub fn page_updates(&self) -> usize {
        self.lock().page_updates
    }

    pub fn draft(&self, slug: &Slug) -> Option<(Value, DateTime<Utc>)> {
        self.lock().drafts.get(slug).cloned()
    }

    pub fn page(&self, slug: &Slug) -> Option<(PageSeoMetadata, u64)> {
        self.lock().pages.get(slug).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    /// Wall-clock time, nudged forward so no two saves share a timestamp
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_saved_at {
            if now <= last {
                now = last + TimeDelta::microseconds(1);
            }
        }
        self.last_saved_at = Some(now);
        now
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn list_pages(&self) -> Result<Vec<PageSeoMetadata>> {
        Ok(self
            .lock()
            .pages
            .values()
            .map(|(page, _)| page.clone())
            .collect())
    }

    async fn update_page(
        &self,
        slug: &Slug,
        data: &PageSeoMetadata,
        _user: &str,
    ) -> Result<PageReceipt> {
        let mut state = self.lock();
        if state.fail_pages > 0 {
            state.fail_pages -= 1;
            return Err(Error::Status {
                status: 503,
                message: "injected page failure".to_string(),
            });
        }

        let version = state.pages.get(slug).map(|(_, v)| v + 1).unwrap_or(1);
        let mut page = data.clone();
        page.slug = slug.to_string();
        state.pages.insert(slug.clone(), (page, version));
        state.page_updates += 1;
        Ok(PageReceipt {
            version: Some(version),
        })
    }

    async fn global(&self) -> Result<GlobalSeoSettings> {
        Ok(self.lock().global.clone())
    }

    async fn update_global(&self, settings: &GlobalSeoSettings, _user: &str) -> Result<()> {
        self.lock().global = settings.clone();
        Ok(())
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn save_draft(&self, slug: &Slug, data: &Value, _user: &str) -> Result<DraftReceipt> {
        let mut state = self.lock();
        if state.fail_drafts > 0 {
            state.fail_drafts -= 1;
            return Err(Error::Status {
                status: 503,
                message: "injected draft failure".to_string(),
            });
        }

        let saved_at = state.next_timestamp();
        state.drafts.insert(slug.clone(), (data.clone(), saved_at));
        state.draft_saves += 1;
        Ok(DraftReceipt { saved_at })
    }
}
