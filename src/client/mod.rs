pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::metadata::{DraftReceipt, GlobalSeoSettings, PageReceipt, PageSeoMetadata};
use crate::slug::Slug;

/// Published page metadata and site-wide defaults
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Every page record the backend knows about
    async fn list_pages(&self) -> Result<Vec<PageSeoMetadata>>;

    /// Publish a page record. Last write wins.
    async fn update_page(
        &self,
        slug: &Slug,
        data: &PageSeoMetadata,
        user: &str,
    ) -> Result<PageReceipt>;

    async fn global(&self) -> Result<GlobalSeoSettings>;

    async fn update_global(&self, settings: &GlobalSeoSettings, user: &str) -> Result<()>;
}

/// Unpublished editor state, saved as an opaque JSON blob per slug
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save_draft(&self, slug: &Slug, data: &Value, user: &str) -> Result<DraftReceipt>;
}
