pub mod autosave;
pub mod cache;
pub mod client;
pub mod config;
pub mod editor;
pub mod error;
pub mod metadata;
pub mod preview;
pub mod slug;
pub mod validation;

// Re-export commonly used types for convenience
pub use editor::Editor;
pub use error::{Error, Result};
pub use metadata::PageSeoMetadata;
pub use slug::Slug;
pub use validation::{ValidationResult, validate};

use std::sync::Arc;

use cache::{KvCache, MemoryCache};
use client::{DraftStore, HttpStore, MemoryStore, PageStore};
use config::ConsoleConfig;
use editor::EditorDeps;

/// Backend a console session talks to
#[derive(Clone)]
pub enum Backend {
    /// The hosted serverless functions
    Http,
    /// An in-process store, for offline work and tests
    Memory(Arc<MemoryStore>),
}

/// Builder for a console session
pub struct Console {
    config: ConsoleConfig,
    backend: Backend,
    cache: Option<Arc<dyn KvCache>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            config: ConsoleConfig::default(),
            backend: Backend::Http,
            cache: None,
        }
    }

    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = ConsoleConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a JSON string
    pub fn with_config_str(self, json: &str) -> Result<Self> {
        let config = ConsoleConfig::from_json(json)?;
        Ok(self.with_config(config))
    }

    /// Author recorded on saves
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    /// Override the autosave timer period
    pub fn with_autosave_interval(mut self, seconds: u64) -> Self {
        self.config.autosave.interval_secs = seconds;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Use a specific cache instead of a fresh in-memory one
    pub fn with_cache(mut self, cache: Arc<dyn KvCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolve configuration and build the stores
    pub fn connect(mut self) -> Result<Session> {
        self.config.apply_env();

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new(self.config.cache_ttl())) as Arc<dyn KvCache>);

        let (pages, drafts): (Arc<dyn PageStore>, Arc<dyn DraftStore>) = match self.backend {
            Backend::Http => {
                ::log::info!("Using backend at {}", self.config.backend.base_url);
                let store = Arc::new(HttpStore::new(
                    &self.config.backend,
                    Arc::clone(&cache),
                    self.config.cache_ttl(),
                )?);
                let pages: Arc<dyn PageStore> = store.clone();
                let drafts: Arc<dyn DraftStore> = store;
                (pages, drafts)
            }
            Backend::Memory(store) => {
                ::log::info!("Using in-memory backend");
                let pages: Arc<dyn PageStore> = store.clone();
                let drafts: Arc<dyn DraftStore> = store;
                (pages, drafts)
            }
        };

        Ok(Session {
            config: self.config,
            pages,
            drafts,
            cache,
        })
    }
}

/// Connected console: stores, cache and configuration
pub struct Session {
    config: ConsoleConfig,
    pages: Arc<dyn PageStore>,
    drafts: Arc<dyn DraftStore>,
    cache: Arc<dyn KvCache>,
}

impl Session {
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn pages(&self) -> &Arc<dyn PageStore> {
        &self.pages
    }

    pub fn drafts(&self) -> &Arc<dyn DraftStore> {
        &self.drafts
    }

    /// Open an editor for `slug`, loading the existing record if there is one
    pub async fn open_editor(&self, slug: &str) -> Result<Editor> {
        let deps = self.editor_deps().await;
        Editor::open(slug, deps).await
    }

    /// Open an editor on a blank record
    pub async fn new_page(&self, slug: &str) -> Result<Editor> {
        let deps = self.editor_deps().await;
        Editor::new_page(slug, deps)
    }

    async fn editor_deps(&self) -> EditorDeps {
        // Previews degrade gracefully without site defaults
        let global = match self.pages.global().await {
            Ok(global) => Some(global),
            Err(e) => {
                ::log::warn!("Global SEO settings unavailable: {}", e);
                None
            }
        };

        EditorDeps {
            pages: Arc::clone(&self.pages),
            drafts: Arc::clone(&self.drafts),
            cache: Arc::clone(&self.cache),
            autosave: self.config.autosave.clone(),
            user: self.config.user.clone(),
            global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadata::GlobalSeoSettings;

    #[tokio::test]
    async fn test_offline_session_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let global = GlobalSeoSettings {
            site_name: "Acme".to_string(),
            ..GlobalSeoSettings::default()
        };
        store.update_global(&global, "admin").await.unwrap();

        let session = Console::new()
            .with_config_str(r#"{"user": "alice", "autosave": {"interval_secs": 10}}"#)
            .unwrap()
            .with_backend(Backend::Memory(store.clone()))
            .connect()
            .unwrap();
        assert_eq!(session.config().user, "alice");

        let mut editor = session.new_page("/contact").await.unwrap();
        editor
            .edit(|f| {
                f.title = "Contact our SEO consultants today".to_string();
                f.description = "C".repeat(125);
            })
            .await
            .unwrap();
        assert_eq!(editor.previews().social.site_name, "Acme");

        editor.save().await.unwrap();
        let reopened = session.open_editor("/contact").await.unwrap();
        assert_eq!(reopened.form().title, "Contact our SEO consultants today");
    }

    #[test]
    fn test_builder_overrides() {
        let session = Console::new()
            .with_user("bob")
            .with_autosave_interval(5)
            .with_backend(Backend::Memory(Arc::new(MemoryStore::new())))
            .connect()
            .unwrap();
        assert_eq!(session.config().user, "bob");
        assert_eq!(session.config().autosave.interval_secs, 5);
    }
}
