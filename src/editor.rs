use std::sync::Arc;
use tokio::sync::watch;

use crate::autosave::{AutoSaveState, AutoSaveTask, AutoSaver, KeyChord, UnloadPrompt};
use crate::cache::{self, KvCache};
use crate::client::{DraftStore, PageStore};
use crate::config::AutosaveConfig;
use crate::error::{Error, Result};
use crate::metadata::{DraftReceipt, GlobalSeoSettings, PageReceipt, PageSeoMetadata};
use crate::preview::Previews;
use crate::slug::Slug;
use crate::validation::{ValidationResult, validate};

/// Result of feeding a key press to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not a shortcut the editor handles
    Ignored,
    /// Save shortcut; carries the receipt when something was saved
    Saved(Option<DraftReceipt>),
}

/// Everything the editor needs from the outside world
#[derive(Clone)]
pub struct EditorDeps {
    pub pages: Arc<dyn PageStore>,
    pub drafts: Arc<dyn DraftStore>,
    pub cache: Arc<dyn KvCache>,
    pub autosave: AutosaveConfig,
    pub user: String,
    /// Site defaults for the social preview
    pub global: Option<GlobalSeoSettings>,
}

/// Editing session for one page
///
/// Owns the form, keeps its validation current and hands every edit to
/// the autosave coordinator.
pub struct Editor {
    slug: Slug,
    form: PageSeoMetadata,
    validation: ValidationResult,
    pages: Arc<dyn PageStore>,
    cache: Arc<dyn KvCache>,
    autosave: Arc<AutoSaver>,
    user: String,
    global: Option<GlobalSeoSettings>,
    last_version: Option<u64>,
}

impl Editor {
    /// Open an existing page, or start a new one when the backend has none
    pub async fn open(slug: &str, deps: EditorDeps) -> Result<Self> {
        let slug = Slug::parse(slug)?;
        let existing = deps.pages.list_pages().await?.into_iter().find(|page| {
            Slug::parse(&page.slug)
                .map(|s| s == slug)
                .unwrap_or(false)
        });

        match existing {
            Some(page) => {
                ::log::info!("Opened {}", slug);
                Self::with_form(slug, page, deps)
            }
            None => {
                ::log::info!("No record for {}, starting a new page", slug);
                let form = PageSeoMetadata::new_page(&slug);
                Self::with_form(slug, form, deps)
            }
        }
    }

    /// Start a fresh record regardless of what the backend holds
    pub fn new_page(slug: &str, deps: EditorDeps) -> Result<Self> {
        let slug = Slug::parse(slug)?;
        let form = PageSeoMetadata::new_page(&slug);
        Self::with_form(slug, form, deps)
    }

    fn with_form(slug: Slug, mut form: PageSeoMetadata, deps: EditorDeps) -> Result<Self> {
        form.slug = slug.to_string();
        let autosave = AutoSaver::new(
            slug.as_str(),
            &form,
            deps.drafts,
            deps.user.clone(),
            &deps.autosave,
        )?;

        Ok(Self {
            validation: validate(&form),
            slug,
            form,
            pages: deps.pages,
            cache: deps.cache,
            autosave,
            user: deps.user,
            global: deps.global,
            last_version: None,
        })
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn form(&self) -> &PageSeoMetadata {
        &self.form
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn previews(&self) -> Previews {
        Previews::render(&self.form, self.global.as_ref())
    }

    /// Backend version from the last publish
    pub fn last_version(&self) -> Option<u64> {
        self.last_version
    }

    /// Mutate the form
    pub async fn edit<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut PageSeoMetadata),
    {
        change(&mut self.form);
        self.form_changed().await
    }

    /// Replace the whole form; the slug stays the editor's
    pub async fn replace(&mut self, form: PageSeoMetadata) -> Result<()> {
        self.form = form;
        self.form_changed().await
    }

    async fn form_changed(&mut self) -> Result<()> {
        self.form.slug = self.slug.to_string();
        self.validation = validate(&self.form);
        cache::put_json(self.cache.as_ref(), &self.backup_key(), &self.form, None);
        self.autosave.update(&self.form).await
    }

    /// Load the local backup written by a previous session, if any
    pub async fn restore_local_draft(&mut self) -> Result<bool> {
        match cache::get_json::<PageSeoMetadata>(self.cache.as_ref(), &self.backup_key()) {
            Some(form) if form != self.form => {
                ::log::info!("Restored local draft for {}", self.slug);
                self.replace(form).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Manual publishing is allowed only without validation errors
    pub fn can_save(&self) -> bool {
        self.validation.is_valid
    }

    /// Publish the form through the page store
    pub async fn save(&mut self) -> Result<PageReceipt> {
        if !self.can_save() {
            return Err(Error::Invalid {
                errors: self.validation.errors.len(),
            });
        }

        let receipt = self
            .pages
            .update_page(&self.slug, &self.form, &self.user)
            .await?;
        self.last_version = receipt.version;
        self.autosave.mark_saved(&self.form).await?;
        self.cache.remove(&self.backup_key());
        Ok(receipt)
    }

    /// Route a key press; Ctrl/Cmd+S saves the draft immediately
    pub async fn handle_key(&self, chord: KeyChord) -> Result<KeyOutcome> {
        if !chord.is_save_shortcut() {
            return Ok(KeyOutcome::Ignored);
        }
        Ok(KeyOutcome::Saved(self.autosave.save_now().await?))
    }

    pub async fn before_unload(&self) -> UnloadPrompt {
        self.autosave.before_unload().await
    }

    /// Save any pending draft and wait for it
    pub async fn flush(&self) -> Result<Option<DraftReceipt>> {
        self.autosave.flush().await
    }

    /// Start the autosave timer; it runs until the task is dropped
    pub fn start_autosave(&self) -> AutoSaveTask {
        AutoSaver::spawn(&self.autosave)
    }

    pub async fn autosave_state(&self) -> AutoSaveState {
        self.autosave.state().await
    }

    pub fn subscribe(&self) -> watch::Receiver<AutoSaveState> {
        self.autosave.subscribe()
    }

    fn backup_key(&self) -> String {
        format!("draft:{}", self.slug)
    }
}
