use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{DraftStore, PageStore};
use crate::cache::{self, KvCache};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::metadata::{DraftReceipt, GlobalSeoSettings, PageReceipt, PageSeoMetadata};
use crate::slug::Slug;

const PAGE_UPDATE: &str = "seo-system/page/update";
const PAGES_ALL: &str = "seo-system/pages/all";
const GLOBAL: &str = "seo-system/global";
const DRAFT_SAVE: &str = "seo/draft/save";

const PAGES_CACHE_KEY: &str = "pages:all";
const GLOBAL_CACHE_KEY: &str = "global";

#[derive(Deserialize)]
struct PagesPayload {
    #[serde(default)]
    pages: Vec<PageSeoMetadata>,
}

#[derive(Deserialize)]
struct GlobalPayload {
    #[serde(default)]
    data: GlobalSeoSettings,
}

/// Backend client speaking JSON to the serverless function base URL
///
/// Every call issues exactly one request. Failures are returned to the
/// caller as they happen; nothing here retries.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    cache: Arc<dyn KvCache>,
    cache_ttl: Duration,
}

impl HttpStore {
    pub fn new(config: &BackendConfig, cache: Arc<dyn KvCache>, cache_ttl: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
            .map_err(|e| Error::Config(format!("anon key is not a valid header value: {}", e)))?;
        let apikey = HeaderValue::from_str(&config.anon_key)
            .map_err(|e| Error::Config(format!("anon key is not a valid header value: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", apikey);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url(&config.base_url)?,
            cache,
            cache_ttl,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        ::log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_envelope(status, &body)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.endpoint(path)?;
        ::log::debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        decode_envelope(status, &text)
    }
}

#[async_trait]
impl PageStore for HttpStore {
    async fn list_pages(&self) -> Result<Vec<PageSeoMetadata>> {
        if let Some(pages) = cache::get_json(self.cache.as_ref(), PAGES_CACHE_KEY) {
            ::log::trace!("Serving page list from cache");
            return Ok(pages);
        }

        let payload: PagesPayload = self.get(PAGES_ALL).await?;
        ::log::info!("Fetched {} page records", payload.pages.len());
        cache::put_json(
            self.cache.as_ref(),
            PAGES_CACHE_KEY,
            &payload.pages,
            Some(self.cache_ttl),
        );
        Ok(payload.pages)
    }

    async fn update_page(
        &self,
        slug: &Slug,
        data: &PageSeoMetadata,
        user: &str,
    ) -> Result<PageReceipt> {
        let body = json!({ "slug": slug, "data": data, "user": user });
        let receipt: PageReceipt = self.post(PAGE_UPDATE, &body).await?;
        self.cache.remove(PAGES_CACHE_KEY);
        ::log::info!("Published {} (version {:?})", slug, receipt.version);
        Ok(receipt)
    }

    async fn global(&self) -> Result<GlobalSeoSettings> {
        if let Some(settings) = cache::get_json(self.cache.as_ref(), GLOBAL_CACHE_KEY) {
            return Ok(settings);
        }

        let payload: GlobalPayload = self.get(GLOBAL).await?;
        cache::put_json(
            self.cache.as_ref(),
            GLOBAL_CACHE_KEY,
            &payload.data,
            Some(self.cache_ttl),
        );
        Ok(payload.data)
    }

    async fn update_global(&self, settings: &GlobalSeoSettings, user: &str) -> Result<()> {
        let body = json!({ "data": settings, "user": user });
        let _: Value = self.post(GLOBAL, &body).await?;
        self.cache.remove(GLOBAL_CACHE_KEY);
        ::log::info!("Updated global SEO settings");
        Ok(())
    }
}

#[async_trait]
impl DraftStore for HttpStore {
    async fn save_draft(&self, slug: &Slug, data: &Value, user: &str) -> Result<DraftReceipt> {
        let body = json!({ "slug": slug, "data": data, "user": user });
        let receipt: DraftReceipt = self.post(DRAFT_SAVE, &body).await?;
        ::log::debug!("Draft for {} saved at {}", slug, receipt.saved_at);
        Ok(receipt)
    }
}

/// Base URL with a trailing slash so relative joins append instead of replace
fn base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("backend base_url is empty".to_string()));
    }
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }
}

/// Apply the backend's `{success, error?, ...payload}` convention
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    let parsed: std::result::Result<Value, _> = serde_json::from_str(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(Error::Status { status, message });
    }

    let value = parsed?;
    if !value.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(Error::Backend(message));
    }

    Ok(serde_json::from_value(value)?)
}
