use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::slug::Slug;

/// SEO record of a single page, keyed by its slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSeoMetadata {
    /// URL path of the page, e.g. `/services/seo`
    #[serde(deserialize_with = "lenient_string")]
    pub slug: String,

    #[serde(deserialize_with = "lenient_string")]
    pub title: String,

    #[serde(deserialize_with = "lenient_string")]
    pub description: String,

    /// Comma-joined keyword list
    #[serde(deserialize_with = "lenient_string")]
    pub keywords: String,

    #[serde(deserialize_with = "lenient_string")]
    pub h1: String,

    /// Canonical URL of the page
    #[serde(deserialize_with = "lenient_string")]
    pub canonical: String,

    #[serde(deserialize_with = "lenient_string")]
    pub og_type: String,

    #[serde(deserialize_with = "lenient_string")]
    pub og_image: String,

    #[serde(deserialize_with = "lenient_string")]
    pub schema_type: String,

    #[serde(deserialize_with = "lenient_bool")]
    pub noindex: bool,
}

impl PageSeoMetadata {
    /// Blank record for a page that has never been saved
    pub fn new_page(slug: &Slug) -> Self {
        Self {
            slug: slug.to_string(),
            og_type: "website".to_string(),
            schema_type: "WebPage".to_string(),
            ..Self::default()
        }
    }

    /// Keywords split on commas, trimmed, empties dropped
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Site-wide defaults served by `/seo-system/global`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSeoSettings {
    #[serde(deserialize_with = "lenient_string")]
    pub site_name: String,

    #[serde(deserialize_with = "lenient_string")]
    pub default_description: String,

    #[serde(deserialize_with = "lenient_string")]
    pub default_og_image: String,

    #[serde(deserialize_with = "lenient_string")]
    pub title_separator: String,

    /// Keys this crate does not interpret, round-tripped untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a page publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReceipt {
    /// Version counter returned by the backend. Informational only.
    #[serde(default)]
    pub version: Option<u64>,
}

/// Result of a draft save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReceipt {
    /// Backend timestamp, or the time the response arrived when omitted or null
    #[serde(default = "Utc::now", deserialize_with = "timestamp_or_now")]
    pub saved_at: DateTime<Utc>,
}

fn timestamp_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.unwrap_or_else(Utc::now))
}

/// Accept strings, treat `null` as empty and stringify other scalars
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        other => other.to_string(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_camel_case() {
        let page = PageSeoMetadata {
            slug: "/about".to_string(),
            og_type: "article".to_string(),
            schema_type: "AboutPage".to_string(),
            ..PageSeoMetadata::default()
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["ogType"], "article");
        assert_eq!(json["schemaType"], "AboutPage");
        assert_eq!(json["noindex"], false);
    }

    #[test]
    fn test_malformed_fields_become_empty() {
        let json = r#"{"slug": "/x", "title": null, "description": 42, "keywords": ["a"], "noindex": "true"}"#;
        let page: PageSeoMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(page.title, "");
        assert_eq!(page.description, "42");
        assert_eq!(page.keywords, "");
        assert_eq!(page.h1, "");
        assert!(page.noindex);
    }

    #[test]
    fn test_new_page_defaults() {
        let slug = Slug::parse("/services/seo").unwrap();
        let page = PageSeoMetadata::new_page(&slug);
        assert_eq!(page.slug, "/services/seo");
        assert_eq!(page.og_type, "website");
        assert_eq!(page.schema_type, "WebPage");
        assert!(page.title.is_empty());
        assert!(!page.noindex);
    }

    #[test]
    fn test_keyword_list() {
        let page = PageSeoMetadata {
            keywords: " seo, local seo ,, audits ".to_string(),
            ..PageSeoMetadata::default()
        };
        assert_eq!(page.keyword_list(), vec!["seo", "local seo", "audits"]);
    }

    #[test]
    fn test_global_settings_keep_unknown_keys() {
        let json = r#"{"siteName": "Acme", "twitterHandle": "@acme"}"#;
        let settings: GlobalSeoSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.site_name, "Acme");
        assert_eq!(settings.extra["twitterHandle"], "@acme");

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["twitterHandle"], "@acme");
    }

    #[test]
    fn test_draft_receipt_missing_or_null_time_is_arrival_time() {
        let before = Utc::now();
        let missing: DraftReceipt = serde_json::from_str("{}").unwrap();
        let null: DraftReceipt = serde_json::from_str(r#"{"savedAt": null}"#).unwrap();
        assert!(missing.saved_at >= before);
        assert!(null.saved_at >= before);

        let given: DraftReceipt = serde_json::from_str(r#"{"savedAt": "2026-10-14T09:30:00Z"}"#).unwrap();
        assert_eq!(given.saved_at.to_rfc3339(), "2026-10-14T09:30:00+00:00");
    }
}
