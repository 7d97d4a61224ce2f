use serde::Serialize;
use url::Url;

use crate::metadata::{GlobalSeoSettings, PageSeoMetadata};

pub const SERP_TITLE_LIMIT: usize = 60;
pub const SERP_DESCRIPTION_LIMIT: usize = 160;
pub const SOCIAL_TITLE_LIMIT: usize = 70;
pub const SOCIAL_DESCRIPTION_LIMIT: usize = 200;

const ELLIPSIS: char = '…';

/// Shorten `text` to at most `limit` chars, ending in an ellipsis when cut
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    let kept: String = text.chars().take(limit - 1).collect();
    let mut out = kept.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// Search result listing as it would appear on a results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerpPreview {
    pub title: String,
    pub display_url: String,
    pub description: String,
}

impl SerpPreview {
    pub fn render(page: &PageSeoMetadata) -> Self {
        Self {
            title: truncate(&page.title, SERP_TITLE_LIMIT),
            display_url: display_url(page),
            description: truncate(&page.description, SERP_DESCRIPTION_LIMIT),
        }
    }
}

/// Open Graph link card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialPreview {
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

impl SocialPreview {
    pub fn render(page: &PageSeoMetadata, global: Option<&GlobalSeoSettings>) -> Self {
        let image = if !page.og_image.trim().is_empty() {
            Some(page.og_image.clone())
        } else {
            global
                .map(|g| g.default_og_image.clone())
                .filter(|img| !img.trim().is_empty())
        };

        let description = match global {
            Some(g) if page.description.trim().is_empty() => g.default_description.as_str(),
            _ => page.description.as_str(),
        };

        Self {
            site_name: global.map(|g| g.site_name.clone()).unwrap_or_default(),
            title: truncate(&page.title, SOCIAL_TITLE_LIMIT),
            description: truncate(description, SOCIAL_DESCRIPTION_LIMIT),
            image,
        }
    }
}

/// Both previews the editor shows next to the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Previews {
    pub serp: SerpPreview,
    pub social: SocialPreview,
}

impl Previews {
    pub fn render(page: &PageSeoMetadata, global: Option<&GlobalSeoSettings>) -> Self {
        Self {
            serp: SerpPreview::render(page),
            social: SocialPreview::render(page, global),
        }
    }
}

/// Host and path of the canonical URL, or the slug when there is none
fn display_url(page: &PageSeoMetadata) -> String {
    match Url::parse(page.canonical.trim()) {
        Ok(url) if url.host_str().is_some() => {
            let host = url.host_str().unwrap_or_default();
            let path = url.path().trim_end_matches('/');
            format!("{}{}", host, path)
        }
        _ => page.slug.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("Short title", 60), "Short title");
        assert_eq!(truncate(&"a".repeat(60), 60), "a".repeat(60));
    }

    #[test]
    fn test_truncate_adds_ellipsis_within_limit() {
        let cut = truncate(&"a".repeat(61), 60);
        assert_eq!(cut.chars().count(), 60);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_truncate_trims_dangling_space() {
        assert_eq!(truncate("hello world again", 7), "hello…");
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        let cut = truncate(&"ü".repeat(10), 5);
        assert_eq!(cut, "üüüü…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_serp_display_url() {
        let mut page = PageSeoMetadata {
            slug: "/services/seo".to_string(),
            canonical: "https://www.example.com/services/seo/".to_string(),
            ..PageSeoMetadata::default()
        };
        assert_eq!(SerpPreview::render(&page).display_url, "www.example.com/services/seo");

        page.canonical = "not a url".to_string();
        assert_eq!(SerpPreview::render(&page).display_url, "/services/seo");
    }

    #[test]
    fn test_social_falls_back_to_global_defaults() {
        let page = PageSeoMetadata {
            title: "Local SEO".to_string(),
            ..PageSeoMetadata::default()
        };
        let global = GlobalSeoSettings {
            site_name: "Acme".to_string(),
            default_description: "We do SEO.".to_string(),
            default_og_image: "https://cdn.example.com/og.png".to_string(),
            ..GlobalSeoSettings::default()
        };

        let card = SocialPreview::render(&page, Some(&global));
        assert_eq!(card.site_name, "Acme");
        assert_eq!(card.description, "We do SEO.");
        assert_eq!(card.image.as_deref(), Some("https://cdn.example.com/og.png"));

        let bare = SocialPreview::render(&page, None);
        assert_eq!(bare.site_name, "");
        assert!(bare.image.is_none());
    }
}
