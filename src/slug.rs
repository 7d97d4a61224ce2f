use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static REPEATED_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("static pattern"));

/// Characters a page path may not carry: whitespace, query and fragment markers
static FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s?#]").expect("static pattern"));

/// Normalised URL path used as the primary key of a page's SEO record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Parse and normalise a raw slug
    ///
    /// `services/seo/`, `/services//seo` and ` /services/seo ` all become
    /// `/services/seo`. The root stays `/`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || FORBIDDEN.is_match(trimmed) {
            return Err(Error::InvalidSlug(raw.to_string()));
        }

        let mut path = format!("/{}", trimmed);
        path = REPEATED_SLASHES.replace_all(&path, "/").into_owned();
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the site root
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
