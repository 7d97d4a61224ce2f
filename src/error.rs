use thiserror::Error;

/// Errors surfaced by the persistence clients, the autosave coordinator and
/// the editor shell
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure talking to the backend
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Backend answered 2xx but with `success: false`
    #[error("backend rejected request: {0}")]
    Backend(String),

    /// Body could not be encoded or decoded as the expected JSON
    #[error("malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),

    /// Manual save attempted while validation reports errors
    #[error("page has {errors} validation error(s)")]
    Invalid { errors: usize },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
