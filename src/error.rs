use thiserror::Error;

/// Failures the scraper can hit. Fetch-side variants are isolated to the URL
/// that produced them; output-side variants surface at the CLI boundary.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("timeout fetching {0}")]
    TransportTimeout(String),

    #[error("transport error fetching {url}: {source}")]
    TransportError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    HttpNonSuccess { url: String, status: u16 },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("sitemap XML error: {0}")]
    Xml(String),
}

impl ScrapeError {
    /// Classify a reqwest failure into timeout vs. generic transport error.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::TransportTimeout(url.to_string())
        } else {
            ScrapeError::TransportError {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
