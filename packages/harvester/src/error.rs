//! Error types for the harvester.
//!
//! `HarvesterError` is the single error type exposed to library consumers.
//! Parsers never fail: an unrecognizable page yields an empty unit list, so
//! every variant here belongs to fetching, URL handling, or output.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: '{0}'")]
    InvalidUrl(String),

    /// URL points outside the configured source domains.
    #[error("Domain '{host}' is not an allowed source (allowed: {})", .allowed.join(", "))]
    DisallowedDomain { host: String, allowed: Vec<String> },

    /// HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status code.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Unknown parser name.
    #[error("Unknown parser type: '{0}'. Expected 'constitution' or 'acts'")]
    UnknownParser(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),
}

impl HarvesterError {
    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
