//! Configuration constants, fetcher settings, and URL handling.

use std::time::Duration;

use url::Url;

use crate::error::{HarvesterError, Result};

/// Domains the fetcher is allowed to contact by default.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["lawphil.net", "www.lawphil.net"];

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Minimum delay between two outgoing requests, process-wide (milliseconds).
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;

/// Maximum number of attempts for one URL, including the first.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Settings for [`crate::http::Fetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub min_interval: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub timeout: Duration,
    pub allowed_domains: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl FetcherConfig {
    /// Load settings from `FETCH_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let min_interval = env_millis("FETCH_MIN_INTERVAL_MS").unwrap_or(defaults.min_interval);
        let retry_base_delay =
            env_millis("FETCH_RETRY_BASE_DELAY_MS").unwrap_or(defaults.retry_base_delay);

        let max_retries = std::env::var("FETCH_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        let timeout = std::env::var("FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let allowed_domains = std::env::var("FETCH_ALLOWED_DOMAINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|d| d.trim().to_lowercase())
                    .filter(|d| !d.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|d| !d.is_empty())
            .unwrap_or(defaults.allowed_domains);

        Self {
            min_interval,
            max_retries,
            retry_base_delay,
            timeout,
            allowed_domains,
        }
    }

    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    #[must_use]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_allowed_domains(
        mut self,
        domains: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

/// Parse a URL and check it targets one of the allowed source domains.
///
/// Subdomains of an allowed domain are accepted.
///
/// # Examples
/// ```
/// use lawph_harvester::config::validate_source_url;
///
/// let allowed = vec!["lawphil.net".to_string()];
/// assert!(validate_source_url("https://lawphil.net/consti/cons1987.html", &allowed).is_ok());
/// assert!(validate_source_url("https://example.com/", &allowed).is_err());
/// ```
pub fn validate_source_url(url: &str, allowed_domains: &[String]) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| HarvesterError::InvalidUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(HarvesterError::InvalidUrl(url.to_string()));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| HarvesterError::InvalidUrl(url.to_string()))?
        .to_lowercase();

    let allowed = allowed_domains.iter().any(|domain| {
        let domain = domain.to_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    });

    if allowed {
        Ok(parsed)
    } else {
        Err(HarvesterError::DisallowedDomain {
            host,
            allowed: allowed_domains.to_vec(),
        })
    }
}

/// Compute the canonical form of a document URL, used as the dedup key.
///
/// Drops the fragment and the default port, lowercases scheme and host, and
/// removes a trailing slash from non-root paths. The query string is kept.
///
/// # Examples
/// ```
/// use lawph_harvester::config::canonical_url;
///
/// assert_eq!(
///     canonical_url("HTTPS://LawPhil.net:443/consti/cons1987.html#art3").unwrap(),
///     "https://lawphil.net/consti/cons1987.html"
/// );
/// ```
pub fn canonical_url(url: &str) -> Result<String> {
    let mut parsed = Url::parse(url.trim()).map_err(|_| HarvesterError::InvalidUrl(url.to_string()))?;
    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    Ok(parsed.to_string())
}

/// Sanitize a URL fragment identifier by removing problematic characters.
///
/// # Examples
/// ```
/// use lawph_harvester::config::sanitize_fragment;
///
/// assert_eq!(sanitize_fragment("article-3-section-1"), "article-3-section-1");
/// assert_eq!(sanitize_fragment("section 4<b>"), "section4b");
/// ```
pub fn sanitize_fragment(fragment: &str) -> String {
    fragment
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.' || *c == '~')
        .collect()
}

/// Build the fragment-qualified URL of a sub-unit.
pub fn unit_url(canonical: &str, fragment: &str) -> String {
    format!("{canonical}#{}", sanitize_fragment(fragment))
}
