//! Rate-limited, retrying HTTP client for the legal-document source.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use sha2::{Digest, Sha256};

use crate::config::{validate_source_url, FetcherConfig};
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester and a contact point.
const USER_AGENT: &str = concat!(
    "lawph-harvester/",
    env!("CARGO_PKG_VERSION"),
    " (legal knowledge base indexer; +https://github.com/lawph/lawph-kb)"
);

/// A fetched page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested.
    pub url: String,
    /// Raw body decoded as text.
    pub html: String,
    /// Lowercase hex SHA-256 of the body.
    pub content_hash: String,
    pub status_code: u16,
    pub fetch_time_ms: u64,
}

/// Fixed-rate limiter: enforces a minimum interval between request starts.
///
/// The lock is held while sleeping, so concurrent callers are released one
/// interval apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Block until the next request may be issued.
    pub fn wait(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(previous) = *last {
            let wait = self.min_interval.saturating_sub(previous.elapsed());
            if !wait.is_zero() {
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limiting request");
                thread::sleep(wait);
            }
        }

        *last = Some(Instant::now());
    }
}

/// Blocking HTTP fetcher for the source site.
///
/// Clones share the HTTP connection pool and the rate limiter. The blocking
/// client owns an internal runtime, so async callers must build and drop a
/// `Fetcher` on a blocking thread.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher with its own rate limiter.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.min_interval));
        Self::with_limiter(config, limiter)
    }

    /// Create a fetcher that paces its requests with an existing limiter.
    pub fn with_limiter(config: FetcherConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            limiter,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch a URL once.
    ///
    /// Non-2xx responses are returned as [`HarvesterError::HttpStatus`].
    pub fn fetch(&self, url: &str) -> Result<FetchResult> {
        validate_source_url(url, &self.config.allowed_domains)?;

        self.limiter.wait();
        let started = Instant::now();

        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvesterError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes()?;
        let html = bytes_to_string(&bytes, url);
        let fetch_time_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(url, status = status.as_u16(), fetch_time_ms, bytes = bytes.len(), "Fetched page");

        Ok(FetchResult {
            url: url.to_string(),
            content_hash: content_hash(&html),
            html,
            status_code: status.as_u16(),
            fetch_time_ms,
        })
    }

    /// Fetch a URL, retrying transient failures with exponential backoff.
    ///
    /// Delays are `base * 2^(retry - 1)`: with the defaults 1s, then 2s. The
    /// last error is returned once all attempts are used.
    pub fn fetch_with_retry(&self, url: &str) -> Result<FetchResult> {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch(url) {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    tracing::warn!(
                        url,
                        error = %e,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, will retry"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.saturating_sub(1).min(16))
}

/// SHA-256 of a document body, hex encoded.
///
/// # Examples
/// ```
/// use lawph_harvester::http::content_hash;
///
/// assert_eq!(
///     content_hash(""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn content_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    format!("{digest:x}")
}

/// Decode a response body, replacing invalid UTF-8 sequences.
pub fn bytes_to_string(bytes: &[u8], context: &str) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            tracing::warn!(
                context,
                error = %e,
                "Response body is not valid UTF-8, decoding lossily"
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fetcher() {
        assert!(Fetcher::new(FetcherConfig::default()).is_ok());
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(2000));
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        assert_eq!(content_hash("<html>a</html>"), content_hash("<html>a</html>"));
        assert_ne!(content_hash("<html>a</html>"), content_hash("<html>b</html>"));
        assert_eq!(content_hash("x").len(), 64);
    }

    #[test]
    fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let started = Instant::now();
        limiter.wait();
        limiter.wait();
        limiter.wait();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_rate_limiter_first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let started = Instant::now();
        limiter.wait();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_fetchers_share_a_limiter() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(50)));
        let first = Fetcher::with_limiter(FetcherConfig::default(), limiter.clone()).unwrap();
        let second = Fetcher::with_limiter(FetcherConfig::default(), limiter.clone()).unwrap();
        assert_eq!(Arc::strong_count(&limiter), 3);

        let started = Instant::now();
        first.limiter.wait();
        second.limiter.wait();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_fetch_rejects_foreign_domain_without_network() {
        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher.fetch("https://example.com/page.html").unwrap_err();
        assert!(matches!(err, HarvesterError::DisallowedDomain { .. }));
    }

    #[test]
    fn test_bytes_to_string_lossy() {
        assert_eq!(bytes_to_string(b"hello", "test"), "hello");
        let decoded = bytes_to_string(&[0x66, 0x6f, 0xff, 0x6f], "test");
        assert!(decoded.starts_with("fo"));
    }
}
