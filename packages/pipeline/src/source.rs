//! Async access to the blocking source fetcher.
//!
//! `reqwest::blocking::Client` owns a private runtime that panics when it is
//! dropped inside an async context. Each fetch therefore builds its client on
//! a blocking thread and drops it there; only the rate limiter is shared.

use std::sync::Arc;

use lawph_harvester::{FetchResult, Fetcher, FetcherConfig, RateLimiter};

use crate::error::Result;

/// Process-wide source fetcher. Clones share one rate limiter.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    config: Arc<FetcherConfig>,
    limiter: Arc<RateLimiter>,
}

impl SourceFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.min_interval));
        Self {
            config: Arc::new(config),
            limiter,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch with retries on a blocking thread.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult> {
        let config = FetcherConfig::clone(&self.config);
        let limiter = self.limiter.clone();
        let url = url.to_string();

        let fetched = tokio::task::spawn_blocking(move || {
            Fetcher::with_limiter(config, limiter)?.fetch_with_retry(&url)
        })
        .await??;
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;
    use lawph_harvester::HarvesterError;

    #[tokio::test]
    async fn test_fetch_from_async_context_keeps_runtime_alive() {
        let fetcher = SourceFetcher::new(FetcherConfig::default());
        let err = fetcher
            .fetch("https://example.com/page.html")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Harvester(HarvesterError::DisallowedDomain { .. })
        ));

        // The runtime is still usable after the client was dropped.
        let again = fetcher.clone().fetch("not a url").await.unwrap_err();
        assert!(matches!(again, PipelineError::Harvester(_)));
        drop(fetcher);
    }

    #[test]
    fn test_clones_share_one_limiter() {
        let fetcher = SourceFetcher::new(FetcherConfig::default());
        let clone = fetcher.clone();
        assert!(Arc::ptr_eq(&fetcher.limiter, &clone.limiter));
        assert_eq!(clone.config().max_retries, fetcher.config().max_retries);
    }
}
