use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{PipelineError, Result};

/// Minimum rendered HTML length accepted as a real content page.
pub const DEFAULT_MIN_HTML_CHARS: usize = 4000;

/// Minimum unit count for categories without a configured expectation.
/// With 1 the fallback parser only runs when the primary parse is empty.
pub const DEFAULT_MIN_UNITS: usize = 1;

/// Known section count of the 1987 Constitution, rounded down.
pub const CONSTITUTION_1987_MIN_UNITS: usize = 150;

pub const DEFAULT_BATCH_CONCURRENCY: usize = 3;

pub const DEFAULT_BATCH_DELAY_MS: u64 = 1000;

pub const DEFAULT_API_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| PipelineError::Config("DATABASE_URL not set".into()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Limits applied by the orchestrator to fetched pages and parse results.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub min_html_chars: usize,
    /// Expected minimum unit count per session category.
    pub min_units: HashMap<String, usize>,
    pub default_min_units: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_html_chars: DEFAULT_MIN_HTML_CHARS,
            min_units: HashMap::from([(
                "constitution_1987".to_string(),
                CONSTITUTION_1987_MIN_UNITS,
            )]),
            default_min_units: DEFAULT_MIN_UNITS,
        }
    }
}

impl OrchestratorConfig {
    /// Load from `SCRAPE_MIN_HTML_CHARS` and `SCRAPE_MIN_UNITS`
    /// (`category=count` pairs separated by commas).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SCRAPE_MIN_HTML_CHARS") {
            config.min_html_chars = v
                .parse()
                .map_err(|_| PipelineError::Config(format!("invalid SCRAPE_MIN_HTML_CHARS: {v}")))?;
        }

        if let Ok(v) = std::env::var("SCRAPE_MIN_UNITS") {
            config.min_units = parse_min_units(&v)?;
        }

        Ok(config)
    }

    pub fn with_min_html_chars(mut self, min_html_chars: usize) -> Self {
        self.min_html_chars = min_html_chars;
        self
    }

    pub fn with_min_units(mut self, category: impl Into<String>, count: usize) -> Self {
        self.min_units.insert(category.into(), count);
        self
    }

    /// Unit count below which the fallback parser runs for `category`.
    pub fn min_units_for(&self, category: &str) -> usize {
        self.min_units
            .get(category)
            .copied()
            .unwrap_or(self.default_min_units)
    }
}

/// Parse `constitution_1987=150,acts=1` into a lookup table.
pub fn parse_min_units(raw: &str) -> Result<HashMap<String, usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (category, count) = pair
                .split_once('=')
                .ok_or_else(|| PipelineError::Config(format!("invalid SCRAPE_MIN_UNITS entry: {pair}")))?;
            let count = count
                .trim()
                .parse()
                .map_err(|_| PipelineError::Config(format!("invalid unit count in: {pair}")))?;
            Ok((category.trim().to_string(), count))
        })
        .collect()
}

/// Window size and pause for batched URL processing.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_CONCURRENCY,
            delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
        }
    }
}

impl BatchConfig {
    pub fn from_env() -> Self {
        let concurrency = std::env::var("SCRAPE_BATCH_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BATCH_CONCURRENCY);

        let delay_ms = std::env::var("SCRAPE_BATCH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BATCH_DELAY_MS);

        Self::new(concurrency, Duration::from_millis(delay_ms))
    }

    pub fn new(concurrency: usize, delay: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            delay,
        }
    }
}

/// Settings of the HTTP control surface.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("API_BIND_ADDR").unwrap_or_else(|_| DEFAULT_API_BIND_ADDR.into());
        let bind_addr = raw
            .parse()
            .map_err(|_| PipelineError::Config(format!("invalid API_BIND_ADDR: {raw}")))?;
        Ok(Self { bind_addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_min_units_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.min_units_for("constitution_1987"), 150);
        assert_eq!(config.min_units_for("acts"), 1);
        assert_eq!(config.min_html_chars, 4000);
    }

    #[test]
    fn test_parse_min_units() {
        let parsed = parse_min_units("constitution_1987=150, acts = 2,").unwrap();
        assert_eq!(parsed.get("constitution_1987"), Some(&150));
        assert_eq!(parsed.get("acts"), Some(&2));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_parse_min_units_rejects_garbage() {
        assert!(parse_min_units("constitution_1987").is_err());
        assert!(parse_min_units("acts=many").is_err());
    }

    #[test]
    fn test_batch_concurrency_is_at_least_one() {
        let config = BatchConfig::new(0, Duration::ZERO);
        assert_eq!(config.concurrency, 1);
    }
}
