use crate::error::{PipelineError, Result};

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com";

/// Configuration for LLM-based enrichment.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub model: String,
    pub api_key: String,
    pub temperature: f64,
    pub api_base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl EnrichmentConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| PipelineError::Config("LLM_API_KEY not set".into()))?;

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let temperature = std::env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        let api_base_url =
            std::env::var("LLM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());

        let max_tokens = std::env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2048);

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        Ok(Self {
            model,
            api_key,
            temperature,
            api_base_url,
            max_tokens,
            timeout_secs,
        })
    }

    /// Create a config builder for testing.
    pub fn builder(api_key: impl Into<String>) -> EnrichmentConfigBuilder {
        EnrichmentConfigBuilder {
            config: EnrichmentConfig {
                model: DEFAULT_MODEL.into(),
                api_key: api_key.into(),
                temperature: 0.0,
                api_base_url: DEFAULT_API_BASE_URL.into(),
                max_tokens: 2048,
                timeout_secs: 120,
            },
        }
    }
}

/// Builder for constructing `EnrichmentConfig` in tests.
pub struct EnrichmentConfigBuilder {
    config: EnrichmentConfig,
}

impl EnrichmentConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.config.api_base_url = api_base_url.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    pub fn build(self) -> EnrichmentConfig {
        self.config
    }
}

/// Configuration for the embedding endpoint.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("EMBEDDING_API_KEY")
            .map_err(|_| PipelineError::Config("EMBEDDING_API_KEY not set".into()))?;

        let api_base_url = std::env::var("EMBEDDING_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_BASE_URL.into());

        let model =
            std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.into());

        let timeout_secs = std::env::var("EMBEDDING_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            api_key,
            api_base_url,
            model,
            timeout_secs,
        })
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: DEFAULT_EMBEDDING_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            timeout_secs: 60,
        }
    }

    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
