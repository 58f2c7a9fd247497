use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::enrichment::config::EmbeddingConfig;
use crate::error::{PipelineError, Result};

/// Embedding collaborator. A failure is fatal for that entry only.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// Holds the API key, so `Debug` is not derived.
pub struct HttpEmbedder {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::LlmApiRequest)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.api_base_url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| PipelineError::Embedding("response contained no embedding".into()))?;

        if vector.is_empty() {
            return Err(PipelineError::Embedding("empty embedding vector".into()));
        }
        Ok(vector)
    }
}

/// Test doubles for the enrichment collaborators.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::enrichment::enricher::Enricher;
    use crate::enrichment::types::{EnrichedFields, EntryDraft};

    /// Enricher that summarizes from the draft and fails for chosen citations.
    #[derive(Default)]
    pub struct MockEnricher {
        failing: HashSet<String>,
        seen: Mutex<Vec<EntryDraft>>,
    }

    impl MockEnricher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_for(mut self, citation: impl Into<String>) -> Self {
            self.failing.insert(citation.into());
            self
        }

        /// Drafts received so far.
        pub fn seen(&self) -> Vec<EntryDraft> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Enricher for MockEnricher {
        async fn enrich(&self, draft: &EntryDraft) -> Result<EnrichedFields> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(draft.clone());
            }
            if self.failing.contains(&draft.canonical_citation) {
                return Err(PipelineError::Enrichment(format!(
                    "mock failure for {}",
                    draft.canonical_citation
                )));
            }
            Ok(EnrichedFields {
                summary: format!("Summary of {}", draft.canonical_citation),
                tags: vec![draft.subtype.clone()],
                ..Default::default()
            })
        }
    }

    /// Embedder returning a fixed-size vector derived from the text length.
    pub struct MockEmbedder {
        dimensions: usize,
        fail: bool,
    }

    impl MockEmbedder {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                dimensions: 0,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(PipelineError::Embedding("mock embedder unavailable".into()));
            }
            Ok(vec![text.len() as f32; self.dimensions])
        }
    }
}
