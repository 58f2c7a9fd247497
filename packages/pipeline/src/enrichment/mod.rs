mod client;
mod config;
mod embedder;
mod enricher;
mod prompt;
mod types;

pub use client::{AnthropicClient, LlmClient, LlmRequest, LlmResponse, Message, Role};
#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockLlmClient;
pub use config::{EmbeddingConfig, EnrichmentConfig, EnrichmentConfigBuilder};
pub use embedder::{Embedder, HttpEmbedder};
#[cfg(any(test, feature = "test-utils"))]
pub use embedder::test_support::{MockEmbedder, MockEnricher};
pub use enricher::{extract_json_object, parse_enriched_fields, Enricher, LlmEnricher};
pub use types::{EnrichedFields, EntryDraft, TokenUsage};
