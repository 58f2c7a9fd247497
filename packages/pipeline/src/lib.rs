pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod documents;
pub mod enrichment;
pub mod entries;
pub mod error;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod sessions;
pub mod source;
pub mod store;

pub use config::{BatchConfig, OrchestratorConfig, PipelineConfig};
pub use db::{connect_with_retry, create_pool, run_migrations};
pub use error::{PipelineError, Result};
pub use generator::{EntryGenerator, GenerationReport};
pub use models::{
    DocumentKind, KnowledgeEntry, ParseStatus, ScrapedDocument, ScrapingSession, SessionStatus,
    SessionSummary,
};
pub use orchestrator::{BatchItem, Orchestrator, ProcessOutcome};
pub use source::SourceFetcher;
pub use store::{PgStore, Store};
