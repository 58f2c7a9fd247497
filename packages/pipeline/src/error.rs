use lawph_harvester::HarvesterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Harvester(#[from] HarvesterError),

    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("session {0} is not running")]
    SessionNotRunning(uuid::Uuid),

    #[error("incomplete HTML for {url}: {reason}")]
    IncompleteHtml { url: String, reason: String },

    #[error("no legal units found in {0}")]
    NoNodes(String),

    #[error("enrichment failed: {0}")]
    Enrichment(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("LLM API request failed: {0}")]
    LlmApiRequest(#[from] reqwest::Error),

    #[error("LLM API error (status {status}): {message}")]
    LlmApiError { status: u16, message: String },

    #[error("failed to parse LLM response: {0}")]
    LlmResponseParse(String),

    #[error("LLM returned empty response")]
    LlmEmptyResponse,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Whether the error describes the input (URL, page, request) rather
    /// than a failure of the pipeline itself.
    pub fn is_unprocessable(&self) -> bool {
        match self {
            Self::IncompleteHtml { .. } | Self::NoNodes(_) | Self::InvalidInput(_) => true,
            Self::Harvester(e) => matches!(
                e,
                HarvesterError::InvalidUrl(_)
                    | HarvesterError::DisallowedDomain { .. }
                    | HarvesterError::HttpStatus { .. }
                    | HarvesterError::UnknownParser(_)
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
