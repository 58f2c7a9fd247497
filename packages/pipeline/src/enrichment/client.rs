//! Chat-completion client used by [`LlmEnricher`](super::LlmEnricher).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::enrichment::config::EnrichmentConfig;
use crate::enrichment::types::TokenUsage;
use crate::error::{PipelineError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Attempts per request, counting the first.
const MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// Completion seam; tests substitute a scripted client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<TextBlock>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Deserialize)]
struct TextBlock {
    text: Option<String>,
}

/// Messages API client. Server errors, rate limits and transport failures
/// are retried with doubling delays; other statuses fail at once.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    retry_base_delay: Duration,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/v1/messages", config.api_base_url.trim_end_matches('/')),
            model: config.model.clone(),
            retry_base_delay: Duration::from_secs(1),
        })
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    async fn send(&self, body: &MessagesBody<'_>) -> Result<LlmResponse> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::LlmApiError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let reply: MessagesReply = resp
            .json()
            .await
            .map_err(|e| PipelineError::LlmResponseParse(e.to_string()))?;
        let content: String = reply.content.into_iter().filter_map(|b| b.text).collect();
        if content.trim().is_empty() {
            return Err(PipelineError::LlmEmptyResponse);
        }

        Ok(LlmResponse {
            content,
            usage: reply.usage,
        })
    }
}

/// `error.message` from an API error body, or the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn is_transient(error: &PipelineError) -> bool {
    match error {
        PipelineError::LlmApiRequest(_) => true,
        PipelineError::LlmApiError { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = MessagesBody {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
        };

        let mut attempt = 1;
        loop {
            match self.send(&body).await {
                Err(e) if is_transient(&e) && attempt < MAX_ATTEMPTS => {
                    let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Scripted client: answers in order, then reports an empty response.
    pub struct MockLlmClient {
        answers: Mutex<Vec<String>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl MockLlmClient {
        pub fn with_responses(answers: Vec<&str>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().map(str::to_string).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            let answer = self.answers.lock().ok().and_then(|mut a| a.pop());
            answer
                .map(|content| LlmResponse {
                    content,
                    usage: TokenUsage::default(),
                })
                .ok_or(PipelineError::LlmEmptyResponse)
        }
    }
}
