use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::enrichment::client::{LlmClient, LlmRequest, Message};
use crate::enrichment::config::EnrichmentConfig;
use crate::enrichment::prompt;
use crate::enrichment::types::{EnrichedFields, EntryDraft, TokenUsage};
use crate::error::{PipelineError, Result};

/// Answers tried per entry before giving up on an unreadable response.
const MAX_ATTEMPTS: u32 = 2;

/// Enrichment collaborator. A failure is fatal for that entry only.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, draft: &EntryDraft) -> Result<EnrichedFields>;
}

/// Enricher backed by a chat-completion model.
pub struct LlmEnricher<C: LlmClient> {
    client: C,
    config: EnrichmentConfig,
}

impl<C: LlmClient> LlmEnricher<C> {
    pub fn new(client: C, config: EnrichmentConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl<C: LlmClient> Enricher for LlmEnricher<C> {
    async fn enrich(&self, draft: &EntryDraft) -> Result<EnrichedFields> {
        info!(citation = %draft.canonical_citation, "enriching entry");

        let system = prompt::build_system_prompt().to_string();
        let mut messages = vec![Message::user(prompt::build_enrichment_prompt(draft))];
        let mut usage = TokenUsage::default();
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            let request = LlmRequest {
                system: system.clone(),
                messages: messages.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };

            let response = self.client.complete(&request).await?;
            usage.add(&response.usage);

            match parse_enriched_fields(&response.content) {
                Ok(fields) => {
                    debug!(
                        citation = %draft.canonical_citation,
                        attempt,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "entry enriched"
                    );
                    return Ok(fields);
                }
                Err(e) => {
                    warn!(citation = %draft.canonical_citation, attempt, error = %e, "unreadable enrichment answer");
                    last_error = e.to_string();
                    messages.push(Message::assistant(response.content));
                    messages.push(Message::user(prompt::build_fix_prompt(&last_error)));
                }
            }
        }

        Err(PipelineError::Enrichment(format!(
            "{}: {last_error}",
            draft.canonical_citation
        )))
    }
}

/// Parse the enrichment answer. An empty summary is rejected.
pub fn parse_enriched_fields(response: &str) -> Result<EnrichedFields> {
    let json = extract_json_object(response)
        .ok_or_else(|| PipelineError::LlmResponseParse("no JSON object found".into()))?;

    let fields: EnrichedFields = serde_json::from_str(json)
        .map_err(|e| PipelineError::LlmResponseParse(e.to_string()))?;

    if fields.summary.trim().is_empty() {
        return Err(PipelineError::LlmResponseParse("empty summary".into()));
    }
    Ok(fields)
}

/// Find the first balanced JSON object in an LLM response.
///
/// Fenced blocks are searched first, preferring one that opens with `{`.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let blocks = extract_fenced_blocks(response);

    let preferred = blocks
        .iter()
        .find(|b| b.trim_start().starts_with('{'))
        .or_else(|| blocks.last())
        .copied();

    preferred
        .and_then(balanced_object)
        .or_else(|| balanced_object(response))
}

/// Extract all fenced code blocks from text.
fn extract_fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find("```") {
        let after_fence = &remaining[start + 3..];
        // Skip optional language identifier on the same line
        let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        if let Some(end) = content.find("```") {
            blocks.push(&content[..end]);
            remaining = &content[end + 3..];
        } else {
            break;
        }
    }

    blocks
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
