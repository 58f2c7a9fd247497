use serde::{Deserialize, Serialize};

/// A legal unit prepared for enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub title: String,
    pub text: String,
    pub canonical_citation: String,
    /// `constitution` or `statute`.
    #[serde(rename = "type")]
    pub entry_type: String,
    pub subtype: String,
}

/// Fields produced by the enrichment collaborator.
///
/// Unknown keys in the model's answer are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub jurisprudence: Vec<String>,
    #[serde(default)]
    pub related_laws: Vec<String>,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default)]
    pub penalties: Vec<String>,
    #[serde(default)]
    pub defenses: Vec<String>,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token usage tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
