use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::enrichment::EnrichedFields;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[sqlx(type_name = "parse_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    Failed,
    FailedIncompleteHtml,
    FailedNoNodes,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[sqlx(type_name = "document_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    /// The fetched page itself.
    Raw,
    /// One legal unit parsed from a page.
    Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScrapingSession {
    pub id: Uuid,
    pub category: String,
    pub root_url: String,
    pub operator: String,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub category: String,
    pub root_url: String,
    pub operator: String,
}

impl NewSession {
    pub fn new(
        category: impl Into<String>,
        root_url: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            root_url: root_url.into(),
            operator: operator.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScrapedDocument {
    pub id: Uuid,
    pub session_id: Uuid,
    pub canonical_url: String,
    pub source_hash: String,
    pub kind: DocumentKind,
    pub extracted_text: String,
    pub metadata: Json<serde_json::Value>,
    pub sequence_index: i32,
    pub parse_status: ParseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document row to upsert.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub session_id: Uuid,
    pub canonical_url: String,
    pub source_hash: String,
    pub kind: DocumentKind,
    pub extracted_text: String,
    pub metadata: serde_json::Value,
    pub sequence_index: i32,
    pub parse_status: ParseStatus,
}

/// Number of documents of one kind and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentCount {
    pub kind: DocumentKind,
    pub parse_status: ParseStatus,
    pub count: i64,
}

/// Session status report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session: ScrapingSession,
    /// Page-level documents per parse status.
    pub counts: BTreeMap<ParseStatus, i64>,
    pub unit_count: i64,
}

impl SessionSummary {
    pub fn new(session: ScrapingSession, counts: &[DocumentCount]) -> Self {
        let mut by_status = BTreeMap::new();
        let mut unit_count = 0;
        for count in counts {
            match count.kind {
                DocumentKind::Raw => *by_status.entry(count.parse_status).or_insert(0) += count.count,
                DocumentKind::Unit => unit_count += count.count,
            }
        }
        Self {
            session,
            counts: by_status,
            unit_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeEntry {
    pub entry_id: String,
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub canonical_citation: String,
    pub title: String,
    pub entry_type: String,
    pub subtype: String,
    pub text: String,
    pub enrichment: Json<EnrichedFields>,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry row to upsert, keyed by `entry_id`.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub entry_id: String,
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub canonical_citation: String,
    pub title: String,
    pub entry_type: String,
    pub subtype: String,
    pub text: String,
    pub enrichment: EnrichedFields,
    pub embedding: Vec<f32>,
}
