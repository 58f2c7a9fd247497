//! Publish parsed units as enriched, embedded knowledge entries.

use std::sync::Arc;

use lawph_harvester::{canonical_citation, citation_slug, UnitKind, UnitMetadata};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::enrichment::{
    AnthropicClient, EmbeddingConfig, Embedder, EnrichedFields, Enricher, EnrichmentConfig,
    EntryDraft, HttpEmbedder, LlmEnricher,
};
use crate::error::{PipelineError, Result};
use crate::models::{DocumentKind, NewEntry, ParseStatus, ScrapedDocument};
use crate::store::Store;

/// A unit that could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    pub document_id: Uuid,
    pub canonical_citation: String,
    pub error: String,
}

/// Result of one generation pass over a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub session_id: Uuid,
    /// Entry IDs published, in document order.
    pub generated: Vec<String>,
    pub failed: Vec<GenerationFailure>,
}

#[derive(Clone)]
pub struct EntryGenerator {
    store: Arc<dyn Store>,
    enricher: Arc<dyn Enricher>,
    embedder: Arc<dyn Embedder>,
}

impl EntryGenerator {
    pub fn new(store: Arc<dyn Store>, enricher: Arc<dyn Enricher>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            enricher,
            embedder,
        }
    }

    /// Build the LLM enricher and HTTP embedder from the environment.
    pub fn from_env(store: Arc<dyn Store>) -> Result<Self> {
        let enrichment = EnrichmentConfig::from_env()?;
        let embedding = EmbeddingConfig::from_env()?;

        let client = AnthropicClient::new(&enrichment)?;
        let enricher = LlmEnricher::new(client, enrichment);
        let embedder = HttpEmbedder::new(&embedding)?;

        Ok(Self::new(store, Arc::new(enricher), Arc::new(embedder)))
    }

    /// Enrich, embed and publish every parsed unit of a session.
    ///
    /// A unit whose enrichment or embedding fails is reported and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn generate_for_session(&self, session_id: Uuid) -> Result<GenerationReport> {
        self.store.get_session(session_id).await?;
        let documents = self.store.session_documents(session_id).await?;

        let mut report = GenerationReport {
            session_id,
            ..Default::default()
        };

        for doc in documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Unit && d.parse_status == ParseStatus::Parsed)
        {
            let draft = match entry_draft(doc) {
                Ok(draft) => draft,
                Err(e) => {
                    warn!(document_id = %doc.id, error = %e, "unit metadata unreadable");
                    report.failed.push(GenerationFailure {
                        document_id: doc.id,
                        canonical_citation: stored_citation(doc),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match self.publish(session_id, doc, &draft).await {
                Ok(entry_id) => report.generated.push(entry_id),
                Err(e) => {
                    warn!(citation = %draft.canonical_citation, error = %e, "entry not published");
                    report.failed.push(GenerationFailure {
                        document_id: doc.id,
                        canonical_citation: draft.canonical_citation,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            session_id = %session_id,
            generated = report.generated.len(),
            failed = report.failed.len(),
            "entry generation finished"
        );
        Ok(report)
    }

    async fn publish(&self, session_id: Uuid, doc: &ScrapedDocument, draft: &EntryDraft) -> Result<String> {
        let enrichment = self.enricher.enrich(draft).await?;
        let embedding = self.embedder.embed(&embedding_input(draft, &enrichment)).await?;

        let entry = self
            .store
            .upsert_entry(&NewEntry {
                entry_id: citation_slug(&draft.canonical_citation),
                session_id,
                document_id: doc.id,
                canonical_citation: draft.canonical_citation.clone(),
                title: draft.title.clone(),
                entry_type: draft.entry_type.clone(),
                subtype: draft.subtype.clone(),
                text: draft.text.clone(),
                enrichment,
                embedding,
            })
            .await?;
        Ok(entry.entry_id)
    }
}

/// Build the enrichment input for a stored unit.
///
/// The citation is recomputed from the stored metadata.
pub fn entry_draft(doc: &ScrapedDocument) -> Result<EntryDraft> {
    let metadata: UnitMetadata = serde_json::from_value(doc.metadata.0.clone())?;
    let citation = canonical_citation(&metadata);

    let (entry_type, subtype) = if metadata.kind.is_constitutional() {
        ("constitution", metadata.kind.as_str().to_string())
    } else {
        let subtype = metadata
            .act
            .as_ref()
            .map(|act| act.act_type.as_str().to_string())
            .unwrap_or_else(|| metadata.kind.as_str().to_string());
        ("statute", subtype)
    };

    if doc.extracted_text.trim().is_empty() {
        return Err(PipelineError::InvalidInput(format!("{citation} has no text")));
    }

    Ok(EntryDraft {
        title: unit_title(&metadata, &citation),
        text: doc.extracted_text.clone(),
        canonical_citation: citation,
        entry_type: entry_type.to_string(),
        subtype,
    })
}

fn unit_title(metadata: &UnitMetadata, citation: &str) -> String {
    if let Some(title) = metadata.title.as_deref().filter(|t| !t.trim().is_empty()) {
        return title.to_string();
    }
    match metadata.kind {
        UnitKind::Preamble => "Preamble".to_string(),
        _ => citation.to_string(),
    }
}

fn stored_citation(doc: &ScrapedDocument) -> String {
    doc.metadata
        .0
        .get("canonical_citation")
        .and_then(|v| v.as_str())
        .unwrap_or(&doc.canonical_url)
        .to_string()
}

fn embedding_input(draft: &EntryDraft, enrichment: &EnrichedFields) -> String {
    format!(
        "{}\n{}\n\n{}",
        draft.canonical_citation, enrichment.summary, draft.text
    )
}
