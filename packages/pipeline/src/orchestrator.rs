//! Scraping sessions: fetch, gate, persist, parse and store legal units.
//!
//! One `process_url` call runs to completion before returning. Every failure
//! after the canonical URL is known writes a failure marker for that URL
//! before the error reaches the caller.

use std::sync::{Arc, LazyLock};

use lawph_harvester::citation::{cite_units, CitedUnit};
use lawph_harvester::html::html_to_text;
use lawph_harvester::metadata::extract_structure;
use lawph_harvester::parsers::acts::parse_year_index;
use lawph_harvester::parsers::fallback::{merge_fallback, FallbackParser};
use lawph_harvester::{
    canonical_url, parser_for, FetchResult, LegalUnit, ParseInput, ParserKind, StructuralParser,
};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{BatchConfig, OrchestratorConfig};
use crate::error::{PipelineError, Result};
use crate::models::{
    DocumentKind, NewDocument, NewSession, ParseStatus, ScrapedDocument, ScrapingSession,
    SessionStatus, SessionSummary,
};
use crate::source::SourceFetcher;
use crate::store::Store;

/// Hash recorded on a failure marker when the page was never fetched.
pub const UNFETCHED_HASH: &str = "unfetched";

/// Visible text below which a page that redirects by script is a stub.
const REDIRECT_STUB_MAX_TEXT: usize = 500;

#[allow(clippy::expect_used)]
static FRAMESET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<frameset[\s>]").expect("valid regex"));

#[allow(clippy::expect_used)]
static META_REFRESH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?refresh"#).expect("valid regex")
});

#[allow(clippy::expect_used)]
static SCRIPT_REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(window\.|document\.)?location(\.href)?\s*=|location\.replace\s*\(")
        .expect("valid regex")
});

/// Why a fetched page was refused before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    TooShort { chars: usize, min: usize },
    Frameset,
    RedirectStub,
}

impl std::fmt::Display for GateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { chars, min } => {
                write!(f, "page has {chars} characters, expected at least {min}")
            }
            Self::Frameset => f.write_str("page is a frameset"),
            Self::RedirectStub => f.write_str("page is a client-side redirect stub"),
        }
    }
}

/// Refuse pages that cannot be the document they claim to be.
pub fn sanity_gate(html: &str, min_chars: usize) -> std::result::Result<(), GateRejection> {
    if FRAMESET_RE.is_match(html) {
        return Err(GateRejection::Frameset);
    }
    if META_REFRESH_RE.is_match(html) {
        return Err(GateRejection::RedirectStub);
    }
    if SCRIPT_REDIRECT_RE.is_match(html)
        && html_to_text(html).chars().count() < REDIRECT_STUB_MAX_TEXT
    {
        return Err(GateRejection::RedirectStub);
    }

    let chars = html.chars().count();
    if chars < min_chars {
        return Err(GateRejection::TooShort {
            chars,
            min: min_chars,
        });
    }
    Ok(())
}

/// Per-unit hash: units of one fetch stay separately addressable.
pub fn unit_hash(document_hash: &str, sequence_index: u32) -> String {
    let digest = Sha256::digest(format!("{document_hash}:{sequence_index}").as_bytes());
    format!("{digest:x}")
}

/// Parse status recorded on the failure marker for an error.
pub fn failure_status(error: &PipelineError) -> ParseStatus {
    match error {
        PipelineError::IncompleteHtml { .. } => ParseStatus::FailedIncompleteHtml,
        PipelineError::NoNodes(_) => ParseStatus::FailedNoNodes,
        _ => ParseStatus::Failed,
    }
}

/// Result of processing one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub canonical_url: String,
    pub content_hash: String,
    pub unit_count: usize,
    pub used_fallback: bool,
    /// Raw document row.
    pub document_id: Uuid,
}

/// Outcome of one URL inside a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProcessOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Units produced for one page, plus whether the fallback parser ran.
struct ParsedPage {
    units: Vec<LegalUnit>,
    used_fallback: bool,
    fallback_added: usize,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn Store>,
    fetcher: SourceFetcher,
    config: Arc<OrchestratorConfig>,
    batch: BatchConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, fetcher: SourceFetcher, config: OrchestratorConfig) -> Self {
        Self {
            store,
            fetcher,
            config: Arc::new(config),
            batch: BatchConfig::default(),
        }
    }

    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Create a session in the `running` state.
    pub async fn start_session(
        &self,
        category: &str,
        root_url: &str,
        operator: &str,
    ) -> Result<ScrapingSession> {
        if category.trim().is_empty() {
            return Err(PipelineError::InvalidInput("category must not be empty".into()));
        }
        if operator.trim().is_empty() {
            return Err(PipelineError::InvalidInput("operator must not be empty".into()));
        }
        let root = canonical_url(root_url)?;

        let session = self
            .store
            .create_session(&NewSession::new(category.trim(), root, operator.trim()))
            .await?;
        info!(session_id = %session.id, category = %session.category, "session started");
        Ok(session)
    }

    /// Fetch, gate, persist and parse one URL.
    #[tracing::instrument(skip(self, parser), fields(parser = %parser))]
    pub async fn process_url(
        &self,
        session_id: Uuid,
        url: &str,
        parser: ParserKind,
    ) -> Result<ProcessOutcome> {
        let session = self.running_session(session_id).await?;
        let canonical = canonical_url(url)?;

        let mut raw: Option<NewDocument> = None;
        match self.process_canonical(&session, &canonical, parser, &mut raw).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.write_failure_marker(&session, &canonical, parser, raw, &e)
                    .await;
                Err(e)
            }
        }
    }

    async fn process_canonical(
        &self,
        session: &ScrapingSession,
        canonical: &str,
        parser: ParserKind,
        raw: &mut Option<NewDocument>,
    ) -> Result<ProcessOutcome> {
        let fetched = self.fetcher.fetch(canonical).await?;

        let doc = {
            let html = fetched.html.clone();
            let meta = fetch_metadata(&fetched, parser);
            let session_id = session.id;
            let url = canonical.to_string();
            let hash = fetched.content_hash.clone();
            tokio::task::spawn_blocking(move || {
                let structure = extract_structure(&html);
                NewDocument {
                    session_id,
                    canonical_url: url,
                    source_hash: hash,
                    kind: DocumentKind::Raw,
                    extracted_text: html_to_text(&html),
                    metadata: with_structure(meta, &structure),
                    sequence_index: 0,
                    parse_status: ParseStatus::Parsed,
                }
            })
            .await?
        };
        *raw = Some(doc.clone());

        sanity_gate(&fetched.html, self.config.min_html_chars).map_err(|rejection| {
            PipelineError::IncompleteHtml {
                url: canonical.to_string(),
                reason: rejection.to_string(),
            }
        })?;

        let stored = self.store.upsert_document(&doc).await?;

        let min_units = self.config.min_units_for(&session.category);
        let page = {
            let html = fetched.html.clone();
            let url = canonical.to_string();
            tokio::task::spawn_blocking(move || parse_page(&url, &html, parser, min_units)).await?
        };

        if page.units.is_empty() {
            return Err(PipelineError::NoNodes(canonical.to_string()));
        }
        if page.used_fallback {
            info!(
                url = canonical,
                added = page.fallback_added,
                total = page.units.len(),
                "fallback parser filled gaps"
            );
        }

        for cited in cite_units(canonical, &page.units) {
            let unit_doc = unit_document(session.id, &fetched.content_hash, &cited)?;
            self.store.upsert_document(&unit_doc).await?;
        }

        info!(
            session_id = %session.id,
            url = canonical,
            units = page.units.len(),
            "document processed"
        );

        Ok(ProcessOutcome {
            canonical_url: canonical.to_string(),
            content_hash: fetched.content_hash,
            unit_count: page.units.len(),
            used_fallback: page.used_fallback,
            document_id: stored.id,
        })
    }

    /// Record the failure on the row for this content. Rows holding other
    /// content for the URL are kept. Marker write errors are logged only.
    async fn write_failure_marker(
        &self,
        session: &ScrapingSession,
        canonical: &str,
        parser: ParserKind,
        raw: Option<NewDocument>,
        error: &PipelineError,
    ) {
        let status = failure_status(error);
        let mut marker = raw.unwrap_or_else(|| NewDocument {
            session_id: session.id,
            canonical_url: canonical.to_string(),
            source_hash: UNFETCHED_HASH.to_string(),
            kind: DocumentKind::Raw,
            extracted_text: String::new(),
            metadata: serde_json::json!({ "parser": parser.as_str() }),
            sequence_index: 0,
            parse_status: status,
        });
        marker.parse_status = status;
        if let Some(obj) = marker.metadata.as_object_mut() {
            obj.insert("error".into(), serde_json::Value::String(error.to_string()));
        }

        warn!(
            session_id = %session.id,
            url = canonical,
            status = %status,
            error = %error,
            "processing failed"
        );

        if let Err(e) = self.store.record_failure(&marker).await {
            warn!(url = canonical, error = %e, "failed to write failure marker");
        }
    }

    /// `running -> completed`.
    pub async fn complete_session(&self, session_id: Uuid) -> Result<ScrapingSession> {
        self.finish(session_id, SessionStatus::Completed, None).await
    }

    /// `running -> failed`.
    pub async fn fail_session(&self, session_id: Uuid, reason: &str) -> Result<ScrapingSession> {
        self.finish(session_id, SessionStatus::Failed, Some(reason)).await
    }

    async fn finish(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        reason: Option<&str>,
    ) -> Result<ScrapingSession> {
        // Surface SessionNotFound before the conditional update.
        self.store.get_session(session_id).await?;
        self.store
            .finish_session(session_id, status, reason)
            .await?
            .ok_or(PipelineError::SessionNotRunning(session_id))
    }

    async fn running_session(&self, session_id: Uuid) -> Result<ScrapingSession> {
        let session = self.store.get_session(session_id).await?;
        if session.status != SessionStatus::Running {
            return Err(PipelineError::SessionNotRunning(session_id));
        }
        Ok(session)
    }

    pub async fn session_status(&self, session_id: Uuid) -> Result<SessionSummary> {
        let session = self.store.get_session(session_id).await?;
        let counts = self.store.document_counts(session_id).await?;
        Ok(SessionSummary::new(session, &counts))
    }

    pub async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<ScrapingSession>> {
        self.store.list_sessions(status).await
    }

    pub async fn session_documents(&self, session_id: Uuid) -> Result<Vec<ScrapedDocument>> {
        self.store.get_session(session_id).await?;
        self.store.session_documents(session_id).await
    }

    /// Process URLs in windows of `concurrency`, sleeping `delay` between windows.
    ///
    /// Items come back in input order; one URL failing does not stop the rest.
    pub async fn process_batch(
        &self,
        session_id: Uuid,
        urls: &[String],
        parser: ParserKind,
    ) -> Result<Vec<BatchItem>> {
        self.running_session(session_id).await?;

        let mut items: Vec<Option<BatchItem>> = vec![None; urls.len()];
        let windows = urls.chunks(self.batch.concurrency).enumerate();
        let window_count = urls.len().div_ceil(self.batch.concurrency);

        for (window, chunk) in windows {
            if window > 0 && !self.batch.delay.is_zero() {
                tokio::time::sleep(self.batch.delay).await;
            }

            let mut set = JoinSet::new();
            for (offset, url) in chunk.iter().enumerate() {
                let index = window * self.batch.concurrency + offset;
                let this = self.clone();
                let url = url.clone();
                set.spawn(async move {
                    let result = this.process_url(session_id, &url, parser).await;
                    (index, url, result)
                });
            }

            while let Some(joined) = set.join_next().await {
                let (index, url, result) = joined?;
                let item = match result {
                    Ok(outcome) => BatchItem {
                        url,
                        outcome: Some(outcome),
                        error: None,
                    },
                    Err(e) => BatchItem {
                        url,
                        outcome: None,
                        error: Some(e.to_string()),
                    },
                };
                if let Some(slot) = items.get_mut(index) {
                    *slot = Some(item);
                }
            }

            info!(session_id = %session_id, window = window + 1, of = window_count, "batch window done");
        }

        Ok(items.into_iter().flatten().collect())
    }

    /// Scrape every act listed on a year-index page.
    pub async fn process_year_index(
        &self,
        session_id: Uuid,
        index_url: &str,
    ) -> Result<Vec<BatchItem>> {
        self.running_session(session_id).await?;
        let canonical = canonical_url(index_url)?;

        let fetched = self.fetcher.fetch(&canonical).await?;
        let entries = {
            let url = canonical.clone();
            tokio::task::spawn_blocking(move || parse_year_index(&url, &fetched.html)).await?
        };
        if entries.is_empty() {
            return Err(PipelineError::NoNodes(canonical));
        }
        info!(url = %canonical, acts = entries.len(), "year index parsed");

        let urls: Vec<String> = entries.into_iter().map(|e| e.url).collect();
        self.process_batch(session_id, &urls, ParserKind::Acts).await
    }
}

fn parse_page(canonical: &str, html: &str, parser: ParserKind, min_units: usize) -> ParsedPage {
    let input = ParseInput::new(canonical, html);
    let primary = parser_for(parser).parse(input);

    if primary.len() >= min_units {
        return ParsedPage {
            units: primary,
            used_fallback: false,
            fallback_added: 0,
        };
    }

    let merged = merge_fallback(primary, FallbackParser.parse(input));
    ParsedPage {
        units: merged.units,
        used_fallback: true,
        fallback_added: merged.added,
    }
}

fn fetch_metadata(fetched: &FetchResult, parser: ParserKind) -> serde_json::Value {
    serde_json::json!({
        "parser": parser.as_str(),
        "requested_url": fetched.url,
        "status_code": fetched.status_code,
        "fetch_time_ms": fetched.fetch_time_ms,
    })
}

fn with_structure(
    mut meta: serde_json::Value,
    structure: &lawph_harvester::metadata::DocumentStructure,
) -> serde_json::Value {
    if let Some(obj) = meta.as_object_mut() {
        obj.insert("title".into(), serde_json::json!(structure.title));
        obj.insert("stats".into(), serde_json::json!(structure.stats));
        obj.insert("headings".into(), serde_json::json!(structure.headings));
        obj.insert("link_count".into(), serde_json::json!(structure.links.len()));
        obj.insert("table_count".into(), serde_json::json!(structure.tables.len()));
    }
    meta
}

fn unit_document(session_id: Uuid, document_hash: &str, cited: &CitedUnit<'_>) -> Result<NewDocument> {
    let unit = cited.unit;
    let sequence_index = i32::try_from(unit.sequence_index).map_err(|_| {
        PipelineError::InvalidInput(format!("sequence index {} out of range", unit.sequence_index))
    })?;

    let mut metadata = serde_json::to_value(&unit.metadata)?;
    if let Some(obj) = metadata.as_object_mut() {
        obj.insert("canonical_citation".into(), serde_json::json!(cited.citation));
        obj.insert("fragment".into(), serde_json::json!(cited.fragment));
        obj.insert("document_hash".into(), serde_json::json!(document_hash));
    }

    Ok(NewDocument {
        session_id,
        canonical_url: cited.url.clone(),
        source_hash: unit_hash(document_hash, unit.sequence_index),
        kind: DocumentKind::Unit,
        extracted_text: unit.extracted_text.clone(),
        metadata,
        sequence_index,
        parse_status: ParseStatus::Parsed,
    })
}
