//! Persistence seam used by the orchestrator and the entry generator.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::documents;
use crate::entries;
use crate::error::Result;
use crate::models::{
    DocumentCount, KnowledgeEntry, NewDocument, NewEntry, NewSession, ScrapedDocument,
    ScrapingSession, SessionStatus,
};
use crate::sessions;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_session(&self, req: &NewSession) -> Result<ScrapingSession>;

    /// Fails with `SessionNotFound` for an unknown ID.
    async fn get_session(&self, session_id: Uuid) -> Result<ScrapingSession>;

    /// Move a running session to `status`; `None` if it was not running.
    async fn finish_session(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        error: Option<&str>,
    ) -> Result<Option<ScrapingSession>>;

    /// Sessions newest first, optionally filtered by status.
    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<ScrapingSession>>;

    async fn upsert_document(&self, doc: &NewDocument) -> Result<ScrapedDocument>;

    /// Write a failure marker onto the row with the marker's exact hash only.
    async fn record_failure(&self, marker: &NewDocument) -> Result<ScrapedDocument>;

    async fn session_documents(&self, session_id: Uuid) -> Result<Vec<ScrapedDocument>>;

    async fn document_counts(&self, session_id: Uuid) -> Result<Vec<DocumentCount>>;

    async fn upsert_entry(&self, entry: &NewEntry) -> Result<KnowledgeEntry>;

    async fn session_entries(&self, session_id: Uuid) -> Result<Vec<KnowledgeEntry>>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_session(&self, req: &NewSession) -> Result<ScrapingSession> {
        sessions::create_session(&self.pool, req).await
    }

    async fn get_session(&self, session_id: Uuid) -> Result<ScrapingSession> {
        sessions::get_session(&self.pool, session_id).await
    }

    async fn finish_session(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        error: Option<&str>,
    ) -> Result<Option<ScrapingSession>> {
        sessions::finish_session(&self.pool, session_id, status, error).await
    }

    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<ScrapingSession>> {
        sessions::list_sessions(&self.pool, status).await
    }

    async fn upsert_document(&self, doc: &NewDocument) -> Result<ScrapedDocument> {
        documents::upsert_document(&self.pool, doc).await
    }

    async fn record_failure(&self, marker: &NewDocument) -> Result<ScrapedDocument> {
        documents::record_failure(&self.pool, marker).await
    }

    async fn session_documents(&self, session_id: Uuid) -> Result<Vec<ScrapedDocument>> {
        documents::session_documents(&self.pool, session_id).await
    }

    async fn document_counts(&self, session_id: Uuid) -> Result<Vec<DocumentCount>> {
        documents::document_counts(&self.pool, session_id).await
    }

    async fn upsert_entry(&self, entry: &NewEntry) -> Result<KnowledgeEntry> {
        entries::upsert_entry(&self.pool, entry).await
    }

    async fn session_entries(&self, session_id: Uuid) -> Result<Vec<KnowledgeEntry>> {
        entries::session_entries(&self.pool, session_id).await
    }
}

/// Test utilities for the store.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, MutexGuard};

    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;
    use crate::error::PipelineError;
    use crate::models::{DocumentKind, ParseStatus};

    #[derive(Default)]
    struct Inner {
        sessions: HashMap<Uuid, ScrapingSession>,
        documents: Vec<ScrapedDocument>,
        entries: BTreeMap<String, KnowledgeEntry>,
    }

    impl Inner {
        fn exact(&mut self, url: &str, hash: &str) -> Option<&mut ScrapedDocument> {
            self.documents
                .iter_mut()
                .find(|d| d.canonical_url == url && d.source_hash == hash)
        }

        /// Row an upsert updates: exact hash, else the newest parsed row, else the newest.
        fn upsert_target(&mut self, url: &str, hash: &str) -> Option<&mut ScrapedDocument> {
            self.documents
                .iter_mut()
                .filter(|d| d.canonical_url == url)
                .max_by_key(|d| {
                    (
                        d.source_hash == hash,
                        d.parse_status == ParseStatus::Parsed,
                        d.updated_at,
                    )
                })
        }

        fn insert(&mut self, doc: &NewDocument) -> ScrapedDocument {
            let now = Utc::now();
            let stored = ScrapedDocument {
                id: Uuid::new_v4(),
                session_id: doc.session_id,
                canonical_url: doc.canonical_url.clone(),
                source_hash: doc.source_hash.clone(),
                kind: doc.kind,
                extracted_text: doc.extracted_text.clone(),
                metadata: Json(doc.metadata.clone()),
                sequence_index: doc.sequence_index,
                parse_status: doc.parse_status,
                created_at: now,
                updated_at: now,
            };
            self.documents.push(stored.clone());
            stored
        }
    }

    /// In-memory store with the same upsert rules as the Postgres schema.
    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
        fail_unit_writes: AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every upsert of a `unit` document fail.
        pub fn fail_unit_writes(&self, fail: bool) {
            self.fail_unit_writes.store(fail, Ordering::SeqCst);
        }

        /// Total number of stored documents across sessions.
        pub fn document_total(&self) -> usize {
            self.inner.lock().map(|i| i.documents.len()).unwrap_or(0)
        }

        fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
            self.inner
                .lock()
                .map_err(|e| PipelineError::InvalidInput(format!("memory store lock poisoned: {e}")))
        }
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn create_session(&self, req: &NewSession) -> Result<ScrapingSession> {
            let session = ScrapingSession {
                id: Uuid::new_v4(),
                category: req.category.clone(),
                root_url: req.root_url.clone(),
                operator: req.operator.clone(),
                status: SessionStatus::Running,
                error: None,
                started_at: Utc::now(),
                finished_at: None,
            };
            self.lock()?.sessions.insert(session.id, session.clone());
            Ok(session)
        }

        async fn get_session(&self, session_id: Uuid) -> Result<ScrapingSession> {
            self.lock()?
                .sessions
                .get(&session_id)
                .cloned()
                .ok_or(PipelineError::SessionNotFound(session_id))
        }

        async fn finish_session(
            &self,
            session_id: Uuid,
            status: SessionStatus,
            error: Option<&str>,
        ) -> Result<Option<ScrapingSession>> {
            let mut inner = self.lock()?;
            let Some(session) = inner
                .sessions
                .get_mut(&session_id)
                .filter(|s| s.status == SessionStatus::Running)
            else {
                return Ok(None);
            };
            session.status = status;
            session.error = error.map(str::to_string);
            session.finished_at = Some(Utc::now());
            Ok(Some(session.clone()))
        }

        async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<ScrapingSession>> {
            let mut sessions: Vec<_> = self
                .lock()?
                .sessions
                .values()
                .filter(|s| status.is_none_or(|wanted| s.status == wanted))
                .cloned()
                .collect();
            sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            Ok(sessions)
        }

        async fn upsert_document(&self, doc: &NewDocument) -> Result<ScrapedDocument> {
            if doc.kind == DocumentKind::Unit && self.fail_unit_writes.load(Ordering::SeqCst) {
                return Err(PipelineError::InvalidInput("unit writes disabled".into()));
            }

            let mut inner = self.lock()?;
            if let Some(existing) = inner.upsert_target(&doc.canonical_url, &doc.source_hash) {
                existing.session_id = doc.session_id;
                existing.source_hash = doc.source_hash.clone();
                existing.kind = doc.kind;
                existing.extracted_text = doc.extracted_text.clone();
                existing.metadata = Json(doc.metadata.clone());
                existing.sequence_index = doc.sequence_index;
                existing.parse_status = doc.parse_status;
                existing.updated_at = Utc::now();
                return Ok(existing.clone());
            }
            Ok(inner.insert(doc))
        }

        async fn record_failure(&self, marker: &NewDocument) -> Result<ScrapedDocument> {
            let mut inner = self.lock()?;
            if let Some(existing) = inner.exact(&marker.canonical_url, &marker.source_hash) {
                existing.session_id = marker.session_id;
                existing.metadata = Json(marker.metadata.clone());
                existing.parse_status = marker.parse_status;
                existing.updated_at = Utc::now();
                return Ok(existing.clone());
            }
            Ok(inner.insert(marker))
        }

        async fn session_documents(&self, session_id: Uuid) -> Result<Vec<ScrapedDocument>> {
            let mut docs: Vec<_> = self
                .lock()?
                .documents
                .iter()
                .filter(|d| d.session_id == session_id)
                .cloned()
                .collect();
            docs.sort_by(|a, b| {
                a.canonical_url
                    .cmp(&b.canonical_url)
                    .then(a.sequence_index.cmp(&b.sequence_index))
            });
            Ok(docs)
        }

        async fn document_counts(&self, session_id: Uuid) -> Result<Vec<DocumentCount>> {
            let mut counts: BTreeMap<_, i64> = BTreeMap::new();
            for doc in self.lock()?.documents.iter().filter(|d| d.session_id == session_id) {
                *counts.entry((doc.kind, doc.parse_status)).or_insert(0) += 1;
            }
            Ok(counts
                .into_iter()
                .map(|((kind, parse_status), count)| DocumentCount {
                    kind,
                    parse_status,
                    count,
                })
                .collect())
        }

        async fn upsert_entry(&self, entry: &NewEntry) -> Result<KnowledgeEntry> {
            let mut inner = self.lock()?;
            let now = Utc::now();
            let created_at = inner
                .entries
                .get(&entry.entry_id)
                .map_or(now, |e| e.created_at);

            let stored = KnowledgeEntry {
                entry_id: entry.entry_id.clone(),
                session_id: entry.session_id,
                document_id: entry.document_id,
                canonical_citation: entry.canonical_citation.clone(),
                title: entry.title.clone(),
                entry_type: entry.entry_type.clone(),
                subtype: entry.subtype.clone(),
                text: entry.text.clone(),
                enrichment: Json(entry.enrichment.clone()),
                embedding: entry.embedding.clone(),
                created_at,
                updated_at: now,
            };
            inner.entries.insert(stored.entry_id.clone(), stored.clone());
            Ok(stored)
        }

        async fn session_entries(&self, session_id: Uuid) -> Result<Vec<KnowledgeEntry>> {
            let mut entries: Vec<_> = self
                .lock()?
                .entries
                .values()
                .filter(|e| e.session_id == session_id)
                .cloned()
                .collect();
            entries.sort_by(|a, b| a.canonical_citation.cmp(&b.canonical_citation));
            Ok(entries)
        }
    }
}
