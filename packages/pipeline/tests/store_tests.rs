mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use common::TestDb;
use lawph_pipeline::enrichment::EnrichedFields;
use lawph_pipeline::models::{
    DocumentKind, NewDocument, NewEntry, NewSession, ParseStatus, SessionStatus,
};
use lawph_pipeline::store::{PgStore, Store};
use lawph_pipeline::{documents, entries, sessions, PipelineError};

const PAGE: &str = "https://lawphil.net/consti/cons1987.html";

fn raw_doc(session_id: Uuid, hash: &str, text: &str) -> NewDocument {
    NewDocument {
        session_id,
        canonical_url: PAGE.to_string(),
        source_hash: hash.to_string(),
        kind: DocumentKind::Raw,
        extracted_text: text.to_string(),
        metadata: json!({"parser": "constitution"}),
        sequence_index: 0,
        parse_status: ParseStatus::Parsed,
    }
}

fn unit_doc(session_id: Uuid, fragment: &str, seq: i32) -> NewDocument {
    NewDocument {
        session_id,
        canonical_url: format!("{PAGE}#{fragment}"),
        source_hash: format!("unit-{seq}"),
        kind: DocumentKind::Unit,
        extracted_text: format!("text of {fragment}"),
        metadata: json!({"kind": "section"}),
        sequence_index: seq,
        parse_status: ParseStatus::Parsed,
    }
}

async fn new_session(db: &TestDb) -> Uuid {
    sessions::create_session(
        &db.pool,
        &NewSession::new("constitution_1987", PAGE, "tester"),
    )
    .await
    .unwrap()
    .id
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_create_and_get_session() {
    let db = TestDb::new().await;
    let id = new_session(&db).await;

    let session = sessions::get_session(&db.pool, id).await.unwrap();
    assert_eq!(session.category, "constitution_1987");
    assert_eq!(session.operator, "tester");
    assert_eq!(session.status, SessionStatus::Running);
    assert!(session.finished_at.is_none());
}

#[tokio::test]
async fn test_get_unknown_session() {
    let db = TestDb::new().await;
    let err = sessions::get_session(&db.pool, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, PipelineError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_finish_session_only_once() {
    let db = TestDb::new().await;
    let id = new_session(&db).await;

    let failed = sessions::finish_session(&db.pool, id, SessionStatus::Failed, Some("fetch error"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, SessionStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("fetch error"));
    assert!(failed.finished_at.is_some());

    let again = sessions::finish_session(&db.pool, id, SessionStatus::Completed, None)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(
        sessions::get_session(&db.pool, id).await.unwrap().status,
        SessionStatus::Failed
    );
}

#[tokio::test]
async fn test_finish_session_rejects_running() {
    let db = TestDb::new().await;
    let id = new_session(&db).await;
    assert!(sessions::finish_session(&db.pool, id, SessionStatus::Running, None)
        .await
        .is_err());
}

#[tokio::test]
async fn test_list_sessions_by_status() {
    let db = TestDb::new().await;
    let first = new_session(&db).await;
    let second = new_session(&db).await;
    sessions::finish_session(&db.pool, first, SessionStatus::Completed, None)
        .await
        .unwrap();

    let all = sessions::list_sessions(&db.pool, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let running = sessions::list_sessions(&db.pool, Some(SessionStatus::Running))
        .await
        .unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, second);
}

// =============================================================================
// Documents
// =============================================================================

#[tokio::test]
async fn test_upsert_same_hash_is_idempotent() {
    let db = TestDb::new().await;
    let session_id = new_session(&db).await;

    let first = documents::upsert_document(&db.pool, &raw_doc(session_id, "abc", "PREAMBLE"))
        .await
        .unwrap();
    let second = documents::upsert_document(&db.pool, &raw_doc(session_id, "abc", "PREAMBLE"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let docs = documents::session_documents(&db.pool, session_id).await.unwrap();
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn test_upsert_changed_hash_updates_in_place() {
    let db = TestDb::new().await;
    let session_id = new_session(&db).await;

    let first = documents::upsert_document(&db.pool, &raw_doc(session_id, "abc", "old text"))
        .await
        .unwrap();
    let second = documents::upsert_document(&db.pool, &raw_doc(session_id, "def", "new text"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.source_hash, "def");
    assert_eq!(second.extracted_text, "new text");

    let docs = documents::session_documents(&db.pool, session_id).await.unwrap();
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn test_upsert_marker_replaces_status() {
    let db = TestDb::new().await;
    let session_id = new_session(&db).await;

    documents::upsert_document(&db.pool, &raw_doc(session_id, "abc", "text"))
        .await
        .unwrap();

    let mut marker = raw_doc(session_id, "abc", "text");
    marker.parse_status = ParseStatus::FailedNoNodes;
    marker.metadata = json!({"error": "no legal units found"});
    let stored = documents::upsert_document(&db.pool, &marker).await.unwrap();

    assert_eq!(stored.parse_status, ParseStatus::FailedNoNodes);
    assert_eq!(stored.metadata.0["error"], "no legal units found");
}

#[tokio::test]
async fn test_record_failure_keeps_prior_session_row() {
    let db = TestDb::new().await;
    let first = new_session(&db).await;
    let second = new_session(&db).await;

    let good = documents::upsert_document(&db.pool, &raw_doc(first, "abc", "PREAMBLE"))
        .await
        .unwrap();

    let mut marker = raw_doc(second, "unfetched", "");
    marker.parse_status = ParseStatus::Failed;
    marker.metadata = json!({"parser": "constitution", "error": "HTTP 503"});
    let failed = documents::record_failure(&db.pool, &marker).await.unwrap();
    assert_ne!(failed.id, good.id);

    let kept = documents::session_documents(&db.pool, first).await.unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].source_hash, "abc");
    assert_eq!(kept[0].extracted_text, "PREAMBLE");
    assert_eq!(kept[0].parse_status, ParseStatus::Parsed);

    let markers = documents::session_documents(&db.pool, second).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].parse_status, ParseStatus::Failed);

    // A later good fetch lands on the parsed row.
    let refreshed = documents::upsert_document(&db.pool, &raw_doc(second, "def", "PREAMBLE v2"))
        .await
        .unwrap();
    assert_eq!(refreshed.id, good.id);
}

#[tokio::test]
async fn test_record_failure_on_same_hash_keeps_text() {
    let db = TestDb::new().await;
    let session_id = new_session(&db).await;
    let good = documents::upsert_document(&db.pool, &raw_doc(session_id, "abc", "PREAMBLE"))
        .await
        .unwrap();

    let mut marker = raw_doc(session_id, "abc", "");
    marker.parse_status = ParseStatus::FailedNoNodes;
    marker.metadata = json!({"error": "no legal units found"});
    let stored = documents::record_failure(&db.pool, &marker).await.unwrap();

    assert_eq!(stored.id, good.id);
    assert_eq!(stored.extracted_text, "PREAMBLE");
    assert_eq!(stored.parse_status, ParseStatus::FailedNoNodes);
}

#[tokio::test]
async fn test_document_counts_by_kind_and_status() {
    let db = TestDb::new().await;
    let session_id = new_session(&db).await;

    documents::upsert_document(&db.pool, &raw_doc(session_id, "abc", "text"))
        .await
        .unwrap();
    for (seq, fragment) in ["preamble", "article-1", "article-3-section-1"].iter().enumerate() {
        documents::upsert_document(&db.pool, &unit_doc(session_id, fragment, seq as i32))
            .await
            .unwrap();
    }

    let store = PgStore::new(db.pool.clone());
    let summary = lawph_pipeline::SessionSummary::new(
        store.get_session(session_id).await.unwrap(),
        &store.document_counts(session_id).await.unwrap(),
    );
    assert_eq!(summary.counts.get(&ParseStatus::Parsed), Some(&1));
    assert_eq!(summary.unit_count, 3);

    let docs = store.session_documents(session_id).await.unwrap();
    assert_eq!(docs[0].canonical_url, PAGE);
    assert_eq!(docs[1].canonical_url, format!("{PAGE}#article-1"));
}

// =============================================================================
// Entries
// =============================================================================

#[tokio::test]
async fn test_upsert_entry_by_slug() {
    let db = TestDb::new().await;
    let session_id = new_session(&db).await;
    let doc = documents::upsert_document(&db.pool, &unit_doc(session_id, "preamble", 0))
        .await
        .unwrap();

    let mut entry = NewEntry {
        entry_id: "1987-constitution-preamble".into(),
        session_id,
        document_id: doc.id,
        canonical_citation: "1987 Constitution, Preamble".into(),
        title: "Preamble".into(),
        entry_type: "constitution".into(),
        subtype: "preamble".into(),
        text: "We, the sovereign Filipino people".into(),
        enrichment: EnrichedFields {
            summary: "Statement of purpose.".into(),
            tags: vec!["sovereignty".into()],
            ..Default::default()
        },
        embedding: vec![0.1, 0.2, 0.3],
    };

    let stored = entries::upsert_entry(&db.pool, &entry).await.unwrap();
    assert_eq!(stored.enrichment.0.tags, vec!["sovereignty".to_string()]);
    assert_eq!(stored.embedding, vec![0.1, 0.2, 0.3]);

    entry.enrichment.summary = "Revised summary.".into();
    entries::upsert_entry(&db.pool, &entry).await.unwrap();

    let all = entries::session_entries(&db.pool, session_id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].enrichment.0.summary, "Revised summary.");
}
