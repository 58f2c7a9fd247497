use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lawph_harvester::{FetcherConfig, ParserKind};
use lawph_pipeline::config::{BatchConfig, OrchestratorConfig};
use lawph_pipeline::models::{DocumentKind, ParseStatus, ScrapedDocument, SessionStatus};
use lawph_pipeline::orchestrator::{Orchestrator, UNFETCHED_HASH};
use lawph_pipeline::store::test_support::MemoryStore;
use lawph_pipeline::store::Store;
use lawph_pipeline::{PipelineError, SourceFetcher};

const CONSTITUTION: &str = include_str!("fixtures/cons1987_excerpt.html");
const ACT: &str = include_str!("fixtures/ra_11934_2022.html");
const YEAR_INDEX: &str = include_str!("fixtures/ra2022_index.html");

const CONSTITUTION_PATH: &str = "/consti/cons1987.html";

fn local_fetcher() -> SourceFetcher {
    let config = FetcherConfig::default()
        .with_allowed_domains(["127.0.0.1"])
        .with_min_interval(Duration::ZERO)
        .with_retry_base_delay(Duration::from_millis(10))
        .with_max_retries(2);
    SourceFetcher::new(config)
}

fn orchestrator(store: &Arc<MemoryStore>, config: OrchestratorConfig) -> Orchestrator {
    let store: Arc<dyn Store> = store.clone();
    Orchestrator::new(store, local_fetcher(), config)
        .with_batch_config(BatchConfig::new(2, Duration::ZERO))
}

fn relaxed_config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_min_html_chars(300)
}

async fn serve(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn raw_documents(docs: &[ScrapedDocument]) -> Vec<&ScrapedDocument> {
    docs.iter().filter(|d| d.kind == DocumentKind::Raw).collect()
}

fn unit_documents(docs: &[ScrapedDocument]) -> Vec<&ScrapedDocument> {
    let mut units: Vec<_> = docs.iter().filter(|d| d.kind == DocumentKind::Unit).collect();
    units.sort_by_key(|d| d.sequence_index);
    units
}

// =============================================================================
// Processing
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_process_constitution_stores_raw_and_units() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());

    let session = orch.start_session("constitution", &url, "tester").await.unwrap();
    let outcome = orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .unwrap();

    assert_eq!(outcome.unit_count, 7);
    assert!(!outcome.used_fallback);

    let docs = orch.session_documents(session.id).await.unwrap();
    let raw = raw_documents(&docs);
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].id, outcome.document_id);
    assert_eq!(raw[0].source_hash, outcome.content_hash);
    assert_eq!(raw[0].metadata.0["parser"], "constitution");
    assert!(raw[0].extracted_text.contains("BILL OF RIGHTS"));

    let units = unit_documents(&docs);
    assert_eq!(units.len(), 7);
    assert_eq!(
        units[0].metadata.0["canonical_citation"],
        "1987 Constitution, Preamble"
    );
    assert_eq!(
        units[2].metadata.0["canonical_citation"],
        "1987 Constitution, Article III, Section 1"
    );
    assert_eq!(units[2].canonical_url, format!("{url}#article-3-section-1"));
    assert!(units[2].metadata.0["topics"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("bill_of_rights")));

    // Distinct per-unit hashes derived from the one document hash.
    let mut hashes: Vec<_> = units.iter().map(|u| u.source_hash.clone()).collect();
    hashes.sort();
    hashes.dedup();
    assert_eq!(hashes.len(), 7);
    assert!(units
        .iter()
        .all(|u| u.metadata.0["document_hash"] == outcome.content_hash.as_str()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reprocessing_same_content_adds_nothing() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let first = orch.process_url(session.id, &url, ParserKind::Constitution).await.unwrap();
    let total = store.document_total();
    let second = orch.process_url(session.id, &url, ParserKind::Constitution).await.unwrap();

    assert_eq!(store.document_total(), total);
    assert_eq!(first.document_id, second.document_id);
    assert_eq!(first.content_hash, second.content_hash);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_changed_content_updates_in_place() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let first = orch.process_url(session.id, &url, ParserKind::Constitution).await.unwrap();

    server.reset().await;
    let amended = CONSTITUTION.replace(
        "<p>ARTICLE XVIII</p>",
        "<p>Section 4. No law shall be passed abridging the freedom of speech, of expression, or of the press.</p>\n<p>ARTICLE XVIII</p>",
    );
    serve(&server, CONSTITUTION_PATH, &amended).await;

    let second = orch.process_url(session.id, &url, ParserKind::Constitution).await.unwrap();
    assert_ne!(first.content_hash, second.content_hash);
    assert_eq!(first.document_id, second.document_id);
    assert_eq!(second.unit_count, 8);

    let docs = orch.session_documents(session.id).await.unwrap();
    let raw = raw_documents(&docs);
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].source_hash, second.content_hash);
    assert_eq!(unit_documents(&docs).len(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_process_act_page() {
    let server = MockServer::start().await;
    let page = "/statutes/repacts/ra2022/ra_11934_2022.html";
    serve(&server, page, ACT).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{page}", server.uri());
    let session = orch.start_session("statutes", &url, "tester").await.unwrap();

    let outcome = orch.process_url(session.id, &url, ParserKind::Acts).await.unwrap();
    assert_eq!(outcome.unit_count, 4);

    let docs = orch.session_documents(session.id).await.unwrap();
    let units = unit_documents(&docs);
    assert_eq!(
        units[3].metadata.0["canonical_citation"],
        "Republic Act No. 11934, Section 4"
    );
    assert_eq!(units[3].metadata.0["act"]["act_number"], "11934");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_short_page_rejected_as_incomplete_html() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    // Default threshold of 4000 characters; the fixture is shorter.
    let orch = orchestrator(&store, OrchestratorConfig::default());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let err = orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteHtml { .. }));
    assert!(err.is_unprocessable());

    let docs = orch.session_documents(session.id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].parse_status, ParseStatus::FailedIncompleteHtml);
    assert_ne!(docs[0].source_hash, UNFETCHED_HASH);
    assert!(docs[0].metadata.0["error"]
        .as_str()
        .unwrap()
        .contains("expected at least 4000"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_frameset_rejected_as_incomplete_html() {
    let server = MockServer::start().await;
    let frameset = format!(
        "<html><frameset cols=\"25%,75%\"><frame src=\"menu.html\"><frame src=\"main.html\"></frameset>{}</html>",
        "<!-- padding -->".repeat(40)
    );
    serve(&server, CONSTITUTION_PATH, &frameset).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let err = orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("frameset"));

    let summary = orch.session_status(session.id).await.unwrap();
    assert_eq!(summary.counts.get(&ParseStatus::FailedIncompleteHtml), Some(&1));
    assert_eq!(summary.unit_count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_page_without_units_fails_no_nodes() {
    let server = MockServer::start().await;
    let filler = format!(
        "<html><body>{}</body></html>",
        "<p>This page is temporarily unavailable while we update our records.</p>".repeat(10)
    );
    serve(&server, CONSTITUTION_PATH, &filler).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let err = orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoNodes(_)));

    let docs = orch.session_documents(session.id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].parse_status, ParseStatus::FailedNoNodes);
    // The raw text survives on the marker row.
    assert!(docs[0].extracted_text.contains("temporarily unavailable"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_failure_writes_unfetched_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONSTITUTION_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let err = orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .unwrap_err();
    assert!(err.is_unprocessable());

    let docs = orch.session_documents(session.id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source_hash, UNFETCHED_HASH);
    assert_eq!(docs[0].parse_status, ParseStatus::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unit_write_failure_marks_page_failed() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    store.fail_unit_writes(true);
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    assert!(orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .is_err());

    let docs = orch.session_documents(session.id).await.unwrap();
    let raw = raw_documents(&docs);
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].parse_status, ParseStatus::Failed);
    assert!(raw[0].metadata.0["error"]
        .as_str()
        .unwrap()
        .contains("unit writes disabled"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_failure_after_success_keeps_prior_row() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());

    let first = orch.start_session("constitution", &url, "tester").await.unwrap();
    let outcome = orch
        .process_url(first.id, &url, ParserKind::Constitution)
        .await
        .unwrap();
    orch.complete_session(first.id).await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path(CONSTITUTION_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let second = orch.start_session("constitution", &url, "tester").await.unwrap();
    assert!(orch
        .process_url(second.id, &url, ParserKind::Constitution)
        .await
        .is_err());

    let kept = orch.session_documents(first.id).await.unwrap();
    let raw = raw_documents(&kept);
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].id, outcome.document_id);
    assert_eq!(raw[0].source_hash, outcome.content_hash);
    assert_eq!(raw[0].parse_status, ParseStatus::Parsed);
    assert!(raw[0].extracted_text.contains("BILL OF RIGHTS"));
    assert_eq!(unit_documents(&kept).len(), 7);

    let failed = orch.session_documents(second.id).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source_hash, UNFETCHED_HASH);
    assert_eq!(failed[0].parse_status, ParseStatus::Failed);
    assert!(failed[0].extracted_text.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_page_after_success_keeps_prior_row() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());

    let first = orch.start_session("constitution", &url, "tester").await.unwrap();
    let outcome = orch
        .process_url(first.id, &url, ParserKind::Constitution)
        .await
        .unwrap();

    server.reset().await;
    serve(&server, CONSTITUTION_PATH, "<html><body>Service unavailable</body></html>").await;

    let second = orch.start_session("constitution", &url, "tester").await.unwrap();
    let err = orch
        .process_url(second.id, &url, ParserKind::Constitution)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteHtml { .. }));

    let kept = raw_documents(&orch.session_documents(first.id).await.unwrap())
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].source_hash, outcome.content_hash);
    assert_eq!(kept[0].parse_status, ParseStatus::Parsed);

    let failed = orch.session_documents(second.id).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_ne!(failed[0].source_hash, outcome.content_hash);
    assert_eq!(failed[0].parse_status, ParseStatus::FailedIncompleteHtml);
    assert!(failed[0].extracted_text.contains("Service unavailable"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fallback_runs_below_category_minimum() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        &store,
        relaxed_config().with_min_units("constitution_1987", 150),
    );
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch
        .start_session("constitution_1987", &url, "tester")
        .await
        .unwrap();

    let outcome = orch
        .process_url(session.id, &url, ParserKind::Constitution)
        .await
        .unwrap();
    assert!(outcome.used_fallback);
    // Fallback only fills gaps; every primary unit is kept.
    assert!(outcome.unit_count >= 7);

    let docs = orch.session_documents(session.id).await.unwrap();
    let units = unit_documents(&docs);
    assert_eq!(
        units[2].metadata.0["canonical_citation"],
        "1987 Constitution, Article III, Section 1"
    );
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_session_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let session = orch
        .start_session("constitution", "https://lawphil.net/consti/cons1987.html", "tester")
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Running);

    let done = orch.complete_session(session.id).await.unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert!(done.finished_at.is_some());

    let err = orch.fail_session(session.id, "too late").await.unwrap_err();
    assert!(matches!(err, PipelineError::SessionNotRunning(_)));

    let err = orch
        .process_url(session.id, "https://lawphil.net/consti/cons1987.html", ParserKind::Constitution)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::SessionNotRunning(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_session_validates_input() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());

    assert!(orch.start_session(" ", "https://lawphil.net/", "tester").await.is_err());
    assert!(orch.start_session("acts", "not a url", "tester").await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_session_not_found() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());

    let err = orch.session_status(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, PipelineError::SessionNotFound(_)));
}

// =============================================================================
// Batches
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_year_index_batch_keeps_order_and_isolates_failures() {
    let server = MockServer::start().await;
    let dir = "/statutes/repacts/ra2022";
    serve(&server, &format!("{dir}/ra2022.html"), YEAR_INDEX).await;
    serve(&server, &format!("{dir}/ra_11934_2022.html"), ACT).await;
    serve(&server, &format!("{dir}/ra_11936_2022.html"), ACT).await;
    Mock::given(method("GET"))
        .and(path(format!("{dir}/ra_11935_2022.html")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let index_url = format!("{}{dir}/ra2022.html", server.uri());
    let session = orch.start_session("statutes", &index_url, "tester").await.unwrap();

    let items = orch.process_year_index(session.id, &index_url).await.unwrap();
    assert_eq!(items.len(), 3);
    assert!(items[0].url.ends_with("ra_11934_2022.html"));
    assert!(items[1].url.ends_with("ra_11935_2022.html"));
    assert!(items[2].url.ends_with("ra_11936_2022.html"));

    assert!(items[0].is_success());
    assert!(!items[1].is_success());
    assert!(items[1].error.as_deref().unwrap().contains("404"));
    assert!(items[2].is_success());

    let summary = orch.session_status(session.id).await.unwrap();
    assert_eq!(summary.counts.get(&ParseStatus::Parsed), Some(&2));
    assert_eq!(summary.counts.get(&ParseStatus::Failed), Some(&1));
    assert_eq!(summary.unit_count, 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_batch_reports_invalid_url_without_aborting() {
    let server = MockServer::start().await;
    serve(&server, CONSTITUTION_PATH, CONSTITUTION).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, relaxed_config());
    let url = format!("{}{CONSTITUTION_PATH}", server.uri());
    let session = orch.start_session("constitution", &url, "tester").await.unwrap();

    let urls = vec!["::not a url::".to_string(), url.clone()];
    let items = orch
        .process_batch(session.id, &urls, ParserKind::Constitution)
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(!items[0].is_success());
    assert_eq!(items[1].outcome.as_ref().map(|o| o.unit_count), Some(7));
}
