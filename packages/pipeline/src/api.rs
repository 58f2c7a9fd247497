//! HTTP control surface for scraping sessions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lawph_harvester::ParserKind;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::generator::{EntryGenerator, GenerationReport};
use crate::models::{ScrapedDocument, ScrapingSession, SessionStatus, SessionSummary};
use crate::orchestrator::{Orchestrator, ProcessOutcome};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Absent when no enrichment credentials are configured.
    pub generator: Option<EntryGenerator>,
}

/// Response envelope shared by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error carried to the client inside the envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        let status = match &error {
            PipelineError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::SessionNotRunning(_) => StatusCode::CONFLICT,
            e if e.is_unprocessable() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %error, "request failed");
        } else {
            tracing::warn!(error = %error, status = status.as_u16(), "request rejected");
        }
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub category: String,
    pub root_url: String,
    pub operator: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessUrlRequest {
    pub url: String,
    #[serde(default = "default_parser")]
    pub parser_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub status: Option<SessionStatus>,
}

fn default_parser() -> String {
    ParserKind::Constitution.as_str().to_string()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions).post(start_session))
        .route("/api/sessions/{id}", get(session_status))
        .route("/api/sessions/{id}/urls", post(process_url))
        .route("/api/sessions/{id}/documents", get(session_documents))
        .route("/api/sessions/{id}/complete", post(complete_session))
        .route("/api/sessions/{id}/entries", post(generate_entries))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<ScrapingSession> {
    let session = state
        .orchestrator
        .start_session(&req.category, &req.root_url, &req.operator)
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionsQuery>,
) -> ApiResult<Vec<ScrapingSession>> {
    let sessions = state.orchestrator.list_sessions(params.status).await?;
    Ok(Json(ApiResponse::ok(sessions)))
}

async fn process_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProcessUrlRequest>,
) -> ApiResult<ProcessOutcome> {
    let parser: ParserKind = req.parser_type.parse().map_err(PipelineError::from)?;
    let outcome = state.orchestrator.process_url(id, &req.url, parser).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

async fn session_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionSummary> {
    let summary = state.orchestrator.session_status(id).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

async fn session_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ScrapedDocument>> {
    let documents = state.orchestrator.session_documents(id).await?;
    Ok(Json(ApiResponse::ok(documents)))
}

async fn complete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ScrapingSession> {
    let session = state.orchestrator.complete_session(id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

async fn generate_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<GenerationReport> {
    let generator = state.generator.as_ref().ok_or_else(|| {
        PipelineError::Config("entry generation is not configured".into())
    })?;
    let report = generator.generate_for_session(id).await?;
    Ok(Json(ApiResponse::ok(report)))
}
