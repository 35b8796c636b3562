//! HTTP surface for medsum.
//!
//! This module exposes a compact Axum router built around per-user sessions:
//!
//! - `POST /sessions` – Start a session and return its id.
//! - `GET /sessions/:id` – Show the loaded document, its extracted text, and the cached summary.
//! - `DELETE /sessions/:id` – End a session.
//! - `POST /sessions/:id/document?filename=report.pdf` – Upload raw bytes and extract their text.
//!   Re-uploading the same file reuses the cached text.
//! - `POST /sessions/:id/questions` – Answer a question against the extracted text.
//! - `POST /sessions/:id/summary` – Summarize the extracted text chunk by chunk.
//! - `GET /metrics` – Observe pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Each session is locked for the duration of an action, so actions on one session never
//! interleave.

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    AnswerOutcome, Document, ExtractionOutcome, ProcessingApi, ProcessingError,
};
use crate::session::{SessionHandle, SessionSnapshot, SessionStore};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared state handed to every handler.
struct AppState<S> {
    service: Arc<S>,
    sessions: SessionStore,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            sessions: self.sessions.clone(),
        }
    }
}

impl<S> AppState<S> {
    async fn session(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        self.sessions
            .get(id)
            .await
            .ok_or(AppError::SessionNotFound(id))
    }
}

/// Build the HTTP router exposing the session API surface.
///
/// `upload_limit_bytes` caps the size of a single document upload.
pub fn create_router<S>(
    service: Arc<S>,
    sessions: SessionStore,
    upload_limit_bytes: usize,
) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route("/sessions", post(create_session::<S>))
        .route(
            "/sessions/:id",
            get(show_session::<S>).delete(end_session::<S>),
        )
        .route("/sessions/:id/document", post(upload_document::<S>))
        .route("/sessions/:id/questions", post(ask_question::<S>))
        .route("/sessions/:id/summary", post(summarize_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(upload_limit_bytes))
        .with_state(AppState { service, sessions })
}

/// Response body for `POST /sessions`.
#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: Uuid,
}

async fn create_session<S>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<CreateSessionResponse>)
where
    S: ProcessingApi,
{
    let session_id = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    )
}

async fn show_session<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError>
where
    S: ProcessingApi,
{
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    Ok(Json(session.snapshot()))
}

async fn end_session<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError>
where
    S: ProcessingApi,
{
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(id))
    }
}

/// Query parameters for `POST /sessions/:id/document`.
#[derive(Deserialize)]
struct UploadParams {
    /// Original filename; its suffix selects the extractor.
    filename: String,
}

/// Response body for `POST /sessions/:id/document`.
#[derive(Serialize)]
struct UploadResponse {
    #[serde(flatten)]
    outcome: ExtractionOutcome,
    /// Present when the upload left the session without usable text.
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

/// Extract text from the uploaded body and make it the session's current document.
async fn upload_document<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError>
where
    S: ProcessingApi,
{
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    let document = Document::new(params.filename, body.to_vec());
    let outcome = state.service.ingest(&mut session, document).await?;
    Ok(Json(UploadResponse {
        warning: outcome.warning(),
        outcome,
    }))
}

/// Request body for `POST /sessions/:id/questions`.
#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

/// Response body for `POST /sessions/:id/questions`.
#[derive(Serialize)]
struct QuestionResponse {
    /// Answer span, or the "No answer found." sentinel.
    answer: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

async fn ask_question<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError>
where
    S: ProcessingApi,
{
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    let outcome = state.service.ask(&session, &request.question).await?;
    let answer = outcome.display_text().to_string();
    let (found, score) = match outcome {
        AnswerOutcome::Found(answer) => (true, answer.score),
        AnswerOutcome::NotFound => (false, None),
    };
    Ok(Json(QuestionResponse {
        answer,
        found,
        score,
    }))
}

/// Response body for `POST /sessions/:id/summary`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
    chunk_count: usize,
    summarized_chunks: usize,
}

async fn summarize_document<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: ProcessingApi,
{
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    let summary = state.service.summarize(&mut session).await?;
    Ok(Json(SummaryResponse {
        summary: summary.text,
        chunk_count: summary.chunk_count,
        summarized_chunks: summary.summarized_chunks,
    }))
}

/// Return the pipeline counters.
async fn get_metrics<S>(
    State(state): State<AppState<S>>,
) -> Json<MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "create_session",
                method: "POST",
                path: "/sessions",
                description: "Start a session. Response returns { \"session_id\": uuid }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "show_session",
                method: "GET",
                path: "/sessions/:id",
                description: "Show the loaded document, its extracted text, and the cached summary.",
                request_example: None,
            },
            CommandDescriptor {
                name: "end_session",
                method: "DELETE",
                path: "/sessions/:id",
                description: "End a session and drop its cached document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "upload_document",
                method: "POST",
                path: "/sessions/:id/document?filename=<name>",
                description: "Upload raw PDF, TXT, DATA or CSV bytes and extract their text. The filename suffix selects the extractor.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ask_question",
                method: "POST",
                path: "/sessions/:id/questions",
                description: "Answer a question against the extracted text. Response returns { \"answer\": string, \"found\": bool }.",
                request_example: Some(json!({ "question": "What is the diagnosis?" })),
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/sessions/:id/summary",
                description: "Summarize the extracted text chunk by chunk and cache the result.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    SessionNotFound(Uuid),
    Processing(ProcessingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::SessionNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Unknown session: {id}")).into_response()
            }
            Self::Processing(error) => {
                let status = match &error {
                    error if error.is_warning() => StatusCode::UNPROCESSABLE_ENTITY,
                    ProcessingError::Extraction(_) => StatusCode::BAD_REQUEST,
                    ProcessingError::Summarization(_) | ProcessingError::QuestionAnswering(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %error, "Request failed");
                } else {
                    tracing::warn!(error = %error, "Request rejected");
                }
                (status, error.to_string()).into_response()
            }
        }
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}
