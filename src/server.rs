//! HTTP boundary.
//!
//! Exposes the ingestion and answer pipelines over a small JSON API:
//!
//! | Method | Path      | Description |
//! |--------|-----------|-------------|
//! | `POST` | `/ingest` | Start an ingestion run as a background task |
//! | `POST` | `/chat`   | Answer a question about the indexed PDFs |
//! | `GET`  | `/health` | Health check (version + passage count) |
//!
//! # Error Contract
//!
//! Error responses are JSON:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Query cannot be empty." } }
//! ```
//!
//! Codes: `bad_request` (400), `unavailable` (503), `internal` (500).
//! `/chat` returns 503 when the store is empty or cannot be checked, and
//! 500 when the answer pipeline itself fails. Query-time service errors
//! are surfaced, never swallowed.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients during development.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chat;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::generate::Generator;
use crate::ingest;
use crate::pdf::PdfReader;
use crate::store::PassageStore;

/// Shared application state passed to all route handlers.
///
/// Every collaborator is constructed once at process start and shared by
/// reference; handlers never build their own clients.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: PassageStore,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub reader: Arc<dyn PdfReader>,
}

/// Build the application router. Split from [`run_server`] so tests can
/// serve it on an ephemeral port.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured bind address and serve until
/// the process is terminated.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();

    // Startup health signal: an empty or unreadable store is worth a
    // warning, not a refusal to start.
    match state.store.count().await {
        Ok(0) => println!(
            "WARNING: the passage collection is empty. Run `citeline ingest` or POST /ingest."
        ),
        Ok(count) => println!("Passage collection loaded with {} passages.", count),
        Err(e) => eprintln!(
            "Error checking the passage collection during startup: {}. Run `citeline init` first.",
            e
        ),
    }

    let app = build_router(state);
    println!("Citeline server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "unavailable".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// Passage count, or null when the store cannot be checked.
    passages: Option<i64>,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        passages: state.store.count().await.ok(),
    })
}

// ============ POST /ingest ============

#[derive(Serialize)]
struct IngestResponse {
    message: String,
    documents_in_collection: Option<i64>,
}

/// Handler for `POST /ingest`.
///
/// Spawns the ingestion coordinator as a background task and returns
/// immediately with the current collection size. When the PDF directory is
/// missing or holds no PDFs, no task is started.
async fn handle_ingest(State(state): State<AppState>) -> Json<IngestResponse> {
    println!("Received request to start PDF ingestion...");

    let pdf_dir = &state.config.storage.pdf_dir;
    let has_pdfs = ingest::discover_pdfs(pdf_dir)
        .map(|files| !files.is_empty())
        .unwrap_or(false);
    if !has_pdfs {
        return Json(IngestResponse {
            message: format!(
                "No PDFs found in {} or directory does not exist. Ingestion skipped.",
                pdf_dir.display()
            ),
            documents_in_collection: None,
        });
    }

    let config = state.config.clone();
    let store = state.store.clone();
    let embedder = state.embedder.clone();
    let reader = state.reader.clone();
    tokio::spawn(async move {
        if let Err(e) =
            ingest::run_ingest(&config, &store, embedder.as_ref(), reader.as_ref()).await
        {
            eprintln!("Background ingestion run failed: {:#}", e);
        }
    });

    let current_count = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            eprintln!("Could not get collection count during ingest request: {}", e);
            None
        }
    };

    Json(IngestResponse {
        message: "PDF ingestion started in the background. Check server logs for progress."
            .to_string(),
        documents_in_collection: current_count,
    })
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

/// Handler for `POST /chat`.
///
/// Guards: 400 for an empty/whitespace query, 503 when the store is empty
/// or uncheckable (the generation call is never attempted), 500 when the
/// pipeline fails.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("Query cannot be empty."));
    }

    match state.store.count().await {
        Ok(0) => {
            return Err(unavailable(
                "Vector database is empty. Please ingest documents first using the /ingest endpoint.",
            ));
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error checking the passage collection: {}", e);
            return Err(unavailable(
                "Service temporarily unavailable. Database may not be ready. Please try again shortly or ingest documents.",
            ));
        }
    }

    println!("Received query: '{}'", request.query);
    let answer = chat::answer_question(
        &state.store,
        state.embedder.as_ref(),
        state.generator.as_ref(),
        &request.query,
        state.config.retrieval.top_k,
    )
    .await
    .map_err(|e| {
        eprintln!("Error answering query: {:#}", e);
        internal("Error processing your query: an internal server error occurred.")
    })?;

    Ok(Json(QueryResponse { answer }))
}
