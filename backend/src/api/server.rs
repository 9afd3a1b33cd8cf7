//! HTTP Server for the Gridform API.
//!
//! Exposes one shared [`GridEngine`] backed by a [`FileStore`]. Requests are
//! serialised through a mutex, so the engine sees a single writer.
//!
//! # API Endpoints
//!
//! | Method | Path                        | Description                     |
//! |--------|-----------------------------|---------------------------------|
//! | GET    | `/health`                   | Health check                    |
//! | GET    | `/api/dataset`              | Current grid                    |
//! | DELETE | `/api/dataset`              | Clear grid and stored snapshot  |
//! | POST   | `/api/import`               | Upload a JSON or CSV file       |
//! | GET    | `/api/export/{format}`      | Download as `json` or `csv`     |
//! | POST   | `/api/records/{index}/edit` | Open an edit, returns the draft |
//! | POST   | `/api/edit/commit`          | Commit the open edit            |
//! | POST   | `/api/edit/cancel`          | Cancel the open edit            |
//! | GET    | `/api/events`               | SSE stream of dataset changes   |
//! | GET    | `/api/logs`                 | SSE stream for real-time logs   |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOGS};
use super::types::{error_response, CancelResponse, CommitResponse, DatasetResponse, ImportResponse};
use crate::config::EngineConfig;
use crate::edit::EditDraft;
use crate::engine::GridEngine;
use crate::error::{CsvError, EditError, EngineError, ImportError, ServerError, ServerResult};
use crate::models::Record;
use crate::store::FileStore;
use crate::transform::pipeline::FileFormat;

/// Engine handle shared by all handlers.
pub type SharedEngine = Arc<Mutex<GridEngine<FileStore>>>;

/// Start the HTTP server
pub async fn start_server(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::with_dir(&config.data_dir);
    let engine = GridEngine::init(store, config.storage_key.clone());
    let state: SharedEngine = Arc::new(Mutex::new(engine));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 Gridform server running on http://localhost:{}", config.port);
    println!("   Data dir:    {}", config.data_dir.display());
    println!("   Storage key: {}", config.storage_key);
    println!("   GET  /api/dataset - Current grid");
    println!("   POST /api/import  - Upload JSON or CSV file");
    println!("   GET  /api/events  - SSE dataset changes");
    println!("   GET  /api/logs    - SSE log stream");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the application router around a shared engine.
pub fn router(state: SharedEngine) -> Router {
    // Permissive CORS so a locally served renderer can call in
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/dataset", get(get_dataset).delete(clear_dataset))
        .route("/api/import", post(import_file))
        .route("/api/export/{format}", get(export_dataset))
        .route("/api/records/{index}/edit", post(edit_requested))
        .route("/api/edit/commit", post(edit_committed))
        .route("/api/edit/cancel", post(edit_cancelled))
        .route("/api/events", get(sse_events))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Engine(err) => match err {
                EngineError::Import(ImportError::EmptyResult) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Import(_) => StatusCode::BAD_REQUEST,
                EngineError::Csv(CsvError::EncodingError(_)) => StatusCode::BAD_REQUEST,
                EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Edit(EditError::NotEditing) => StatusCode::CONFLICT,
                EngineError::NothingToExport => StatusCode::NOT_FOUND,
                // Out-of-range indices are a caller bug, not bad input
                EngineError::Edit(EditError::IndexOutOfRange { .. })
                | EngineError::Csv(CsvError::WriteError(_))
                | EngineError::Store(_)
                | EngineError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log_error(self.to_string());
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "gridform",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "dataset": "GET /api/dataset",
            "import": "POST /api/import",
            "events": "GET /api/events (SSE)",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn get_dataset(State(engine): State<SharedEngine>) -> Json<DatasetResponse> {
    let engine = engine.lock().await;
    Json(DatasetResponse::new(
        engine.dataset(),
        engine.grid_state(),
        engine.edit_state(),
    ))
}

async fn clear_dataset(State(engine): State<SharedEngine>) -> ServerResult<StatusCode> {
    engine.lock().await.clear()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload endpoint. Format is chosen by the file name's extension.
async fn import_file(
    State(engine): State<SharedEngine>,
    mut multipart: Multipart,
) -> ServerResult<Json<ImportResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let name = file_name
        .clone()
        .ok_or_else(|| ServerError::BadRequest("Uploaded file has no name".into()))?;

    log_info(format!("📄 Upload: {} ({} bytes)", name, bytes.len()));

    let mut engine = engine.lock().await;
    let dataset = engine.import_file(&name, &bytes)?;
    Ok(Json(ImportResponse::new(file_name, dataset)))
}

async fn export_dataset(
    State(engine): State<SharedEngine>,
    Path(format): Path<FileFormat>,
) -> ServerResult<Response> {
    let export = engine.lock().await.export(format)?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);

    Ok((
        [
            (header::CONTENT_TYPE, export.mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

async fn edit_requested(
    State(engine): State<SharedEngine>,
    Path(index): Path<usize>,
) -> ServerResult<Json<EditDraft>> {
    let draft = engine.lock().await.on_edit_requested(index)?;
    Ok(Json(draft))
}

async fn edit_committed(
    State(engine): State<SharedEngine>,
    Json(values): Json<Record>,
) -> ServerResult<Json<CommitResponse>> {
    let mut engine = engine.lock().await;
    let index = engine.on_edit_committed(values)?;
    let record = engine
        .dataset()
        .records
        .get(index)
        .cloned()
        .ok_or_else(|| ServerError::Internal(format!("Record {} vanished after commit", index)))?;

    Ok(Json(CommitResponse { index, record }))
}

async fn edit_cancelled(State(engine): State<SharedEngine>) -> Json<CancelResponse> {
    let cancelled = engine.lock().await.on_edit_cancelled();
    Json(CancelResponse { cancelled })
}

/// SSE endpoint for dataset change notifications
async fn sse_events(
    State(engine): State<SharedEngine>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = engine.lock().await.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(change) => {
            let json = serde_json::to_string(&change).ok()?;
            Some(Ok(Event::default().event("datasetChanged").data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOGS.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
