//! HTTP server for the restructure API.
//!
//! # Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/restructure`    | Upload source + template, map the rows   |
//! | GET    | `/download/{id}`  | Fetch a generated XLSX file              |
//! | GET    | `/api/logs`       | SSE stream of processing progress        |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, status_for, RestructureResponse};
use crate::config::AppConfig;
use crate::error::{PipelineError, ServerError, StorageError};
use crate::pipeline::{self, FileInput};
use crate::storage::{DiskStore, FileStore};
use crate::writer::XLSX_CONTENT_TYPE;

/// Shared per-request context.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<DiskStore>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/restructure", post(restructure))
        .route("/download/{id}", get(download))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let store = Arc::new(DiskStore::new(&config.scratch_dir, config.file_ttl)?);
    let state = AppState {
        config: Arc::new(config),
        store,
    };

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("restruct server running on http://localhost:{}", port);
    println!("   POST /restructure   - Upload source + template files");
    println!("   GET  /download/{{id}} - Fetch a generated file");
    println!("   GET  /api/logs      - SSE progress stream");
    println!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "restruct",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time progress streaming.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

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

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Restructure endpoint: multipart upload with `source_file` and
/// `template_file` fields.
async fn restructure(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RestructureResponse>, (StatusCode, Json<Value>)> {
    let mut source: Option<Upload> = None;
    let mut template: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "source_file" && name != "template_file" {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(&format!("Read error: {}", e)))?
            .to_vec();

        let upload = Upload { filename, bytes };
        if name == "source_file" {
            source = Some(upload);
        } else {
            template = Some(upload);
        }
    }

    let source = source.ok_or_else(|| bad_request("source_file field is required"))?;
    let template = template.ok_or_else(|| bad_request("template_file field is required"))?;

    let outcome = run_pipeline(&state, source, template)
        .await
        .map_err(to_http)?;

    Ok(Json(RestructureResponse::from(outcome)))
}

/// Run the pipeline off the async executor, under the configured deadline.
/// The mapping is CPU-bound, so it goes through `spawn_blocking`.
async fn run_pipeline(
    state: &AppState,
    source: Upload,
    template: Upload,
) -> Result<crate::pipeline::RestructureOutcome, ServerError> {
    let config = state.config.clone();
    let store = state.store.clone();
    let work = tokio::task::spawn_blocking(move || {
        pipeline::restructure(
            FileInput {
                filename: &source.filename,
                bytes: &source.bytes,
            },
            FileInput {
                filename: &template.filename,
                bytes: &template.bytes,
            },
            &config.catalog,
            &config.mapper,
            store.as_ref() as &dyn FileStore,
        )
    });

    match tokio::time::timeout(state.config.timeout, work).await {
        Err(_) => Err(ServerError::Pipeline(PipelineError::Timeout)),
        Ok(Err(join_err)) => Err(ServerError::Internal(join_err.to_string())),
        Ok(Ok(result)) => result.map_err(ServerError::Pipeline),
    }
}

/// Download endpoint for generated files.
async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), (StatusCode, Json<Value>)> {
    let file = state.store.get(&id).map_err(|e| match e {
        StorageError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(error_response(&format!("File not found: {}", id))),
        ),
        other => to_http(ServerError::Internal(other.to_string())),
    })?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = header::HeaderValue::from_str(XLSX_CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    if let Ok(value) = header::HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, file.bytes))
}

fn bad_request(detail: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(error_response(detail)))
}

fn to_http(err: ServerError) -> (StatusCode, Json<Value>) {
    let status =
        StatusCode::from_u16(status_for(&err)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error_response(&err.to_string())))
}
