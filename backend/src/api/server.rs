//! HTTP Server for the staffload API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                  |
//! |--------|-------------------|----------------------------------------------|
//! | GET    | `/health`         | Health check                                 |
//! | POST   | `/api/import`     | Upload a worker file (`?mode=&tenant=`)      |
//! | GET    | `/api/template`   | Blank CSV template                           |
//! | GET    | `/api/sample`     | CSV template with example rows               |
//! | GET    | `/api/logs`       | SSE stream for real-time logs                |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ImportResponse};
use crate::config::AppConfig;
use crate::error::{CsvResult, PipelineError, ServerError, ServerResult};
use crate::store::WorkerRepository;
use crate::template::{worker_sample, worker_template};
use crate::transform::pipeline::{import_bytes, ImportMode, ImportOptions};

/// Uploads above this size are rejected by axum before reaching the handler.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn WorkerRepository>,
    pub config: AppConfig,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Csv(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::ValidationFailed { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Pipeline(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
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
        .route("/api/import", post(import_upload))
        .route("/api/template", get(download_template))
        .route("/api/sample", get(download_sample))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    config: AppConfig,
    repo: Arc<dyn WorkerRepository>,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(AppState { repo, config });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 Staffload server running on http://localhost:{}", port);
    eprintln!("   POST /api/import   - Upload worker CSV (?mode=validate|dry-run|create|update&tenant=<uuid>)");
    eprintln!("   GET  /api/template - Blank CSV template");
    eprintln!("   GET  /api/sample   - CSV template with example rows");
    eprintln!("   GET  /api/logs     - SSE log stream");
    eprintln!("   GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "staffload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "import": "POST /api/import",
            "template": "GET /api/template",
            "sample": "GET /api/sample",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers just skip what they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub mode: Option<String>,
    pub tenant: Option<String>,
}

/// Resolve mode and tenant of an import request.
///
/// Persisting modes need a tenant, from the query or the configured default.
pub fn import_options(query: &ImportQuery, config: &AppConfig) -> ServerResult<ImportOptions> {
    let mode = match query.mode.as_deref() {
        Some(m) => m.parse::<ImportMode>().map_err(ServerError::BadRequest)?,
        None => ImportMode::default(),
    };

    let tenant = match query.tenant.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Some(
            Uuid::parse_str(t)
                .map_err(|_| ServerError::BadRequest(format!("invalid tenant id '{}'", t)))?,
        ),
        None => config.default_tenant,
    };

    let tenant_id = match tenant {
        Some(id) => id,
        None if mode.persists() => {
            return Err(ServerError::BadRequest(format!(
                "a tenant is required for {} imports",
                mode
            )))
        }
        None => Uuid::nil(),
    };

    Ok(ImportOptions::from_config(config, mode, tenant_id))
}

async fn import_upload(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> ServerResult<Json<ImportResponse>> {
    let options = import_options(&query, &state.config)?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    log_info(format!(
        "📄 New {} upload: {} ({} bytes)",
        options.mode,
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let report = import_bytes(&bytes, state.repo.as_ref(), &options)
        .await
        .map_err(|e| {
            log_error(format!("Import failed: {}", e));
            ServerError::from(e)
        })?;

    Ok(Json(ImportResponse::new(report, file_name)))
}

fn csv_download(content: CsvResult<Vec<u8>>, file_name: &str) -> ServerResult<Response> {
    let body = content.map_err(|e| ServerError::Internal(e.to_string()))?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn download_template() -> ServerResult<Response> {
    csv_download(worker_template(), "workers_template.csv")
}

async fn download_sample() -> ServerResult<Response> {
    csv_download(worker_sample(), "workers_sample.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mode: Option<&str>, tenant: Option<&str>) -> ImportQuery {
        ImportQuery {
            mode: mode.map(str::to_string),
            tenant: tenant.map(str::to_string),
        }
    }

    #[test]
    fn test_default_mode_is_validate() {
        let options = import_options(&query(None, None), &AppConfig::default()).unwrap();
        assert_eq!(options.mode, ImportMode::Validate);
        assert_eq!(options.tenant_id, Uuid::nil());
    }

    #[test]
    fn test_persisting_modes_need_a_tenant() {
        let err = import_options(&query(Some("create"), None), &AppConfig::default()).unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));

        let config = AppConfig {
            default_tenant: Some(Uuid::new_v4()),
            ..AppConfig::default()
        };
        let options = import_options(&query(Some("create"), None), &config).unwrap();
        assert_eq!(Some(options.tenant_id), config.default_tenant);
    }

    #[test]
    fn test_query_tenant_overrides_default() {
        let tenant = Uuid::new_v4();
        let config = AppConfig {
            default_tenant: Some(Uuid::new_v4()),
            batch_size: 10,
            ..AppConfig::default()
        };
        let options =
            import_options(&query(Some("update"), Some(&tenant.to_string())), &config).unwrap();

        assert_eq!(options.tenant_id, tenant);
        assert_eq!(options.batch_size, 10);
    }

    #[test]
    fn test_bad_query_values() {
        let config = AppConfig::default();
        assert!(import_options(&query(Some("upsert"), None), &config).is_err());
        assert!(import_options(&query(Some("update"), Some("acme")), &config).is_err());
    }

    #[test]
    fn test_error_status_codes() {
        let bad = ServerError::BadRequest("no file".into()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let refused: ServerError = PipelineError::ValidationFailed { error_rows: 2 }.into();
        assert_eq!(refused.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_csv_download_headers() {
        let response = csv_download(worker_template(), "workers_template.csv").unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"workers_template.csv\""
        );
    }
}
