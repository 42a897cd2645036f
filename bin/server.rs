// Enrollment Insights - Web Server
// Upload a CSV, get back a summary + 11 charts with insights

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use enrollment_insights::render::RenderConfig;
use enrollment_insights::{analyze_bytes, views, InsightError, UploadStore};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<UploadStore>,
    render: RenderConfig,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Liveness probe
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(enrollment_insights::VERSION))
}

/// GET / - Landing page with the empty summary shape and upload form
async fn serve_index() -> impl IntoResponse {
    Html(views::render_index())
}

/// POST /upload - Persist the uploaded file, then redirect to its report.
///
/// A missing file part or an empty filename is answered with a plain-text
/// 200 body; clients treat any non-HTML text body as a failure indicator.
async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                log::warn!("upload aborted mid-transfer: {}", e);
                return "Upload failed".into_response();
            }
        };
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return "No file part".into_response();
    };
    if filename.is_empty() {
        return "No selected file".into_response();
    }

    match state.store.save(&filename, &bytes) {
        Ok(name) => {
            Redirect::to(&format!("/visualize/{}", urlencoding::encode(&name))).into_response()
        }
        Err(e) => {
            log::error!("failed to store upload '{}': {}", filename, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload").into_response()
        }
    }
}

/// GET /visualize/:name - Run the pipeline over a stored upload.
async fn visualize(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let decoded = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    let bytes = match state.store.load(&decoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("no stored upload '{}': {}", decoded, e);
            return (
                StatusCode::NOT_FOUND,
                format!("No uploaded file named '{}'", decoded),
            )
                .into_response();
        }
    };

    match analyze_bytes(&bytes, &state.render) {
        Ok(report) => Html(views::render_report(&decoded, &report)).into_response(),
        Err(e) => {
            log::error!("pipeline failed for '{}': {}", decoded, e);
            (error_status(&e), format!("Failed to analyze '{}': {}", decoded, e)).into_response()
        }
    }
}

/// Data errors are the uploader's to fix; everything else is on the server.
fn error_status(error: &InsightError) -> StatusCode {
    if error.is_user_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("📊 Enrollment Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let upload_dir = env::var("INSIGHTS_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
    let addr = env::var("INSIGHTS_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let treemap = env::var("INSIGHTS_TREEMAP")
        .map(|v| !matches!(v.trim(), "0" | "false" | "off"))
        .unwrap_or(true);

    let store = match UploadStore::new(&upload_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Cannot open upload dir '{}': {}", upload_dir, e);
            std::process::exit(1);
        }
    };
    println!("✓ Uploads stored in: {}", store.root().display());

    let render = RenderConfig::detect().with_treemap(treemap);
    if render.treemap_available() {
        println!("✓ Treemap capability: enabled");
    } else {
        println!("- Treemap capability: unavailable (slot degrades to text)");
    }

    let state = AppState {
        store: Arc::new(store),
        render,
    };

    let app = Router::new()
        .route("/", get(serve_index))
        .route("/upload", post(upload_file))
        .route("/visualize/:name", get(visualize))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("❌ Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    println!("\n🚀 Server running on http://{}", addr);
    println!("   Upload a CSV at http://{}/\n", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
