pub mod api;
pub mod client;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::IntakeConfig;
use crate::services::dispatcher::JobDispatcher;
use crate::services::storage::StorageService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_cv,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::UploadReceipt,
            models::UploadCvForm,
            models::ErrorResponse,
            models::HealthResponse,
        )
    ),
    tags(
        (name = "cv", description = "CV ingestion and worker dispatch"),
        (name = "system", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageService>,
    pub dispatcher: Arc<dyn JobDispatcher>,
    pub config: IntakeConfig,
}

pub fn create_app(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(&api::middleware::request_id::X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(api::handlers::health::health_check))
        .route(
            "/api/upload-cv",
            post(api::handlers::upload::upload_cv).layer(axum::extract::DefaultBodyLimit::max(
                state.config.max_file_size + MULTIPART_OVERHEAD,
            )),
        )
        .layer(api::middleware::cors::loopback_cors())
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
