pub mod api;
pub mod config;
pub mod infrastructure;
pub mod metrics;
pub mod services;

use crate::config::GatewayConfig;
use crate::services::uploader::Uploader;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::UploadForm,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "upload", description = "Object upload endpoint"),
        (name = "system", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub uploader: Arc<Uploader>,
    pub config: GatewayConfig,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

pub fn create_app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::upload::upload_file)
                .fallback(api::handlers::upload::method_not_allowed),
        );

    if state.metrics.is_some() {
        router = router.route(
            "/metrics",
            get(api::handlers::metrics::prometheus_metrics),
        );
    }

    let body_limit = state.config.body_limit();

    router
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
