use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use s3_upload_gateway::config::GatewayConfig;
use s3_upload_gateway::services::storage::{StorageError, StorageProvider, StorageService};
use s3_upload_gateway::services::uploader::Uploader;
use s3_upload_gateway::{AppState, create_app};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "metrics-test-boundary";

struct AcceptAll;

#[async_trait]
impl StorageService for AcceptAll {
    async fn put_private_object(
        &self,
        _bucket: &str,
        _key: &str,
        _body: Bytes,
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for AcceptAll {
    async fn client_for_region(
        &self,
        _region: &str,
    ) -> Result<Arc<dyn StorageService>, StorageError> {
        Ok(Arc::new(AcceptAll))
    }
}

fn app(enable_metrics: bool) -> Router {
    let metrics = if enable_metrics {
        Some(s3_upload_gateway::metrics::init().unwrap())
    } else {
        None
    };

    let state = AppState {
        uploader: Arc::new(Uploader::new(Arc::new(AcceptAll)).with_metrics(enable_metrics)),
        config: GatewayConfig::default(),
        metrics,
    };
    create_app(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

fn sample(rendered: &str, prefix: &str) -> Option<f64> {
    rendered
        .lines()
        .find(|line| line.starts_with(prefix))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

#[tokio::test]
async fn test_successful_upload_is_counted_once() {
    let app = app(true);
    let body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        counted\r\n\
        --{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"bucketName\"\r\n\r\n\
        metrics-bucket\r\n\
        --{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"region\"\r\n\r\n\
        ap-south-1\r\n\
        --{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"fileName\"\r\n\r\n\
        a.txt\r\n\
        --{BOUNDARY}--\r\n"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, rendered) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sample(
            &rendered,
            r#"gateway_uploads_total{bucket="metrics-bucket",region="ap-south-1"}"#
        ),
        Some(1.0)
    );
    assert_eq!(
        sample(
            &rendered,
            r#"gateway_upload_duration_seconds_count{bucket="metrics-bucket",region="ap-south-1"}"#
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let (status, _) = get(app(false), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = get(app(false), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_document_lists_upload() {
    let (status, body) = get(app(false), "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert!(json["paths"]["/upload"]["post"].is_object());
}
