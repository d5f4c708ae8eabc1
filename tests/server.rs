//! HTTP surface tests, mostly driven through the router without binding a port.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use gearman_exporter::{
    BuildInfoCollector, ExporterError, GearmanCollector, Registry,
    collector::fetch::{StatusSource, StatusStream},
    registry::TEXT_CONTENT_TYPE,
    server::{AppState, create_router, serve},
};
use http_body_util::BodyExt;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tower::ServiceExt;

struct Canned(Option<&'static str>);

#[async_trait]
impl StatusSource for Canned {
    async fn fetch(&self) -> Result<StatusStream, ExporterError> {
        self.0.map_or(Err(ExporterError::Timeout), |body| {
            Ok(StatusStream::new(
                body.as_bytes(),
                Instant::now() + Duration::from_secs(1),
            ))
        })
    }
}

fn app(source: Canned, telemetry_path: &str) -> axum::Router {
    let mut registry = Registry::new();
    registry
        .register(Arc::new(GearmanCollector::with_source(source)))
        .expect("Failed to register gearman collector");
    registry
        .register(Arc::new(BuildInfoCollector))
        .expect("Failed to register build info");

    create_router(AppState {
        registry: Arc::new(registry),
        telemetry_path: telemetry_path.to_string(),
    })
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_endpoint_renders_scrape() {
    let app = app(Canned(Some("fn1\t5\t2\t3\nfn2\t0\t0\t1\n.\n")), "/metrics");
    let (status, content_type, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(TEXT_CONTENT_TYPE));
    assert!(body.contains("# HELP gearman_up Was the last scrape of gearman successful."));
    assert!(body.contains("# TYPE gearman_function_jobs gauge"));
    assert!(body.contains("gearman_up 1"));
    assert!(body.contains("gearman_function_jobs{function=\"fn1\"} 5"));
    assert!(body.contains("gearman_function_jobs_running{function=\"fn1\"} 2"));
    assert!(body.contains("gearman_function_jobs_waiting{function=\"fn1\"} 3"));
    assert!(body.contains("gearman_function_workers{function=\"fn2\"} 1"));
    assert!(body.contains("gearman_exporter_build_info{version="));
}

#[tokio::test]
async fn test_failed_scrape_is_still_ok() {
    let app = app(Canned(None), "/metrics");
    let (status, _, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("gearman_up 0"));
    assert!(!body.contains("gearman_function_"));
}

#[tokio::test]
async fn test_index_links_to_metrics() {
    let app = app(Canned(None), "/gearman-metrics");
    let (status, _, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h1>Gearman Exporter</h1>"));
    assert!(body.contains("href=\"/gearman-metrics\""));
}

#[tokio::test]
async fn test_custom_path_and_unknown_routes() {
    let app = app(Canned(Some(".\n")), "/gearman-metrics");
    let (status, _, body) = get(app.clone(), "/gearman-metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("gearman_up 1"));

    let (status, _, _) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_at_root() {
    let app = app(Canned(Some(".\n")), "/");
    let (status, _, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("gearman_up 1"));
}

#[tokio::test]
async fn test_serve_reports_address_in_use() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let err = serve(addr, app(Canned(None), "/metrics"))
        .await
        .expect_err("bind on a taken port must fail");
    match err {
        ExporterError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::AddrInUse),
        other => panic!("unexpected error: {other}"),
    }
}
