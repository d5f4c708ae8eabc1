//! HTTP surface: the telemetry endpoint and a landing page.

use crate::{
    error::ExporterError,
    registry::{Registry, TEXT_CONTENT_TYPE},
};
use axum::{
    Router,
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
};
use std::{net::SocketAddr, sync::Arc};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub telemetry_path: String,
}

/// Builds the router serving `telemetry_path` and, unless the telemetry path
/// is `/`, a landing page at `/`.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new().route(&state.telemetry_path, get(metrics_handler));
    if state.telemetry_path != "/" {
        router = router.route("/", get(index_handler));
    }
    router.with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.registry.render().await;
    ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body)
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Gearman Exporter</title></head>
<body>
<h1>Gearman Exporter</h1>
<p><a href="{}">Metrics</a></p>
</body>
</html>"#,
        state.telemetry_path
    ))
}

/// Binds `addr` and serves `app` until a shutdown signal arrives.
///
/// # Errors
/// Returns [`ExporterError::Io`] if the address can't be bound or the server
/// fails.
pub async fn serve(addr: SocketAddr, app: Router) -> Result<(), ExporterError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves once Ctrl+C or SIGTERM is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("Received Ctrl+C signal"),
        () = terminate => log::info!("Received terminate signal"),
    }
}
