//! Gearman exporter binary entry point.

use clap::Parser;
use gearman_exporter::{
    BuildInfoCollector, Config, ExporterError, GearmanCollector, ProcessCollector, Registry,
    server::{AppState, create_router, serve},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ExporterError> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    log::info!(
        "Starting gearman_exporter (version={})",
        env!("CARGO_PKG_VERSION")
    );

    let collector = match GearmanCollector::new(&config.scrape_uri, config.timeout) {
        Ok(collector) => collector,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let mut registry = Registry::new();
    registry.register(Arc::new(collector))?;
    registry.register(Arc::new(BuildInfoCollector))?;
    if let Some(pid_file) = &config.pid_file {
        log::info!("Exporting process metrics for pid file {}", pid_file.display());
        registry.register(Arc::new(ProcessCollector::new(pid_file)))?;
    }

    let app = create_router(AppState {
        registry: Arc::new(registry),
        telemetry_path: config.telemetry_path.clone(),
    });

    serve(config.listen_address, app).await?;

    log::info!("Shutdown complete");
    Ok(())
}
