use std::net::SocketAddr;
use std::sync::OnceLock;

use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Called once at startup, before any
/// counter is touched.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    let _ = METRICS_HANDLE.set(handle);
}

/// Register every pipeline counter at zero so they are visible to scrapes
/// before the first event occurs.
pub fn initialize_pipeline_metrics() {
    metrics::counter!("flights.fetch.success").absolute(0);
    metrics::counter!("flights.fetch.failed").absolute(0);
    metrics::counter!("flights.records.normalized").absolute(0);
    metrics::counter!("flights.records.malformed").absolute(0);
    metrics::counter!("flights.records.stored").absolute(0);
    metrics::counter!("flights.records.store_failed").absolute(0);
    metrics::counter!("flights.nats.published").absolute(0);
    metrics::counter!("flights.nats.publish_failed").absolute(0);
    metrics::counter!("flights.nats.dropped").absolute(0);
}

async fn metrics_handler() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Serve `/metrics` for Prometheus scraping. Runs until the process exits.
pub async fn start_metrics_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Metrics server listening on {}", addr);
            listener
        }
        Err(e) => {
            warn!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        warn!("Metrics server error: {}", e);
    }
}
