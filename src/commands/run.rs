use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::db::PgPool;
use crate::flights_repo::{FlightsRepository, SightingStore};
use crate::nats_publisher::{NatsStatePublisher, StatePublisher};
use crate::poller::Poller;
use crate::providers::Provider;
use crate::providers::flightaware::FlightAwareClient;
use crate::providers::opensky::OpenSkyClient;

/// Start one poller per configured provider and run until shutdown.
///
/// Everything the pollers depend on is initialized here, once, before any of
/// them starts; a store or publisher that cannot be reached at startup aborts
/// the process instead of letting pollers run against a broken dependency.
pub async fn handle_run(config: Config, pool: PgPool) -> Result<()> {
    crate::metrics::init_metrics();
    crate::metrics::initialize_pipeline_metrics();
    if let Some(port) = config.metrics_port {
        tokio::spawn(async move {
            crate::metrics::start_metrics_server(port).await;
        });
    }

    let publisher = NatsStatePublisher::connect(&config.nats_url, &config.nats_subject)
        .await
        .context("Failed to connect to NATS")?;
    let publisher: Arc<dyn StatePublisher> = Arc::new(publisher);

    let store: Arc<dyn SightingStore> = Arc::new(FlightsRepository::new(pool));

    let http = reqwest::Client::builder()
        .user_agent("skyfeed/0.1")
        .build()
        .context("Failed to build HTTP client")?;

    let mut providers: Vec<Arc<dyn Provider>> = vec![Arc::new(OpenSkyClient::new(
        http.clone(),
        config.opensky_credentials.clone(),
    ))];
    match &config.flightaware_api_key {
        Some(key) => {
            providers.push(Arc::new(FlightAwareClient::new(http, key.clone())));
        }
        None => info!("FLIGHTAWARE_API_KEY not set, FlightAware poller disabled"),
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal, letting in-flight work finish...");
                    cancel.cancel();
                }
                Err(e) => {
                    error!("Unable to listen for shutdown signal: {}", e);
                }
            }
        });
    }

    let mut pollers = JoinSet::new();
    for provider in providers {
        let poller = Poller::new(
            provider,
            store.clone(),
            publisher.clone(),
            config.poll_interval,
        );
        let cancel = cancel.clone();
        pollers.spawn(async move {
            poller.run(cancel).await;
        });
    }

    // Pollers only return after cancellation, and each finishes its
    // in-flight snapshot first.
    while let Some(result) = pollers.join_next().await {
        if let Err(e) = result {
            error!("Poller task failed: {}", e);
        }
    }

    info!("All pollers stopped, shutting down");
    Ok(())
}
