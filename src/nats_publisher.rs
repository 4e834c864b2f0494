use anyhow::Result;
use async_nats::Client;
use tracing::{debug, info, warn};

use crate::errors::PublishError;
use crate::flights::FlightState;

/// Queue between pollers and the NATS forwarder task. When it fills, new
/// payloads are dropped instead of blocking a poller: realtime consumers get
/// best-effort delivery, the durable store gets every record.
const PUBLISH_QUEUE_SIZE: usize = 1000;

/// Best-effort realtime sink. `publish` must never block the caller and
/// never surface a failure; a dropped update is logged and counted, nothing
/// more.
pub trait StatePublisher: Send + Sync {
    fn publish(&self, state: &FlightState);
}

/// Publish one state to NATS as flat JSON
async fn publish_to_nats(
    client: &Client,
    subject: &str,
    state: &FlightState,
) -> Result<(), PublishError> {
    let payload = serde_json::to_vec(state)?;
    client.publish(subject.to_string(), payload.into()).await?;
    debug!(icao24 = %state.icao24, "Published state to {}", subject);
    Ok(())
}

/// NATS publisher for normalized flight states
#[derive(Clone)]
pub struct NatsStatePublisher {
    tx: flume::Sender<FlightState>,
}

impl NatsStatePublisher {
    /// Connect to NATS and start the forwarder task. A connection failure
    /// here is an initialization failure; the process should not start
    /// polling without its realtime sink.
    pub async fn connect(nats_url: &str, subject: &str) -> Result<Self> {
        info!("Connecting to NATS server at {}", nats_url);
        let client = async_nats::ConnectOptions::new()
            .name("skyfeed")
            .connect(nats_url)
            .await?;
        Ok(Self::with_client(client, subject))
    }

    /// Wrap an existing NATS client; spawns the forwarder that drains the
    /// bounded queue.
    pub fn with_client(client: Client, subject: &str) -> Self {
        let (tx, rx) = flume::bounded::<FlightState>(PUBLISH_QUEUE_SIZE);
        let subject = subject.to_string();

        tokio::spawn(async move {
            while let Ok(state) = rx.recv_async().await {
                match publish_to_nats(&client, &subject, &state).await {
                    Ok(()) => {
                        metrics::counter!("flights.nats.published").increment(1);
                    }
                    Err(e) => {
                        metrics::counter!("flights.nats.publish_failed").increment(1);
                        warn!(icao24 = %state.icao24, "Failed to publish state: {}", e);
                    }
                }
            }
            debug!("Publish queue closed, NATS forwarder exiting");
        });

        Self { tx }
    }

    fn try_enqueue(&self, state: &FlightState) -> Result<(), PublishError> {
        self.tx.try_send(state.clone()).map_err(|e| match e {
            flume::TrySendError::Full(_) => PublishError::QueueFull,
            flume::TrySendError::Disconnected(_) => PublishError::QueueClosed,
        })
    }
}

impl StatePublisher for NatsStatePublisher {
    fn publish(&self, state: &FlightState) {
        if let Err(e) = self.try_enqueue(state) {
            metrics::counter!("flights.nats.dropped").increment(1);
            warn!(
                icao24 = %state.icao24,
                source = %state.source,
                "Dropping realtime update: {}", e
            );
        }
    }
}
