use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::flights_repo::SightingStore;
use crate::nats_publisher::StatePublisher;
use crate::providers::Provider;

/// Counts for one fetch/process cycle, mostly for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub normalized: usize,
    pub malformed: usize,
    pub stored: usize,
    pub store_failures: usize,
}

/// Drives one provider: fetch a snapshot, normalize each record, fan out to
/// the publisher (best-effort) and the store (durable), sleep, repeat.
///
/// Every failure below initialization is contained here: a failed fetch
/// skips the cycle, a malformed record or failed write skips that record.
/// Nothing crosses the loop boundary.
pub struct Poller {
    provider: Arc<dyn Provider>,
    store: Arc<dyn SightingStore>,
    publisher: Arc<dyn StatePublisher>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn SightingStore>,
        publisher: Arc<dyn StatePublisher>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            publisher,
            interval,
        }
    }

    /// One fetch/process cycle. Exposed so tests can drive the pipeline
    /// without the sleep loop.
    pub async fn poll_once(&self) -> CycleStats {
        let source = self.provider.name();
        let mut stats = CycleStats::default();

        let records = match self.provider.fetch_snapshot().await {
            Ok(records) => {
                metrics::counter!("flights.fetch.success").increment(1);
                records
            }
            Err(e) => {
                metrics::counter!("flights.fetch.failed").increment(1);
                warn!(source, "Snapshot fetch failed, skipping cycle: {}", e);
                return stats;
            }
        };

        stats.fetched = records.len();
        debug!(source, "Snapshot contains {} state vectors", records.len());

        // Records are processed sequentially, so upserts for one aircraft
        // from this provider apply in snapshot order.
        for record in &records {
            let state = match self.provider.normalize(record) {
                Ok(state) => state,
                Err(e) => {
                    stats.malformed += 1;
                    metrics::counter!("flights.records.malformed").increment(1);
                    warn!(source, "Skipping malformed record: {}", e);
                    continue;
                }
            };
            stats.normalized += 1;
            metrics::counter!("flights.records.normalized").increment(1);

            // Realtime sink first; it never blocks or fails the durable write
            self.publisher.publish(&state);

            match self.store.record_sighting(&state).await {
                Ok(()) => {
                    stats.stored += 1;
                    metrics::counter!("flights.records.stored").increment(1);
                }
                Err(e) => {
                    stats.store_failures += 1;
                    metrics::counter!("flights.records.store_failed").increment(1);
                    error!(source, icao24 = %state.icao24, "Failed to store sighting: {}", e);
                }
            }
        }

        stats
    }

    /// Poll until cancelled. The sleep is a fixed delay after processing,
    /// not a fixed-rate schedule: effective period = interval + work time.
    pub async fn run(&self, cancel: CancellationToken) {
        let source = self.provider.name();
        info!(source, interval = ?self.interval, "Poller started");

        loop {
            let stats = self.poll_once().await;
            if stats.fetched > 0 {
                info!(
                    source,
                    fetched = stats.fetched,
                    stored = stats.stored,
                    malformed = stats.malformed,
                    store_failures = stats.store_failures,
                    "Cycle complete"
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(source, "Poller stopped");
    }
}
