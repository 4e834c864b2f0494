// Shared fakes for pipeline integration tests: an in-memory store, a
// recording publisher, and a scripted provider with a keyed record shape.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use skyfeed::errors::{MalformedRecord, StoreError, TransportError};
use skyfeed::flights::{FlightState, Position};
use skyfeed::flights_repo::SightingStore;
use skyfeed::nats_publisher::StatePublisher;
use skyfeed::providers::{Provider, RawRecord};

/// In-memory stand-in for the Postgres repository. Mirrors its semantics:
/// one current row per icao24, append-only history, combined writes succeed
/// or fail together.
#[derive(Default)]
pub struct MemoryStore {
    pub current: Mutex<HashMap<String, FlightState>>,
    pub history: Mutex<Vec<(i64, FlightState)>>,
    /// Sightings for this aircraft fail with a store error.
    pub fail_icao24: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn fail_for(&self, icao24: &str) {
        *self.fail_icao24.lock().unwrap() = Some(icao24.to_string());
    }

    pub fn current_count(&self) -> usize {
        self.current.lock().unwrap().len()
    }

    pub fn history_count(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    pub fn history_count_for(&self, icao24: &str) -> usize {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.icao24 == icao24)
            .count()
    }

    pub fn get_current(&self, icao24: &str) -> Option<FlightState> {
        self.current.lock().unwrap().get(icao24).cloned()
    }

    fn check_failure(&self, state: &FlightState) -> Result<(), StoreError> {
        if self.fail_icao24.lock().unwrap().as_deref() == Some(state.icao24.as_str()) {
            // Any database error will do for the fake
            return Err(StoreError::Database(diesel::result::Error::NotFound));
        }
        Ok(())
    }
}

#[async_trait]
impl SightingStore for MemoryStore {
    async fn upsert_current(&self, state: &FlightState) -> Result<(), StoreError> {
        self.check_failure(state)?;
        self.current
            .lock()
            .unwrap()
            .insert(state.icao24.clone(), state.clone());
        Ok(())
    }

    async fn append_history(&self, state: &FlightState, timestamp: i64) -> Result<(), StoreError> {
        self.check_failure(state)?;
        self.history
            .lock()
            .unwrap()
            .push((timestamp, state.clone()));
        Ok(())
    }

    async fn record_sighting(&self, state: &FlightState) -> Result<(), StoreError> {
        // Combined unit of work: nothing is written when either half fails
        self.check_failure(state)?;
        self.upsert_current(state).await?;
        self.append_history(state, chrono::Utc::now().timestamp())
            .await
    }
}

/// Records everything it is asked to publish.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<FlightState>>,
}

impl RecordingPublisher {
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn published_states(&self) -> Vec<FlightState> {
        self.published.lock().unwrap().clone()
    }
}

impl StatePublisher for RecordingPublisher {
    fn publish(&self, state: &FlightState) {
        self.published.lock().unwrap().push(state.clone());
    }
}

/// Provider fed from canned snapshots, using a keyed record shape:
/// `id`, `callsign`, `lat`, `lon`, `alt_a`/`alt_b` (first non-null wins),
/// `vel`, `hdg`, `vr`, `t_a`/`t_b` (first non-null wins).
pub struct ScriptedProvider {
    snapshots: Mutex<Vec<Result<Vec<RawRecord>, TransportError>>>,
}

impl ScriptedProvider {
    pub fn new(snapshots: Vec<Result<Vec<RawRecord>, TransportError>>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots),
        }
    }

    pub fn single(records: Vec<RawRecord>) -> Self {
        Self::new(vec![Ok(records)])
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "opensky"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RawRecord>, TransportError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }
        snapshots.remove(0)
    }

    fn normalize(&self, record: &RawRecord) -> Result<FlightState, MalformedRecord> {
        let fields = record.as_object().ok_or(MalformedRecord::WrongShape {
            expected: "keyed record object",
        })?;

        let icao24 = match fields.get("id").and_then(Value::as_str) {
            None => return Err(MalformedRecord::MissingIdentity),
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(MalformedRecord::EmptyIdentity);
                }
                trimmed.to_string()
            }
        };

        let get_f64 = |key: &str| fields.get(key).and_then(Value::as_f64);
        let get_i64 = |key: &str| fields.get(key).and_then(Value::as_i64);

        let position = match (get_f64("lat"), get_f64("lon")) {
            (Some(latitude), Some(longitude)) => Some(Position {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(FlightState {
            icao24,
            callsign: fields
                .get("callsign")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            origin_country: None,
            position,
            altitude: get_f64("alt_a").or_else(|| get_f64("alt_b")),
            velocity: get_f64("vel"),
            heading: get_f64("hdg"),
            vertical_rate: get_f64("vr"),
            last_seen: get_i64("t_a").or_else(|| get_i64("t_b")),
            source: self.name().to_string(),
            flight_number: None,
            country_name: None,
        })
    }
}
