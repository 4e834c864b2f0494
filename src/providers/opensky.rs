use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{MalformedRecord, TransportError};
use crate::flights::{FlightState, Position};
use crate::providers::{Provider, RawRecord, clean_string};

pub const OPENSKY_BASE_URL: &str = "https://opensky-network.org/api";

/// Snapshot fetch timeout. OpenSky's states/all response runs to several MB.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// OpenSky positional state vector slots, per their REST API docs:
/// 0 icao24, 1 callsign, 2 origin_country, 3 time_position, 4 last_contact,
/// 5 longitude, 6 latitude, 7 baro_altitude, 8 on_ground, 9 velocity,
/// 10 true_track, 11 vertical_rate, 12 sensors, 13 geo_altitude, 14 squawk,
/// 15 spi, 16 position_source
const SLOT_ICAO24: usize = 0;
const SLOT_CALLSIGN: usize = 1;
const SLOT_ORIGIN_COUNTRY: usize = 2;
const SLOT_TIME_POSITION: usize = 3;
const SLOT_LAST_CONTACT: usize = 4;
const SLOT_LONGITUDE: usize = 5;
const SLOT_LATITUDE: usize = 6;
const SLOT_BARO_ALTITUDE: usize = 7;
const SLOT_VELOCITY: usize = 9;
const SLOT_TRUE_TRACK: usize = 10;
const SLOT_VERTICAL_RATE: usize = 11;
const SLOT_GEO_ALTITUDE: usize = 13;

/// Optional basic-auth credentials. Anonymous access works but is rate
/// limited harder by OpenSky.
#[derive(Debug, Clone)]
pub struct OpenSkyCredentials {
    pub username: String,
    pub password: String,
}

/// Client for the OpenSky Network states/all REST endpoint
#[derive(Clone)]
pub struct OpenSkyClient {
    client: Client,
    base_url: String,
    credentials: Option<OpenSkyCredentials>,
}

#[derive(Debug, Deserialize)]
struct StatesResponse {
    /// Null or absent when OpenSky has no data for the request
    states: Option<Vec<Value>>,
}

impl OpenSkyClient {
    pub fn new(client: Client, credentials: Option<OpenSkyCredentials>) -> Self {
        Self {
            client,
            base_url: OPENSKY_BASE_URL.to_string(),
            credentials,
        }
    }

    /// Point the client at a different base URL (test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Provider for OpenSkyClient {
    fn name(&self) -> &'static str {
        "opensky"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RawRecord>, TransportError> {
        let url = format!("{}/states/all", self.base_url);
        debug!("Fetching OpenSky snapshot from {}", url);

        let mut request = self.client.get(&url).timeout(FETCH_TIMEOUT);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        let body: StatesResponse = response.json().await.map_err(TransportError::Body)?;
        Ok(body.states.unwrap_or_default())
    }

    fn normalize(&self, record: &RawRecord) -> Result<FlightState, MalformedRecord> {
        normalize_state(record, self.name())
    }
}

/// Convert one OpenSky positional state vector into a canonical
/// [`FlightState`].
///
/// Only the identity slot is required; every other slot reads defensively so
/// a null, missing, or wrong-typed value becomes `None` instead of failing
/// the record.
pub fn normalize_state(record: &Value, source: &str) -> Result<FlightState, MalformedRecord> {
    let slots = record.as_array().ok_or(MalformedRecord::WrongShape {
        expected: "positional state array",
    })?;

    let icao24 = match str_slot(slots, SLOT_ICAO24) {
        None => return Err(MalformedRecord::MissingIdentity),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(MalformedRecord::EmptyIdentity);
            }
            trimmed.to_string()
        }
    };

    // Position is all-or-nothing: a lone latitude or longitude is dropped.
    let position = match (
        f64_slot(slots, SLOT_LATITUDE),
        f64_slot(slots, SLOT_LONGITUDE),
    ) {
        (Some(latitude), Some(longitude)) => Some(Position {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(FlightState {
        icao24,
        callsign: clean_string(str_slot(slots, SLOT_CALLSIGN)),
        origin_country: clean_string(str_slot(slots, SLOT_ORIGIN_COUNTRY)),
        position,
        // Barometric altitude wins over geometric when both are reported
        altitude: f64_slot(slots, SLOT_BARO_ALTITUDE).or_else(|| f64_slot(slots, SLOT_GEO_ALTITUDE)),
        velocity: f64_slot(slots, SLOT_VELOCITY),
        heading: f64_slot(slots, SLOT_TRUE_TRACK),
        vertical_rate: f64_slot(slots, SLOT_VERTICAL_RATE),
        // time_position wins over last_contact when both are reported
        last_seen: i64_slot(slots, SLOT_TIME_POSITION).or_else(|| i64_slot(slots, SLOT_LAST_CONTACT)),
        source: source.to_string(),
        flight_number: None,
        country_name: None,
    })
}

fn str_slot(slots: &[Value], idx: usize) -> Option<&str> {
    slots.get(idx).and_then(Value::as_str)
}

fn f64_slot(slots: &[Value], idx: usize) -> Option<f64> {
    slots.get(idx).and_then(Value::as_f64)
}

fn i64_slot(slots: &[Value], idx: usize) -> Option<i64> {
    slots
        .get(idx)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_state() {
        let record = json!([
            "abc123", " UAL123 ", "United States", 1700000000, 1700000010,
            -122.2, 37.5, 1000.0, false, 250.0, 90.0, 0.0, null, 1050.0,
            "7700", false, 0
        ]);

        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.icao24, "abc123");
        assert_eq!(state.callsign.as_deref(), Some("UAL123"));
        assert_eq!(state.origin_country.as_deref(), Some("United States"));
        assert_eq!(
            state.position,
            Some(Position {
                latitude: 37.5,
                longitude: -122.2
            })
        );
        assert_eq!(state.altitude, Some(1000.0));
        assert_eq!(state.velocity, Some(250.0));
        assert_eq!(state.heading, Some(90.0));
        assert_eq!(state.vertical_rate, Some(0.0));
        assert_eq!(state.last_seen, Some(1700000000));
        assert_eq!(state.source, "opensky");
        assert_eq!(state.flight_number, None);
    }

    #[test]
    fn test_normalize_missing_identity() {
        let record = json!([null, "UAL123", "United States"]);
        assert!(matches!(
            normalize_state(&record, "opensky"),
            Err(MalformedRecord::MissingIdentity)
        ));

        let record = json!([]);
        assert!(matches!(
            normalize_state(&record, "opensky"),
            Err(MalformedRecord::MissingIdentity)
        ));
    }

    #[test]
    fn test_normalize_empty_identity() {
        let record = json!(["   ", "UAL123"]);
        assert!(matches!(
            normalize_state(&record, "opensky"),
            Err(MalformedRecord::EmptyIdentity)
        ));
    }

    #[test]
    fn test_normalize_wrong_shape() {
        let record = json!({"icao24": "abc123"});
        assert!(matches!(
            normalize_state(&record, "opensky"),
            Err(MalformedRecord::WrongShape { .. })
        ));
    }

    #[test]
    fn test_normalize_identity_is_trimmed() {
        let record = json!([" abc123 "]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.icao24, "abc123");
    }

    #[test]
    fn test_blank_callsign_becomes_none() {
        let record = json!(["abc123", "        ", null]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.callsign, None);
        assert_eq!(state.origin_country, None);
    }

    #[test]
    fn test_altitude_coalesces_to_geometric() {
        // Barometric (slot 7) null, geometric (slot 13) set
        let record = json!([
            "abc123", null, null, null, null, null, null, null, false, null,
            null, null, null, 500.0
        ]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.altitude, Some(500.0));
    }

    #[test]
    fn test_altitude_prefers_barometric() {
        let record = json!([
            "abc123", null, null, null, null, null, null, 1000.0, false, null,
            null, null, null, 500.0
        ]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.altitude, Some(1000.0));
    }

    #[test]
    fn test_timestamp_prefers_time_position() {
        let record = json!(["abc123", null, null, 1000, 2000]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.last_seen, Some(1000));

        let record = json!(["abc123", null, null, null, 2000]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.last_seen, Some(2000));
    }

    #[test]
    fn test_lone_coordinate_drops_position() {
        // Longitude present, latitude null
        let record = json!(["abc123", null, null, null, null, -122.2, null]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.position, None);
    }

    #[test]
    fn test_wrong_typed_slots_read_as_absent() {
        // Numeric slots holding strings, string slots holding numbers
        let record = json!(["abc123", 42, 7, "soon", "later", "x", "y", "high"]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.callsign, None);
        assert_eq!(state.origin_country, None);
        assert_eq!(state.last_seen, None);
        assert_eq!(state.position, None);
        assert_eq!(state.altitude, None);
    }

    #[test]
    fn test_integer_altitude_reads_as_float() {
        let record = json!([
            "abc123", null, null, null, null, null, null, 1000, false
        ]);
        let state = normalize_state(&record, "opensky").unwrap();
        assert_eq!(state.altitude, Some(1000.0));
    }

    #[test]
    fn test_states_response_tolerates_missing_key() {
        let body: StatesResponse = serde_json::from_str(r#"{"time": 1700000000}"#).unwrap();
        assert!(body.states.is_none());

        let body: StatesResponse =
            serde_json::from_str(r#"{"time": 1700000000, "states": null}"#).unwrap();
        assert!(body.states.is_none());

        let body: StatesResponse =
            serde_json::from_str(r#"{"time": 1700000000, "states": [["abc123"]]}"#).unwrap();
        assert_eq!(body.states.unwrap().len(), 1);
    }
}
