//! FlightAware extension point.
//!
//! Commercial feed integration is not implemented; this provider exists so
//! the runner, config, and normalization contract already have a seat for it.
//! It is only constructed when an API key is configured, and its snapshot
//! fetch yields no data until the AeroAPI search call is wired in.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::errors::{MalformedRecord, TransportError};
use crate::flights::{FlightState, Position};
use crate::providers::{Provider, RawRecord, clean_string};

#[derive(Clone)]
pub struct FlightAwareClient {
    #[allow(dead_code)] // Held for the eventual AeroAPI request
    client: Client,
    #[allow(dead_code)]
    api_key: String,
}

impl FlightAwareClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Provider for FlightAwareClient {
    fn name(&self) -> &'static str {
        "flightaware"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RawRecord>, TransportError> {
        debug!("FlightAware snapshot fetch not implemented, returning empty snapshot");
        Ok(Vec::new())
    }

    fn normalize(&self, record: &RawRecord) -> Result<FlightState, MalformedRecord> {
        normalize_record(record, self.name())
    }
}

/// Normalize one keyed FlightAware-style record. Same contract as OpenSky:
/// only the identity key is required, everything else reads defensively.
pub fn normalize_record(record: &Value, source: &str) -> Result<FlightState, MalformedRecord> {
    let fields = record.as_object().ok_or(MalformedRecord::WrongShape {
        expected: "keyed record object",
    })?;

    let icao24 = match fields.get("hexid").and_then(Value::as_str) {
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
    let get_str = |key: &str| fields.get(key).and_then(Value::as_str);

    let position = match (get_f64("lat"), get_f64("lon")) {
        (Some(latitude), Some(longitude)) => Some(Position {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(FlightState {
        icao24,
        callsign: clean_string(get_str("ident")),
        origin_country: clean_string(get_str("origin_country")),
        position,
        altitude: get_f64("alt"),
        velocity: get_f64("groundspeed"),
        heading: get_f64("heading"),
        vertical_rate: get_f64("vertical_rate"),
        last_seen: fields.get("timestamp").and_then(Value::as_i64),
        source: source.to_string(),
        flight_number: clean_string(get_str("flight_number")),
        country_name: clean_string(get_str("country_name")),
    })
}
