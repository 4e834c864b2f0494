use serde::{Deserialize, Serialize};

/// A latitude/longitude pair. Both coordinates are always present together;
/// a record with only one of them carries no position at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Canonical aircraft state vector, the unit flowing through the whole
/// pipeline: provider record in, `FlightState` out, fanned out to NATS and
/// Postgres. Immutable once produced.
///
/// `icao24` and `source` are always present; everything else is optional and
/// absent fields never fail normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    /// Transponder hex address, the natural key for current-state rows.
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    /// Flattened so the publish payload stays a flat key/value map.
    #[serde(flatten)]
    pub position: Option<Position>,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    pub heading: Option<f64>,
    pub vertical_rate: Option<f64>,
    /// Epoch seconds of the sighting, as reported by the provider.
    pub last_seen: Option<i64>,
    /// Which provider produced this record ("opensky", "flightaware", ...).
    pub source: String,
    /// Only populated by richer (commercial) providers.
    pub flight_number: Option<String>,
    pub country_name: Option<String>,
}

impl FlightState {
    pub fn latitude(&self) -> Option<f64> {
        self.position.map(|p| p.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.position.map(|p| p.longitude)
    }
}
