//! Snapshot providers.
//!
//! Each provider knows how to fetch one full "all current aircraft" snapshot
//! and how to normalize its own record shape into a [`FlightState`]. The
//! poller only ever talks to the [`Provider`] trait, so adding a commercial
//! feed means implementing this trait and wiring it into the runner.

pub mod flightaware;
pub mod opensky;

use async_trait::async_trait;

use crate::errors::{MalformedRecord, TransportError};
use crate::flights::FlightState;

/// One raw, provider-shaped record out of a snapshot. OpenSky uses positional
/// arrays, commercial APIs use keyed objects; normalization sorts it out.
pub type RawRecord = serde_json::Value;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Source tag stamped onto every record this provider produces.
    fn name(&self) -> &'static str;

    /// Fetch the provider's full current snapshot. A missing top-level state
    /// list is "no data", not an error; transport and HTTP failures are.
    async fn fetch_snapshot(&self) -> Result<Vec<RawRecord>, TransportError>;

    /// Normalize one raw record. Pure and synchronous; only an unreadable
    /// aircraft identity fails the record, every other field degrades to
    /// `None`.
    fn normalize(&self, record: &RawRecord) -> Result<FlightState, MalformedRecord>;
}

/// Read a string field, treating whitespace-only values as absent.
pub(crate) fn clean_string(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
