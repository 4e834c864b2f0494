use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use tracing::debug;
use uuid::Uuid;

use crate::db::PgPool;
use crate::errors::StoreError;
use crate::flights::{FlightState, Position};

/// Durable sink for normalized sightings. Implementations must be safe for
/// concurrent use from multiple pollers without external locking.
#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Overwrite the current-state row for `state.icao24`, inserting it on
    /// first sighting. Latest write wins; there is deliberately no
    /// `last_seen` ordering guard, so a late-arriving stale sighting may
    /// overwrite a fresher row.
    async fn upsert_current(&self, state: &FlightState) -> Result<(), StoreError>;

    /// Append one immutable history row for the sighting.
    async fn append_history(&self, state: &FlightState, timestamp: i64) -> Result<(), StoreError>;

    /// Combined per-record unit of work: history append and current upsert
    /// succeed or fail together.
    async fn record_sighting(&self, state: &FlightState) -> Result<(), StoreError>;
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::flights_current)]
#[diesel(treat_none_as_null = true)]
struct CurrentRow {
    id: Uuid,
    icao24: String,
    callsign: Option<String>,
    flight_number: Option<String>,
    origin_country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    altitude: Option<f64>,
    velocity: Option<f64>,
    heading: Option<f64>,
    vertical_rate: Option<f64>,
    last_seen: Option<i64>,
    source: String,
    country_name: Option<String>,
}

impl CurrentRow {
    fn from_state(state: &FlightState) -> Self {
        Self {
            // Fresh id for the insert arm; the conflict arm never touches it
            id: Uuid::new_v4(),
            icao24: state.icao24.clone(),
            callsign: state.callsign.clone(),
            flight_number: state.flight_number.clone(),
            origin_country: state.origin_country.clone(),
            lat: state.latitude(),
            lon: state.longitude(),
            altitude: state.altitude,
            velocity: state.velocity,
            heading: state.heading,
            vertical_rate: state.vertical_rate,
            last_seen: state.last_seen,
            source: state.source.clone(),
            country_name: state.country_name.clone(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::flights_history)]
struct HistoryRow {
    id: Uuid,
    icao24: String,
    timestamp: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    altitude: Option<f64>,
    velocity: Option<f64>,
    source: String,
}

impl HistoryRow {
    fn from_state(state: &FlightState, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            icao24: state.icao24.clone(),
            timestamp,
            lat: state.latitude(),
            lon: state.longitude(),
            altitude: state.altitude,
            velocity: state.velocity,
            source: state.source.clone(),
        }
    }
}

#[derive(Queryable)]
struct CurrentDslRow {
    icao24: String,
    callsign: Option<String>,
    flight_number: Option<String>,
    origin_country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    altitude: Option<f64>,
    velocity: Option<f64>,
    heading: Option<f64>,
    vertical_rate: Option<f64>,
    last_seen: Option<i64>,
    source: String,
    country_name: Option<String>,
}

impl From<CurrentDslRow> for FlightState {
    fn from(row: CurrentDslRow) -> Self {
        let position = match (row.lat, row.lon) {
            (Some(latitude), Some(longitude)) => Some(Position {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            icao24: row.icao24,
            callsign: row.callsign,
            origin_country: row.origin_country,
            position,
            altitude: row.altitude,
            velocity: row.velocity,
            heading: row.heading,
            vertical_rate: row.vertical_rate,
            last_seen: row.last_seen,
            source: row.source,
            flight_number: row.flight_number,
            country_name: row.country_name,
        }
    }
}

/// One stored history sighting, for time-series playback.
#[derive(Debug, Clone, Queryable)]
pub struct HistorySighting {
    pub id: Uuid,
    pub icao24: String,
    pub timestamp: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    pub source: String,
}

/// Postgres-backed store for the two flight relations
#[derive(Clone)]
pub struct FlightsRepository {
    pool: PgPool,
}

impl FlightsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn upsert_current_sync(
        conn: &mut PgConnection,
        state: &FlightState,
    ) -> Result<(), diesel::result::Error> {
        use crate::schema::flights_current::dsl::*;

        let row = CurrentRow::from_state(state);
        // The unique index on icao24 makes concurrent upserts for the same
        // aircraft serialize inside Postgres; last write wins.
        diesel::insert_into(flights_current)
            .values(&row)
            .on_conflict(icao24)
            .do_update()
            .set(&row)
            .execute(conn)?;
        Ok(())
    }

    fn append_history_sync(
        conn: &mut PgConnection,
        state: &FlightState,
        ts: i64,
    ) -> Result<(), diesel::result::Error> {
        use crate::schema::flights_history::dsl::*;

        diesel::insert_into(flights_history)
            .values(&HistoryRow::from_state(state, ts))
            .execute(conn)?;
        Ok(())
    }

    /// Latest known state for one aircraft, if it has been sighted.
    pub async fn get_current(&self, icao24_param: &str) -> Result<Option<FlightState>, StoreError> {
        use crate::schema::flights_current::dsl::*;

        let pool = self.pool.clone();
        let icao24_param = icao24_param.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let row = flights_current
                .filter(icao24.eq(&icao24_param))
                .select((
                    icao24,
                    callsign,
                    flight_number,
                    origin_country,
                    lat,
                    lon,
                    altitude,
                    velocity,
                    heading,
                    vertical_rate,
                    last_seen,
                    source,
                    country_name,
                ))
                .first::<CurrentDslRow>(&mut conn)
                .optional()?;
            Ok::<Option<FlightState>, StoreError>(row.map(FlightState::from))
        })
        .await?
    }

    /// History rows for one aircraft in time order, oldest first.
    pub async fn get_history(
        &self,
        icao24_param: &str,
        limit: i64,
    ) -> Result<Vec<HistorySighting>, StoreError> {
        use crate::schema::flights_history::dsl::*;

        let pool = self.pool.clone();
        let icao24_param = icao24_param.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let rows = flights_history
                .filter(icao24.eq(&icao24_param))
                .order(timestamp.asc())
                .limit(limit)
                .load::<HistorySighting>(&mut conn)?;
            Ok::<Vec<HistorySighting>, StoreError>(rows)
        })
        .await?
    }
}

#[async_trait]
impl SightingStore for FlightsRepository {
    async fn upsert_current(&self, state: &FlightState) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Self::upsert_current_sync(&mut conn, &state)?;
            Ok::<(), StoreError>(())
        })
        .await?
    }

    async fn append_history(&self, state: &FlightState, timestamp: i64) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Self::append_history_sync(&mut conn, &state, timestamp)?;
            Ok::<(), StoreError>(())
        })
        .await?
    }

    async fn record_sighting(&self, state: &FlightState) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let state = state.clone();
        // History rows are stamped with wall clock at write time, not the
        // provider's last_seen.
        let ts = Utc::now().timestamp();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            conn.transaction(|conn| {
                Self::upsert_current_sync(conn, &state)?;
                Self::append_history_sync(conn, &state, ts)
            })?;
            debug!(
                icao24 = %state.icao24,
                source = %state.source,
                "Recorded sighting"
            );
            Ok::<(), StoreError>(())
        })
        .await?
    }
}
