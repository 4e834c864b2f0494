//! skyfeed - live aircraft state-vector ingestion pipeline
//!
//! Polls public aggregation APIs (OpenSky) on a fixed interval, normalizes
//! provider records into a canonical flight state, and fans each record out
//! to NATS (best-effort realtime) and Postgres (current state per aircraft
//! plus append-only history).

pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod flights;
pub mod flights_repo;
pub mod metrics;
pub mod nats_publisher;
pub mod poller;
pub mod providers;
pub mod schema;

pub use config::Config;
pub use flights::{FlightState, Position};
pub use flights_repo::{FlightsRepository, SightingStore};
pub use nats_publisher::{NatsStatePublisher, StatePublisher};
pub use poller::{CycleStats, Poller};
pub use providers::Provider;
