use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::providers::opensky::OpenSkyCredentials;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
pub const DEFAULT_NATS_SUBJECT: &str = "flights.realtime";

/// Environment-sourced runtime configuration. `dotenvy` has already loaded
/// `.env` by the time this runs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fixed delay between poll cycles, per provider.
    pub poll_interval: Duration,
    pub database_url: String,
    pub nats_url: String,
    pub nats_subject: String,
    /// Optional basic auth; anonymous OpenSky access works at lower rates.
    pub opensky_credentials: Option<OpenSkyCredentials>,
    /// Presence of a key enables the FlightAware poller.
    pub flightaware_api_key: Option<String>,
    /// When set, serve Prometheus metrics on this port.
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let poll_interval_secs = match env::var("POLL_INTERVAL_SECONDS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .context("POLL_INTERVAL_SECONDS must be an integer")?;
                if secs < 1 {
                    bail!("POLL_INTERVAL_SECONDS must be at least 1");
                }
                secs
            }
            Err(_) => DEFAULT_POLL_INTERVAL_SECS,
        };

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL must be set in the environment")?;

        let nats_url = env::var("NATS_URL").unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
        let nats_subject =
            env::var("NATS_SUBJECT").unwrap_or_else(|_| DEFAULT_NATS_SUBJECT.to_string());

        let opensky_credentials = match (env::var("OPENSKY_USERNAME"), env::var("OPENSKY_PASSWORD"))
        {
            (Ok(username), Ok(password)) => Some(OpenSkyCredentials { username, password }),
            _ => None,
        };

        let flightaware_api_key = env::var("FLIGHTAWARE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(raw) => Some(raw.parse().context("METRICS_PORT must be a port number")?),
            Err(_) => None,
        };

        Ok(Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            database_url,
            nats_url,
            nats_subject,
            opensky_credentials,
            flightaware_api_key,
            metrics_port,
        })
    }
}
