use thiserror::Error;

/// A provider snapshot fetch failed. The poller logs it and skips the cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("could not decode snapshot body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A single provider record could not be normalized. The poller logs it and
/// skips that record only.
#[derive(Debug, Error)]
pub enum MalformedRecord {
    #[error("record has no aircraft identity field")]
    MissingIdentity,
    #[error("aircraft identity field is empty")]
    EmptyIdentity,
    #[error("record is not a {expected}")]
    WrongShape { expected: &'static str },
}

/// A durable write failed. Logged and the poller continues with the next
/// record; never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A realtime publish was dropped. Swallowed inside the publisher; only
/// counted and logged.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish queue is full")]
    QueueFull,
    #[error("publish queue is closed")]
    QueueClosed,
    #[error("serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("nats: {0}")]
    Nats(#[from] async_nats::PublishError),
}
