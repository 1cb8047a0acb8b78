//! The seams between the categorizer and the services around it. The
//! categorizer core only ever talks to these traits; the transports behind
//! them live elsewhere.

/// Decoding of raw logs into events.
pub mod decoder;

/// The live block broadcast feed.
pub mod feed;

/// The historical log source used for catch-up.
pub mod log_source;

/// Prometheus metrics.
pub mod metrics;

/// The downstream channel for categorized results.
pub mod sink;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("channel closed")]
    Closed,
    #[error("channel is full")]
    Full,
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("{0:#}")]
    Unknown(anyhow::Error),
}
