/// Blockchain data: networks, blocks and the logs they carry.
pub mod blockchain;

/// Traits for the collaborators the categorizer talks to, and the metrics
/// registry.
pub mod components;

/// Smartcontract categorization state.
pub mod data;

/// Environment variable configuration.
pub mod env;

/// Logging facilities based on `slog`.
pub mod log;

/// The wire message envelope exchanged with other services.
pub mod message;

/// In-memory collaborators for tests.
pub mod mock;

/// Utilities.
pub mod util;

pub use anyhow;
pub use futures03;
pub use itertools;
pub use parking_lot;
pub use prometheus;
pub use serde_json;
pub use slog;
pub use tokio;

pub use util::spawn;

/// A prelude that makes all component traits and data types available.
///
/// Add the following code to import all traits and data types listed below at once.
///
/// ```
/// use categorizer::prelude::*;
/// ```
pub mod prelude {
    pub use ::anyhow;
    pub use anyhow::{anyhow, Context as _, Error};
    pub use async_trait::async_trait;
    pub use futures03;
    pub use itertools::Itertools;
    pub use lazy_static::lazy_static;
    pub use parking_lot;
    pub use serde;
    pub use serde_derive::{Deserialize, Serialize};
    pub use serde_json;
    pub use slog::{self, crit, debug, error, info, o, trace, warn, Logger};
    pub use std::fmt::Debug;
    pub use std::sync::Arc;
    pub use std::time::Duration;
    pub use thiserror;
    pub use tokio;

    pub use crate::blockchain::{
        Block, BlockBroadcast, BlockNumber, LogEntry, Network, NetworkId, Networks,
    };
    pub use crate::components::decoder::{DecodedEvent, DecoderFactory, LogDecoder};
    pub use crate::components::feed::BroadcastFeed;
    pub use crate::components::log_source::{
        fetch_logs, HistoricalLogSource, LogFilterResult, LogSourceError,
    };
    pub use crate::components::metrics::{Counter, Gauge, MetricsRegistry};
    pub use crate::components::sink::ResultSink;
    pub use crate::components::TransportError;
    pub use crate::data::smartcontract::Smartcontract;
    pub use crate::env::ENV_VARS;
    pub use crate::log::codes::LogCode;
    pub use crate::message::{
        Broadcast, Command, MessageError, Parameters, Reply, ReplyStatus, Request,
    };
    pub use crate::util::backoff::ExponentialBackoff;
    pub use crate::util::bounded_queue::BoundedQueue;
}
