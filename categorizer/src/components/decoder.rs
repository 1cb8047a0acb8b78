use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::blockchain::LogEntry;

/// A log interpreted through its smartcontract's interface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Interprets the logs of one smartcontract. How that is done is up to the
/// implementation; the categorizer only needs the result.
pub trait LogDecoder: Send + Sync + 'static {
    fn decode(&self, log: &LogEntry) -> Result<DecodedEvent, anyhow::Error>;
}

/// Builds a decoder from the contract interface that comes with a
/// smartcontract registration.
pub trait DecoderFactory: Send + Sync + 'static {
    fn decoder(&self, abi: &Value) -> Result<Arc<dyn LogDecoder>, anyhow::Error>;
}
