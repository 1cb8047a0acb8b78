use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::blockchain::{BlockBroadcast, BlockNumber, LogEntry};
use crate::components::decoder::{DecodedEvent, DecoderFactory, LogDecoder};
use crate::components::log_source::HistoricalLogSource;
use crate::components::sink::ResultSink;
use crate::components::TransportError;
use crate::message::{Broadcast, Command, Parameters, Reply, Request};

/// The wire form of a new-block broadcast for `network_id`.
pub fn block_frame(network_id: &str, number: BlockNumber, logs: Vec<LogEntry>) -> String {
    let payload = BlockBroadcast {
        block_number: number,
        network_id: network_id.to_string(),
        block_timestamp: 1_700_000_000 + number,
        logs,
    };
    let parameters = payload
        .to_parameters()
        .expect("block broadcasts serialize to an object");
    Broadcast::new(network_id, Reply::ok(parameters))
        .to_frame()
        .expect("ok replies are valid")
}

/// A scripted answer of `MockLogSource`.
#[derive(Clone, Debug)]
pub enum SourceOutcome {
    /// Answer with a `fail` reply carrying this message.
    Fail(String),
    /// The request does not reach the source.
    Unreachable,
}

/// A historical log source serving a fixed set of logs. It honors the
/// addresses and block range of each `log_filter` request and records
/// every request it receives. Scripted outcomes are used, in order, before
/// falling back to serving logs.
#[derive(Default)]
pub struct MockLogSource {
    logs: Mutex<Vec<LogEntry>>,
    script: Mutex<VecDeque<SourceOutcome>>,
    requests: Mutex<Vec<Command>>,
}

impl MockLogSource {
    pub fn new(logs: Vec<LogEntry>) -> Arc<Self> {
        Arc::new(MockLogSource {
            logs: Mutex::new(logs),
            ..Default::default()
        })
    }

    pub fn script(&self, outcome: SourceOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Every `log_filter` request received so far.
    pub fn requests(&self) -> Vec<Command> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HistoricalLogSource for MockLogSource {
    async fn request(&self, request: Request) -> Result<Reply, TransportError> {
        let command = Command::try_from(request)
            .map_err(|e| TransportError::Unavailable(format!("bad request: {}", e)))?;
        self.requests.lock().push(command.clone());

        if let Some(outcome) = self.script.lock().pop_front() {
            return match outcome {
                SourceOutcome::Fail(message) => Ok(Reply::fail(message)),
                SourceOutcome::Unreachable => {
                    Err(TransportError::Unavailable("mock source".to_string()))
                }
            };
        }

        let (addresses, from_block, to_block) = match command {
            Command::LogFilter {
                addresses,
                from_block,
                to_block,
            } => (addresses, from_block, to_block),
            other => {
                return Ok(Reply::fail(format!(
                    "unsupported command `{}`",
                    other.name()
                )))
            }
        };

        let logs: Vec<LogEntry> = self
            .logs
            .lock()
            .iter()
            .filter(|log| addresses.iter().any(|address| log.is_for(address)))
            .filter(|log| log.block_number >= from_block)
            .filter(|log| to_block.map_or(true, |to| log.block_number <= to))
            .cloned()
            .collect();

        let parameters = Parameters::new().set(
            "logs",
            serde_json::to_value(logs).map_err(|e| TransportError::Unknown(e.into()))?,
        );
        Ok(Reply::ok(parameters))
    }
}

/// Captures everything pushed downstream. Can be told to refuse pushes.
#[derive(Default)]
pub struct RecordingSink {
    pushed: Mutex<Vec<Request>>,
    failing: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSink::default())
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn requests(&self) -> Vec<Request> {
        self.pushed.lock().clone()
    }

    /// The pushed results as `(address, block numbers of the logs)`.
    pub fn categorized(&self) -> Vec<(String, Vec<BlockNumber>)> {
        self.requests()
            .into_iter()
            .filter_map(|request| match Command::try_from(request) {
                Ok(Command::Categorized {
                    smartcontracts,
                    logs,
                }) => Some((
                    smartcontracts
                        .first()
                        .map(|sm| sm.address.clone())
                        .unwrap_or_default(),
                    logs.iter().map(|log| log.block_number).collect(),
                )),
                _ => None,
            })
            .collect()
    }
}

impl ResultSink for RecordingSink {
    fn push(&self, request: Request) -> Result<(), TransportError> {
        if *self.failing.lock() {
            return Err(TransportError::Closed);
        }
        self.pushed.lock().push(request);
        Ok(())
    }
}

/// Decodes every log into an `Event` carrying the log's block number,
/// except logs whose `log_index` is in `failing`.
#[derive(Clone, Debug, Default)]
pub struct MockDecoder {
    pub failing: Vec<u64>,
}

impl LogDecoder for MockDecoder {
    fn decode(&self, log: &LogEntry) -> Result<DecodedEvent, anyhow::Error> {
        if self.failing.contains(&log.log_index) {
            anyhow::bail!("no event matches topics {:?}", log.topics);
        }
        let mut parameters = serde_json::Map::new();
        parameters.insert("block_number".to_string(), json!(log.block_number));
        Ok(DecodedEvent {
            name: "Event".to_string(),
            parameters,
        })
    }
}

/// Accepts any JSON object as a contract interface.
pub struct MockDecoderFactory;

impl DecoderFactory for MockDecoderFactory {
    fn decoder(&self, abi: &Value) -> Result<Arc<dyn LogDecoder>, anyhow::Error> {
        if !abi.is_object() {
            anyhow::bail!("contract interface must be an object, got {}", abi);
        }
        Ok(Arc::new(MockDecoder::default()))
    }
}
