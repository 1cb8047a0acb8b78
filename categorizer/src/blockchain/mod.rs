//! The blockchain vocabulary shared by the categorizer: block numbers,
//! blocks as they arrive on the live feed, and the logs inside them.

mod network;

pub use network::{Network, NetworkId, NetworkKind, Networks};

use serde_derive::{Deserialize, Serialize};

use crate::components::decoder::DecodedEvent;
use crate::message::{MessageError, Parameters};

pub type BlockNumber = u64;

/// A single event log emitted by a smartcontract. Apart from the address
/// and the block it belongs to, the payload is opaque to the categorizer;
/// interpreting it is the job of a `LogDecoder`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: String,
    pub block_number: BlockNumber,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub log_index: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    /// Filled in once a worker decoded the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<DecodedEvent>,
}

impl LogEntry {
    pub fn new(address: impl Into<String>, block_number: BlockNumber) -> Self {
        LogEntry {
            address: address.into(),
            block_number,
            transaction_id: String::new(),
            log_index: 0,
            topics: Vec::new(),
            data: String::new(),
            event: None,
        }
    }

    pub fn is_for(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

/// Keep the logs that belong to `address`, in their original order.
pub fn filter_by_address(logs: &[LogEntry], address: &str) -> Vec<LogEntry> {
    logs.iter().filter(|log| log.is_for(address)).cloned().collect()
}

/// The highest block number among `logs`.
pub fn max_block_number(logs: &[LogEntry]) -> Option<BlockNumber> {
    logs.iter().map(|log| log.block_number).max()
}

/// A block received from the live broadcast feed. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub network_id: NetworkId,
    pub number: BlockNumber,
    pub timestamp: u64,
    pub logs: Vec<LogEntry>,
}

impl Block {
    pub fn new(
        network_id: NetworkId,
        number: BlockNumber,
        timestamp: u64,
        logs: Vec<LogEntry>,
    ) -> Self {
        Block {
            network_id,
            number,
            timestamp,
            logs,
        }
    }

    /// The logs of this block emitted by `address`.
    pub fn logs_for(&self, address: &str) -> Vec<LogEntry> {
        filter_by_address(&self.logs, address)
    }
}

/// The parameters a blockchain client puts into a new-block broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockBroadcast {
    pub block_number: BlockNumber,
    pub network_id: NetworkId,
    pub block_timestamp: u64,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl BlockBroadcast {
    pub fn from_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        parameters.decode()
    }

    pub fn to_parameters(&self) -> Result<Parameters, MessageError> {
        Parameters::encode(self)
    }

    pub fn into_block(self) -> Block {
        Block::new(
            self.network_id,
            self.block_number,
            self.block_timestamp,
            self.logs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_for_matches_address_case_insensitively() {
        let block = Block::new(
            "1".into(),
            10,
            0,
            vec![
                LogEntry::new("0xAbC", 10),
                LogEntry::new("0xdef", 10),
                LogEntry::new("0xabc", 10),
            ],
        );

        assert_eq!(block.logs_for("0xabc").len(), 2);
        assert_eq!(block.logs_for("0xDEF").len(), 1);
        assert!(block.logs_for("0x123").is_empty());
    }

    #[test]
    fn broadcast_parameters_require_block_number() {
        let parameters: Parameters = serde_json::from_str(
            r#"{"network_id": "1", "block_timestamp": 1700000000, "logs": []}"#,
        )
        .unwrap();
        assert!(BlockBroadcast::from_parameters(&parameters).is_err());

        let parameters: Parameters = serde_json::from_str(
            r#"{"block_number": 150, "network_id": "1", "block_timestamp": 1700000000,
                "logs": [{"address": "0xabc", "block_number": 150, "data": "0x"}]}"#,
        )
        .unwrap();
        let block = BlockBroadcast::from_parameters(&parameters)
            .unwrap()
            .into_block();
        assert_eq!(block.number, 150);
        assert_eq!(block.network_id, "1");
        assert_eq!(block.logs, vec![LogEntry {
            data: "0x".into(),
            ..LogEntry::new("0xabc", 150)
        }]);
    }
}
