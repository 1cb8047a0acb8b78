use categorizer::prelude::{BlockNumber, MessageError, TransportError};

#[derive(thiserror::Error, Debug)]
pub enum CategorizeError {
    #[error("log of {log_address} at block {block_number} handed to the worker of {address}")]
    ForeignLog {
        address: String,
        log_address: String,
        block_number: BlockNumber,
    },
}

/// Why a single broadcast was not turned into a block. None of these stop
/// the ingestor.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("malformed broadcast: {0}")]
    Malformed(#[from] MessageError),
    #[error("broadcast reports failure: {0}")]
    Failed(String),
    #[error("broadcast for network `{got}` on the feed of `{expected}`")]
    WrongNetwork { expected: String, got: String },
}

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("encoding categorized result: {0}")]
    Encode(#[from] MessageError),
    #[error("pushing categorized result: {0}")]
    Transport(#[from] TransportError),
}

#[derive(thiserror::Error, Debug)]
pub enum ManagerError {
    #[error("the manager is stopped")]
    Stopped,
    #[error("the manager is already running")]
    AlreadyStarted,
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),
    #[error("smartcontract {0} is already registered")]
    AlreadyRegistered(String),
    #[error("building a log decoder failed: {0:#}")]
    Decoder(anyhow::Error),
    #[error(transparent)]
    Message(#[from] MessageError),
}
