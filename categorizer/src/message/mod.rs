//! The messages services exchange over the wire.
//!
//! - A `Request` is sent by clients to a remote service, which answers
//!   with a `Reply`.
//! - A `Broadcast` is published on a pub/sub channel; subscribers filter
//!   on its topic.
//! - A `Command` is the typed form of a `Request`: every command the
//!   categorizer sends or accepts is listed there, and converting a
//!   `Request` into a `Command` checks its parameters against the schema.
//!
//! All messages are encoded as JSON.

mod broadcast;
mod command;
mod reply;
mod request;

pub use broadcast::Broadcast;
pub use command::Command;
pub use reply::{Reply, ReplyStatus};
pub use request::Request;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug)]
pub enum MessageError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("failure should not have an empty message")]
    FailWithoutMessage,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// The key/value parameters carried by requests and replies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Parameters(Map::new())
    }

    /// Serialize `value` into parameters. `value` must serialize to a JSON
    /// object.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, MessageError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Parameters(map)),
            other => Err(MessageError::InvalidParameters(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// Deserialize the parameters into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| MessageError::InvalidParameters(e.to_string()))
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Parameters(map)
    }
}
