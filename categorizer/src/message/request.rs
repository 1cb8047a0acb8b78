use serde_derive::{Deserialize, Serialize};

use super::{MessageError, Parameters};

/// A command sent to a remote service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Request {
    pub fn new(command: impl Into<String>, parameters: Parameters) -> Self {
        Request {
            command: command.into(),
            parameters,
        }
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn parse(msg: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(msg)?)
    }
}
