use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::TryFrom;

use super::{MessageError, Parameters, Request};
use crate::blockchain::{BlockNumber, LogEntry};
use crate::data::smartcontract::Smartcontract;

/// Every command the categorizer sends or accepts. The wire form is still
/// a generic `Request`; `Command` pins the parameters of each command down
/// so that both sides of the wire agree on them at compile time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "parameters", rename_all = "snake_case")]
pub enum Command {
    /// Ask the historical log source for the logs of `addresses` in
    /// `[from_block, to_block]`, or from `from_block` up to whatever the
    /// source is willing to return when `to_block` is not set.
    LogFilter {
        addresses: Vec<String>,
        from_block: BlockNumber,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_block: Option<BlockNumber>,
    },
    /// Pushed downstream after a smartcontract was categorized.
    Categorized {
        smartcontracts: Vec<Smartcontract>,
        logs: Vec<LogEntry>,
    },
    /// Hand new smartcontracts to the manager. `abis[i]` is the contract
    /// interface of `smartcontracts[i]`.
    RegisterSmartcontracts {
        smartcontracts: Vec<Smartcontract>,
        abis: Vec<Value>,
    },
}

impl Command {
    pub const LOG_FILTER: &'static str = "log_filter";
    pub const CATEGORIZED: &'static str = "categorized";
    pub const REGISTER_SMARTCONTRACTS: &'static str = "register_smartcontracts";

    pub fn name(&self) -> &'static str {
        match self {
            Command::LogFilter { .. } => Self::LOG_FILTER,
            Command::Categorized { .. } => Self::CATEGORIZED,
            Command::RegisterSmartcontracts { .. } => Self::REGISTER_SMARTCONTRACTS,
        }
    }

    fn is_known(command: &str) -> bool {
        matches!(
            command,
            Self::LOG_FILTER | Self::CATEGORIZED | Self::REGISTER_SMARTCONTRACTS
        )
    }

    pub fn into_request(self) -> Result<Request, MessageError> {
        let name = self.name();
        let mut tagged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(MessageError::InvalidMessage(format!(
                    "command `{}` serialized to {}",
                    name, other
                )))
            }
        };
        let parameters = match tagged.remove("parameters") {
            Some(Value::Object(map)) => Parameters::from(map),
            _ => Parameters::new(),
        };
        Ok(Request::new(name, parameters))
    }
}

impl TryFrom<Request> for Command {
    type Error = MessageError;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        if !Command::is_known(&request.command) {
            return Err(MessageError::UnknownCommand(request.command));
        }

        let tagged = serde_json::json!({
            "command": request.command,
            "parameters": Value::Object(request.parameters.into_inner()),
        });
        serde_json::from_value(tagged).map_err(|e| MessageError::InvalidParameters(e.to_string()))
    }
}
