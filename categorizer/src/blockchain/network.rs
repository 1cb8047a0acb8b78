use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::message::MessageError;

pub type NetworkId = String;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    Evm,
}

/// A blockchain network the categorizer follows. There is one manager per
/// network, and the network id doubles as the broadcast topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    #[serde(default, rename = "type")]
    pub kind: NetworkKind,
}

impl Network {
    pub fn new(id: impl Into<NetworkId>) -> Self {
        Network {
            id: id.into(),
            kind: NetworkKind::Evm,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Networks(Vec<Network>);

impl Networks {
    /// Parse a JSON list of networks. Network ids must be unique.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, MessageError> {
        let parsed: Vec<Network> = serde_json::from_value(raw.clone())
            .map_err(|e| MessageError::InvalidParameters(format!("networks: {}", e)))?;

        let mut networks = Networks::default();
        for network in parsed {
            if networks.exist(&network.id) {
                return Err(MessageError::InvalidParameters(format!(
                    "duplicate network id '{}'",
                    network.id
                )));
            }
            networks.0.push(network);
        }
        Ok(networks)
    }

    pub fn exist(&self, network_id: &str) -> bool {
        self.0.iter().any(|network| network.id == network_id)
    }

    pub fn get(&self, network_id: &str) -> Option<&Network> {
        self.0.iter().find(|network| network.id == network_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
