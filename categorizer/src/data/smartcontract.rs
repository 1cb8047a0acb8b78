use serde_derive::{Deserialize, Serialize};

use crate::blockchain::{BlockNumber, NetworkId};

/// A smartcontract tracked by the categorizer. `categorized_block_number`
/// is the watermark: the highest block whose logs have been applied to the
/// smartcontract. It never decreases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Smartcontract {
    pub network_id: NetworkId,
    pub address: String,
    pub categorized_block_number: BlockNumber,
}

impl Smartcontract {
    pub fn new(
        network_id: impl Into<NetworkId>,
        address: impl Into<String>,
        categorized_block_number: BlockNumber,
    ) -> Self {
        Smartcontract {
            network_id: network_id.into(),
            address: address.into(),
            categorized_block_number,
        }
    }

    /// The first block whose logs still have to be applied. `None` when the
    /// watermark is already at the last representable block.
    pub fn next_block_number(&self) -> Option<BlockNumber> {
        self.categorized_block_number.checked_add(1)
    }
}
