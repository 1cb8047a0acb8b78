use categorizer::prelude::{tokio, BlockNumber};
use tokio::sync::watch;

/// The block number of the first block the ingestor enqueued. It is set
/// exactly once; everything before it is history that catch-up covers.
pub struct Baseline {
    sender: watch::Sender<Option<BlockNumber>>,
}

impl Default for Baseline {
    fn default() -> Self {
        Baseline {
            sender: watch::Sender::new(None),
        }
    }
}

impl Baseline {
    pub fn get(&self) -> Option<BlockNumber> {
        *self.sender.borrow()
    }

    /// Record the baseline unless it is already known. Returns whether
    /// `number` became the baseline.
    pub fn set_once(&self, number: BlockNumber) -> bool {
        self.sender.send_if_modified(|baseline| match baseline {
            Some(_) => false,
            None => {
                *baseline = Some(number);
                true
            }
        })
    }

    /// Wait until the baseline is known.
    pub async fn wait(&self) -> BlockNumber {
        let mut receiver = self.sender.subscribe();
        loop {
            if let Some(number) = *receiver.borrow_and_update() {
                return number;
            }
            // `changed` only fails once the sender, owned by `self`, is gone
            let _ = receiver.changed().await;
        }
    }
}
