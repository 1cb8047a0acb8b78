use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use super::TransportError;

/// A pub/sub subscription to the block broadcasts of one network. The
/// subscription is already filtered to the network's topic; messages are
/// handed out raw and parsed by the caller.
#[async_trait]
pub trait BroadcastFeed: Send + 'static {
    /// Wait at most `timeout` for the next message. `Ok(None)` means the
    /// feed stayed silent for that long, which is not an error.
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;

    /// Re-arm the subscription after the feed has been silent for a while.
    async fn resubscribe(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// An in-process feed: whatever is sent into the channel is delivered.
#[async_trait]
impl BroadcastFeed for mpsc::Receiver<String> {
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(msg)) => Ok(Some(msg)),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Ok(None),
        }
    }
}
