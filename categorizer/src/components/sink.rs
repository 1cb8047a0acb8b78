use tokio::sync::mpsc;

use super::TransportError;
use crate::message::Request;

/// A one-way, fire-and-forget channel to a downstream consumer. `push`
/// must not block; a result that cannot be delivered right away is
/// reported as an error and dropped.
pub trait ResultSink: Send + Sync + 'static {
    fn push(&self, request: Request) -> Result<(), TransportError>;
}

impl ResultSink for mpsc::Sender<Request> {
    fn push(&self, request: Request) -> Result<(), TransportError> {
        self.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Full,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

impl ResultSink for mpsc::UnboundedSender<Request> {
    fn push(&self, request: Request) -> Result<(), TransportError> {
        self.send(request).map_err(|_| TransportError::Closed)
    }
}
