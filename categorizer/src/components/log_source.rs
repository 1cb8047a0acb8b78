use async_trait::async_trait;
use serde_derive::Deserialize;

use super::TransportError;
use crate::blockchain::{BlockNumber, LogEntry};
use crate::message::{Command, MessageError, Reply, Request};

/// A service that answers `log_filter` requests with the logs recorded on
/// chain, each tagged with its smartcontract address and block number.
#[async_trait]
pub trait HistoricalLogSource: Send + Sync + 'static {
    async fn request(&self, request: Request) -> Result<Reply, TransportError>;
}

#[derive(thiserror::Error, Debug)]
pub enum LogSourceError {
    #[error("log source transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("log source replied with failure: {0}")]
    Failed(String),
    #[error("malformed log source reply: {0}")]
    Malformed(#[from] MessageError),
}

/// The logs of one `log_filter` round trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogFilterResult {
    pub logs: Vec<LogEntry>,
    /// The last block the source scanned, when it says so. A source that
    /// pages its answers reports here where the page ended.
    pub to_block: Option<BlockNumber>,
}

#[derive(Deserialize)]
struct LogFilterReply {
    #[serde(default)]
    logs: Vec<LogEntry>,
    #[serde(default)]
    to_block: Option<BlockNumber>,
}

/// Fetch the logs of `addresses` starting at `from_block`, up to and
/// including `to_block` if given.
pub async fn fetch_logs(
    source: &dyn HistoricalLogSource,
    addresses: Vec<String>,
    from_block: BlockNumber,
    to_block: Option<BlockNumber>,
) -> Result<LogFilterResult, LogSourceError> {
    let request = Command::LogFilter {
        addresses,
        from_block,
        to_block,
    }
    .into_request()?;

    let reply = source.request(request).await?;
    reply.validate()?;
    if !reply.is_ok() {
        return Err(LogSourceError::Failed(reply.message));
    }

    let LogFilterReply { logs, to_block } = reply.parameters.decode()?;
    Ok(LogFilterResult { logs, to_block })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Parameters;
    use serde_json::json;

    struct Fixed(Reply);

    #[async_trait]
    impl HistoricalLogSource for Fixed {
        async fn request(&self, request: Request) -> Result<Reply, TransportError> {
            assert_eq!(request.command, "log_filter");
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn decodes_logs_and_page_end() {
        let source = Fixed(Reply::ok(
            Parameters::new()
                .set(
                    "logs",
                    json!([{"address": "0xabc", "block_number": 101}, {"address": "0xabc", "block_number": 120}]),
                )
                .set("to_block", 130),
        ));

        let result = fetch_logs(&source, vec!["0xabc".into()], 100, Some(149))
            .await
            .unwrap();
        assert_eq!(result.logs.len(), 2);
        assert_eq!(result.to_block, Some(130));
    }

    #[tokio::test]
    async fn failed_reply_is_an_error() {
        let source = Fixed(Reply::fail("archive node unavailable"));
        let err = fetch_logs(&source, vec!["0xabc".into()], 100, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LogSourceError::Failed(msg) if msg == "archive node unavailable"));
    }

    #[tokio::test]
    async fn malformed_logs_are_an_error() {
        let source = Fixed(Reply::ok(Parameters::new().set("logs", json!([{"address": 5}]))));
        let err = fetch_logs(&source, vec!["0xabc".into()], 100, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LogSourceError::Malformed(_)));
    }
}
