use std::fmt::{Display, Error, Formatter};

/// Attached to log records under the `code` key so that log pipelines can
/// pick out the interesting ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogCode {
    BlockIngestionStatus,
    BlockIngestionLagging,
    CatchUpStatus,
    CatchUpPromoted,
    MalformedMessage,
    PublishFailure,
}

impl Display for LogCode {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let value = match self {
            LogCode::BlockIngestionStatus => "BlockIngestionStatus",
            LogCode::BlockIngestionLagging => "BlockIngestionLagging",
            LogCode::CatchUpStatus => "CatchUpStatus",
            LogCode::CatchUpPromoted => "CatchUpPromoted",
            LogCode::MalformedMessage => "MalformedMessage",
            LogCode::PublishFailure => "PublishFailure",
        };
        write!(f, "{}", value)
    }
}

impl slog::Value for LogCode {
    fn serialize(
        &self,
        _rec: &slog::Record,
        key: slog::Key,
        serializer: &mut dyn slog::Serializer,
    ) -> slog::Result {
        serializer.emit_str(key, format!("{}", self).as_str())
    }
}
