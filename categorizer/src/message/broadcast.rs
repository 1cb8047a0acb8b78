use serde_derive::{Deserialize, Serialize};

use super::{MessageError, Reply};

/// A message published on a pub/sub channel. Subscribers filter incoming
/// broadcasts by `topic`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub topic: String,
    pub reply: Reply,
}

impl Broadcast {
    pub fn new(topic: impl Into<String>, reply: Reply) -> Self {
        Broadcast {
            topic: topic.into(),
            reply,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.reply.is_ok()
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        self.reply.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// The form a publisher puts on the wire: the topic, a space, and the
    /// JSON body, so that subscribers can filter on the topic prefix.
    pub fn to_frame(&self) -> Result<String, MessageError> {
        Ok(format!("{} {}", self.topic, self.to_json()?))
    }

    /// Parse a broadcast. Anything before the first `{` is the topic
    /// prefix added for subscription filtering and is ignored.
    pub fn parse(msg: &str) -> Result<Self, MessageError> {
        let start = msg.find('{').ok_or_else(|| {
            MessageError::InvalidMessage(format!(
                "no distinction between topic and reply in broadcast '{}'",
                msg
            ))
        })?;

        let broadcast: Broadcast = serde_json::from_str(&msg[start..])?;
        broadcast.reply.validate()?;
        Ok(broadcast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Parameters;
    use serde_json::json;

    fn new_block_broadcast() -> Broadcast {
        Broadcast::new(
            "1",
            Reply::ok(
                Parameters::new()
                    .set("block_number", 150)
                    .set("network_id", "1")
                    .set("block_timestamp", 1700000000u64)
                    .set("logs", json!([])),
            ),
        )
    }

    #[test]
    fn broadcast_survives_the_wire() {
        let broadcast = new_block_broadcast();

        assert_eq!(
            Broadcast::parse(&broadcast.to_json().unwrap()).unwrap(),
            broadcast
        );

        let frame = broadcast.to_frame().unwrap();
        assert!(frame.starts_with("1 {"));
        assert_eq!(Broadcast::parse(&frame).unwrap(), broadcast);
    }

    #[test]
    fn broadcast_without_body_is_rejected() {
        let err = Broadcast::parse("1 block 150").unwrap_err();
        assert!(matches!(err, MessageError::InvalidMessage(_)));

        assert!(Broadcast::parse(r#"1 {"topic": "1"}"#).is_err());
        assert!(Broadcast::parse(r#"1 {"topic": "1", "reply": {"status": "fail"}}"#).is_err());
    }
}
