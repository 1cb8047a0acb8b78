use serde_derive::{Deserialize, Serialize};

use super::{MessageError, Parameters};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "fail")]
    Fail,
}

/// The answer of a service to a `Request`. A failed reply must explain
/// itself in `message`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Reply {
    pub fn ok(parameters: Parameters) -> Self {
        Reply {
            status: ReplyStatus::Ok,
            message: String::new(),
            parameters,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Reply {
            status: ReplyStatus::Fail,
            message: message.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }

    pub fn validate(&self) -> Result<(), MessageError> {
        if self.status == ReplyStatus::Fail && self.message.is_empty() {
            return Err(MessageError::FailWithoutMessage);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    pub fn parse(msg: &str) -> Result<Self, MessageError> {
        let reply: Reply = serde_json::from_str(msg)?;
        reply.validate()?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_survives_the_wire() {
        let reply = Reply::ok(Parameters::new().set("logs", json!([])));
        let encoded = reply.to_json().unwrap();
        assert!(encoded.contains(r#""status":"OK""#));
        assert_eq!(Reply::parse(&encoded).unwrap(), reply);

        let reply = Reply::fail("node is syncing");
        assert_eq!(Reply::parse(&reply.to_json().unwrap()).unwrap(), reply);
    }

    #[test]
    fn failed_reply_needs_a_message() {
        assert!(matches!(
            Reply::parse(r#"{"status": "fail", "parameters": {}}"#),
            Err(MessageError::FailWithoutMessage)
        ));
        assert!(matches!(
            Reply::fail("").to_json(),
            Err(MessageError::FailWithoutMessage)
        ));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Reply::parse(r#"{"status": "maybe", "parameters": {}}"#).is_err());
    }
}
