use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, RECEIVE_MESSAGE};

/// One JSON frame on the hub socket, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Frame {
    /// First frame sent by the server; tells the client its own connection id.
    Handshake {
        #[serde(rename = "connectionId")]
        connection_id: String,
    },
    /// A method call. Clients invoke hub methods, the hub pushes client methods.
    Invocation {
        #[serde(
            rename = "invocationId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        invocation_id: Option<String>,
        target: String,
        #[serde(default)]
        arguments: Vec<Value>,
    },
    /// Reply to an invocation that carried an `invocationId`.
    Completion {
        #[serde(rename = "invocationId")]
        invocation_id: String,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    Ping,
    Close {
        #[serde(default)]
        error: Option<String>,
    },
}

impl Frame {
    pub fn invocation(
        invocation_id: Option<String>,
        target: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self::Invocation {
            invocation_id,
            target: target.into(),
            arguments,
        }
    }

    /// Client-bound `ReceiveMessage(user, message)` push.
    pub fn receive_message(user: &str, message: &str) -> Self {
        Self::invocation(
            None,
            RECEIVE_MESSAGE,
            vec![Value::from(user), Value::from(message)],
        )
    }

    pub fn completion(invocation_id: String, outcome: Result<Option<Value>, String>) -> Self {
        match outcome {
            Ok(result) => Self::Completion {
                invocation_id,
                result,
                error: None,
            },
            Err(error) => Self::Completion {
                invocation_id,
                result: None,
                error: Some(error),
            },
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_invocation_without_id() {
        let frame = Frame::decode(
            r#"{"type":"invocation","target":"GetConnectedClients","arguments":[]}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            Frame::invocation(None, "GetConnectedClients", Vec::new())
        );
    }

    #[test]
    fn test_receive_message_shape() {
        let text = Frame::receive_message("alice", "hi").encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "invocation", "target": "ReceiveMessage", "arguments": ["alice", "hi"]})
        );
    }

    #[test]
    fn test_completion_error_shape() {
        let text = Frame::completion("7".into(), Err("boom".into()))
            .encode()
            .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "completion", "invocationId": "7", "result": null, "error": "boom"})
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(Frame::decode(r#"{"type":"stream"}"#).is_err());
        assert!(Frame::decode("not json").is_err());
    }
}
