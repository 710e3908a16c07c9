use serde::{Deserialize, Serialize};

// Client -> Server events
pub const EVENT_SEND_MESSAGE: &str = "send_message";

// Server -> Client events
pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_CONNECT_ERROR: &str = "connect_error";
pub const EVENT_RECEIVE_MESSAGE: &str = "receive_message";

/// Close code sent after a failed handshake.
pub const CLOSE_AUTH_FAILED: u16 = 4001;

/// First frame a client sends: `{"auth": {"token": "..."}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(default)]
    pub auth: HandshakeAuth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakeAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Handshake {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth: HandshakeAuth {
                token: Some(token.into()),
            },
        }
    }
}

/// Every post-handshake frame in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl GatewayFrame {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

/// Payload of `send_message`. Every field is optional at the wire boundary;
/// the relay decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_message_accepts_partial_payloads() {
        let parsed: SendMessage =
            serde_json::from_value(json!({ "receiver": "12", "message": "hi" })).unwrap();
        assert_eq!(parsed.receiver.as_deref(), Some("12"));
        assert_eq!(parsed.receiver_type, None);

        let frame: GatewayFrame = serde_json::from_str(r#"{"event":"send_message"}"#).unwrap();
        assert!(frame.data.is_null());
    }

    #[test]
    fn handshake_without_auth_has_no_token() {
        let parsed: Handshake = serde_json::from_str("{}").unwrap();
        assert!(parsed.auth.token.is_none());
    }
}
