//! Stream Wire Types
//!
//! Control messages sent to the streaming feed and the inbound envelope.

use serde::{Deserialize, Serialize};

/// Reply to a server `ping`
pub const PONG_MESSAGE: &str = r#"{"type":"pong"}"#;

/// Subscription request sent after every (re)connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMessage {
    pub action: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    pub network: String,
}

impl SubscribeMessage {
    /// Subscribe to the raw transaction feed
    pub fn transactions(network: &str) -> Self {
        Self {
            action: "subscribe".to_string(),
            kind: "transaction".to_string(),
            program_id: None,
            network: network.to_string(),
        }
    }

    /// Subscribe to activity of one program
    pub fn program(program_id: &str, network: &str) -> Self {
        Self {
            action: "subscribe".to_string(),
            kind: "program".to_string(),
            program_id: Some(program_id.to_string()),
            network: network.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Inbound `{type, transaction?}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transaction: Option<String>,
}

/// Inbound message after envelope dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Ping,
    Transaction(String),
    /// Transaction envelope without a payload
    EmptyTransaction,
    /// Acknowledgements and anything else not handled
    Other(String),
}

impl From<InboundEnvelope> for InboundMessage {
    fn from(envelope: InboundEnvelope) -> Self {
        match envelope.kind.as_str() {
            "ping" => InboundMessage::Ping,
            "transaction" => match envelope.transaction {
                Some(payload) => InboundMessage::Transaction(payload),
                None => InboundMessage::EmptyTransaction,
            },
            _ => InboundMessage::Other(envelope.kind),
        }
    }
}
