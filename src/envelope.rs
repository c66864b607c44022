//! JSON envelopes exchanged with the peer.
//!
//! Outbound (relay → peer):
//!
//! ```text
//! {"mqtt":{"topic":"…","message":"<base64>"}}
//! {"rpcResponse":{"id":…,"response":…}}
//! {"text":{"message":"<base64>","final":true}}
//! ```
//!
//! Inbound (peer → relay):
//!
//! ```text
//! {"message":"phrases","data":["…","…"]}
//! {"message":"keyword","data":"…"}
//! {"id":…,"method":"…","argument":…}
//! ```
//!
//! Inbound decoding is two-stage: bytes that are not JSON at all are a
//! [`Error::MalformedEnvelope`]; JSON that matches none of the known shapes
//! decodes to [`Classified::Unrecognized`] and is ignored by the relay.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

/// Envelopes the relay sends to the peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outbound {
    /// A bus publish forwarded to the peer.
    Mqtt { topic: String, message: String },
    /// Result of an RPC the peer invoked.
    RpcResponse { id: Value, response: Value },
    /// Speech-to-text result.
    Text {
        message: String,
        #[serde(rename = "final")]
        is_final: bool,
    },
}

impl Outbound {
    pub fn mqtt(topic: impl Into<String>, message: &[u8]) -> Self {
        Self::Mqtt {
            topic: topic.into(),
            message: STANDARD.encode(message),
        }
    }

    pub fn text(message: &[u8], is_final: bool) -> Self {
        Self::Text {
            message: STANDARD.encode(message),
            is_final,
        }
    }

    pub fn rpc_response(id: Value, response: Value) -> Self {
        Self::RpcResponse { id, response }
    }

    /// Correlated error response: `{"error": "<message>"}` in the response slot.
    pub fn rpc_error(id: Value, error: &Error) -> Self {
        Self::RpcResponse {
            id,
            response: serde_json::json!({ "error": error.to_string() }),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Every field is a string, bool or an already-valid `Value`.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Telemetry pushed by the peer, tagged by the `message` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "message", content = "data", rename_all = "lowercase")]
pub enum Telemetry {
    Phrases(Vec<String>),
    Keyword(String),
}

/// RPC call issued by the peer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcRequest {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub argument: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Telemetry(Telemetry),
    Rpc(RpcRequest),
}

/// Outcome of classifying a reassembled buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Known(Inbound),
    /// Valid JSON of no known shape; carries the value for logging.
    Unrecognized(Value),
}

/// Parse and classify a reassembled inbound buffer.
pub fn classify(buffer: &[u8]) -> Result<Classified> {
    let value: Value =
        serde_json::from_slice(buffer).map_err(|e| Error::MalformedEnvelope(e.to_string()))?;
    Ok(match Inbound::deserialize(&value) {
        Ok(inbound) => Classified::Known(inbound),
        Err(_) => Classified::Unrecognized(value),
    })
}

/// Payload of a `speech/text` bus message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechText {
    pub message: String,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// Argument of the `postMQTT` RPC.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusPublish {
    pub topic: String,
    pub message: String,
}

impl BusPublish {
    pub fn decoded_message(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.message)
            .map_err(|e| Error::HandlerFailure(format!("message is not base64: {e}")))
    }
}
