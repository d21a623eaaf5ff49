//! Frame decoding and encoding.
//!
//! Incoming text frames are validated in a fixed order: JSON syntax,
//! top-level object, `id`, `method`, `params`. The first failure wins and
//! is reported with `id: null`. Method lookup and typed params decoding
//! happen later, in the dispatcher.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::request::json_kind;
use crate::protocol::{Command, Outgoing, ProtocolProfile};

// ============================================================================
// Constants
// ============================================================================

/// Diagnostic for binary frames.
const BINARY_NOT_SUPPORTED: &str = "not supported type (binary)";

/// Diagnostic for malformed JSON.
const INVALID_JSON: &str = "Cannot parse data as JSON";

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a WebSocket frame.
///
/// Returns `None` for control frames, which never reach the dispatcher.
#[must_use]
pub fn decode(message: &Message) -> Option<Result<Command>> {
    match message {
        Message::Text(text) => Some(decode_text(text.as_str())),
        Message::Binary(_) => Some(Err(Error::invalid_argument(BINARY_NOT_SUPPORTED))),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

/// Decodes and validates a text frame.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] describing the first violation.
pub fn decode_text(text: &str) -> Result<Command> {
    let value: Value =
        serde_json::from_str(text).map_err(|_| Error::invalid_argument(INVALID_JSON))?;

    let mut map = match value {
        Value::Object(map) => map,
        other => return Err(expected("object", Some(&other))),
    };

    let id = map
        .get("id")
        .and_then(Value::as_u64)
        .map(CommandId::new)
        .ok_or_else(|| expected("unsigned integer", map.get("id")))?;

    let method = match map.remove("method") {
        Some(Value::String(method)) => method,
        other => return Err(expected("string", other.as_ref())),
    };

    let params = match map.remove("params") {
        None => Map::new(),
        Some(Value::Object(params)) => params,
        Some(other) => return Err(expected("object", Some(&other))),
    };

    Ok(Command::new(id, method, params))
}

fn expected(what: &str, got: Option<&Value>) -> Error {
    Error::invalid_argument(format!("Expected {what} but got {}", json_kind(got)))
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes an outgoing message as a text frame.
#[must_use]
pub fn encode(outgoing: &Outgoing, profile: ProtocolProfile) -> Message {
    Message::Text(outgoing.to_json(profile).to_string().into())
}

// ============================================================================
// Tests
// ============================================================================
