//! Command envelope and response message types.
//!
//! # Format
//!
//! Command (client → server):
//! ```json
//! { "id": 5, "method": "session.status", "params": {} }
//! ```
//!
//! Success (server → client, `result` becomes `value` in the legacy profile):
//! ```json
//! { "id": 5, "result": { "ready": true, "message": "ready" } }
//! ```
//!
//! Error (server → client):
//! ```json
//! { "id": null, "error": "invalid argument", "message": "Cannot parse data as JSON" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::{Error, ErrorCode, Result};
use crate::identifiers::{CommandId, ContextId};

use super::{Event, ProtocolProfile};

// ============================================================================
// Command
// ============================================================================

/// A decoded, schema-valid command. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: CommandId,
    method: String,
    params: Map<String, Value>,
}

impl Command {
    /// Creates a command from validated parts.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Returns the client-chosen id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Returns the method name as sent.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the raw params object.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Returns the `context` param if present and a string.
    #[must_use]
    pub fn target_context(&self) -> Option<ContextId> {
        self.params
            .get("context")
            .and_then(Value::as_str)
            .map(ContextId::new)
    }

    /// Decodes the params object into a typed params struct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] carrying serde's field diagnostic.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone()))
            .map_err(|e| Error::invalid_argument(e.to_string()))
    }
}

// ============================================================================
// Response
// ============================================================================

/// The single reply to one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Command completed.
    Success {
        /// Echoed command id.
        id: CommandId,
        /// Result payload.
        result: Value,
    },
    /// Command or frame failed.
    Error {
        /// Echoed command id, `None` when it could not be determined.
        id: Option<CommandId>,
        /// Error code.
        code: ErrorCode,
        /// Diagnostic message.
        message: String,
    },
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: CommandId, result: Value) -> Self {
        Self::Success { id, result }
    }

    /// Creates an error response from a crate error.
    #[inline]
    #[must_use]
    pub fn error(id: Option<CommandId>, error: &Error) -> Self {
        Self::Error {
            id,
            code: error.code(),
            message: error.to_string(),
        }
    }

    /// Returns the id this response answers.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<CommandId> {
        match self {
            Self::Success { id, .. } => Some(*id),
            Self::Error { id, .. } => *id,
        }
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Renders the wire form under `profile`.
    #[must_use]
    pub fn to_json(&self, profile: ProtocolProfile) -> Value {
        match self {
            Self::Success { id, result } => {
                let mut map = Map::with_capacity(2);
                map.insert("id".to_string(), json!(id));
                map.insert(profile.result_key().to_string(), result.clone());
                Value::Object(map)
            }
            Self::Error { id, code, message } => json!({
                "id": id,
                "error": code.as_str(),
                "message": message,
            }),
        }
    }
}

// ============================================================================
// Outgoing
// ============================================================================

/// Anything written to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Reply to a command.
    Response(Response),
    /// Asynchronous notification.
    Event(Event),
}

impl Outgoing {
    /// Renders the wire form under `profile`.
    #[must_use]
    pub fn to_json(&self, profile: ProtocolProfile) -> Value {
        match self {
            Self::Response(response) => response.to_json(profile),
            Self::Event(event) => event.to_json(profile),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Names the JSON type of a value the way schema validators report it.
///
/// A missing value is `undefined`.
#[must_use]
pub fn json_kind(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
