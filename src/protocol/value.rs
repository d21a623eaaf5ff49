//! Serialized values exchanged with the client.
//!
//! Primitives carry their value inline. Object-like values carry an
//! `objectId` plus descriptive metadata instead of the value itself.
//!
//! ```json
//! { "type": "string", "value": "hello" }
//! { "type": "Window", "objectId": "…", "className": "Window", "description": "Window" }
//! { "type": "node", "objectId": "…" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Number, Value};

use crate::identifiers::ObjectId;

// ============================================================================
// RemoteKind
// ============================================================================

/// Kind of an object living in the browser engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    /// Plain object.
    Object,
    /// Array.
    Array,
    /// Window proxy.
    Window,
    /// DOM node.
    Node,
}

impl RemoteKind {
    /// Returns the `type` tag used on the wire.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::Array => "Array",
            Self::Window => "Window",
            Self::Node => "node",
        }
    }
}

// ============================================================================
// SerializedValue
// ============================================================================

/// A value as presented to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedValue {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// String primitive.
    String(String),
    /// Number primitive.
    Number(Number),
    /// Boolean primitive.
    Boolean(bool),
    /// Reference to an engine-owned object.
    Remote {
        /// Object kind.
        kind: RemoteKind,
        /// Handle exposed to the client.
        object_id: ObjectId,
        /// Constructor name, e.g. `HTMLDivElement`.
        class_name: Option<String>,
        /// Human-readable description.
        description: Option<String>,
    },
}

impl SerializedValue {
    /// Builds a node reference as returned by element queries.
    #[inline]
    #[must_use]
    pub fn node(object_id: ObjectId) -> Self {
        Self::Remote {
            kind: RemoteKind::Node,
            object_id,
            class_name: None,
            description: None,
        }
    }

    /// Converts a JSON primitive. Arrays and objects are not primitives and
    /// yield `None`.
    #[must_use]
    pub fn from_primitive(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Renders the value as console text.
    #[must_use]
    pub fn console_text(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::String(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Remote {
                kind,
                class_name,
                description,
                ..
            } => description
                .clone()
                .or_else(|| class_name.clone())
                .unwrap_or_else(|| kind.as_str().to_string()),
        }
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for SerializedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", "undefined")?;
                map.end()
            }
            Self::Null => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", "null")?;
                map.end()
            }
            Self::String(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "string")?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Self::Number(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "number")?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Self::Boolean(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "boolean")?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Self::Remote {
                kind,
                object_id,
                class_name,
                description,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind.as_str())?;
                map.serialize_entry("objectId", object_id)?;
                if let Some(class_name) = class_name {
                    map.serialize_entry("className", class_name)?;
                }
                if let Some(description) = description {
                    map.serialize_entry("description", description)?;
                }
                map.end()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_primitive_serialization() {
        assert_eq!(
            SerializedValue::String("hi".into()).to_json(),
            json!({ "type": "string", "value": "hi" })
        );
        assert_eq!(
            SerializedValue::from_primitive(&json!(3)).expect("number").to_json(),
            json!({ "type": "number", "value": 3 })
        );
        assert_eq!(SerializedValue::Undefined.to_json(), json!({ "type": "undefined" }));
    }

    #[test]
    fn test_node_serialization() {
        let value = SerializedValue::node(ObjectId::new("n1"));
        assert_eq!(value.to_json(), json!({ "type": "node", "objectId": "n1" }));
    }

    #[test]
    fn test_remote_serialization() {
        let value = SerializedValue::Remote {
            kind: RemoteKind::Window,
            object_id: ObjectId::new("w1"),
            class_name: Some("Window".into()),
            description: Some("Window".into()),
        };
        assert_eq!(
            value.to_json(),
            json!({
                "type": "Window",
                "objectId": "w1",
                "className": "Window",
                "description": "Window"
            })
        );
        assert_eq!(value.console_text(), "Window");
    }

    #[test]
    fn test_arrays_are_not_primitives() {
        assert!(SerializedValue::from_primitive(&json!([1, 2])).is_none());
    }
}
