//! Event message types.
//!
//! Events are notifications pushed to the client without an `id`.
//!
//! # Format
//!
//! ```json
//! { "method": "browsingContext.load", "params": { "context": "…", "url": "…" } }
//! ```
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `browsingContext` | `contextCreated`, `contextDestroyed`, `load` |
//! | `log` | `entryAdded` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::identifiers::ContextId;

use super::{ProtocolProfile, SerializedValue};

// ============================================================================
// ContextInfo
// ============================================================================

/// Description of a browsing context as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    /// Context id.
    pub context: ContextId,
    /// Owning context, `None` for top-level contexts.
    pub parent: Option<ContextId>,
    /// Current URL.
    pub url: String,
    /// Nested contexts, present only in tree listings.
    pub children: Option<Vec<ContextInfo>>,
}

impl ContextInfo {
    /// Renders the wire form under `profile`.
    #[must_use]
    pub fn to_json(&self, profile: ProtocolProfile) -> Value {
        let mut map = Map::new();
        map.insert("context".into(), json!(self.context));
        map.insert("parent".into(), json!(self.parent));
        map.insert("url".into(), json!(self.url));
        if let Some(kind) = profile.context_type() {
            map.insert("type".into(), json!(kind));
        }
        if let Some(children) = &self.children {
            let children = children
                .iter()
                .map(|child| child.to_json(profile))
                .collect();
            map.insert("children".into(), Value::Array(children));
        }
        Value::Object(map)
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Console severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `console.debug`.
    Debug,
    /// `console.log` / `console.info`.
    Info,
    /// `console.warn`.
    Warn,
    /// `console.error`.
    Error,
}

/// One frame of a console call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Script URL.
    pub url: String,
    /// Function name, empty for anonymous top-level code.
    pub function_name: String,
    /// Zero-based line.
    pub line_number: u32,
    /// Zero-based column.
    pub column_number: u32,
}

/// A console log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Context the call happened in.
    pub context: ContextId,
    /// Severity.
    pub level: LogLevel,
    /// Console function name, e.g. `log`.
    pub method: String,
    /// Rendered message text.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Call arguments.
    pub args: Vec<SerializedValue>,
    /// Call stack, innermost frame first.
    pub stack_trace: Vec<StackFrame>,
}

impl LogEntry {
    /// Renders the `log.entryAdded` params.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "type": "console",
            "level": self.level,
            "method": self.method,
            "text": self.text,
            "timestamp": self.timestamp,
            "source": { "context": self.context },
            "args": self.args,
            "stackTrace": self.stack_trace,
        })
    }
}

// ============================================================================
// Event
// ============================================================================

/// An event pushed to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A context was created.
    ContextCreated(ContextInfo),
    /// A context was destroyed.
    ContextDestroyed(ContextInfo),
    /// A navigation finished loading.
    Load {
        /// Navigated context.
        context: ContextId,
        /// Loaded URL.
        url: String,
    },
    /// A console API was called.
    LogEntryAdded(LogEntry),
}

impl Event {
    /// Returns the event name in `module.eventName` format.
    #[inline]
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::ContextCreated(_) => "browsingContext.contextCreated",
            Self::ContextDestroyed(_) => "browsingContext.contextDestroyed",
            Self::Load { .. } => "browsingContext.load",
            Self::LogEntryAdded(_) => "log.entryAdded",
        }
    }

    /// Renders the wire form under `profile`.
    #[must_use]
    pub fn to_json(&self, profile: ProtocolProfile) -> Value {
        let params = match self {
            Self::ContextCreated(info) | Self::ContextDestroyed(info) => info.to_json(profile),
            Self::Load { context, url } => json!({ "context": context, "url": url }),
            Self::LogEntryAdded(entry) => entry.to_json(),
        };
        json!({ "method": self.method(), "params": params })
    }
}

// ============================================================================
// Tests
// ============================================================================
