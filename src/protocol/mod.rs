//! WebSocket protocol message types.
//!
//! This module defines the message format exchanged with the client.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Command` | Client → Server | Command request |
//! | `Response` | Server → Client | Exactly one per command |
//! | `Event` | Server → Client | Asynchronous notification |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Method registry and typed params |
//! | `event` | Event, context and log entry types |
//! | `profile` | Wire-format revisions |
//! | `request` | Command envelope and Response types |
//! | `value` | Serialized values and remote references |

// ============================================================================
// Submodules
// ============================================================================

/// Method registry and typed params.
pub mod command;

/// Event message types.
pub mod event;

/// Wire-format revisions.
pub mod profile;

/// Command envelope and Response message types.
pub mod request;

/// Serialized values.
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Method, WaitUntil};
pub use event::{ContextInfo, Event, LogEntry, LogLevel, StackFrame};
pub use profile::ProtocolProfile;
pub use request::{Command, Outgoing, Response};
pub use value::{RemoteKind, SerializedValue};
