//! Error types for the BiDi server.
//!
//! This module defines all error types used throughout the crate. Every
//! variant that can reach a client maps to one wire error code through
//! [`Error::code`], and its `Display` text is the wire `message`.
//!
//! # Error Categories
//!
//! | Category | Variants | Wire code |
//! |----------|----------|-----------|
//! | Input | [`Error::InvalidArgument`] | `invalid argument` |
//! | Dispatch | [`Error::UnknownCommand`] | `unknown command` |
//! | Lookup | [`Error::ContextNotFound`], [`Error::ObjectNotFound`], [`Error::ElementNotFound`] | `unknown error` |
//! | Waiting | [`Error::SelectorTimeout`], [`Error::NavigationTimeout`] | `unknown error` |
//! | Engine | [`Error::Engine`], [`Error::ScriptError`] | `unknown error` |
//! | Server | [`Error::Config`], [`Error::Connection`], [`Error::ConnectionClosed`] | - |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] | - |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{ContextId, ObjectId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ErrorCode
// ============================================================================

/// Error code carried in the `error` field of a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed or unparseable input.
    InvalidArgument,
    /// Well-formed command with an unrecognized method.
    UnknownCommand,
    /// Well-formed command that failed during execution.
    UnknownError,
}

impl ErrorCode {
    /// Returns the wire representation.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::UnknownCommand => "unknown command",
            Self::UnknownError => "unknown error",
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Server Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when server options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// WebSocket handshake or transport failure.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The client connection is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// Malformed input. The message is the exact diagnostic sent to the
    /// client.
    #[error("{message}")]
    InvalidArgument {
        /// Field-specific diagnostic.
        message: String,
    },

    /// Command method is not registered.
    #[error("Unknown command '{method}'")]
    UnknownCommand {
        /// The unrecognized method name.
        method: String,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// Browsing context does not exist (or was closed).
    #[error("Context {context} not found")]
    ContextNotFound {
        /// The missing context id.
        context: ContextId,
    },

    /// Remote object reference cannot be resolved in the target context.
    #[error("Object {object_id} not found")]
    ObjectNotFound {
        /// The unresolved object id.
        object_id: ObjectId,
    },

    /// Immediate selector query matched nothing.
    #[error("No element matches selector `{selector}`")]
    ElementNotFound {
        /// CSS selector used.
        selector: String,
    },

    // ========================================================================
    // Wait Errors
    // ========================================================================
    /// Selector wait ran out of time.
    #[error("waiting for selector `{selector}` failed: timeout {timeout_ms}ms exceeded")]
    SelectorTimeout {
        /// Selector being waited for.
        selector: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Navigation did not finish in time. The navigation itself keeps going.
    #[error("Navigation timeout of {timeout_ms} ms exceeded")]
    NavigationTimeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// Browser engine failure.
    #[error("{message}")]
    Engine {
        /// Description reported by the engine.
        message: String,
    },

    /// Script evaluation threw or could not run.
    #[error("Evaluation failed: {message}")]
    ScriptError {
        /// Error message from script execution.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(method: impl Into<String>) -> Self {
        Self::UnknownCommand {
            method: method.into(),
        }
    }

    /// Creates a context not found error.
    #[inline]
    pub fn context_not_found(context: ContextId) -> Self {
        Self::ContextNotFound { context }
    }

    /// Creates an object not found error.
    #[inline]
    pub fn object_not_found(object_id: ObjectId) -> Self {
        Self::ObjectNotFound { object_id }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Creates a selector wait timeout error.
    #[inline]
    pub fn selector_timeout(selector: impl Into<String>, timeout_ms: u64) -> Self {
        Self::SelectorTimeout {
            selector: selector.into(),
            timeout_ms,
        }
    }

    /// Creates a navigation timeout error.
    #[inline]
    pub fn navigation_timeout(timeout_ms: u64) -> Self {
        Self::NavigationTimeout { timeout_ms }
    }

    /// Creates an engine error.
    #[inline]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the wire error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::UnknownCommand { .. } => ErrorCode::UnknownCommand,
            _ => ErrorCode::UnknownError,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::SelectorTimeout { .. } | Self::NavigationTimeout { .. }
        )
    }

    /// Returns `true` if this error is about a missing entity.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContextNotFound { .. } | Self::ObjectNotFound { .. } | Self::ElementNotFound { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
