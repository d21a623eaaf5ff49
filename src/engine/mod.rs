//! Browser engine collaborator.
//!
//! The server never touches DOM, rendering or JavaScript itself. It drives
//! an engine through [`BrowserEngine`] and learns about asynchronous page
//! activity through [`EngineSignal`]s delivered to a [`SignalHandler`].
//!
//! # Ownership
//!
//! Engine objects are referenced by [`EngineHandle`]. The engine stays the
//! sole owner of the underlying value; the server only maps handles to
//! client-visible object ids.
//!
//! # Signal Ordering
//!
//! The handler is called synchronously. An engine must raise every signal
//! caused by a call (e.g. `Load` for `navigate`) before that call's future
//! resolves, so the resulting event is queued ahead of the command response.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `sandbox` | In-process engine with simulated pages |

// ============================================================================
// Submodules
// ============================================================================

/// In-process engine with simulated pages.
pub mod sandbox;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::{LogLevel, RemoteKind, StackFrame};

// ============================================================================
// Re-exports
// ============================================================================

pub use sandbox::{
    INSERT_HTML_SCRIPT, QUERY_SELECTOR_SCRIPT, SandboxEngine, ScriptFn, ScriptScope,
};

// ============================================================================
// EngineHandle
// ============================================================================

/// Opaque reference to an engine-owned object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// Wraps an engine-assigned handle value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

// ============================================================================
// Values
// ============================================================================

/// An object living in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Object kind.
    pub kind: RemoteKind,
    /// Engine handle.
    pub handle: EngineHandle,
    /// Constructor name.
    pub class_name: String,
    /// Human-readable description.
    pub description: String,
}

/// A value produced by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    /// `undefined`.
    Undefined,
    /// A JSON-representable primitive.
    Json(Value),
    /// An engine-owned object.
    Remote(RemoteObject),
}

/// An argument passed into script evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalArg {
    /// Plain JSON value.
    Value(Value),
    /// Previously exposed engine object.
    Handle(EngineHandle),
}

/// Result of probing a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// No element matches.
    Missing,
    /// An element matches but is not visible.
    Hidden(EngineHandle),
    /// A visible element matches.
    Visible(EngineHandle),
}

impl SelectorState {
    /// Returns the matched element, visible or not.
    #[inline]
    #[must_use]
    pub const fn handle(self) -> Option<EngineHandle> {
        match self {
            Self::Missing => None,
            Self::Hidden(handle) | Self::Visible(handle) => Some(handle),
        }
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Asynchronous notification raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// A navigation finished loading.
    Load {
        /// Navigated context.
        context: ContextId,
        /// Loaded URL.
        url: String,
    },
    /// Page code called a console API.
    ConsoleCall {
        /// Calling context.
        context: ContextId,
        /// Severity.
        level: LogLevel,
        /// Console function name.
        method: String,
        /// Call arguments.
        args: Vec<EngineValue>,
        /// Call site, `None` for anonymous top-level evaluation.
        call_site: Option<StackFrame>,
    },
    /// The engine opened a context on its own (e.g. a popup).
    ContextCreated {
        /// New context id.
        context: ContextId,
        /// Opener.
        parent: Option<ContextId>,
        /// Initial URL.
        url: String,
    },
    /// The engine closed a context on its own.
    ContextDestroyed {
        /// Closed context.
        context: ContextId,
    },
}

/// Signal handler callback type.
///
/// Called synchronously for each signal raised by the engine.
pub type SignalHandler = Arc<dyn Fn(EngineSignal) + Send + Sync>;

// ============================================================================
// BrowserEngine
// ============================================================================

/// Primitives the server needs from a browser engine.
///
/// Pages are addressed by the [`ContextId`] the server assigned when it
/// opened them.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Opens a page for `context` at `url`.
    async fn open_page(&self, context: &ContextId, parent: Option<&ContextId>, url: &str)
    -> Result<()>;

    /// Closes the page of `context`.
    async fn close_page(&self, context: &ContextId) -> Result<()>;

    /// Navigates and resolves once the page has loaded. Raises
    /// [`EngineSignal::Load`] before resolving.
    async fn navigate(&self, context: &ContextId, url: &str) -> Result<()>;

    /// Probes `selector` once.
    async fn query(&self, context: &ContextId, selector: &str) -> Result<SelectorState>;

    /// Calls the function `source` with `args`.
    async fn evaluate(
        &self,
        context: &ContextId,
        source: &str,
        args: Vec<EvalArg>,
    ) -> Result<EngineValue>;

    /// Clicks an element.
    async fn click(&self, context: &ContextId, element: EngineHandle) -> Result<()>;

    /// Types text into an element.
    async fn type_text(&self, context: &ContextId, element: EngineHandle, text: &str)
    -> Result<()>;

    /// Installs or clears the signal handler.
    fn set_signal_handler(&self, handler: Option<SignalHandler>);
}

// ============================================================================
// Tests
// ============================================================================
