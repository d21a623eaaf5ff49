//! BiDi Server - browser automation protocol server over WebSocket.
//!
//! This library implements a subset of the WebDriver BiDi wire protocol on
//! top of a pluggable browser engine.
//!
//! # Architecture
//!
//! The server follows a client-server model:
//!
//! - **Client**: Sends JSON commands, receives responses and events
//! - **Server (Rust)**: Validates, dispatches and answers each command once
//! - **Engine**: Owns pages, DOM and script execution behind [`BrowserEngine`]
//!
//! Key design principles:
//!
//! - Each connection owns one [`Session`]: context tree + lanes + event bridge
//! - Protocol uses `module.methodName` format
//! - Commands for the same context run in order; contexts never block each other
//! - Events caused by a command are written before its response
//!
//! # Quick Start
//!
//! ```no_run
//! use bidi_server::{Result, SandboxEngine, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::builder()
//!         .engine(SandboxEngine::new())
//!         .port(8080)
//!         .bind()
//!         .await?;
//!
//!     println!("Listening on {}", server.ws_url());
//!     server.serve().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | Browser engine seam and in-process sandbox engine |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Command, response and event message types |
//! | [`server`] | Listener, builder and options |
//! | [`session`] | Per-connection state: registry, dispatcher, waits, bridge |
//! | [`transport`] | Frame codec and connection event loop |

// ============================================================================
// Modules
// ============================================================================

/// Browser engine seam.
///
/// The server drives pages only through [`BrowserEngine`].
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Protocol message types.
pub mod protocol;

/// Server entry point.
///
/// Use [`Server::builder()`] to create a configured server.
pub mod server;

/// Per-connection protocol session.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{
    BrowserEngine, EngineHandle, EngineSignal, EngineValue, EvalArg, RemoteObject,
    SandboxEngine, ScriptScope, SelectorState, SignalHandler,
};

// Error types
pub use error::{Error, ErrorCode, Result};

// Identifier types
pub use identifiers::{CommandId, ContextId, ObjectId};

// Protocol types
pub use protocol::{Event, ProtocolProfile, Response};

// Server types
pub use server::{Server, ServerBuilder, ServerOptions};

// Session types
pub use session::Session;
