//! Server entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Server`] | Bound listener serving protocol sessions |
//! | [`ServerBuilder`] | Fluent configuration builder |
//! | [`ServerOptions`] | Listening address, wire format and timeouts |
//!
//! # Example
//!
//! ```no_run
//! use bidi_server::{Result, SandboxEngine, Server};
//!
//! # async fn example() -> Result<()> {
//! let server = Server::builder()
//!     .engine(SandboxEngine::new())
//!     .port(0)
//!     .bind()
//!     .await?;
//!
//! server.serve_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for server configuration.
pub mod builder;

/// Core server implementation.
pub mod core;

/// Server options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ServerBuilder;
pub use core::Server;
pub use options::ServerOptions;
