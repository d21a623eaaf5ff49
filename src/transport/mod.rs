//! WebSocket transport layer.
//!
//! This module carries frames between the client and the session.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client         │         WebSocket            │  Connection     │
//! │                 │◄────────────────────────────►│  → Session      │
//! │                 │      host:PORT               │  → Outbound     │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Frame validation and encoding |
//! | `connection` | WebSocket connection and event loop |
//! | `outbound` | Ordered queue of responses and events |

// ============================================================================
// Submodules
// ============================================================================

/// Frame validation and encoding.
pub mod codec;

/// WebSocket connection and event loop.
pub mod connection;

/// Ordered queue of responses and events.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use outbound::Outbound;
