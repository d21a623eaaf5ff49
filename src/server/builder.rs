//! Builder pattern for server configuration.
//!
//! Provides a fluent API for configuring and binding a [`Server`].
//!
//! # Example
//!
//! ```ignore
//! use bidi_server::{ProtocolProfile, SandboxEngine, Server};
//!
//! let server = Server::builder()
//!     .engine(SandboxEngine::new())
//!     .port(8080)
//!     .profile(ProtocolProfile::Legacy)
//!     .bind()
//!     .await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::BrowserEngine;
use crate::error::{Error, Result};
use crate::protocol::ProtocolProfile;

use super::core::Server;
use super::options::ServerOptions;

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for configuring a [`Server`].
///
/// Use [`Server::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ServerBuilder {
    /// Server options.
    options: ServerOptions,
    /// Browser engine.
    engine: Option<Arc<dyn BrowserEngine>>,
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("options", &self.options)
            .field("engine", &self.engine.is_some())
            .finish()
    }
}

// ============================================================================
// ServerBuilder Implementation
// ============================================================================

impl ServerBuilder {
    /// Creates a builder with default options and no engine.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the browser engine.
    #[must_use]
    pub fn engine<E: BrowserEngine + 'static>(mut self, engine: E) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Replaces all options.
    #[must_use]
    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the listening address.
    #[must_use]
    pub fn host(mut self, host: IpAddr) -> Self {
        self.options.host = host;
        self
    }

    /// Sets the listening port, `0` for ephemeral.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Sets the wire format.
    #[must_use]
    pub fn profile(mut self, profile: ProtocolProfile) -> Self {
        self.options.profile = profile;
        self
    }

    /// Sets the default selector wait timeout.
    #[must_use]
    pub fn selector_timeout(mut self, timeout: Duration) -> Self {
        self.options.selector_timeout = timeout;
        self
    }

    /// Sets the selector poll interval.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Sets the default navigation timeout.
    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.options.navigation_timeout = timeout;
        self
    }

    /// Validates the configuration and binds the server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no engine is set or options are invalid
    /// - [`Error::Io`] if binding fails
    pub async fn bind(self) -> Result<Server> {
        let engine = self.validate_engine()?;
        Server::bind(engine, self.options).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ServerBuilder {
    /// Validates the engine configuration.
    fn validate_engine(&self) -> Result<Arc<dyn BrowserEngine>> {
        self.engine.clone().ok_or_else(|| {
            Error::config(
                "Browser engine is required. Use .engine() to set it.\n\
                 Example: Server::builder().engine(SandboxEngine::new())",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
