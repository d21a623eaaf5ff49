//! Server implementation.
//!
//! The server accepts WebSocket clients one at a time. Each connection
//! gets a fresh [`Session`] that lives exactly as long as the connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::{Future, pending};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::engine::BrowserEngine;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::{Connection, Outbound};

use super::{ServerBuilder, ServerOptions};

// ============================================================================
// Server
// ============================================================================

/// A bound protocol server.
///
/// # Example
///
/// ```ignore
/// use bidi_server::{SandboxEngine, Server};
///
/// let server = Server::builder()
///     .engine(SandboxEngine::new())
///     .port(0)
///     .bind()
///     .await?;
///
/// println!("{}", server.ws_url());
/// server.serve().await?;
/// ```
pub struct Server {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Port the server is bound to.
    port: u16,
    /// Configuration shared by every session.
    options: ServerOptions,
    /// Engine driven by every session.
    engine: Arc<dyn BrowserEngine>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("port", &self.port)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Server - Public API
// ============================================================================

impl Server {
    /// Creates a server builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener.
    ///
    /// Port `0` lets the OS pick an available port.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Io`] if binding fails
    pub async fn bind(engine: Arc<dyn BrowserEngine>, options: ServerOptions) -> Result<Self> {
        options.validate()?;

        let addr = SocketAddr::new(options.host, options.port);
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        debug!(port, host = %options.host, "WebSocket server bound");

        Ok(Self {
            listener,
            port,
            options,
            engine,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(self.options.host, self.port)
    }

    /// Returns the URL clients connect to.
    ///
    /// A wildcard host is reported as `127.0.0.1`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let host = if self.options.host.is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.options.host
        };
        format!("ws://{}", SocketAddr::new(host, self.port))
    }

    /// Serves clients until the process ends.
    ///
    /// # Errors
    ///
    /// Currently never fails; per-connection failures are logged.
    pub async fn serve(self) -> Result<()> {
        self.serve_until(pending()).await
    }

    /// Serves clients until `shutdown` completes.
    ///
    /// A connection still open at shutdown is dropped without teardown.
    ///
    /// # Errors
    ///
    /// Currently never fails; per-connection failures are logged.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    tokio::select! {
                        result = self.handle_connection(stream, addr) => {
                            if let Err(e) = result {
                                warn!(%addr, error = %e, "Connection failed");
                            }
                        }

                        _ = &mut shutdown => {
                            info!("Shutdown requested");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Server - Internal
// ============================================================================

impl Server {
    /// Upgrades a TCP stream and runs its session to completion.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(%addr, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(%addr, "WebSocket connection established");

        let (outbound, outbound_rx) = Outbound::channel();
        let session = Session::open(Arc::clone(&self.engine), &self.options, outbound).await?;

        Connection::new(session, outbound_rx, self.options.profile)
            .run(ws_stream)
            .await;

        info!(%addr, "Client disconnected");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
