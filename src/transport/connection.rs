//! WebSocket connection and event loop.
//!
//! One connection drives one [`Session`]. The event loop handles:
//!
//! - Incoming frames from the client, handed to the session
//! - Outgoing responses and events, written by this loop only
//!
//! When the client goes away the session is torn down before the loop
//! returns.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::protocol::{Outgoing, ProtocolProfile};
use crate::session::Session;

use super::codec;

// ============================================================================
// Connection
// ============================================================================

/// A client connection bound to its session.
pub struct Connection {
    /// Session state for this client.
    session: Session,
    /// Receiving half of the session's outbound queue.
    outbound_rx: mpsc::UnboundedReceiver<Outgoing>,
    /// Wire format used when encoding.
    profile: ProtocolProfile,
}

impl Connection {
    /// Creates a connection for `session`.
    #[must_use]
    pub fn new(
        session: Session,
        outbound_rx: mpsc::UnboundedReceiver<Outgoing>,
        profile: ProtocolProfile,
    ) -> Self {
        Self {
            session,
            outbound_rx,
            profile,
        }
    }

    /// Runs the event loop until the client disconnects, then tears the
    /// session down.
    pub async fn run<S>(mut self, ws_stream: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from client
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by client");
                            break;
                        }

                        Some(Ok(message)) => {
                            self.session.handle_message(&message);
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }
                    }
                }

                // Responses and events for client
                outgoing = self.outbound_rx.recv() => {
                    let Some(outgoing) = outgoing else {
                        debug!("Outbound channel closed");
                        break;
                    };

                    if let Err(e) = ws_write.send(codec::encode(&outgoing, self.profile)).await {
                        warn!(error = %e, "Failed to write frame");
                        break;
                    }
                    trace!("Frame written");
                }
            }
        }

        self.session.close().await;
        let _ = ws_write.close().await;

        debug!("Event loop terminated");
    }
}
