//! Outbound message queue.
//!
//! Every response and event goes through one queue drained by the
//! connection's single writer, so frames never interleave and the order of
//! enqueueing is the order on the wire.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::trace;

use crate::protocol::{Event, Outgoing, Response};

// ============================================================================
// Outbound
// ============================================================================

/// Sending half of the outbound queue.
///
/// Cheap to clone. After [`close`](Self::close) every send is a no-op.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: Arc<AtomicBool>,
}

impl Outbound {
    /// Creates a queue and returns both halves.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (outbound, rx)
    }

    /// Queues an event.
    pub fn send_event(&self, event: Event) {
        trace!(method = event.method(), "Queueing event");
        self.send(Outgoing::Event(event));
    }

    /// Queues a response.
    pub fn send_response(&self, response: Response) {
        trace!(id = ?response.id(), error = response.is_error(), "Queueing response");
        self.send(Outgoing::Response(response));
    }

    /// Stops accepting messages.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns `true` once the queue is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }

    /// Returns `false` when the message was dropped.
    fn send(&self, outgoing: Outgoing) -> bool {
        if self.closed.load(Ordering::Acquire) {
            trace!("Outbound closed, dropping message");
            return false;
        }
        match self.tx.send(outgoing) {
            Ok(()) => true,
            Err(mpsc::error::SendError(outgoing)) => {
                trace!(?outgoing, "Writer gone, dropping message");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
