//! Per-connection protocol session.
//!
//! A [`Session`] owns everything one client connection creates: its
//! context registry, the dispatcher with its lanes and tasks, and the
//! engine signal handler. Closing the session releases all of it.
//!
//! # Lifecycle
//!
//! 1. `Session::open` - Open the root context and install the event bridge
//! 2. `Session::handle_message` - Decode frames and dispatch commands
//! 3. `Session::close` - Stop output, abort work, close pages silently
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | Engine signals to protocol events |
//! | `dispatcher` | Command routing and per-context lanes |
//! | `registry` | Browsing context tree and object handles |
//! | `wait` | Selector and navigation waits |

// ============================================================================
// Submodules
// ============================================================================

/// Engine signals to protocol events.
pub mod bridge;

/// Command routing and per-context lanes.
pub mod dispatcher;

/// Browsing context tree and object handles.
pub mod registry;

/// Selector and navigation waits.
pub mod wait;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace};

use crate::engine::BrowserEngine;
use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::Response;
use crate::server::ServerOptions;
use crate::transport::{Outbound, codec};

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::EventBridge;
pub use dispatcher::Dispatcher;
pub use registry::ContextRegistry;
pub use wait::WaitEngine;

// ============================================================================
// Constants
// ============================================================================

/// URL of the root context.
const ROOT_URL: &str = "about:blank";

// ============================================================================
// Session
// ============================================================================

/// State of one client connection.
pub struct Session {
    engine: Arc<dyn BrowserEngine>,
    registry: Arc<ContextRegistry>,
    dispatcher: Dispatcher,
    outbound: Outbound,
    root: ContextId,
    closed: AtomicBool,
}

impl Session {
    /// Opens a session: creates the root context silently and starts
    /// routing engine signals to `outbound`.
    ///
    /// # Arguments
    ///
    /// * `engine` - Browser engine shared with the server
    /// * `options` - Profile, wait defaults and timeouts
    /// * `outbound` - Queue drained by the connection writer
    ///
    /// # Errors
    ///
    /// Returns the engine error if the root page cannot be opened.
    pub async fn open(
        engine: Arc<dyn BrowserEngine>,
        options: &ServerOptions,
        outbound: Outbound,
    ) -> Result<Self> {
        let registry = Arc::new(ContextRegistry::new(outbound.clone()));

        let root = ContextId::generate();
        engine.open_page(&root, None, ROOT_URL).await?;
        registry.register_root(root.clone(), ROOT_URL);

        EventBridge::install(engine.as_ref(), Arc::clone(&registry), outbound.clone());

        let dispatcher = Dispatcher::new(
            Arc::clone(&engine),
            Arc::clone(&registry),
            outbound.clone(),
            options,
        );

        info!(root = %root, profile = %options.profile, "Session opened");

        Ok(Self {
            engine,
            registry,
            dispatcher,
            outbound,
            root,
            closed: AtomicBool::new(false),
        })
    }

    /// Handles one incoming frame.
    ///
    /// Malformed frames are answered with an `invalid argument` error and
    /// `id: null`; valid commands are dispatched. Never blocks.
    pub fn handle_message(&self, message: &Message) {
        match codec::decode(message) {
            None => trace!("Control frame ignored"),
            Some(Err(e)) => {
                debug!(error = %e, "Rejected frame");
                self.outbound.send_response(Response::error(None, &e));
            }
            Some(Ok(command)) => self.dispatcher.submit(command),
        }
    }

    /// Returns the context opened at session start.
    #[inline]
    #[must_use]
    pub fn root_context(&self) -> &ContextId {
        &self.root
    }

    /// Returns the context registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Returns `true` once [`close`](Self::close) ran.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Tears the session down. Idempotent.
    ///
    /// Output stops first, so nothing raised during teardown reaches the
    /// client. Pages are closed without events.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.outbound.close();
        EventBridge::uninstall(self.engine.as_ref());
        self.dispatcher.shutdown();

        let contexts = self.registry.drain();
        let count = contexts.len();
        for context in contexts {
            if let Err(e) = self.engine.close_page(&context).await {
                trace!(%context, error = %e, "Page already gone");
            }
        }

        info!(contexts = count, "Session closed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::engine::SandboxEngine;
    use crate::protocol::{Outgoing, ProtocolProfile};

    async fn open() -> (SandboxEngine, Session, UnboundedReceiver<Outgoing>) {
        let engine = SandboxEngine::new();
        let (outbound, rx) = Outbound::channel();
        let session = Session::open(Arc::new(engine.clone()), &ServerOptions::default(), outbound)
            .await
            .expect("open");
        (engine, session, rx)
    }

    fn json_of(outgoing: &Outgoing) -> Value {
        outgoing.to_json(ProtocolProfile::Current)
    }

    #[tokio::test]
    async fn test_open_creates_silent_root() {
        let (engine, session, mut rx) = open().await;
        assert!(session.registry().contains(session.root_context()));
        assert_eq!(engine.page_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_frame_is_answered() {
        let (_engine, session, mut rx) = open().await;
        session.handle_message(&Message::Text("this is not json".into()));

        let outgoing = rx.recv().await.expect("response");
        assert_eq!(
            json_of(&outgoing),
            json!({ "id": null, "error": "invalid argument", "message": "Cannot parse data as JSON" })
        );
    }

    #[tokio::test]
    async fn test_control_frames_are_ignored() {
        let (_engine, session, mut rx) = open().await;
        session.handle_message(&Message::Pong(Vec::new().into()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let (_engine, session, mut rx) = open().await;
        session.handle_message(&Message::Text(
            r#"{"id":5,"method":"session.status","params":{}}"#.into(),
        ));

        let outgoing = rx.recv().await.expect("response");
        assert_eq!(
            json_of(&outgoing),
            json!({ "id": 5, "result": { "ready": true, "message": "ready" } })
        );
    }

    #[tokio::test]
    async fn test_close_releases_pages_silently() {
        let (engine, session, mut rx) = open().await;
        session.handle_message(&Message::Text(
            r#"{"id":1,"method":"browsingContext.create","params":{}}"#.into(),
        ));
        let _created = rx.recv().await.expect("event");
        let _response = rx.recv().await.expect("response");
        assert_eq!(engine.page_count(), 2);

        session.close().await;
        session.close().await;

        assert!(session.is_closed());
        assert_eq!(engine.page_count(), 0);
        assert!(session.registry().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
