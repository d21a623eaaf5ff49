//! Engine signal to protocol event bridge.
//!
//! The bridge installs a synchronous [`SignalHandler`] on the engine that
//! converts each signal into a protocol event and queues it immediately.
//! Signals raised while an engine call is in flight are therefore queued
//! ahead of that command's response.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{trace, warn};

use crate::engine::{BrowserEngine, EngineSignal, EngineValue, SignalHandler};
use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::{Event, LogEntry, LogLevel, SerializedValue, StackFrame};
use crate::transport::Outbound;

use super::ContextRegistry;

// ============================================================================
// Constants
// ============================================================================

/// Column just past the `(function() {` wrapper around evaluated code.
const WRAPPER_COLUMN: u32 = 14;

// ============================================================================
// EventBridge
// ============================================================================

/// Installs and removes the session's signal handler.
pub struct EventBridge;

impl EventBridge {
    /// Routes `engine` signals to `outbound`.
    pub fn install(engine: &dyn BrowserEngine, registry: Arc<ContextRegistry>, outbound: Outbound) {
        let handler: SignalHandler =
            Arc::new(move |signal| Self::forward(&registry, &outbound, signal));
        engine.set_signal_handler(Some(handler));
    }

    /// Stops routing signals.
    pub fn uninstall(engine: &dyn BrowserEngine) {
        engine.set_signal_handler(None);
    }

    /// Converts one signal and queues the resulting event.
    fn forward(registry: &ContextRegistry, outbound: &Outbound, signal: EngineSignal) {
        if outbound.is_closed() {
            trace!(?signal, "Session closed, signal dropped");
            return;
        }

        match signal {
            EngineSignal::Load { context, url } => {
                if !registry.contains(&context) {
                    trace!(%context, "Load for unknown context dropped");
                    return;
                }
                registry.set_url(&context, url.clone());
                outbound.send_event(Event::Load { context, url });
            }

            EngineSignal::ConsoleCall {
                context,
                level,
                method,
                args,
                call_site,
            } => match Self::log_entry(registry, context, level, method, args, call_site) {
                Ok(entry) => outbound.send_event(Event::LogEntryAdded(entry)),
                Err(e) => trace!(error = %e, "Console call dropped"),
            },

            EngineSignal::ContextCreated {
                context,
                parent,
                url,
            } => {
                let parent = parent.filter(|p| registry.contains(p));
                if let Err(e) = registry.create(context, parent, url) {
                    warn!(error = %e, "Failed to adopt engine context");
                }
            }

            EngineSignal::ContextDestroyed { context } => {
                if registry.destroy(&context).is_none() {
                    trace!(%context, "Destroy for unknown context dropped");
                }
            }
        }
    }

    fn log_entry(
        registry: &ContextRegistry,
        context: ContextId,
        level: LogLevel,
        method: String,
        args: Vec<EngineValue>,
        call_site: Option<StackFrame>,
    ) -> Result<LogEntry> {
        registry.resolve(&context)?;

        let args = args
            .into_iter()
            .map(|arg| registry.serialize(&context, arg))
            .collect::<Result<Vec<_>>>()?;

        let text = args
            .iter()
            .map(SerializedValue::console_text)
            .collect::<Vec<_>>()
            .join(" ");

        let frame = call_site.unwrap_or_else(|| StackFrame {
            url: registry.url(&context).unwrap_or_default(),
            function_name: String::new(),
            line_number: 0,
            column_number: WRAPPER_COLUMN,
        });

        Ok(LogEntry {
            context,
            level,
            method,
            text,
            timestamp: now_ms(),
            args,
            stack_trace: vec![frame],
        })
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
