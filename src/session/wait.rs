//! Deadline-bounded waits.
//!
//! Selector waits poll the engine at a fixed interval. The deadline is
//! checked after each failed poll, so a timeout is only reported once at
//! least the full timeout has elapsed.
//!
//! Navigation waits race the engine's navigation task against a timer. The
//! task is never cancelled by the wait; on timeout it keeps running and
//! its load event is delivered whenever it completes.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, trace};

use crate::engine::{BrowserEngine, SelectorState};
use crate::error::{Error, Result};
use crate::identifiers::ContextId;

// ============================================================================
// Constants
// ============================================================================

/// Default selector wait timeout.
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default selector poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// WaitEngine
// ============================================================================

/// Polling waits with shared defaults.
#[derive(Debug, Clone, Copy)]
pub struct WaitEngine {
    poll_interval: Duration,
    default_timeout: Duration,
}

impl Default for WaitEngine {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_SELECTOR_TIMEOUT)
    }
}

impl WaitEngine {
    /// Creates a wait engine.
    #[inline]
    #[must_use]
    pub const fn new(poll_interval: Duration, default_timeout: Duration) -> Self {
        Self {
            poll_interval,
            default_timeout,
        }
    }

    /// Waits until `selector` matches a visible element, or with `hidden`,
    /// until nothing visible matches.
    ///
    /// Returns the final probe result.
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine probed on every poll
    /// * `context` - Context whose page is probed
    /// * `selector` - CSS selector (e.g., "#login")
    /// * `timeout_ms` - Deadline in milliseconds, `None` for the default
    /// * `hidden` - Wait for the selector to stop matching anything visible
    ///
    /// # Errors
    ///
    /// - [`Error::SelectorTimeout`] once `timeout_ms` (default 5000) elapsed
    /// - Engine errors from the probe, unchanged
    pub async fn wait_for_selector(
        &self,
        engine: &dyn BrowserEngine,
        context: &ContextId,
        selector: &str,
        timeout_ms: Option<u64>,
        hidden: bool,
    ) -> Result<SelectorState> {
        let timeout_ms = timeout_ms.unwrap_or_else(|| duration_ms(self.default_timeout));
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut polls = 0u32;

        loop {
            let state = engine.query(context, selector).await?;
            polls += 1;

            let satisfied = match state {
                SelectorState::Visible(_) => !hidden,
                SelectorState::Hidden(_) | SelectorState::Missing => hidden,
            };
            if satisfied {
                trace!(%context, selector, polls, "Selector wait satisfied");
                return Ok(state);
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(%context, selector, timeout_ms, polls, "Selector wait timed out");
                return Err(Error::selector_timeout(selector, timeout_ms));
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Waits up to `timeout_ms` for a navigation task.
///
/// The task is borrowed so it survives a timeout.
///
/// # Arguments
///
/// * `navigation` - Running navigation task
/// * `timeout_ms` - Deadline in milliseconds
///
/// # Errors
///
/// - [`Error::NavigationTimeout`] if the task is still running
/// - The navigation's own error if it failed
pub async fn wait_for_navigation(
    navigation: &mut JoinHandle<Result<()>>,
    timeout_ms: u64,
) -> Result<()> {
    match timeout(Duration::from_millis(timeout_ms), navigation).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(Error::engine(format!("Navigation task failed: {e}"))),
        Err(_) => Err(Error::navigation_timeout(timeout_ms)),
    }
}

/// Converts to whole milliseconds, saturating.
#[inline]
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
