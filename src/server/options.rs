//! Server configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bidi_server::{ProtocolProfile, ServerOptions};
//!
//! let options = ServerOptions::new()
//!     .with_port(9222)
//!     .with_profile(ProtocolProfile::Legacy)
//!     .with_selector_timeout(Duration::from_secs(2));
//! ```
//!
//! # Environment
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PORT` | `8080` | Listening port, `0` for ephemeral |
//! | `BIDI_HOST` | `127.0.0.1` | Listening address |
//! | `BIDI_PROFILE` | `current` | Wire format, `current` or `legacy` |

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::ProtocolProfile;
use crate::session::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_SELECTOR_TIMEOUT};

// ============================================================================
// Constants
// ============================================================================

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Port variable.
const ENV_PORT: &str = "PORT";

/// Host variable.
const ENV_HOST: &str = "BIDI_HOST";

/// Profile variable.
const ENV_PROFILE: &str = "BIDI_PROFILE";

// ============================================================================
// ServerOptions
// ============================================================================

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to listen on.
    pub host: IpAddr,

    /// Port to listen on, `0` for an ephemeral port.
    pub port: u16,

    /// Wire format revision.
    pub profile: ProtocolProfile,

    /// Selector wait timeout when a command gives none.
    pub selector_timeout: Duration,

    /// Interval between selector probes.
    pub poll_interval: Duration,

    /// Navigation timeout when a command gives none.
    pub navigation_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ServerOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            profile: ProtocolProfile::Current,
            selector_timeout: DEFAULT_SELECTOR_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }

    /// Reads options from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unparsable values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads options through `lookup`, falling back to defaults for unset
    /// keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::new();

        if let Some(port) = lookup(ENV_PORT) {
            options.port = port
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{ENV_PORT} must be a port number, got '{port}'")))?;
        }

        if let Some(host) = lookup(ENV_HOST) {
            options.host = host
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{ENV_HOST} must be an IP address, got '{host}'")))?;
        }

        if let Some(profile) = lookup(ENV_PROFILE) {
            options.profile = profile.parse()?;
        }

        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ServerOptions {
    /// Sets the listening address.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the listening port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the wire format.
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: ProtocolProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the default selector wait timeout.
    #[inline]
    #[must_use]
    pub fn with_selector_timeout(mut self, timeout: Duration) -> Self {
        self.selector_timeout = timeout;
        self
    }

    /// Sets the selector poll interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the default navigation timeout.
    #[inline]
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ServerOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the poll interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("Poll interval must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
