//! Protocol profiles.
//!
//! Different revisions of the wire contract disagree on small details:
//! whether a success payload sits under `result` or `value`, whether
//! context descriptions carry a `type` tag, and whether non-standard
//! commands use a `PROTO.`/`DEBUG.` prefix. One profile is chosen per
//! server and every message is rendered through it.
//!
//! | Aspect | [`ProtocolProfile::Current`] | [`ProtocolProfile::Legacy`] |
//! |--------|------------------------------|-----------------------------|
//! | Success wrapper | `result` | `value` |
//! | Context `type` tag | omitted | `"window"` |
//! | Extension commands | un-prefixed | `PROTO.` / `DEBUG.` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// ProtocolProfile
// ============================================================================

/// Wire-format revision used for serialization and method lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolProfile {
    /// Current revision: `result` wrapper, no context type tag.
    #[default]
    Current,
    /// Early revision: `value` wrapper, `type` tag, prefixed extension methods.
    Legacy,
}

impl ProtocolProfile {
    /// Returns the key holding a successful command payload.
    #[inline]
    #[must_use]
    pub const fn result_key(self) -> &'static str {
        match self {
            Self::Current => "result",
            Self::Legacy => "value",
        }
    }

    /// Returns the `type` tag attached to context descriptions, if any.
    #[inline]
    #[must_use]
    pub const fn context_type(self) -> Option<&'static str> {
        match self {
            Self::Current => None,
            Self::Legacy => Some("window"),
        }
    }

    /// Returns the profile name as accepted by [`FromStr`].
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for ProtocolProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "legacy" => Ok(Self::Legacy),
            other => Err(Error::config(format!(
                "Unknown protocol profile '{other}', expected 'current' or 'legacy'"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
