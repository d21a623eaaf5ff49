//! Command methods and their typed parameters.
//!
//! Commands follow `module.methodName` format. The wire name of each
//! [`Method`] depends on the active [`ProtocolProfile`].
//!
//! | Method | Current name | Legacy name |
//! |--------|--------------|-------------|
//! | Status | `session.status` | `session.status` |
//! | Tree | `browsingContext.getTree` | `browsingContext.getTree` |
//! | Create | `browsingContext.create` | `PROTO.browsingContext.createContext` |
//! | Close | `browsingContext.close` | `DEBUG.Page.close` |
//! | Navigate | `browsingContext.navigate` | `browsingContext.navigate` |
//! | Wait | `browsingContext.waitForSelector` | `PROTO.browsingContext.waitForSelector` |
//! | Select | `browsingContext.selectElement` | `PROTO.browsingContext.selectElement` |
//! | Evaluate | `browsingContext.evaluate` | `PROTO.browsingContext.evaluate` |
//! | Click | `browsingContext.click` | `PROTO.browsingContext.click` |
//! | Type | `browsingContext.type` | `PROTO.browsingContext.type` |

// ============================================================================
// Imports
// ============================================================================

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{ContextId, ObjectId};

use super::ProtocolProfile;
use super::request::json_kind;

// ============================================================================
// Method
// ============================================================================

/// Registered command methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Readiness probe.
    SessionStatus,
    /// Enumerate open contexts.
    GetTree,
    /// Open a new context.
    Create,
    /// Close a context and its descendants.
    Close,
    /// Navigate a context.
    Navigate,
    /// Poll for a selector.
    WaitForSelector,
    /// Immediate selector query.
    SelectElement,
    /// Run a function in the page.
    Evaluate,
    /// Click an element.
    Click,
    /// Type text into an element.
    Type,
}

impl Method {
    /// All registered methods.
    pub const ALL: [Self; 10] = [
        Self::SessionStatus,
        Self::GetTree,
        Self::Create,
        Self::Close,
        Self::Navigate,
        Self::WaitForSelector,
        Self::SelectElement,
        Self::Evaluate,
        Self::Click,
        Self::Type,
    ];

    /// Returns the wire name under `profile`.
    #[must_use]
    pub const fn wire_name(self, profile: ProtocolProfile) -> &'static str {
        match (self, profile) {
            (Self::SessionStatus, _) => "session.status",
            (Self::GetTree, _) => "browsingContext.getTree",
            (Self::Navigate, _) => "browsingContext.navigate",
            (Self::Create, ProtocolProfile::Current) => "browsingContext.create",
            (Self::Create, ProtocolProfile::Legacy) => "PROTO.browsingContext.createContext",
            (Self::Close, ProtocolProfile::Current) => "browsingContext.close",
            (Self::Close, ProtocolProfile::Legacy) => "DEBUG.Page.close",
            (Self::WaitForSelector, ProtocolProfile::Current) => "browsingContext.waitForSelector",
            (Self::WaitForSelector, ProtocolProfile::Legacy) => {
                "PROTO.browsingContext.waitForSelector"
            }
            (Self::SelectElement, ProtocolProfile::Current) => "browsingContext.selectElement",
            (Self::SelectElement, ProtocolProfile::Legacy) => "PROTO.browsingContext.selectElement",
            (Self::Evaluate, ProtocolProfile::Current) => "browsingContext.evaluate",
            (Self::Evaluate, ProtocolProfile::Legacy) => "PROTO.browsingContext.evaluate",
            (Self::Click, ProtocolProfile::Current) => "browsingContext.click",
            (Self::Click, ProtocolProfile::Legacy) => "PROTO.browsingContext.click",
            (Self::Type, ProtocolProfile::Current) => "browsingContext.type",
            (Self::Type, ProtocolProfile::Legacy) => "PROTO.browsingContext.type",
        }
    }

    /// Looks up a method by exact wire name.
    #[must_use]
    pub fn from_wire(name: &str, profile: ProtocolProfile) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.wire_name(profile) == name)
    }

    /// Returns `true` if the method targets a browsing context through a
    /// `context` parameter.
    #[inline]
    #[must_use]
    pub const fn is_context_scoped(self) -> bool {
        !matches!(self, Self::SessionStatus | Self::GetTree | Self::Create)
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Params of `browsingContext.getTree`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetTreeParams {
    /// Restrict the tree to this context's subtree.
    #[serde(default)]
    pub root: Option<ContextId>,
}

/// Params of context creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateParams {
    /// Initial URL, `about:blank` when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// Owning context for nested contexts.
    #[serde(default)]
    pub parent: Option<ContextId>,
}

/// Params of commands that only need a context.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextParams {
    /// Target context.
    pub context: ContextId,
}

/// Navigation readiness condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitUntil {
    /// Wait for the load event.
    #[serde(rename = "load")]
    Load,
    /// Wait for DOM content to be parsed.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
}

/// Params of `browsingContext.navigate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    /// Target context.
    pub context: ContextId,
    /// Destination URL.
    pub url: String,
    /// Conditions to wait for, `["load"]` when absent.
    #[serde(default)]
    pub wait_until: Option<Vec<WaitUntil>>,
    /// Milliseconds to wait before failing the command.
    #[serde(default, deserialize_with = "deserialize_timeout")]
    pub timeout: Option<u64>,
}

impl NavigateParams {
    /// Returns `true` if the command should wait for the navigation.
    #[inline]
    #[must_use]
    pub fn waits(&self) -> bool {
        self.wait_until.as_ref().is_none_or(|list| !list.is_empty())
    }
}

/// Params of `browsingContext.waitForSelector`.
#[derive(Debug, Clone, Deserialize)]
pub struct WaitForSelectorParams {
    /// Target context.
    pub context: ContextId,
    /// CSS selector.
    pub selector: String,
    /// Milliseconds to wait before failing.
    #[serde(default, deserialize_with = "deserialize_timeout")]
    pub timeout: Option<u64>,
    /// Wait for the selector to disappear instead.
    #[serde(default)]
    pub hidden: bool,
}

/// Params of `browsingContext.selectElement`.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectElementParams {
    /// Target context.
    pub context: ContextId,
    /// CSS selector.
    pub selector: String,
}

/// Params of `browsingContext.evaluate`.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateParams {
    /// Target context.
    pub context: ContextId,
    /// Function source, e.g. `(a, b) => a + b`.
    pub function: String,
    /// Call arguments: plain JSON or `{"objectId": ...}` references.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Reference to a remote object previously handed to the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReference {
    /// Object to resolve.
    pub object_id: ObjectId,
}

impl RemoteReference {
    /// Interprets an argument as a remote reference.
    ///
    /// Only objects whose sole key is a string `objectId` qualify.
    #[must_use]
    pub fn from_arg(arg: &Value) -> Option<Self> {
        let map = arg.as_object()?;
        if map.len() != 1 {
            return None;
        }
        map.get("objectId")
            .and_then(Value::as_str)
            .map(|id| Self {
                object_id: ObjectId::new(id),
            })
    }
}

/// Params of `browsingContext.click`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClickParams {
    /// Target context.
    pub context: ContextId,
    /// Element to click.
    pub element: RemoteReference,
}

/// Params of `browsingContext.type`.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeParams {
    /// Target context.
    pub context: ContextId,
    /// Element receiving input.
    pub element: RemoteReference,
    /// Text to type.
    pub text: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Accepts a timeout as an unsigned integer or a numeric string (`"1"`).
fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
            de::Error::custom("timeout: Expected unsigned integer but got number")
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| {
            de::Error::custom(format!("timeout: Expected unsigned integer but got '{s}'"))
        }),
        Some(other) => Err(de::Error::custom(format!(
            "timeout: Expected unsigned integer but got {}",
            json_kind(Some(&other))
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
