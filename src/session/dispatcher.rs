//! Command dispatch.
//!
//! Every decoded command is answered exactly once. Commands addressed to a
//! live context run on that context's lane: a FIFO worker that executes
//! one command at a time in dispatch order. Everything else runs as an
//! independent task, so a long wait in one context never stalls another.
//!
//! # Methods
//!
//! | Method | Handler |
//! |--------|---------|
//! | `session.status` | `status` |
//! | `browsingContext.getTree` | `get_tree` |
//! | `browsingContext.create` | `create` |
//! | `browsingContext.close` | `close` |
//! | `browsingContext.navigate` | `navigate` |
//! | `browsingContext.waitForSelector` | `wait_for_selector` |
//! | `browsingContext.selectElement` | `select_element` |
//! | `browsingContext.evaluate` | `evaluate` |
//! | `browsingContext.click` | `click` |
//! | `browsingContext.type` | `type_text` |

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace, warn};
use url::Url;

use crate::engine::{BrowserEngine, EngineHandle, EngineValue, EvalArg};
use crate::error::{Error, Result};
use crate::identifiers::{ContextId, ObjectId};
use crate::protocol::command::{
    ClickParams, ContextParams, CreateParams, EvaluateParams, GetTreeParams, NavigateParams,
    RemoteReference, SelectElementParams, TypeParams, WaitForSelectorParams,
};
use crate::protocol::{Command, Method, ProtocolProfile, Response, SerializedValue};
use crate::server::ServerOptions;
use crate::transport::Outbound;

use super::ContextRegistry;
use super::wait::{WaitEngine, duration_ms, wait_for_navigation};

// ============================================================================
// Constants
// ============================================================================

/// URL of contexts created without one.
const BLANK_URL: &str = "about:blank";

// ============================================================================
// Types
// ============================================================================

/// A queued command execution.
type Job = BoxFuture<'static, ()>;

/// Sending half of a context lane.
type LaneSender = mpsc::UnboundedSender<Job>;

// ============================================================================
// TaskTracker
// ============================================================================

/// Abort handles of every task a session spawned.
#[derive(Debug, Default)]
struct TaskTracker {
    handles: Mutex<Vec<AbortHandle>>,
}

impl TaskTracker {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let task = tokio::spawn(future);
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(task.abort_handle());
        task
    }

    fn abort_all(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let count = handles.len();
        for handle in handles {
            handle.abort();
        }
        if count > 0 {
            debug!(count, "Aborted session tasks");
        }
    }

    fn live(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes commands to handlers and answers each exactly once.
///
/// Cheap to clone; clones share lanes and tasks.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// Shared dispatcher state and command handlers.
struct DispatcherInner {
    engine: Arc<dyn BrowserEngine>,
    registry: Arc<ContextRegistry>,
    outbound: Outbound,
    waits: WaitEngine,
    profile: ProtocolProfile,
    navigation_timeout: Duration,
    lanes: Mutex<FxHashMap<ContextId, LaneSender>>,
    tasks: TaskTracker,
}

impl Dispatcher {
    /// Creates a dispatcher for one session.
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine executing page operations
    /// * `registry` - Context tree of this session
    /// * `outbound` - Queue receiving every response
    /// * `options` - Profile, wait defaults and navigation timeout
    #[must_use]
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        registry: Arc<ContextRegistry>,
        outbound: Outbound,
        options: &ServerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                engine,
                registry,
                outbound,
                waits: WaitEngine::new(options.poll_interval, options.selector_timeout),
                profile: options.profile,
                navigation_timeout: options.navigation_timeout,
                lanes: Mutex::new(FxHashMap::default()),
                tasks: TaskTracker::default(),
            }),
        }
    }

    /// Schedules `command`. Its response is queued when it completes.
    pub fn submit(&self, command: Command) {
        let id = command.id();
        let Some(method) = Method::from_wire(command.method(), self.inner.profile) else {
            debug!(%id, method = command.method(), "Unknown command");
            self.inner.outbound.send_response(Response::error(
                Some(id),
                &Error::unknown_command(command.method()),
            ));
            return;
        };

        trace!(%id, ?method, "Dispatching command");

        let target = method
            .is_context_scoped()
            .then(|| command.target_context())
            .flatten();

        let inner = Arc::clone(&self.inner);
        let job: Job = Box::pin(async move {
            let response = match inner.execute(method, &command).await {
                Ok(result) => Response::success(id, result),
                Err(e) => {
                    debug!(%id, ?method, error = %e, "Command failed");
                    Response::error(Some(id), &e)
                }
            };
            inner.outbound.send_response(response);
        });

        let job = match target.and_then(|context| self.inner.lane(&context)) {
            Some(lane) => match lane.send(job) {
                Ok(()) => return,
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };
        self.inner.tasks.spawn(job);
    }

    /// Aborts every lane and in-flight command.
    pub fn shutdown(&self) {
        self.inner.lanes.lock().clear();
        self.inner.tasks.abort_all();
    }

    /// Returns the number of running tasks, lanes included.
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.inner.tasks.live()
    }
}

// ============================================================================
// DispatcherInner - Lanes
// ============================================================================

impl DispatcherInner {
    /// Returns the lane of a live context, starting its worker on first use.
    ///
    /// The liveness check runs under the lanes lock, so a context retired
    /// concurrently never gets a fresh worker.
    fn lane(&self, context: &ContextId) -> Option<LaneSender> {
        let mut lanes = self.lanes.lock();
        if !self.registry.contains(context) {
            return None;
        }

        lanes.retain(|id, lane| !lane.is_closed() && self.registry.contains(id));
        let lane = lanes
            .entry(context.clone())
            .or_insert_with(|| self.spawn_lane(context))
            .clone();
        Some(lane)
    }

    fn spawn_lane(&self, context: &ContextId) -> LaneSender {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let context = context.clone();
        self.tasks.spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            trace!(%context, "Lane closed");
        });
        tx
    }

    /// Destroys `context` in the registry and drops its lane in one step.
    fn retire(&self, context: &ContextId) {
        let mut lanes = self.lanes.lock();
        self.registry.destroy(context);
        lanes.remove(context);
    }
}

// ============================================================================
// DispatcherInner - Handlers
// ============================================================================

impl DispatcherInner {
    async fn execute(&self, method: Method, command: &Command) -> Result<Value> {
        match method {
            Method::SessionStatus => Ok(Self::status()),
            Method::GetTree => self.get_tree(command.parse_params()?),
            Method::Create => self.create(command.parse_params()?).await,
            Method::Close => self.close(command.parse_params()?).await,
            Method::Navigate => self.navigate(command.parse_params()?).await,
            Method::WaitForSelector => self.wait_for_selector(command.parse_params()?).await,
            Method::SelectElement => self.select_element(command.parse_params()?).await,
            Method::Evaluate => self.evaluate(command.parse_params()?).await,
            Method::Click => self.click(command.parse_params()?).await,
            Method::Type => self.type_text(command.parse_params()?).await,
        }
    }

    /// `session.status`.
    fn status() -> Value {
        json!({ "ready": true, "message": "ready" })
    }

    /// `browsingContext.getTree`.
    fn get_tree(&self, params: GetTreeParams) -> Result<Value> {
        let contexts: Vec<Value> = self
            .registry
            .tree(params.root.as_ref())?
            .iter()
            .map(|info| info.to_json(self.profile))
            .collect();
        Ok(json!({ "contexts": contexts }))
    }

    /// `browsingContext.create`.
    async fn create(&self, params: CreateParams) -> Result<Value> {
        let url = params.url.unwrap_or_else(|| BLANK_URL.to_string());
        validate_url(&url)?;
        if let Some(parent) = &params.parent {
            self.registry.resolve(parent)?;
        }

        let context = ContextId::generate();
        self.engine
            .open_page(&context, params.parent.as_ref(), &url)
            .await?;

        match self.registry.create(context.clone(), params.parent, url) {
            Ok(info) => Ok(info.to_json(self.profile)),
            Err(e) => {
                self.discard_page(&context).await;
                Err(e)
            }
        }
    }

    /// `browsingContext.close`. Descendants are closed first, deepest
    /// first.
    async fn close(&self, params: ContextParams) -> Result<Value> {
        for context in self.registry.subtree_post_order(&params.context)? {
            if let Err(e) = self.engine.close_page(&context).await {
                warn!(%context, error = %e, "Engine failed to close page");
            }
            self.retire(&context);
        }
        Ok(json!({}))
    }

    /// `browsingContext.navigate`.
    async fn navigate(&self, params: NavigateParams) -> Result<Value> {
        self.registry.resolve(&params.context)?;
        validate_url(&params.url)?;

        let mut navigation = {
            let engine = Arc::clone(&self.engine);
            let context = params.context.clone();
            let url = params.url.clone();
            self.tasks.spawn(async move {
                let result = engine.navigate(&context, &url).await;
                if let Err(e) = &result {
                    debug!(%context, url = %url, error = %e, "Navigation failed");
                }
                result
            })
        };

        if params.waits() {
            let timeout_ms = params
                .timeout
                .unwrap_or_else(|| duration_ms(self.navigation_timeout));
            wait_for_navigation(&mut navigation, timeout_ms).await?;
        }

        Ok(json!({ "url": params.url }))
    }

    /// `browsingContext.waitForSelector`.
    async fn wait_for_selector(&self, params: WaitForSelectorParams) -> Result<Value> {
        self.registry.resolve(&params.context)?;

        let state = self
            .waits
            .wait_for_selector(
                self.engine.as_ref(),
                &params.context,
                &params.selector,
                params.timeout,
                params.hidden,
            )
            .await?;

        match (params.hidden, state.handle()) {
            (false, Some(handle)) => self.node(&params.context, handle),
            _ => Ok(json!({})),
        }
    }

    /// `browsingContext.selectElement`.
    async fn select_element(&self, params: SelectElementParams) -> Result<Value> {
        self.registry.resolve(&params.context)?;

        let handle = self
            .engine
            .query(&params.context, &params.selector)
            .await?
            .handle()
            .ok_or_else(|| Error::element_not_found(&params.selector))?;

        self.node(&params.context, handle)
    }

    /// `browsingContext.evaluate`.
    ///
    /// Primitive results come back as a string holding their JSON text;
    /// objects come back as serialized remote references.
    async fn evaluate(&self, params: EvaluateParams) -> Result<Value> {
        self.registry.resolve(&params.context)?;

        let args = params
            .args
            .into_iter()
            .map(|arg| match RemoteReference::from_arg(&arg) {
                Some(reference) => self
                    .registry
                    .resolve_object(&params.context, &reference.object_id)
                    .map(EvalArg::Handle),
                None => Ok(EvalArg::Value(arg)),
            })
            .collect::<Result<Vec<_>>>()?;

        let value = self
            .engine
            .evaluate(&params.context, &params.function, args)
            .await?;

        match value {
            EngineValue::Json(json) => Ok(Value::String(serde_json::to_string(&json)?)),
            other => Ok(self.registry.serialize(&params.context, other)?.to_json()),
        }
    }

    /// `browsingContext.click`.
    async fn click(&self, params: ClickParams) -> Result<Value> {
        let handle = self.element(&params.context, &params.element.object_id)?;
        self.engine.click(&params.context, handle).await?;
        Ok(json!({}))
    }

    /// `browsingContext.type`.
    async fn type_text(&self, params: TypeParams) -> Result<Value> {
        let handle = self.element(&params.context, &params.element.object_id)?;
        self.engine
            .type_text(&params.context, handle, &params.text)
            .await?;
        Ok(json!({}))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Closes a page the registry never adopted.
    async fn discard_page(&self, context: &ContextId) {
        if let Err(e) = self.engine.close_page(context).await {
            debug!(%context, error = %e, "Failed to close orphaned page");
        }
    }

    fn node(&self, context: &ContextId, handle: EngineHandle) -> Result<Value> {
        let object_id = self.registry.expose(context, handle)?;
        Ok(SerializedValue::node(object_id).to_json())
    }

    fn element(&self, context: &ContextId, object_id: &ObjectId) -> Result<EngineHandle> {
        self.registry.resolve(context)?;
        self.registry.resolve_object(context, object_id)
    }
}

/// Rejects strings that are not absolute URLs.
fn validate_url(url: &str) -> Result<()> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|e| Error::invalid_argument(format!("Invalid URL '{url}': {e}")))
}

// ============================================================================
// Tests
// ============================================================================
