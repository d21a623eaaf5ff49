//! In-process browser engine with simulated pages.
//!
//! Pages are flat element lists scanned from HTML: either the body of a
//! `data:text/html,` URL or a fixture registered for a URL. Selectors support
//! the simple forms `tag`, `#id`, `.class` and their compounds
//! (`button#go.primary`).
//!
//! Scripts are registered closures keyed by their exact source text. A
//! source that is a JSON literal evaluates to itself without registration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bidi_server::engine::{EngineValue, SandboxEngine};
//!
//! let engine = SandboxEngine::new()
//!     .with_page("https://slow.test/", "<h1>Slow</h1>")
//!     .with_latency("https://slow.test/", Duration::from_secs(2))
//!     .with_script("(a,b) => a+b", |_scope, args| {
//!         // ...
//!         Ok(EngineValue::Json(3.into()))
//!     });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ContextId;
use crate::protocol::{LogLevel, RemoteKind};

use super::{
    BrowserEngine, EngineHandle, EngineSignal, EngineValue, EvalArg, RemoteObject,
    SelectorState, SignalHandler,
};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of inline HTML documents.
const DATA_HTML_PREFIX: &str = "data:text/html,";

/// Builtin element lookup.
pub const QUERY_SELECTOR_SCRIPT: &str = "(selector) => document.querySelector(selector)";

/// Builtin HTML insertion at the end of the body.
pub const INSERT_HTML_SCRIPT: &str =
    "(html) => document.body.insertAdjacentHTML('beforeend', html)";

/// Opening tags with optional attributes.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)(\s[^<>]*?)?/?>").expect("valid tag pattern")
});

/// Attributes inside an opening tag.
static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
    )
    .expect("valid attribute pattern")
});

/// Simple and compound selectors.
static SELECTOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9-]*)?((?:[#.][A-Za-z0-9_-]+)*)$")
        .expect("valid selector pattern")
});

// ============================================================================
// Types
// ============================================================================

/// Script implementation callback.
pub type ScriptFn =
    Arc<dyn Fn(&mut ScriptScope<'_>, &[EvalArg]) -> Result<EngineValue> + Send + Sync>;

/// Document served for a URL.
#[derive(Debug, Clone, Default)]
struct Fixture {
    /// HTML body, `None` to fall back to the URL itself.
    html: Option<String>,
    /// Delay before the load completes.
    latency: Duration,
}

/// A simulated DOM element.
#[derive(Debug, Clone)]
struct Element {
    handle: EngineHandle,
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    visible: bool,
    value: String,
    clicks: u32,
}

/// A simulated page.
#[derive(Debug, Default)]
struct Page {
    url: String,
    elements: Vec<Element>,
    objects: FxHashMap<EngineHandle, RemoteObject>,
    window: Option<EngineHandle>,
    /// Bumped per navigation so superseded loads are dropped.
    navigation: u64,
}

/// Internal shared state.
#[derive(Default)]
struct SandboxInner {
    pages: Mutex<FxHashMap<ContextId, Page>>,
    fixtures: RwLock<FxHashMap<String, Fixture>>,
    scripts: RwLock<FxHashMap<String, ScriptFn>>,
    handler: RwLock<Option<SignalHandler>>,
    next_handle: AtomicU64,
}

// ============================================================================
// SandboxEngine
// ============================================================================

/// In-process [`BrowserEngine`] backed by simulated pages.
///
/// Cloning shares the same pages, fixtures and scripts.
#[derive(Clone, Default)]
pub struct SandboxEngine {
    inner: Arc<SandboxInner>,
}

impl std::fmt::Debug for SandboxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxEngine")
            .field("pages", &self.page_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SandboxEngine - Configuration
// ============================================================================

impl SandboxEngine {
    /// Creates an engine with no fixtures or scripts.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` for `url`.
    #[must_use]
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.inner
            .fixtures
            .write()
            .entry(url.into())
            .or_default()
            .html = Some(html.into());
        self
    }

    /// Delays load completion of `url` by `latency`.
    #[must_use]
    pub fn with_latency(self, url: impl Into<String>, latency: Duration) -> Self {
        self.inner
            .fixtures
            .write()
            .entry(url.into())
            .or_default()
            .latency = latency;
        self
    }

    /// Registers a script implementation for the exact `source` text.
    #[must_use]
    pub fn with_script<F>(self, source: impl Into<String>, script: F) -> Self
    where
        F: Fn(&mut ScriptScope<'_>, &[EvalArg]) -> Result<EngineValue> + Send + Sync + 'static,
    {
        self.inner
            .scripts
            .write()
            .insert(source.into().trim().to_string(), Arc::new(script));
        self
    }

    /// Registers common snippets: addition of two arguments, the window
    /// object, the page URL, element lookup, an element's value and HTML
    /// insertion.
    #[must_use]
    pub fn with_builtin_scripts(self) -> Self {
        self.with_script("(a, b) => a + b", add_script)
            .with_script("(a,b) => a+b", add_script)
            .with_script("() => window", |scope, _| Ok(scope.window()))
            .with_script("() => location.href", |scope, _| {
                Ok(EngineValue::Json(scope.url().into()))
            })
            .with_script(QUERY_SELECTOR_SCRIPT, |scope, args| match args.first() {
                Some(EvalArg::Value(serde_json::Value::String(selector))) => {
                    match scope.query(selector).handle() {
                        Some(element) => scope.node(element),
                        None => Ok(EngineValue::Json(serde_json::Value::Null)),
                    }
                }
                _ => Err(Error::script_error("TypeError: selector must be a string")),
            })
            .with_script("(element) => element.value", |scope, args| match args.first() {
                Some(EvalArg::Handle(element)) => {
                    Ok(EngineValue::Json(scope.element_value(*element)?.into()))
                }
                _ => Err(Error::script_error("TypeError: element is not a node")),
            })
            .with_script(INSERT_HTML_SCRIPT, |scope, args| match args.first() {
                Some(EvalArg::Value(serde_json::Value::String(html))) => {
                    scope.insert_html(html);
                    Ok(EngineValue::Undefined)
                }
                _ => Err(Error::script_error("TypeError: html must be a string")),
            })
    }
}

// ============================================================================
// SandboxEngine - Inspection & Page Mutation
// ============================================================================

impl SandboxEngine {
    /// Returns the number of open pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.inner.pages.lock().len()
    }

    /// Returns the current URL of a page.
    #[must_use]
    pub fn page_url(&self, context: &ContextId) -> Option<String> {
        self.inner.pages.lock().get(context).map(|p| p.url.clone())
    }

    /// Returns the text typed into an element so far.
    #[must_use]
    pub fn element_value(&self, context: &ContextId, element: EngineHandle) -> Option<String> {
        let pages = self.inner.pages.lock();
        pages
            .get(context)?
            .element(element)
            .map(|e| e.value.clone())
    }

    /// Returns how many times an element was clicked.
    #[must_use]
    pub fn click_count(&self, context: &ContextId, element: EngineHandle) -> Option<u32> {
        let pages = self.inner.pages.lock();
        pages.get(context)?.element(element).map(|e| e.clicks)
    }

    /// Appends elements to a page, as a script mutating the DOM would.
    pub fn insert_html(&self, context: &ContextId, html: &str) -> Result<()> {
        let mut pages = self.inner.pages.lock();
        let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
        page.elements
            .extend(scan_elements(html, &self.inner.next_handle));
        Ok(())
    }

    /// Removes every element matching `selector`.
    pub fn remove_elements(&self, context: &ContextId, selector: &str) -> Result<usize> {
        let mut pages = self.inner.pages.lock();
        let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
        let before = page.elements.len();
        page.elements.retain(|e| !e.matches(selector));
        Ok(before - page.elements.len())
    }

    /// Shows or hides every element matching `selector`.
    pub fn set_visible(&self, context: &ContextId, selector: &str, visible: bool) -> Result<()> {
        let mut pages = self.inner.pages.lock();
        let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
        page.elements
            .iter_mut()
            .filter(|e| e.matches(selector))
            .for_each(|e| e.visible = visible);
        Ok(())
    }

    /// Opens a page on the engine's own initiative, like `window.open`.
    pub fn open_popup(&self, opener: &ContextId, url: &str) -> Result<ContextId> {
        let context = ContextId::generate();
        let page = self.inner.load_document(url)?;
        self.inner.pages.lock().insert(context.clone(), page);
        self.inner.emit(EngineSignal::ContextCreated {
            context: context.clone(),
            parent: Some(opener.clone()),
            url: url.to_string(),
        });
        Ok(context)
    }

    /// Closes a page from inside, like `window.close()`.
    pub fn close_from_page(&self, context: &ContextId) -> Result<()> {
        self.inner
            .pages
            .lock()
            .remove(context)
            .ok_or_else(|| no_page(context))?;
        self.inner.emit(EngineSignal::ContextDestroyed {
            context: context.clone(),
        });
        Ok(())
    }
}

// ============================================================================
// SandboxInner - Internal
// ============================================================================

impl SandboxInner {
    /// Calls the installed handler, if any.
    fn emit(&self, signal: EngineSignal) {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(signal),
            None => trace!(?signal, "Signal dropped, no handler installed"),
        }
    }

    /// Looks up the document and latency for `url`.
    fn resolve_document(&self, url: &str) -> (String, Duration) {
        let fixture = self.fixtures.read().get(url).cloned().unwrap_or_default();
        let html = fixture
            .html
            .unwrap_or_else(|| data_url_body(url).unwrap_or_default());
        (html, fixture.latency)
    }

    /// Builds a fresh page for `url` without waiting for latency.
    fn load_document(&self, url: &str) -> Result<Page> {
        let (html, _) = self.resolve_document(url);
        Ok(Page {
            url: url.to_string(),
            elements: scan_elements(&html, &self.next_handle),
            ..Page::default()
        })
    }

    fn allocate(&self) -> EngineHandle {
        allocate_handle(&self.next_handle)
    }
}

// ============================================================================
// BrowserEngine Implementation
// ============================================================================

#[async_trait]
impl BrowserEngine for SandboxEngine {
    async fn open_page(
        &self,
        context: &ContextId,
        parent: Option<&ContextId>,
        url: &str,
    ) -> Result<()> {
        let page = self.inner.load_document(url)?;
        let mut pages = self.inner.pages.lock();

        if pages.contains_key(context) {
            return Err(Error::engine(format!("Page for {context} already open")));
        }
        if let Some(parent) = parent
            && !pages.contains_key(parent)
        {
            return Err(no_page(parent));
        }

        pages.insert(context.clone(), page);
        debug!(%context, url, "Sandbox page opened");
        Ok(())
    }

    async fn close_page(&self, context: &ContextId) -> Result<()> {
        self.inner
            .pages
            .lock()
            .remove(context)
            .ok_or_else(|| no_page(context))?;
        debug!(%context, "Sandbox page closed");
        Ok(())
    }

    async fn navigate(&self, context: &ContextId, url: &str) -> Result<()> {
        let (html, latency) = self.inner.resolve_document(url);

        let generation = {
            let mut pages = self.inner.pages.lock();
            let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
            page.navigation += 1;
            page.navigation
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        {
            let mut pages = self.inner.pages.lock();
            let page = pages
                .get_mut(context)
                .ok_or_else(|| Error::engine("Page closed during navigation"))?;

            if page.navigation != generation {
                debug!(%context, url, "Navigation superseded");
                return Ok(());
            }

            page.url = url.to_string();
            page.elements = scan_elements(&html, &self.inner.next_handle);
            page.objects.clear();
            page.window = None;
        }

        self.inner.emit(EngineSignal::Load {
            context: context.clone(),
            url: url.to_string(),
        });
        Ok(())
    }

    async fn query(&self, context: &ContextId, selector: &str) -> Result<SelectorState> {
        let pages = self.inner.pages.lock();
        let page = pages.get(context).ok_or_else(|| no_page(context))?;

        let state = page
            .elements
            .iter()
            .find(|e| e.matches(selector))
            .map_or(SelectorState::Missing, |e| {
                if e.visible {
                    SelectorState::Visible(e.handle)
                } else {
                    SelectorState::Hidden(e.handle)
                }
            });
        Ok(state)
    }

    async fn evaluate(
        &self,
        context: &ContextId,
        source: &str,
        args: Vec<EvalArg>,
    ) -> Result<EngineValue> {
        let source = source.trim();
        let script = self.inner.scripts.read().get(source).cloned();

        let (value, signals) = {
            let mut pages = self.inner.pages.lock();
            let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
            let mut scope = ScriptScope {
                context,
                page,
                engine: &self.inner,
                signals: Vec::new(),
            };

            let value = match script {
                Some(script) => script(&mut scope, &args),
                None => scope.literal(source),
            };
            (value, scope.signals)
        };

        for signal in signals {
            self.inner.emit(signal);
        }
        value
    }

    async fn click(&self, context: &ContextId, element: EngineHandle) -> Result<()> {
        let mut pages = self.inner.pages.lock();
        let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
        let element = page.element_mut(element)?;
        element.clicks += 1;
        trace!(%context, tag = %element.tag, "Sandbox click");
        Ok(())
    }

    async fn type_text(
        &self,
        context: &ContextId,
        element: EngineHandle,
        text: &str,
    ) -> Result<()> {
        let mut pages = self.inner.pages.lock();
        let page = pages.get_mut(context).ok_or_else(|| no_page(context))?;
        page.element_mut(element)?.value.push_str(text);
        Ok(())
    }

    fn set_signal_handler(&self, handler: Option<SignalHandler>) {
        *self.inner.handler.write() = handler;
    }
}

// ============================================================================
// ScriptScope
// ============================================================================

/// Page access handed to a script implementation.
///
/// Console calls made through the scope are raised as signals once the
/// script returns, before `evaluate` resolves.
pub struct ScriptScope<'a> {
    context: &'a ContextId,
    page: &'a mut Page,
    engine: &'a SandboxInner,
    signals: Vec<EngineSignal>,
}

impl ScriptScope<'_> {
    /// Returns the page URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.page.url
    }

    /// Records a console call from top-level code.
    pub fn console(&mut self, level: LogLevel, method: &str, args: Vec<EngineValue>) {
        self.signals.push(EngineSignal::ConsoleCall {
            context: self.context.clone(),
            level,
            method: method.to_string(),
            args,
            call_site: None,
        });
    }

    /// Allocates a new engine object.
    ///
    /// # Arguments
    ///
    /// * `kind` - Wire kind of the object
    /// * `class_name` - Constructor name (e.g., "Object")
    /// * `description` - Console rendering of the object
    pub fn create_object(&mut self, kind: RemoteKind, class_name: &str, description: &str) -> EngineValue {
        let object = RemoteObject {
            kind,
            handle: self.engine.allocate(),
            class_name: class_name.to_string(),
            description: description.to_string(),
        };
        self.page.objects.insert(object.handle, object.clone());
        EngineValue::Remote(object)
    }

    /// Returns the page's window object. The handle is stable per document.
    pub fn window(&mut self) -> EngineValue {
        if let Some(object) = self.page.window.and_then(|h| self.page.objects.get(&h)) {
            return EngineValue::Remote(object.clone());
        }
        let value = self.create_object(RemoteKind::Window, "Window", "Window");
        if let EngineValue::Remote(object) = &value {
            self.page.window = Some(object.handle);
        }
        value
    }

    /// Probes a selector.
    #[must_use]
    pub fn query(&self, selector: &str) -> SelectorState {
        self.page
            .elements
            .iter()
            .find(|e| e.matches(selector))
            .map_or(SelectorState::Missing, |e| {
                if e.visible {
                    SelectorState::Visible(e.handle)
                } else {
                    SelectorState::Hidden(e.handle)
                }
            })
    }

    /// Returns an element as a node value.
    pub fn node(&self, element: EngineHandle) -> Result<EngineValue> {
        let element = self.page.element(element).ok_or_else(detached)?;
        Ok(EngineValue::Remote(RemoteObject {
            kind: RemoteKind::Node,
            handle: element.handle,
            class_name: element.class_name(),
            description: element.tag.clone(),
        }))
    }

    /// Returns the current value of an element.
    pub fn element_value(&self, element: EngineHandle) -> Result<String> {
        self.page
            .element(element)
            .map(|e| e.value.clone())
            .ok_or_else(detached)
    }

    /// Appends elements parsed from `html`.
    pub fn insert_html(&mut self, html: &str) {
        self.page
            .elements
            .extend(scan_elements(html, &self.engine.next_handle));
    }

    /// Evaluates a JSON literal source.
    fn literal(&mut self, source: &str) -> Result<EngineValue> {
        if source == "undefined" {
            return Ok(EngineValue::Undefined);
        }
        if source == "window" {
            return Ok(self.window());
        }
        match serde_json::from_str::<serde_json::Value>(source) {
            Ok(value @ serde_json::Value::Array(_)) => {
                let len = value.as_array().map_or(0, Vec::len);
                Ok(self.create_object(RemoteKind::Array, "Array", &format!("Array({len})")))
            }
            Ok(serde_json::Value::Object(_)) => {
                Ok(self.create_object(RemoteKind::Object, "Object", "Object"))
            }
            Ok(value) => Ok(EngineValue::Json(value)),
            Err(_) => Err(Error::script_error(format!(
                "ReferenceError: no sandbox script registered for `{source}`"
            ))),
        }
    }
}

// ============================================================================
// Page & Element Helpers
// ============================================================================

impl Page {
    fn element(&self, handle: EngineHandle) -> Option<&Element> {
        self.elements.iter().find(|e| e.handle == handle)
    }

    fn element_mut(&mut self, handle: EngineHandle) -> Result<&mut Element> {
        self.elements
            .iter_mut()
            .find(|e| e.handle == handle)
            .ok_or_else(detached)
    }
}

impl Element {
    /// Checks a simple or compound selector against this element.
    fn matches(&self, selector: &str) -> bool {
        let Some(captures) = SELECTOR_PATTERN.captures(selector.trim()) else {
            return false;
        };

        if let Some(tag) = captures.get(1)
            && !tag.as_str().eq_ignore_ascii_case(&self.tag)
        {
            return false;
        }

        let qualifiers = captures.get(2).map_or("", |m| m.as_str());
        if captures.get(1).is_none() && qualifiers.is_empty() {
            return false;
        }

        split_qualifiers(qualifiers).into_iter().all(|(prefix, name)| match prefix {
            '#' => self.id.as_deref() == Some(name),
            _ => self.classes.iter().any(|c| c == name),
        })
    }

    /// Approximates the DOM interface name.
    fn class_name(&self) -> String {
        match self.tag.as_str() {
            "div" => "HTMLDivElement".to_string(),
            "input" => "HTMLInputElement".to_string(),
            "button" => "HTMLButtonElement".to_string(),
            "a" => "HTMLAnchorElement".to_string(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "HTMLHeadingElement".to_string(),
            _ => "HTMLElement".to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn allocate_handle(counter: &AtomicU64) -> EngineHandle {
    EngineHandle::new(counter.fetch_add(1, Ordering::Relaxed) + 1)
}

fn no_page(context: &ContextId) -> Error {
    Error::engine(format!("No page for context {context}"))
}

fn detached() -> Error {
    Error::engine("Node is detached from document")
}

/// `(a, b) => a + b` with script semantics for numbers and strings.
fn add_script(_scope: &mut ScriptScope<'_>, args: &[EvalArg]) -> Result<EngineValue> {
    use serde_json::Value;

    let values = args
        .iter()
        .map(|arg| match arg {
            EvalArg::Value(value) => Ok(value),
            EvalArg::Handle(_) => Err(Error::script_error("TypeError: cannot add objects")),
        })
        .collect::<Result<Vec<_>>>()?;

    let sum = match values.as_slice() {
        [Value::Number(a), Value::Number(b)] => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) if a.checked_add(b).is_some() => Value::from(a + b),
            _ => Value::from(a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default()),
        },
        [a, b] if a.is_string() || b.is_string() => {
            Value::String(format!("{}{}", concat_text(a), concat_text(b)))
        }
        _ => return Err(Error::script_error("TypeError: expected two addable arguments")),
    };
    Ok(EngineValue::Json(sum))
}

fn concat_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decodes the body of a `data:text/html,` URL.
fn data_url_body(url: &str) -> Option<String> {
    let body = url.strip_prefix(DATA_HTML_PREFIX)?;
    Some(
        urlencoding::decode(body)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| body.to_string()),
    )
}

/// Splits `#id.cls` into `('#', "id"), ('.', "cls")`.
fn split_qualifiers(qualifiers: &str) -> Vec<(char, &str)> {
    let mut parts = Vec::new();
    let mut rest = qualifiers;
    while let Some(prefix) = rest.chars().next() {
        let body = &rest[prefix.len_utf8()..];
        let end = body.find(['#', '.']).unwrap_or(body.len());
        parts.push((prefix, &body[..end]));
        rest = &body[end..];
    }
    parts
}

/// Scans opening tags into elements.
fn scan_elements(html: &str, counter: &AtomicU64) -> Vec<Element> {
    TAG_PATTERN
        .captures_iter(html)
        .map(|tag| {
            let name = tag[1].to_ascii_lowercase();
            let attrs = tag.get(2).map_or("", |m| m.as_str());

            let mut element = Element {
                handle: allocate_handle(counter),
                tag: name,
                id: None,
                classes: Vec::new(),
                visible: true,
                value: String::new(),
                clicks: 0,
            };

            for attr in ATTR_PATTERN.captures_iter(attrs) {
                let key = attr[1].to_ascii_lowercase();
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map_or("", |m| m.as_str());

                match key.as_str() {
                    "id" => element.id = Some(value.to_string()),
                    "class" => {
                        element.classes = value.split_whitespace().map(str::to_string).collect();
                    }
                    "hidden" => element.visible = false,
                    "style" => {
                        let style: String = value.split_whitespace().collect();
                        if style.contains("display:none") || style.contains("visibility:hidden") {
                            element.visible = false;
                        }
                    }
                    "value" => element.value = value.to_string(),
                    _ => {}
                }
            }

            element
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
