//! Browsing context registry.
//!
//! Tracks every live context of a session with its parent, URL and
//! remote-object handle table, and emits lifecycle events. The registry is
//! the single source of truth for context existence: a context is
//! resolvable from the moment `contextCreated` is queued until its
//! `contextDestroyed` is queued.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::engine::{EngineHandle, EngineValue};
use crate::error::{Error, Result};
use crate::identifiers::{ContextId, ObjectId};
use crate::protocol::{ContextInfo, Event, SerializedValue};
use crate::transport::Outbound;

// ============================================================================
// Constants
// ============================================================================

/// URL reported for destroyed contexts.
const DESTROYED_URL: &str = "about:blank";

// ============================================================================
// Types
// ============================================================================

/// Bidirectional map between client object ids and engine handles.
#[derive(Debug, Default)]
struct HandleTable {
    by_object: FxHashMap<ObjectId, EngineHandle>,
    by_handle: FxHashMap<EngineHandle, ObjectId>,
}

impl HandleTable {
    /// Returns the object id for `handle`, minting one on first exposure.
    fn expose(&mut self, handle: EngineHandle) -> ObjectId {
        if let Some(object_id) = self.by_handle.get(&handle) {
            return object_id.clone();
        }
        let object_id = ObjectId::generate();
        self.by_handle.insert(handle, object_id.clone());
        self.by_object.insert(object_id.clone(), handle);
        object_id
    }

    fn resolve(&self, object_id: &ObjectId) -> Option<EngineHandle> {
        self.by_object.get(object_id).copied()
    }
}

#[derive(Debug)]
struct ContextEntry {
    parent: Option<ContextId>,
    url: String,
    handles: HandleTable,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Creation order.
    order: Vec<ContextId>,
    entries: FxHashMap<ContextId, ContextEntry>,
}

impl RegistryState {
    fn children_of<'a>(&'a self, parent: &'a ContextId) -> impl Iterator<Item = &'a ContextId> {
        self.order.iter().filter(move |id| {
            self.entries
                .get(*id)
                .is_some_and(|entry| entry.parent.as_ref() == Some(parent))
        })
    }

    fn info(&self, id: &ContextId, with_children: bool) -> Option<ContextInfo> {
        let entry = self.entries.get(id)?;
        let children = with_children.then(|| {
            self.children_of(id)
                .filter_map(|child| self.info(child, true))
                .collect()
        });
        Some(ContextInfo {
            context: id.clone(),
            parent: entry.parent.clone(),
            url: entry.url.clone(),
            children,
        })
    }

    fn collect_post_order(&self, id: &ContextId, out: &mut Vec<ContextId>) {
        for child in self.children_of(id) {
            self.collect_post_order(child, out);
        }
        out.push(id.clone());
    }
}

// ============================================================================
// ContextRegistry
// ============================================================================

/// Live browsing contexts of one session.
#[derive(Debug)]
pub struct ContextRegistry {
    state: Mutex<RegistryState>,
    outbound: Outbound,
}

impl ContextRegistry {
    /// Creates an empty registry emitting events to `outbound`.
    #[must_use]
    pub fn new(outbound: Outbound) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            outbound,
        }
    }

    /// Registers the session's initial context without emitting an event.
    pub fn register_root(&self, id: ContextId, url: impl Into<String>) {
        let mut state = self.state.lock();
        Self::insert(&mut state, id, None, url.into());
    }

    /// Registers a new context and queues `contextCreated`.
    ///
    /// # Arguments
    ///
    /// * `id` - Id of the page the engine already opened
    /// * `parent` - Parent context, `None` for a top-level context
    /// * `url` - Initial URL reported in the event
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`] if `parent` is not live.
    pub fn create(
        &self,
        id: ContextId,
        parent: Option<ContextId>,
        url: impl Into<String>,
    ) -> Result<ContextInfo> {
        let info = {
            let mut state = self.state.lock();
            if let Some(parent) = &parent
                && !state.entries.contains_key(parent)
            {
                return Err(Error::context_not_found(parent.clone()));
            }
            Self::insert(&mut state, id.clone(), parent, url.into());
            state
                .info(&id, false)
                .ok_or_else(|| Error::context_not_found(id.clone()))?
        };

        debug!(context = %info.context, "Context created");
        self.outbound.send_event(Event::ContextCreated(info.clone()));
        Ok(info)
    }

    /// Removes a context and queues `contextDestroyed`.
    ///
    /// Descendants are not touched; close them first with
    /// [`subtree_post_order`](Self::subtree_post_order).
    pub fn destroy(&self, id: &ContextId) -> Option<ContextInfo> {
        let entry = self.remove(id)?;
        let info = ContextInfo {
            context: id.clone(),
            parent: entry.parent,
            url: DESTROYED_URL.to_string(),
            children: None,
        };

        debug!(context = %id, "Context destroyed");
        self.outbound.send_event(Event::ContextDestroyed(info.clone()));
        Some(info)
    }

    /// Removes every context without emitting events. Returns the ids,
    /// most recently created first.
    pub fn drain(&self) -> Vec<ContextId> {
        let mut state = self.state.lock();
        state.entries.clear();
        let mut ids = std::mem::take(&mut state.order);
        ids.reverse();
        ids
    }

    /// Returns `id` and all its descendants, deepest first, `id` last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`] if `id` is not live.
    pub fn subtree_post_order(&self, id: &ContextId) -> Result<Vec<ContextId>> {
        let state = self.state.lock();
        if !state.entries.contains_key(id) {
            return Err(Error::context_not_found(id.clone()));
        }
        let mut out = Vec::new();
        state.collect_post_order(id, &mut out);
        Ok(out)
    }

    /// Fails unless `id` is live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`].
    pub fn resolve(&self, id: &ContextId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::context_not_found(id.clone()))
        }
    }

    /// Returns `true` if `id` is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ContextId) -> bool {
        self.state.lock().entries.contains_key(id)
    }

    /// Returns the number of live contexts.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if no context is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current URL of `id`.
    #[must_use]
    pub fn url(&self, id: &ContextId) -> Option<String> {
        self.state.lock().entries.get(id).map(|e| e.url.clone())
    }

    /// Records a committed navigation.
    pub fn set_url(&self, id: &ContextId, url: impl Into<String>) {
        if let Some(entry) = self.state.lock().entries.get_mut(id) {
            entry.url = url.into();
        }
    }

    /// Lists contexts as a tree, top-level contexts in creation order.
    ///
    /// With `root`, lists only that context's subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`] if `root` is not live.
    pub fn tree(&self, root: Option<&ContextId>) -> Result<Vec<ContextInfo>> {
        let state = self.state.lock();
        match root {
            Some(root) => state
                .info(root, true)
                .map(|info| vec![info])
                .ok_or_else(|| Error::context_not_found(root.clone())),
            None => Ok(state
                .order
                .iter()
                .filter(|id| state.entries.get(*id).is_some_and(|e| e.parent.is_none()))
                .filter_map(|id| state.info(id, true))
                .collect()),
        }
    }

    // ========================================================================
    // Remote Objects
    // ========================================================================

    /// Returns the object id for an engine handle in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`] if `context` is not live.
    pub fn expose(&self, context: &ContextId, handle: EngineHandle) -> Result<ObjectId> {
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(context)
            .ok_or_else(|| Error::context_not_found(context.clone()))?;
        Ok(entry.handles.expose(handle))
    }

    /// Resolves an object id handed out in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] for ids unknown to `context`, and
    /// [`Error::ContextNotFound`] if `context` is not live.
    pub fn resolve_object(&self, context: &ContextId, object_id: &ObjectId) -> Result<EngineHandle> {
        let state = self.state.lock();
        let entry = state
            .entries
            .get(context)
            .ok_or_else(|| Error::context_not_found(context.clone()))?;
        entry
            .handles
            .resolve(object_id)
            .ok_or_else(|| Error::object_not_found(object_id.clone()))
    }

    /// Converts an engine value into its client form, exposing remote
    /// objects through `context`'s handle table.
    ///
    /// JSON arrays and objects are not primitives; an engine handing one
    /// over by value is rendered as its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`] if `context` is not live.
    pub fn serialize(&self, context: &ContextId, value: EngineValue) -> Result<SerializedValue> {
        match value {
            EngineValue::Undefined => Ok(SerializedValue::Undefined),
            EngineValue::Json(json) => Ok(SerializedValue::from_primitive(&json)
                .unwrap_or_else(|| SerializedValue::String(json.to_string()))),
            EngineValue::Remote(object) => {
                let object_id = self.expose(context, object.handle)?;
                Ok(SerializedValue::Remote {
                    kind: object.kind,
                    object_id,
                    class_name: Some(object.class_name),
                    description: Some(object.description),
                })
            }
        }
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn insert(state: &mut RegistryState, id: ContextId, parent: Option<ContextId>, url: String) {
        state.order.push(id.clone());
        state.entries.insert(
            id,
            ContextEntry {
                parent,
                url,
                handles: HandleTable::default(),
            },
        );
    }

    fn remove(&self, id: &ContextId) -> Option<ContextEntry> {
        let mut state = self.state.lock();
        let entry = state.entries.remove(id)?;
        state.order.retain(|other| other != id);
        Some(entry)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::engine::RemoteObject;
    use crate::protocol::{Outgoing, RemoteKind};

    fn registry() -> (ContextRegistry, UnboundedReceiver<Outgoing>) {
        let (outbound, rx) = Outbound::channel();
        (ContextRegistry::new(outbound), rx)
    }

    fn id(raw: &str) -> ContextId {
        ContextId::new(raw)
    }

    #[test]
    fn test_root_is_silent() {
        let (registry, mut rx) = registry();
        registry.register_root(id("ROOT"), "about:blank");
        assert!(registry.contains(&id("ROOT")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_create_emits_event() {
        let (registry, mut rx) = registry();
        let info = registry
            .create(id("A"), None, "about:blank")
            .expect("create");
        assert_eq!(info.children, None);

        match rx.try_recv() {
            Ok(Outgoing::Event(Event::ContextCreated(event))) => assert_eq!(event, info),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_create_with_unknown_parent_fails() {
        let (registry, _rx) = registry();
        let err = registry
            .create(id("A"), Some(id("MISSING")), "about:blank")
            .expect_err("parent must exist");
        assert!(err.is_not_found());
        assert!(!registry.contains(&id("A")));
    }

    #[test]
    fn test_tree_nests_children_in_creation_order() {
        let (registry, _rx) = registry();
        registry.register_root(id("ROOT"), "about:blank");
        registry.create(id("A"), None, "about:blank").expect("A");
        registry.create(id("A1"), Some(id("A")), "about:blank").expect("A1");
        registry.create(id("A2"), Some(id("A")), "about:blank").expect("A2");

        let tree = registry.tree(None).expect("tree");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].context, id("ROOT"));
        let children = tree[1].children.as_ref().expect("children listed");
        assert_eq!(children[0].context, id("A1"));
        assert_eq!(children[1].context, id("A2"));

        let subtree = registry.tree(Some(&id("A1"))).expect("subtree");
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].children, Some(vec![]));

        assert!(registry.tree(Some(&id("NOPE"))).is_err());
    }

    #[test]
    fn test_subtree_post_order() {
        let (registry, _rx) = registry();
        registry.create(id("A"), None, "about:blank").expect("A");
        registry.create(id("B"), Some(id("A")), "about:blank").expect("B");
        registry.create(id("C"), Some(id("B")), "about:blank").expect("C");
        registry.create(id("D"), Some(id("A")), "about:blank").expect("D");

        let order = registry.subtree_post_order(&id("A")).expect("subtree");
        assert_eq!(order, vec![id("C"), id("B"), id("D"), id("A")]);
    }

    #[test]
    fn test_destroy_reports_blank_url() {
        let (registry, mut rx) = registry();
        registry
            .create(id("A"), None, "https://example.com/")
            .expect("create");
        let _ = rx.try_recv();

        let info = registry.destroy(&id("A")).expect("destroyed");
        assert_eq!(info.url, "about:blank");
        assert!(matches!(
            rx.try_recv(),
            Ok(Outgoing::Event(Event::ContextDestroyed(_)))
        ));
        assert!(registry.destroy(&id("A")).is_none());
        assert!(registry.resolve(&id("A")).is_err());
    }

    #[test]
    fn test_handles_are_stable_per_context() {
        let (registry, _rx) = registry();
        registry.register_root(id("A"), "about:blank");
        registry.create(id("B"), None, "about:blank").expect("B");

        let handle = EngineHandle::new(9);
        let first = registry.expose(&id("A"), handle).expect("expose");
        let second = registry.expose(&id("A"), handle).expect("expose");
        assert_eq!(first, second);
        assert_eq!(registry.resolve_object(&id("A"), &first).expect("resolve"), handle);

        let err = registry
            .resolve_object(&id("B"), &first)
            .expect_err("other context");
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[test]
    fn test_serialize_values() {
        let (registry, _rx) = registry();
        registry.register_root(id("A"), "about:blank");

        let value = registry
            .serialize(&id("A"), EngineValue::Json(json!("hi")))
            .expect("serialize");
        assert_eq!(value, SerializedValue::String("hi".into()));

        let remote = registry
            .serialize(
                &id("A"),
                EngineValue::Remote(RemoteObject {
                    kind: RemoteKind::Window,
                    handle: EngineHandle::new(1),
                    class_name: "Window".into(),
                    description: "Window".into(),
                }),
            )
            .expect("serialize");
        assert_eq!(remote.to_json()["type"], "Window");
    }

    #[test]
    fn test_drain_is_silent() {
        let (registry, mut rx) = registry();
        registry.register_root(id("A"), "about:blank");
        registry.register_root(id("B"), "about:blank");

        assert_eq!(registry.drain(), vec![id("B"), id("A")]);
        assert!(registry.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
