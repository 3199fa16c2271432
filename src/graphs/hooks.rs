//! Runtime side table of per-node change callbacks.
//!
//! The persisted node record carries only data (id, kind, position,
//! configuration). Anything callable lives here, keyed by node id, and is
//! rebuilt after a graph is loaded; callbacks are never serialized into
//! the workflow document.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::graphs::model::NodeConfig;
use crate::types::NodeId;

/// Callback invoked when a node's configuration changes.
pub type ConfigChanged = Arc<dyn Fn(&NodeId, &NodeConfig) + Send + Sync>;

/// Side table mapping node id to its configuration-change callback.
#[derive(Clone, Default)]
pub struct ChangeHooks {
    hooks: FxHashMap<NodeId, ConfigChanged>,
}

impl ChangeHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the callback for a node.
    pub fn register(&mut self, id: NodeId, hook: ConfigChanged) {
        self.hooks.insert(id, hook);
    }

    /// Drop the callback for a node. Call this when the node is deleted.
    pub fn unregister(&mut self, id: &NodeId) {
        self.hooks.remove(id);
    }

    /// Notify the node's callback, if one is registered.
    pub fn notify(&self, id: &NodeId, config: &NodeConfig) {
        if let Some(hook) = self.hooks.get(id) {
            hook(id, config);
        }
    }

    /// Drop every callback. Used before rebuilding the table on load.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for ChangeHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHooks")
            .field("registered", &self.hooks.len())
            .finish()
    }
}
