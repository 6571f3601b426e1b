//! Shared lifecycle bookkeeping used by every mode's `Dispatchable`
//! implementation: state, parent/children, forward list, custom
//! parameters, and the `tree`/`metrics` recursion (§4.1).

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{info, warn, Span};

// Layer 3: Internal module imports
use super::error::ActorError;
use super::forward::ForwardList;
use super::reference::{ActorRef, TreeNode};
use super::state::ActorState;
use crate::util::{ActorId, ActorMode};

pub struct ActorCore {
    id: ActorId,
    name: String,
    mode: ActorMode,
    state: RwLock<ActorState>,
    parent: Option<ActorRef>,
    children: RwLock<Vec<ActorRef>>,
    forward_list: RwLock<ForwardList>,
    custom_parameters: RwLock<HashMap<String, Value>>,
    span: Span,
}

impl ActorCore {
    pub fn new(
        id: ActorId,
        name: String,
        mode: ActorMode,
        parent: Option<ActorRef>,
        custom_parameters: HashMap<String, Value>,
    ) -> Self {
        let span = tracing::info_span!("actor", actor.id = %id, actor.name = %name, actor.mode = %mode);
        Self {
            id,
            name,
            mode,
            state: RwLock::new(ActorState::New),
            parent,
            children: RwLock::new(Vec::new()),
            forward_list: RwLock::new(ForwardList::new()),
            custom_parameters: RwLock::new(custom_parameters),
            span,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ActorMode {
        self.mode
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn parent(&self) -> Option<&ActorRef> {
        self.parent.as_ref()
    }

    pub fn state(&self) -> ActorState {
        *self.state.read()
    }

    pub fn custom_parameter(&self, key: &str) -> Option<Value> {
        self.custom_parameters.read().get(key).cloned()
    }

    pub fn custom_parameters(&self) -> HashMap<String, Value> {
        self.custom_parameters.read().clone()
    }

    /// `new → ready`, logged at `info` per §0.1.
    pub fn mark_ready(&self) {
        *self.state.write() = ActorState::Ready;
        info!(parent: &self.span, "actor ready");
    }

    /// `ready → crashed`, the sideband transition of §4.1.
    pub fn mark_crashed(&self) {
        *self.state.write() = ActorState::Crashed;
        tracing::error!(parent: &self.span, "actor crashed");
    }

    /// `ready → destroying`, only fires the transition once.
    pub fn begin_destroy(&self) -> bool {
        let mut state = self.state.write();
        if *state == ActorState::Destroying || *state == ActorState::Destroyed {
            return false;
        }
        *state = ActorState::Destroying;
        true
    }

    /// `destroying → destroyed`, the last action per §4.1.
    pub fn mark_destroyed(&self) {
        *self.state.write() = ActorState::Destroyed;
        info!(parent: &self.span, "actor destroyed");
    }

    pub fn require_ready(&self) -> Result<(), ActorError> {
        self.state().require_ready()
    }

    pub fn add_child(&self, child: ActorRef) {
        self.children.write().push(child);
    }

    pub fn children(&self) -> Vec<ActorRef> {
        self.children.read().clone()
    }

    pub fn has_child(&self, id: ActorId) -> bool {
        self.children.read().iter().any(|c| c.id() == id)
    }

    pub fn forward_list(&self) -> &RwLock<ForwardList> {
        &self.forward_list
    }

    /// Destroy every child depth-first, in reverse insertion order, before
    /// the caller runs the behaviour's own `destroy` hook (§4.1
    /// "Children are destroyed depth-first *before* the parent's own
    /// `destroy` hook runs"). A child that fails to destroy is logged and
    /// skipped, per §7's propagation policy.
    pub async fn destroy_children(&self) {
        let children: Vec<ActorRef> = {
            let mut guard = self.children.write();
            let drained: Vec<ActorRef> = guard.drain(..).collect();
            drained
        };
        for child in children.into_iter().rev() {
            if let Err(err) = child.destroy().await {
                warn!(parent: &self.span, child = %child.id(), error = %err, "child failed to destroy");
            }
        }
    }

    /// `{id, name, location, children?}` via depth-first recursion
    /// (§4.1 "Tree and metrics"). `extra_children` lets proxies splice in
    /// subtree fragments fetched from a remote/forked peer. A child is
    /// only live in `self.children` once its own `destroy()` has run
    /// top-down (`destroy_children`); a child destroyed directly by the
    /// caller, bypassing its parent, lingers in the Vec in `Destroyed`
    /// state and is filtered out here so the tree stays exactly the
    /// transitive set of non-destroyed descendants (§8 tree round-trip).
    pub async fn tree_node(&self, extra_children: Vec<TreeNode>) -> TreeNode {
        let mut children = Vec::new();
        for child in self.children() {
            if child.state().is_terminal() {
                continue;
            }
            if let Ok(node) = child.tree().await {
                children.push(node);
            }
        }
        children.extend(extra_children);
        TreeNode {
            id: self.id,
            name: self.name.clone(),
            location: self.mode,
            children,
        }
    }

    /// Merges the current actor's metric map with a mapping from child
    /// `name` to child metrics. A child destroyed through its parent's
    /// `destroy_children` is already gone from `self.children`; a child
    /// destroyed directly is filtered out by state here so its key drops
    /// out of the merged map either way (§8 seed scenario 5).
    pub async fn metrics_value(&self, own: Value, extra: Vec<(String, Value)>) -> Value {
        let mut map = match own {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        for child in self.children() {
            if child.state().is_terminal() {
                continue;
            }
            if let Ok(metrics) = child.metrics().await {
                map.insert(child.name().to_string(), metrics);
            }
        }
        for (name, metrics) in extra {
            map.insert(name, metrics);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_actor_starts_in_new_state() {
        let core = ActorCore::new(ActorId::new(), "root".to_string(), ActorMode::InMemory, None, HashMap::new());
        assert_eq!(core.state(), ActorState::New);
    }

    #[test]
    fn mark_ready_transitions_state() {
        let core = ActorCore::new(ActorId::new(), "root".to_string(), ActorMode::InMemory, None, HashMap::new());
        core.mark_ready();
        assert_eq!(core.state(), ActorState::Ready);
        assert!(core.require_ready().is_ok());
    }

    #[test]
    fn begin_destroy_only_fires_once() {
        let core = ActorCore::new(ActorId::new(), "root".to_string(), ActorMode::InMemory, None, HashMap::new());
        core.mark_ready();
        assert!(core.begin_destroy());
        assert!(!core.begin_destroy());
    }

    #[test]
    fn custom_parameters_are_stored() {
        let mut params = HashMap::new();
        params.insert("key".to_string(), Value::from("value"));
        let core = ActorCore::new(ActorId::new(), "root".to_string(), ActorMode::InMemory, None, params);
        assert_eq!(core.custom_parameter("key"), Some(Value::from("value")));
    }
}
