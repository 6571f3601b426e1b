// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::ActorError;
use super::state::ActorState;
use crate::message::Args;
use crate::util::{ActorId, ActorMode};

/// `{id, name, location, children?}`, the shape `tree()` recurses into
/// (§4.1 "Tree and metrics").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: ActorId,
    pub name: String,
    pub location: ActorMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Specification for a new child, passed to `ActorRef::create_child`
/// (§4.10 `createActor(def, parent, opts)`).
pub struct ChildSpec {
    pub name: String,
    pub mode: ActorMode,
    pub behaviour: Option<Box<dyn super::behaviour::Behaviour>>,
    pub module_path: Option<String>,
    pub custom_parameters: std::collections::HashMap<String, Value>,
    pub ping_timeout: Option<Duration>,
    pub cluster_size: usize,
    pub cluster: Option<String>,
    pub hosts: Vec<String>,
}

impl ChildSpec {
    pub fn in_memory(name: impl Into<String>, behaviour: impl super::behaviour::Behaviour + 'static) -> Self {
        Self {
            name: name.into(),
            mode: ActorMode::InMemory,
            behaviour: Some(Box::new(behaviour)),
            module_path: None,
            custom_parameters: std::collections::HashMap::new(),
            ping_timeout: None,
            cluster_size: 1,
            cluster: None,
            hosts: Vec::new(),
        }
    }
}

/// The operations every execution mode must provide underneath an
/// `ActorRef` (§4.1 dispatch step 3's mode-specific `send0`/
/// `sendAndReceive0`, plus the lifecycle/introspection surface §4.10
/// exposes through `ActorSystem`). Kept as a trait object at the seam
/// between modes — in-memory, forked, remote, and balancer references
/// are otherwise indistinguishable to callers (location transparency is
/// the entire point of §1).
#[async_trait]
pub trait Dispatchable: Send + Sync {
    fn id(&self) -> ActorId;
    fn name(&self) -> &str;
    fn mode(&self) -> ActorMode;
    fn state(&self) -> ActorState;

    async fn send(&self, topic: &str, args: Args) -> Result<(), ActorError>;
    async fn send_and_receive(
        &self,
        topic: &str,
        args: Args,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError>;

    async fn create_child(&self, spec: ChildSpec) -> Result<ActorRef, ActorError>;
    async fn destroy(&self) -> Result<(), ActorError>;
    async fn tree(&self) -> Result<TreeNode, ActorError>;
    async fn metrics(&self) -> Result<Value, ActorError>;

    fn forward_to_parent(&self, topics: Vec<String>) -> Result<(), ActorError>;
    fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError>;
    fn forward_to_child(&self, child: &ActorRef, topics: Vec<String>) -> Result<(), ActorError>;

    /// Live references to this actor's local children, used to resolve a
    /// wire-level child id back into a usable `ActorRef` (§4.8's
    /// `forwardToChild` control topic, applied on the process that hosts
    /// the actor). Actors with no local child registry — a proxy, a
    /// balancer — return an empty list.
    fn child_refs(&self) -> Vec<ActorRef> {
        Vec::new()
    }
}

/// A serializable pointer to an actor, valid from any mode after
/// marshalling (§3 Actor reference). Cloning an `ActorRef` is cheap — it
/// shares the underlying `Arc<dyn Dispatchable>` with the original.
#[derive(Clone)]
pub struct ActorRef {
    id: ActorId,
    name: String,
    mode: ActorMode,
    inner: Arc<dyn Dispatchable>,
}

impl ActorRef {
    pub fn new(inner: Arc<dyn Dispatchable>) -> Self {
        Self {
            id: inner.id(),
            name: inner.name().to_string(),
            mode: inner.mode(),
            inner,
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

    pub fn state(&self) -> ActorState {
        self.inner.state()
    }

    pub async fn send(&self, topic: &str, args: Args) -> Result<(), ActorError> {
        self.inner.send(topic, args).await
    }

    pub async fn send_and_receive(&self, topic: &str, args: Args) -> Result<Value, ActorError> {
        self.inner.send_and_receive(topic, args, None).await
    }

    pub async fn send_and_receive_timeout(
        &self,
        topic: &str,
        args: Args,
        timeout: Duration,
    ) -> Result<Value, ActorError> {
        self.inner.send_and_receive(topic, args, Some(timeout)).await
    }

    pub async fn create_child(&self, spec: ChildSpec) -> Result<ActorRef, ActorError> {
        self.inner.create_child(spec).await
    }

    pub async fn destroy(&self) -> Result<(), ActorError> {
        self.inner.destroy().await
    }

    pub async fn tree(&self) -> Result<TreeNode, ActorError> {
        self.inner.tree().await
    }

    pub async fn metrics(&self) -> Result<Value, ActorError> {
        self.inner.metrics().await
    }

    /// `forwardToParent(topics…)` (§4.8).
    pub fn forward_to_parent(&self, topics: Vec<String>) -> Result<(), ActorError> {
        self.inner.forward_to_parent(topics)
    }

    /// `forwardToParent(true)` sentinel (§4.8).
    pub fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError> {
        self.inner.forward_all_unknown_to_parent()
    }

    /// `forwardToChild(child, topics…)` (§4.8) — verifies `child` is a
    /// registered child before adding the forward entries.
    pub fn forward_to_child(&self, child: &ActorRef, topics: Vec<String>) -> Result<(), ActorError> {
        self.inner.forward_to_child(child, topics)
    }

    pub fn child_refs(&self) -> Vec<ActorRef> {
        self.inner.child_refs()
    }
}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

/// The wire-level token an `ActorRef` marshals to, per §3's "locator is
/// enough for the current process to reach the actor". `marshal::InterProcessRef`
/// and `marshal::InterHostRef` both produce/consume this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRefToken {
    pub id: ActorId,
    pub name: String,
    pub mode: ActorMode,
    pub locator: RefLocator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RefLocator {
    /// Routes back through the shared pipe bus by actor id (§4.6
    /// `InterProcessReference`).
    Pipe,
    /// Routes through a fresh socket bus to `host:port` (§4.6
    /// `InterHostReference`).
    Socket { host: String, port: u16 },
}
