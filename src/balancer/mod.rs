//! Round-robin balancer: fans a clustered parent's requests out across N
//! same-behaviour children.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

// Layer 3: Internal module imports
use crate::actor::{ActorError, ActorRef, ActorState, ChildSpec, Dispatchable, TreeNode};
use crate::message::Args;
use crate::util::{ActorId, ActorMode};

/// Wraps `children` behind a single `ActorRef` that round-robins
/// `send`/`sendAndReceive` across them and can also `broadcast` to all
/// of them at once (§4.7). `mode` is the cluster's nominal execution
/// mode (`Forked`/`Remote`), preserved for introspection only — per §9's
/// open-question resolution, consumers should not read authoritative
/// semantics into it (see DESIGN.md).
pub struct RoundRobinBalancer {
    id: ActorId,
    name: String,
    mode: ActorMode,
    children: Vec<ActorRef>,
    counter: AtomicUsize,
}

impl RoundRobinBalancer {
    pub fn new(children: Vec<ActorRef>, mode: ActorMode) -> Self {
        Self {
            id: ActorId::new(),
            name: children
                .first()
                .map(|c| format!("{}-cluster", c.name()))
                .unwrap_or_else(|| "cluster".to_string()),
            mode,
            children,
            counter: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Result<&ActorRef, ActorError> {
        if self.children.is_empty() {
            return Err(ActorError::Config("balancer has no children".to_string()));
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.children.len();
        Ok(&self.children[index])
    }

    pub fn children(&self) -> &[ActorRef] {
        &self.children
    }

    /// `broadcast(topic, …)` — fans `send` out to every child (§4.7).
    pub async fn broadcast(&self, topic: &str, args_per_child: Vec<Args>) -> Result<(), ActorError> {
        let mut futures = Vec::with_capacity(self.children.len());
        for (child, args) in self.children.iter().zip(args_per_child) {
            futures.push(child.send(topic, args));
        }
        for result in join_all(futures).await {
            result?;
        }
        Ok(())
    }

    /// `broadcastAndReceive` — an ordered list of per-child responses (§4.7).
    pub async fn broadcast_and_receive(
        &self,
        topic: &str,
        args_per_child: Vec<Args>,
    ) -> Vec<Result<Value, ActorError>> {
        let mut futures = Vec::with_capacity(self.children.len());
        for (child, args) in self.children.iter().zip(args_per_child) {
            futures.push(child.send_and_receive(topic, args));
        }
        join_all(futures).await
    }
}

#[async_trait]
impl Dispatchable for RoundRobinBalancer {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ActorMode {
        self.mode
    }

    fn state(&self) -> ActorState {
        if self.children.iter().all(|c| c.state() == ActorState::Ready) {
            ActorState::Ready
        } else {
            ActorState::Crashed
        }
    }

    async fn send(&self, topic: &str, args: Args) -> Result<(), ActorError> {
        self.next()?.send(topic, args).await
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        args: Args,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        match timeout {
            Some(duration) => self.next()?.send_and_receive_timeout(topic, args, duration).await,
            None => self.next()?.send_and_receive(topic, args).await,
        }
    }

    async fn create_child(&self, _spec: ChildSpec) -> Result<ActorRef, ActorError> {
        Err(ActorError::Config(
            "a balancer cannot create children directly; create a new cluster instead".to_string(),
        ))
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        for child in &self.children {
            child.destroy().await?;
        }
        Ok(())
    }

    async fn tree(&self) -> Result<TreeNode, ActorError> {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            children.push(child.tree().await?);
        }
        Ok(TreeNode {
            id: self.id,
            name: self.name.clone(),
            location: self.mode,
            children,
        })
    }

    async fn metrics(&self) -> Result<Value, ActorError> {
        let mut map = serde_json::Map::new();
        for child in &self.children {
            map.insert(child.name().to_string(), child.metrics().await?);
        }
        Ok(Value::Object(map))
    }

    fn forward_to_parent(&self, _topics: Vec<String>) -> Result<(), ActorError> {
        Err(ActorError::Config("forwarding is configured on cluster members, not the balancer".to_string()))
    }

    fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError> {
        Err(ActorError::Config("forwarding is configured on cluster members, not the balancer".to_string()))
    }

    fn forward_to_child(&self, _child: &ActorRef, _topics: Vec<String>) -> Result<(), ActorError> {
        Err(ActorError::Config("forwarding is configured on cluster members, not the balancer".to_string()))
    }
}
