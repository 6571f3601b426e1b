//! Minimal `ActorRef` fixtures for unit tests elsewhere in `actor::*`
//! that need a target reference but not a real actor behind it.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::ActorError;
use super::reference::{ActorRef, ChildSpec, Dispatchable, TreeNode};
use super::state::ActorState;
use crate::message::Args;
use crate::util::{ActorId, ActorMode};

struct NoopDispatchable {
    id: ActorId,
    name: String,
}

#[async_trait]
impl Dispatchable for NoopDispatchable {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ActorMode {
        ActorMode::InMemory
    }

    fn state(&self) -> ActorState {
        ActorState::Ready
    }

    async fn send(&self, _topic: &str, _args: Args) -> Result<(), ActorError> {
        Ok(())
    }

    async fn send_and_receive(
        &self,
        _topic: &str,
        _args: Args,
        _timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        Ok(Value::Null)
    }

    async fn create_child(&self, _spec: ChildSpec) -> Result<ActorRef, ActorError> {
        Err(ActorError::Config("noop ref cannot create children".to_string()))
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        Ok(())
    }

    async fn tree(&self) -> Result<TreeNode, ActorError> {
        Ok(TreeNode {
            id: self.id,
            name: self.name.clone(),
            location: ActorMode::InMemory,
            children: Vec::new(),
        })
    }

    async fn metrics(&self) -> Result<Value, ActorError> {
        Ok(Value::Null)
    }

    fn forward_to_parent(&self, _topics: Vec<String>) -> Result<(), ActorError> {
        Ok(())
    }

    fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError> {
        Ok(())
    }

    fn forward_to_child(&self, _child: &ActorRef, _topics: Vec<String>) -> Result<(), ActorError> {
        Ok(())
    }
}

/// A ready, named `ActorRef` that accepts any message and does nothing.
pub fn noop_ref(name: &str) -> ActorRef {
    ActorRef::new(Arc::new(NoopDispatchable {
        id: ActorId::new(),
        name: name.to_string(),
    }))
}
