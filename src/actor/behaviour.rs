// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde_json::Value;

// Layer 3: Internal module imports
use super::context::ActorContext;
use super::error::ActorError;
use crate::message::Args;

/// The user-supplied record of handlers and lifecycle hooks an actor is
/// constructed from (§3 `definition`, §9 "dynamic dispatch on behaviour
/// objects"). Represented as a capability record rather than an
/// inheritance hierarchy, per §9.
#[async_trait]
pub trait Behaviour: Send + Sync {
    /// Runs once, before the actor transitions `New → Ready` (§4.1).
    async fn initialize(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// Runs once, as the last step of `Destroying → Destroyed`, after all
    /// children have already been destroyed (§4.1).
    async fn destroy(&mut self, _ctx: &ActorContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// Dispatch a single topic to its handler. Returning `Dispatch::NoHandler`
    /// lets the caller fall through to forwarding/no-handler handling (§4.1
    /// step 2, §4.2).
    async fn dispatch(&mut self, topic: &str, args: Args, ctx: &ActorContext) -> Dispatch;

    /// The actor's own metric map, merged by `tree`/`metrics` recursion
    /// with each child's map keyed by child name (§4.1 "Tree and metrics").
    fn metrics(&self) -> Value {
        Value::Null
    }
}

/// The outcome of `Behaviour::dispatch`.
pub enum Dispatch {
    /// The topic had a handler; its (possibly deferred) return value.
    Handled(Value),
    /// No handler exists for this topic — triggers §4.1's forwarding
    /// fallback (`forwardAllUnknown`) and ultimately `ActorError::NoHandler`.
    /// Carries the original arguments back so the forwarding fallback can
    /// still deliver them to `forwardAllUnknown`'s target.
    NoHandler(Args),
    /// The handler ran and raised an error (§7 `handler-error`).
    Error(ActorError),
}

/// A `Behaviour` with no handlers, used for actors that exist purely to
/// hold children (the default root, balancer-backed parents).
#[derive(Default)]
pub struct NullBehaviour;

#[async_trait]
impl Behaviour for NullBehaviour {
    async fn dispatch(&mut self, _topic: &str, args: Args, _ctx: &ActorContext) -> Dispatch {
        Dispatch::NoHandler(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{ActorId, ActorMode};

    #[tokio::test]
    async fn null_behaviour_has_no_handlers() {
        let mut behaviour = NullBehaviour;
        let ctx = ActorContext::new(ActorId::new(), String::new(), ActorMode::InMemory);
        let outcome = behaviour.dispatch("anything", Args::new(), &ctx).await;
        assert!(matches!(outcome, Dispatch::NoHandler(_)));
    }

    #[test]
    fn null_behaviour_metrics_are_null() {
        assert_eq!(NullBehaviour.metrics(), Value::Null);
    }
}
