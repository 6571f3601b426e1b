//! Shared forwarding + behaviour-dispatch front door (§4.1 Dispatch,
//! §4.8 Forwarding). Every mode that actually owns a live `Behaviour` —
//! [`crate::inmemory::InMemoryActor`] locally, and the `ForkedActorChild`/
//! `RemoteActorChild` workers once an `actor-message` envelope reaches
//! them — funnels through here so the first-match forward-list lookup
//! and the `forwardAllUnknown` fallback behave identically everywhere.
//!
//! `ActorProxy` (the parent-side handle to a forked/remote actor) does
//! NOT use this: forwarding configuration is pushed to the actor that
//! actually owns the forward list via the control topics in
//! `super::proxy::control_topics`, so the forward decision is always
//! made on the process that hosts the behaviour.

// Layer 2: Third-party crate imports
use serde_json::Value;
use tracing::warn;

// Layer 3: Internal module imports
use super::behaviour::{Behaviour, Dispatch};
use super::context::ActorContext;
use super::core::ActorCore;
use super::error::ActorError;
use super::reference::ActorRef;
use crate::message::Args;

fn explicit_forward(core: &ActorCore, topic: &str) -> Option<ActorRef> {
    core.forward_list().read().resolve(topic).cloned()
}

fn forward_all_unknown(core: &ActorCore) -> Option<ActorRef> {
    core.forward_list().read().forward_all_unknown().cloned()
}

/// `send(topic, args…)` (§4.1 steps 2–3) for a `Behaviour` co-located
/// with `core`. A handler error is logged and swallowed per §7's
/// propagation policy for non-`receive` requests.
pub(crate) async fn dispatch_send(
    core: &ActorCore,
    behaviour: &mut dyn Behaviour,
    ctx: &ActorContext,
    topic: &str,
    args: Args,
) -> Result<(), ActorError> {
    if let Some(target) = explicit_forward(core, topic) {
        return target.send(topic, args).await;
    }
    match behaviour.dispatch(topic, args, ctx).await {
        Dispatch::Handled(_) => Ok(()),
        Dispatch::Error(err) => {
            warn!(topic, error = %err, "handler error swallowed on send");
            Ok(())
        }
        Dispatch::NoHandler(args) => match forward_all_unknown(core) {
            Some(target) => target.send(topic, args).await,
            None => Err(ActorError::NoHandler),
        },
    }
}

/// `sendAndReceive(topic, args…)` (§4.1 steps 2–3). A handler error
/// propagates to the caller rather than being swallowed, per §7.
pub(crate) async fn dispatch_send_and_receive(
    core: &ActorCore,
    behaviour: &mut dyn Behaviour,
    ctx: &ActorContext,
    topic: &str,
    args: Args,
) -> Result<Value, ActorError> {
    if let Some(target) = explicit_forward(core, topic) {
        return target.send_and_receive(topic, args).await;
    }
    match behaviour.dispatch(topic, args, ctx).await {
        Dispatch::Handled(value) => Ok(value),
        Dispatch::Error(err) => Err(err),
        Dispatch::NoHandler(args) => match forward_all_unknown(core) {
            Some(target) => target.send_and_receive(topic, args).await,
            None => Err(ActorError::NoHandler),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::test_support::noop_ref;
    use crate::util::{ActorId, ActorMode};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Behaviour for Echo {
        async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &ActorContext) -> Dispatch {
            if topic == "echo" {
                Dispatch::Handled(Value::from("handled"))
            } else {
                Dispatch::NoHandler(args)
            }
        }
    }

    fn core() -> ActorCore {
        ActorCore::new(ActorId::new(), "t".to_string(), ActorMode::InMemory, None, Default::default())
    }

    fn ctx() -> ActorContext {
        ActorContext::new(ActorId::new(), "t".to_string(), ActorMode::InMemory)
    }

    #[tokio::test]
    async fn no_handler_without_fallback_errors() {
        let core = core();
        let mut behaviour = Echo;
        let result = dispatch_send_and_receive(&core, &mut behaviour, &ctx(), "missing", Args::new()).await;
        assert!(matches!(result, Err(ActorError::NoHandler)));
    }

    #[tokio::test]
    async fn no_handler_with_fallback_forwards() {
        let core = core();
        let target = noop_ref("fallback");
        core.forward_list().write().set_forward_all_unknown(target);
        let mut behaviour = Echo;
        let result = dispatch_send_and_receive(&core, &mut behaviour, &ctx(), "missing", Args::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn explicit_forward_wins_over_a_local_handler() {
        let core = core();
        let target = noop_ref("explicit");
        core.forward_list().write().add_exact("echo", target);
        let mut behaviour = Echo;
        // Echo would normally handle "echo" locally with Value::from("handled");
        // the explicit forward entry must pre-empt that and go to noop_ref,
        // which always answers with `Value::Null`.
        let result = dispatch_send_and_receive(&core, &mut behaviour, &ctx(), "echo", Args::new())
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }
}
