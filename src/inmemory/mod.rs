//! In-memory actor: the only mode that invokes user behaviour directly. A
//! dedicated `tokio` task owns the `Behaviour` exclusively and processes
//! one command at a time — no internal buffering or backpressure, but a
//! single task per actor so handler bodies genuinely run to completion
//! before the next one starts.
//!
//! `create_actor` also implements the mode-dispatch every other caller
//! (an in-memory actor creating a child, or `system::ActorSystem`
//! creating a top-level actor) goes through: in-memory children are
//! spawned directly, forked/remote children delegate to their
//! respective modules, and a `cluster_size > 1` spec wraps the result in
//! a [`crate::balancer::RoundRobinBalancer`] (§4.5/§4.7).

// Layer 1: Standard library imports
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

// Layer 3: Internal module imports
use crate::actor::{
    dispatch, ActorContext, ActorCore, ActorError, ActorRef, ActorState, Behaviour, ChildSpec, Dispatchable, TreeNode,
};
use crate::balancer::RoundRobinBalancer;
use crate::message::Args;
use crate::util::{ActorId, ActorMode};

enum Command {
    Send {
        topic: String,
        args: Args,
        reply: oneshot::Sender<Result<(), ActorError>>,
    },
    SendAndReceive {
        topic: String,
        args: Args,
        reply: oneshot::Sender<Result<Value, ActorError>>,
    },
    Destroy {
        reply: oneshot::Sender<Result<(), ActorError>>,
    },
    Metrics {
        reply: oneshot::Sender<Value>,
    },
}

/// `send0`/`sendAndReceive0` target for actors created with
/// `mode: in-memory` (§4.2). Owns the `ActorCore` bookkeeping shared
/// with every other mode plus a private task running the user
/// `Behaviour`.
pub struct InMemoryActor {
    core: Arc<ActorCore>,
    commands: mpsc::UnboundedSender<Command>,
    self_ref: OnceLock<Weak<InMemoryActor>>,
}

impl InMemoryActor {
    /// Constructs and fully initializes a new in-memory actor: spawns
    /// its private task, runs `Behaviour::initialize`, and only
    /// transitions `New → Ready` once that completes successfully
    /// (§4.1 "`new → ready`: completion of `initialize()`").
    pub async fn spawn(
        name: impl Into<String>,
        parent: Option<ActorRef>,
        mut behaviour: Box<dyn Behaviour>,
        custom_parameters: std::collections::HashMap<String, Value>,
    ) -> Result<ActorRef, ActorError> {
        let id = ActorId::new();
        let name = name.into();
        let core = Arc::new(ActorCore::new(id, name.clone(), ActorMode::InMemory, parent, custom_parameters));
        let ctx = ActorContext::new(id, name, ActorMode::InMemory).with_custom_parameters(core.custom_parameters());

        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task_core = core.clone();
        tokio::spawn(async move {
            if let Err(err) = behaviour.initialize(&ctx).await {
                let _ = ready_tx.send(Err(err));
                return;
            }
            task_core.mark_ready();
            let _ = ready_tx.send(Ok(()));

            while let Some(command) = commands_rx.recv().await {
                match command {
                    Command::Send { topic, args, reply } => {
                        debug!(topic, "dispatching send");
                        let result = dispatch::dispatch_send(&task_core, behaviour.as_mut(), &ctx, &topic, args).await;
                        let _ = reply.send(result);
                    }
                    Command::SendAndReceive { topic, args, reply } => {
                        debug!(topic, "dispatching sendAndReceive");
                        let result =
                            dispatch::dispatch_send_and_receive(&task_core, behaviour.as_mut(), &ctx, &topic, args)
                                .await;
                        let _ = reply.send(result);
                    }
                    Command::Metrics { reply } => {
                        let _ = reply.send(behaviour.metrics());
                    }
                    Command::Destroy { reply } => {
                        task_core.destroy_children().await;
                        let result = behaviour.destroy(&ctx).await;
                        task_core.mark_destroyed();
                        info!("actor destroyed");
                        let _ = reply.send(result);
                        break;
                    }
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(ActorError::Transport(
                    "actor task exited before completing initialize()".to_string(),
                ))
            }
        }

        let actor = Arc::new(Self {
            core,
            commands: commands_tx,
            self_ref: OnceLock::new(),
        });
        let _ = actor.self_ref.set(Arc::downgrade(&actor));
        Ok(ActorRef::new(actor))
    }

    fn self_ref(&self) -> Result<ActorRef, ActorError> {
        self.self_ref
            .get()
            .and_then(Weak::upgrade)
            .map(ActorRef::new)
            .ok_or_else(|| ActorError::Config("actor self-reference not yet initialized".to_string()))
    }
}

#[async_trait]
impl Dispatchable for InMemoryActor {
    fn id(&self) -> ActorId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn mode(&self) -> ActorMode {
        ActorMode::InMemory
    }

    fn state(&self) -> ActorState {
        self.core.state()
    }

    async fn send(&self, topic: &str, args: Args) -> Result<(), ActorError> {
        self.core.require_ready()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                topic: topic.to_string(),
                args,
                reply: reply_tx,
            })
            .map_err(|_| ActorError::transport_for(self.core.id(), "actor task is gone"))?;
        reply_rx
            .await
            .map_err(|_| ActorError::transport_for(self.core.id(), "actor task dropped the reply"))?
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        args: Args,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        self.core.require_ready()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::SendAndReceive {
                topic: topic.to_string(),
                args,
                reply: reply_tx,
            })
            .map_err(|_| ActorError::transport_for(self.core.id(), "actor task is gone"))?;

        let wait = async {
            reply_rx
                .await
                .map_err(|_| ActorError::transport_for(self.core.id(), "actor task dropped the reply"))?
        };
        match timeout {
            Some(duration) => tokio::time::timeout(duration, wait)
                .await
                .map_err(|_| ActorError::Timeout)?,
            None => wait.await,
        }
    }

    async fn create_child(&self, spec: ChildSpec) -> Result<ActorRef, ActorError> {
        self.core.require_ready()?;
        let child = create_actor(Some(self.self_ref()?), spec).await?;
        self.core.add_child(child.clone());
        Ok(child)
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        if !self.core.begin_destroy() {
            return Ok(());
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Destroy { reply: reply_tx }).is_err() {
            self.core.mark_destroyed();
            return Ok(());
        }
        reply_rx.await.unwrap_or(Ok(()))
    }

    async fn tree(&self) -> Result<TreeNode, ActorError> {
        Ok(self.core.tree_node(Vec::new()).await)
    }

    async fn metrics(&self) -> Result<Value, ActorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Metrics { reply: reply_tx }).is_err() {
            return Ok(Value::Null);
        }
        let own = reply_rx.await.unwrap_or(Value::Null);
        Ok(self.core.metrics_value(own, Vec::new()).await)
    }

    fn forward_to_parent(&self, topics: Vec<String>) -> Result<(), ActorError> {
        let parent = self
            .core
            .parent()
            .cloned()
            .ok_or_else(|| ActorError::Config("actor has no parent to forward to".to_string()))?;
        let mut list = self.core.forward_list().write();
        for topic in topics {
            list.add_exact(topic, parent.clone());
        }
        Ok(())
    }

    fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError> {
        let parent = self
            .core
            .parent()
            .cloned()
            .ok_or_else(|| ActorError::Config("actor has no parent to forward to".to_string()))?;
        self.core.forward_list().write().set_forward_all_unknown(parent);
        Ok(())
    }

    fn forward_to_child(&self, child: &ActorRef, topics: Vec<String>) -> Result<(), ActorError> {
        if !self.core.has_child(child.id()) {
            return Err(ActorError::Config(format!(
                "{} is not a registered child of {}",
                child.id(),
                self.core.id()
            )));
        }
        let mut list = self.core.forward_list().write();
        for topic in topics {
            list.add_exact(topic, child.clone());
        }
        Ok(())
    }

    fn child_refs(&self) -> Vec<ActorRef> {
        self.core.children()
    }
}

/// Mode-dispatch front door for `createActor`: picks the right
/// constructor for `spec.mode`, then — if `spec.cluster_size` asks for a
/// cluster — repeats that many times and wraps the results in a balancer,
/// each replica created with `cluster_size: 1`.
pub async fn create_actor(parent: Option<ActorRef>, spec: ChildSpec) -> Result<ActorRef, ActorError> {
    let cluster_size = spec.cluster_size.max(1);
    if cluster_size == 1 {
        return create_single(parent, spec).await;
    }
    if matches!(spec.mode, ActorMode::InMemory) {
        return Err(ActorError::Config(
            "clustering is only meaningful for forked/remote actors".to_string(),
        ));
    }
    let mut children = Vec::with_capacity(cluster_size);
    for index in 0..cluster_size {
        let mut replica = ChildSpec {
            name: format!("{}-{}", spec.name, index),
            mode: spec.mode,
            behaviour: None,
            module_path: spec.module_path.clone(),
            custom_parameters: spec.custom_parameters.clone(),
            ping_timeout: spec.ping_timeout,
            cluster_size: 1,
            cluster: None,
            hosts: resolve_replica_hosts(&spec.hosts, index),
        };
        replica.cluster = None;
        children.push(create_single(parent.clone(), replica).await?);
    }
    Ok(ActorRef::new(Arc::new(RoundRobinBalancer::new(children, spec.mode))))
}

/// If more hosts were given than replicas, each replica gets its own
/// host; if fewer (including the single-host case), every replica lands
/// on the same host(s) list (§4.5 "If only a single host is given but
/// clusterSize > 1, all replicas land on that host").
fn resolve_replica_hosts(hosts: &[String], index: usize) -> Vec<String> {
    if hosts.len() > 1 {
        hosts.get(index).cloned().into_iter().collect()
    } else {
        hosts.to_vec()
    }
}

async fn create_single(parent: Option<ActorRef>, spec: ChildSpec) -> Result<ActorRef, ActorError> {
    match spec.mode {
        ActorMode::InMemory => {
            let behaviour = spec.behaviour.ok_or_else(|| {
                ActorError::Config("an in-memory actor requires a behaviour object".to_string())
            })?;
            InMemoryActor::spawn(spec.name, parent, behaviour, spec.custom_parameters).await
        }
        ActorMode::Forked => crate::forked::ForkedActorParent::spawn(parent, spec).await,
        ActorMode::Remote => crate::remote::RemoteActorParent::connect(parent, spec).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::{ActorContext as Ctx, Dispatch, NullBehaviour};
    use serde_json::json;

    struct Counter(i64);

    #[async_trait]
    impl Behaviour for Counter {
        async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &Ctx) -> Dispatch {
            match topic {
                "plus" => {
                    if let Some(n) = args.downcast_ref::<i64>(0) {
                        self.0 += n;
                    }
                    Dispatch::Handled(json!(self.0))
                }
                _ => Dispatch::NoHandler(args),
            }
        }
        fn metrics(&self) -> Value {
            json!({ "count": self.0 })
        }
    }

    #[tokio::test]
    async fn send_and_receive_invokes_handler_directly() {
        let actor = InMemoryActor::spawn("counter", None, Box::new(Counter(0)), Default::default())
            .await
            .unwrap();
        let mut args = Args::new();
        args.push(5i64);
        let result = actor.send_and_receive("plus", args).await.unwrap();
        assert_eq!(result, json!(5));
    }

    #[tokio::test]
    async fn spawn_only_returns_once_ready() {
        let actor = InMemoryActor::spawn("root", None, Box::new(NullBehaviour), Default::default())
            .await
            .unwrap();
        assert_eq!(actor.state(), ActorState::Ready);
    }

    #[tokio::test]
    async fn no_handler_errors_without_a_forward_target() {
        let actor = InMemoryActor::spawn("counter", None, Box::new(Counter(0)), Default::default())
            .await
            .unwrap();
        let err = actor.send_and_receive("missing", Args::new()).await.unwrap_err();
        assert!(matches!(err, ActorError::NoHandler));
    }

    #[tokio::test]
    async fn destroy_runs_behaviour_hook_and_transitions_state() {
        let actor = InMemoryActor::spawn("counter", None, Box::new(Counter(0)), Default::default())
            .await
            .unwrap();
        actor.destroy().await.unwrap();
        assert_eq!(actor.state(), ActorState::Destroyed);
    }

    #[tokio::test]
    async fn metrics_reads_behaviour_map() {
        let actor = InMemoryActor::spawn("counter", None, Box::new(Counter(7)), Default::default())
            .await
            .unwrap();
        let metrics = actor.metrics().await.unwrap();
        assert_eq!(metrics["count"], json!(7));
    }

    #[tokio::test]
    async fn create_child_registers_with_parent_core() {
        let parent = InMemoryActor::spawn("parent", None, Box::new(NullBehaviour), Default::default())
            .await
            .unwrap();
        let child_spec = ChildSpec::in_memory("child", Counter(0));
        let child = parent.create_child(child_spec).await.unwrap();
        let tree = parent.tree().await.unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].id, child.id());
    }

    #[tokio::test]
    async fn seed_scenario_1_accumulates_extstate() {
        struct Accumulator(i64);
        #[async_trait]
        impl Behaviour for Accumulator {
            async fn dispatch(&mut self, topic: &str, mut args: Args, _ctx: &Ctx) -> Dispatch {
                if topic != "myMessage" {
                    return Dispatch::NoHandler(args);
                }
                if let Some(count) = args.downcast_ref::<i64>(0) {
                    self.0 += count;
                }
                let _ = args.len();
                Dispatch::Handled(json!(self.0))
            }
        }
        let actor = InMemoryActor::spawn("root", None, Box::new(Accumulator(0)), Default::default())
            .await
            .unwrap();
        let mut args = Args::new();
        args.push(3i64);
        actor.send("myMessage", args).await.unwrap();
        // give the single-task actor a chance to process the fire-and-forget send
        tokio::task::yield_now().await;
        let metrics = actor.send_and_receive("myMessage", Args::one(0i64)).await.unwrap();
        assert_eq!(metrics, json!(3));
    }

    #[tokio::test]
    async fn seed_scenario_2_how_many_returns_length() {
        struct HowMany;
        #[async_trait]
        impl Behaviour for HowMany {
            async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &Ctx) -> Dispatch {
                if topic != "howMany" {
                    return Dispatch::NoHandler(args);
                }
                let len = args.downcast_ref::<Vec<i32>>(0).map(|v| v.len()).unwrap_or(0);
                Dispatch::Handled(json!(len))
            }
        }
        let actor = InMemoryActor::spawn("root", None, Box::new(HowMany), Default::default())
            .await
            .unwrap();
        let mut args = Args::new();
        args.push(vec![1, 2, 3]);
        let result = actor.send_and_receive("howMany", args).await.unwrap();
        assert_eq!(result, json!(3));
    }

    #[tokio::test]
    async fn seed_scenario_3_say_hello_uses_two_positional_args() {
        struct Greeter;
        #[async_trait]
        impl Behaviour for Greeter {
            async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &Ctx) -> Dispatch {
                if topic != "sayHello" {
                    return Dispatch::NoHandler(args);
                }
                let to = args.downcast_ref::<String>(0).cloned().unwrap_or_default();
                let from = args.downcast_ref::<String>(1).cloned().unwrap_or_default();
                Dispatch::Handled(json!(format!("Hello to {to} from {from}")))
            }
        }
        let actor = InMemoryActor::spawn("root", None, Box::new(Greeter), Default::default())
            .await
            .unwrap();
        let mut args = Args::new();
        args.push("Bob".to_string());
        args.push("Jack".to_string());
        let result = actor.send_and_receive("sayHello", args).await.unwrap();
        assert_eq!(result, json!("Hello to Bob from Jack"));
    }
}
