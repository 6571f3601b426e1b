//! `Dispatchable` implementation shared by the forked and remote modes:
//! every operation crosses the wire as an envelope over a shared
//! [`Connection`] rather than touching local state directly (§4.3, §4.4,
//! §4.9). The in-memory mode never uses this — it dispatches straight
//! into a co-located [`crate::actor::ActorCore`]/[`crate::actor::Behaviour`]
//! pair instead.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

// Layer 3: Internal module imports
use super::connection::Connection;
use super::error::ActorError;
use super::reference::{ActorRef, ChildSpec, Dispatchable, TreeNode};
use super::state::ActorState;
use crate::marshal::MarshallerRegistry;
use crate::message::{ActorMessageBody, Args, CreateActorBody, DefinitionFormat, Envelope, EnvelopeBody, WireArgs};
use crate::util::{ActorId, ActorMode};

/// Reserved `actor-message` topics used to configure a remote actor's
/// forward list from the parent side, since the real `forward_list`
/// lives on whichever process actually hosts the actor's `ActorCore`
/// (§4.8). Not part of the envelope-type table in §6 — these ride the
/// existing `actor-message` body rather than inventing a new envelope
/// type.
pub mod control_topics {
    pub const FORWARD_TO_PARENT: &str = "$$hactor.forward-to-parent";
    pub const FORWARD_ALL_UNKNOWN_TO_PARENT: &str = "$$hactor.forward-all-unknown-to-parent";
    pub const FORWARD_TO_CHILD: &str = "$$hactor.forward-to-child";
}

pub struct ActorProxy {
    id: ActorId,
    name: String,
    mode: ActorMode,
    state: RwLock<ActorState>,
    connection: Arc<Connection>,
    registry: Arc<MarshallerRegistry>,
}

impl ActorProxy {
    pub fn new(
        id: ActorId,
        name: String,
        mode: ActorMode,
        connection: Arc<Connection>,
        registry: Arc<MarshallerRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            mode,
            state: RwLock::new(ActorState::Ready),
            connection,
            registry,
        })
    }

    fn envelope(&self, body: EnvelopeBody) -> Envelope {
        Envelope::new(self.id, body)
    }

    async fn request_value(&self, body: EnvelopeBody) -> Result<Value, ActorError> {
        let reply = self
            .connection
            .call(self.envelope(body))
            .await
            .map_err(|e| ActorError::transport_for(self.id, e))?;
        match reply {
            EnvelopeBody::ActorResponse { response, error } => {
                if let Some(error) = error {
                    Err(ActorError::Handler(error))
                } else {
                    Ok(response.unwrap_or(Value::Null))
                }
            }
            other => Err(ActorError::Transport(format!(
                "unexpected reply body for actor {}: {}",
                self.id,
                other.type_name()
            ))),
        }
    }

    /// Flags this proxy `crashed` (§4.4 Respawn) without going through
    /// `destroy` — called by the forked/remote owner when the peer
    /// process exits or a heartbeat deadline elapses.
    pub(crate) fn mark_crashed(&self) {
        let mut state = self.state.write();
        if !matches!(*state, ActorState::Destroying | ActorState::Destroyed) {
            *state = ActorState::Crashed;
        }
    }

    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn send_control_topic(&self, topic: &'static str, payload: Value) {
        let envelope = self.envelope(EnvelopeBody::ActorMessage(ActorMessageBody {
            topic: topic.to_string(),
            message: WireArgs::single(payload),
            marshalled_type: None,
            receive: false,
        }));
        let connection = self.connection.clone();
        let actor_id = self.id;
        tokio::spawn(async move {
            if let Err(err) = connection.notify(envelope).await {
                warn!(actor = %actor_id, error = %err, "failed to push forward-list update to remote actor");
            }
        });
    }
}

#[async_trait]
impl Dispatchable for ActorProxy {
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
        *self.state.read()
    }

    async fn send(&self, topic: &str, args: Args) -> Result<(), ActorError> {
        let (wire, marshalled_types) = self
            .registry
            .marshall_args(&args, self.mode)
            .map_err(|e| ActorError::Marshal(e.to_string()))?;
        let envelope = self.envelope(EnvelopeBody::ActorMessage(ActorMessageBody {
            topic: topic.to_string(),
            message: wire,
            marshalled_type: marshalled_type_field(&marshalled_types),
            receive: false,
        }));
        self.connection
            .notify(envelope)
            .await
            .map_err(|e| ActorError::transport_for(self.id, e))
    }

    async fn send_and_receive(
        &self,
        topic: &str,
        args: Args,
        timeout: Option<Duration>,
    ) -> Result<Value, ActorError> {
        let (wire, marshalled_types) = self
            .registry
            .marshall_args(&args, self.mode)
            .map_err(|e| ActorError::Marshal(e.to_string()))?;
        let body = EnvelopeBody::ActorMessage(ActorMessageBody {
            topic: topic.to_string(),
            message: wire,
            marshalled_type: marshalled_type_field(&marshalled_types),
            receive: true,
        });
        let call = self.request_value(body);
        match timeout {
            Some(duration) => tokio::time::timeout(duration, call)
                .await
                .map_err(|_| ActorError::Timeout)?,
            None => call.await,
        }
    }

    async fn create_child(&self, spec: ChildSpec) -> Result<ActorRef, ActorError> {
        if spec.behaviour.is_some() {
            return Err(ActorError::Config(
                "children of a forked/remote actor must be created via module_path, not an in-process behaviour object".to_string(),
            ));
        }
        let module_path = spec.module_path.clone().ok_or_else(|| {
            ActorError::Config("module_path is required to create a child of a forked/remote actor".to_string())
        })?;
        let child_id = ActorId::new();
        let body = CreateActorBody {
            id: child_id,
            definition: module_path,
            definition_format: DefinitionFormat::ModulePath,
            parent_id: Some(self.id),
            mode: spec.mode,
            config: Value::Null,
            resources: Value::Null,
            marshallers: Vec::new(),
            custom_parameters: spec.custom_parameters,
            custom_parameters_marshalled_types: None,
            ping_timeout_ms: spec.ping_timeout.map(|d| d.as_millis() as u64),
            log_level: None,
            test: false,
            debug: false,
            additional_requires: Vec::new(),
            clusters: Default::default(),
            name: Some(spec.name.clone()),
        };
        let reply = self
            .connection
            .call(self.envelope(EnvelopeBody::CreateActor(Box::new(body))))
            .await
            .map_err(|e| ActorError::transport_for(self.id, e))?;
        match reply {
            EnvelopeBody::ActorResponse { error: Some(error), .. } => Err(ActorError::Handler(error)),
            EnvelopeBody::ActorResponse { .. } => {
                let child = ActorProxy::new(
                    child_id,
                    spec.name,
                    spec.mode,
                    self.connection.clone(),
                    self.registry.clone(),
                );
                Ok(ActorRef::new(child))
            }
            other => Err(ActorError::Transport(format!(
                "unexpected reply to create-actor: {}",
                other.type_name()
            ))),
        }
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        {
            let mut state = self.state.write();
            if *state == ActorState::Destroying || *state == ActorState::Destroyed {
                return Ok(());
            }
            *state = ActorState::Destroying;
        }
        let reply = self
            .connection
            .call(self.envelope(EnvelopeBody::DestroyActor))
            .await
            .map_err(|e| ActorError::transport_for(self.id, e))?;
        match reply {
            EnvelopeBody::ActorDestroyed => {
                self.connection
                    .notify(self.envelope(EnvelopeBody::ActorDestroyedAck))
                    .await
                    .map_err(|e| ActorError::transport_for(self.id, e))?;
                *self.state.write() = ActorState::Destroyed;
                Ok(())
            }
            other => Err(ActorError::Transport(format!(
                "unexpected reply to destroy-actor: {}",
                other.type_name()
            ))),
        }
    }

    async fn tree(&self) -> Result<TreeNode, ActorError> {
        let value = self.request_value(EnvelopeBody::ActorTree).await?;
        serde_json::from_value(value).map_err(|e| ActorError::Transport(e.to_string()))
    }

    async fn metrics(&self) -> Result<Value, ActorError> {
        self.request_value(EnvelopeBody::ActorMetrics).await
    }

    fn forward_to_parent(&self, topics: Vec<String>) -> Result<(), ActorError> {
        self.send_control_topic(control_topics::FORWARD_TO_PARENT, serde_json::json!(topics));
        Ok(())
    }

    fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError> {
        self.send_control_topic(control_topics::FORWARD_ALL_UNKNOWN_TO_PARENT, Value::Bool(true));
        Ok(())
    }

    fn forward_to_child(&self, child: &ActorRef, topics: Vec<String>) -> Result<(), ActorError> {
        self.send_control_topic(
            control_topics::FORWARD_TO_CHILD,
            serde_json::json!({ "child": child.id(), "topics": topics }),
        );
        Ok(())
    }
}

fn marshalled_type_field(kinds: &[Option<String>]) -> Option<Value> {
    if kinds.iter().all(Option::is_none) {
        return None;
    }
    Some(serde_json::json!(kinds))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::bus::PipeBus;
    use crate::marshal::default_registry;

    async fn paired_connections() -> (Arc<Connection>, Arc<Connection>) {
        let (a, b) = tokio::io::duplex(8192);
        let (a_read, a_write) = tokio::io::split(a);
        let (b_read, b_write) = tokio::io::split(b);
        #[cfg(unix)]
        let bus_a = PipeBus::new(Box::new(a_write), Box::new(a_read), None);
        #[cfg(not(unix))]
        let bus_a = PipeBus::new(Box::new(a_write), Box::new(a_read));
        #[cfg(unix)]
        let bus_b = PipeBus::new(Box::new(b_write), Box::new(b_read), None);
        #[cfg(not(unix))]
        let bus_b = PipeBus::new(Box::new(b_write), Box::new(b_read));
        (Connection::new(bus_a), Connection::new(bus_b))
    }

    #[tokio::test]
    async fn send_and_receive_round_trips_through_an_echo_peer() {
        let (conn_parent, conn_child) = paired_connections().await;
        let mut inbox = conn_child.requests();
        let registry = Arc::new(default_registry());
        let proxy = ActorProxy::new(ActorId::new(), "worker".to_string(), ActorMode::Forked, conn_parent, registry);

        let echo = tokio::spawn(async move {
            let request = inbox.recv().await.unwrap();
            match request.body {
                EnvelopeBody::ActorMessage(ref body) => {
                    let response = request.respond_ok(body.message.0[0].clone());
                    conn_child.notify(response).await.unwrap();
                }
                _ => panic!("expected actor-message"),
            }
        });

        let mut args = Args::new();
        args.push(Value::from("hello"));
        let result = proxy.send_and_receive("echo", args, None).await.unwrap();
        assert_eq!(result, Value::from("hello"));
        echo.await.unwrap();
    }
}
