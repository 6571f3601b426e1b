//! Parent-side handle to a remote actor (§4.5): a short TCP handshake
//! through the target host's [`super::ListeningServer`] followed by a
//! persistent socket straight to the worker it spawned. Unlike
//! [`crate::forked::ForkedActorParent`], this one heartbeats its peer and,
//! when a `pingTimeout` is configured, respawns it on crash.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::actor::{ActorError, ActorProxy, ActorRef, ChildSpec, Connection, Dispatchable, TreeNode};
use crate::bus::SocketBus;
use crate::marshal::{default_registry, MarshallerRegistry};
use crate::message::{Args, CreateActorBody, DefinitionFormat, Envelope, EnvelopeBody};
use crate::util::{ActorId, ActorMode};

use super::DEFAULT_LISTEN_PORT;

/// Everything needed to reconnect from scratch, kept around only when a
/// `pingTimeout` was configured — a respawn re-sends the very envelope
/// that created the actor the first time (§4.4's "new worker is started
/// with the original create-actor envelope").
struct RespawnState {
    target: (String, u16),
    body: CreateActorBody,
    ping_period: Duration,
}

pub struct RemoteActorParent {
    id: ActorId,
    name: String,
    proxy: RwLock<Arc<ActorProxy>>,
    registry: Arc<MarshallerRegistry>,
    respawn: Option<RespawnState>,
}

impl RemoteActorParent {
    pub async fn connect(parent: Option<ActorRef>, spec: ChildSpec) -> Result<ActorRef, ActorError> {
        if spec.behaviour.is_some() {
            return Err(ActorError::Config(
                "remote actors are constructed from a module_path, not an in-process behaviour object".to_string(),
            ));
        }
        let module_path = spec.module_path.clone().ok_or_else(|| {
            ActorError::Config("module_path is required to spawn a remote actor".to_string())
        })?;
        let target = resolve_target(&spec)?;
        let id = ActorId::new();

        let body = CreateActorBody {
            id,
            definition: module_path,
            definition_format: DefinitionFormat::ModulePath,
            parent_id: parent.as_ref().map(ActorRef::id),
            mode: ActorMode::Remote,
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
            clusters: HashMap::new(),
            name: Some(spec.name.clone()),
        };

        let registry = Arc::new(default_registry());
        let connection = handshake_and_connect(&target, &body).await?;

        let proxy = ActorProxy::new(id, spec.name.clone(), ActorMode::Remote, connection, registry.clone());

        let respawn = spec.ping_timeout.map(|ping_timeout| RespawnState {
            target: target.clone(),
            body: body.clone(),
            ping_period: ping_timeout / 2,
        });

        let parent_handle = Arc::new(Self {
            id,
            name: spec.name,
            proxy: RwLock::new(proxy),
            registry,
            respawn,
        });
        parent_handle.clone().arm_liveness_watch();
        Ok(ActorRef::new(parent_handle))
    }

    fn current(&self) -> Arc<ActorProxy> {
        self.proxy.read().clone()
    }

    /// Starts either the full ping/respawn loop (when `pingTimeout` was
    /// configured) or a plain exit watcher, mirroring
    /// `forked::ForkedActorParent`'s "peer death marks the proxy crashed"
    /// for the no-heartbeat case.
    fn arm_liveness_watch(self: Arc<Self>) {
        let proxy = self.current();
        let connection = proxy.connection().clone();

        let Some(respawn) = &self.respawn else {
            let watched = self.clone();
            tokio::spawn(async move {
                connection.wait_closed().await;
                watched.current().mark_crashed();
            });
            return;
        };
        let period = respawn.ping_period.max(Duration::from_millis(50));
        let inbox = connection.requests();
        let watched = self.clone();
        super::heartbeat::spawn(self.id, connection, inbox, period, move || {
            watched.current().mark_crashed();
            let watched = watched.clone();
            tokio::spawn(async move {
                watched.respawn_and_rearm().await;
            });
        });
    }

    async fn respawn_and_rearm(self: Arc<Self>) {
        let Some(respawn) = &self.respawn else { return };
        info!(actor = %self.id, "respawning crashed remote actor");
        let connection = match handshake_and_connect(&respawn.target, &respawn.body).await {
            Ok(connection) => connection,
            Err(err) => {
                warn!(actor = %self.id, error = %err, "remote respawn failed");
                return;
            }
        };
        let new_proxy = ActorProxy::new(self.id, self.name.clone(), ActorMode::Remote, connection, self.registry.clone());
        *self.proxy.write() = new_proxy;
        self.arm_liveness_watch();
    }
}

fn resolve_target(spec: &ChildSpec) -> Result<(String, u16), ActorError> {
    let host_entry = spec.hosts.first().cloned().unwrap_or_else(|| "127.0.0.1".to_string());
    match host_entry.split_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| ActorError::Config(format!("invalid port in host entry '{host_entry}'")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((host_entry, DEFAULT_LISTEN_PORT)),
    }
}

/// Two-hop handshake (§4.9): a short control connection to the
/// listening server negotiates `create-actor` and yields the worker's
/// own port, then a fresh persistent socket talks to the worker
/// directly from here on.
async fn handshake_and_connect(target: &(String, u16), body: &CreateActorBody) -> Result<Arc<Connection>, ActorError> {
    let control_stream = TcpStream::connect((target.0.as_str(), target.1))
        .await
        .map_err(|e| ActorError::Transport(format!("failed to reach listening server at {}:{}: {e}", target.0, target.1)))?;
    let control = Connection::new(SocketBus::new(control_stream));

    let reply = control
        .call(Envelope::new(body.id, EnvelopeBody::CreateActor(Box::new(body.clone()))))
        .await
        .map_err(|e| ActorError::transport_for(body.id, e))?;
    let port = match reply {
        EnvelopeBody::ActorResponse { error: Some(error), .. } => return Err(ActorError::Handler(error)),
        EnvelopeBody::ActorResponse { response: Some(value), .. } => value
            .get("port")
            .and_then(Value::as_u64)
            .ok_or_else(|| ActorError::Transport("listening server ack missing port".to_string()))? as u16,
        other => {
            return Err(ActorError::Transport(format!(
                "unexpected reply to create-actor: {}",
                other.type_name()
            )))
        }
    };

    let worker_stream = TcpStream::connect((target.0.as_str(), port))
        .await
        .map_err(|e| ActorError::Transport(format!("failed to reach remote worker at {}:{port}: {e}", target.0)))?;
    Ok(Connection::new(SocketBus::new(worker_stream)))
}

#[async_trait]
impl Dispatchable for RemoteActorParent {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ActorMode {
        ActorMode::Remote
    }

    fn state(&self) -> crate::actor::ActorState {
        self.current().state()
    }

    async fn send(&self, topic: &str, args: Args) -> Result<(), ActorError> {
        self.current().send(topic, args).await
    }

    async fn send_and_receive(&self, topic: &str, args: Args, timeout: Option<Duration>) -> Result<Value, ActorError> {
        self.current().send_and_receive(topic, args, timeout).await
    }

    async fn create_child(&self, spec: ChildSpec) -> Result<ActorRef, ActorError> {
        self.current().create_child(spec).await
    }

    async fn destroy(&self) -> Result<(), ActorError> {
        self.current().destroy().await
    }

    async fn tree(&self) -> Result<TreeNode, ActorError> {
        self.current().tree().await
    }

    async fn metrics(&self) -> Result<Value, ActorError> {
        self.current().metrics().await
    }

    fn forward_to_parent(&self, topics: Vec<String>) -> Result<(), ActorError> {
        self.current().forward_to_parent(topics)
    }

    fn forward_all_unknown_to_parent(&self) -> Result<(), ActorError> {
        self.current().forward_all_unknown_to_parent()
    }

    fn forward_to_child(&self, child: &ActorRef, topics: Vec<String>) -> Result<(), ActorError> {
        self.current().forward_to_child(child, topics)
    }
}
