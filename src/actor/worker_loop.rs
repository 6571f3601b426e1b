//! The envelope-serving loop shared by every out-of-process child
//! (§4.4's forked worker and §4.5's remote worker are otherwise
//! identical: both read a `create-actor` envelope once, then dispatch
//! `actor-message`/`actor-tree`/`actor-metrics`/`destroy-actor` against
//! an in-memory actor until `actor-destroyed-ack` or the bus exits).

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, warn};

// Layer 3: Internal module imports
use super::{ActorProxy, ActorRef, Connection};
use crate::marshal::MarshallerRegistry;
use crate::message::{CreateActorBody, Envelope, EnvelopeBody, WireArgs};
use crate::util::{ActorId, ActorMode};

/// Blocks on the first envelope, expecting `create-actor`, and returns
/// its body. The caller still owns `inbox`/`connection` afterwards so it
/// can reply once the actor is actually constructed.
pub(crate) async fn read_create_actor(
    inbox: &mut UnboundedReceiver<Envelope>,
) -> Result<(Envelope, CreateActorBody), String> {
    let envelope = inbox
        .recv()
        .await
        .ok_or_else(|| "bus closed before create-actor arrived".to_string())?;
    let body = match envelope.body {
        EnvelopeBody::CreateActor(ref body) => body.as_ref().clone(),
        ref other => return Err(format!("expected create-actor, got {}", other.type_name())),
    };
    Ok((envelope, body))
}

/// Builds the `ActorRef` proxying back to the host-side parent, if any,
/// over `connection` — so a worker can forward to or message its parent
/// without a second transport (§4.4).
pub(crate) fn parent_ref(
    body: &CreateActorBody,
    connection: &Arc<Connection>,
    registry: &Arc<MarshallerRegistry>,
) -> Option<ActorRef> {
    body.parent_id.map(|parent_id| {
        ActorRef::new(ActorProxy::new(
            parent_id,
            "parent".to_string(),
            ActorMode::InMemory,
            connection.clone(),
            registry.clone(),
        ))
    })
}

/// Constructs the in-memory actor named by `body.definition` via the
/// global behaviour registry.
pub(crate) async fn build_actor(
    body: &CreateActorBody,
    parent: Option<ActorRef>,
) -> Result<ActorRef, String> {
    let behaviour = crate::system::registry::global()
        .create(&body.definition)
        .map_err(|e| e.to_string())?;

    crate::inmemory::InMemoryActor::spawn(
        body.name.clone().unwrap_or_else(|| body.id.to_string()),
        parent,
        behaviour,
        body.custom_parameters.clone(),
    )
    .await
    .map_err(|e| e.to_string())
}

/// Serves envelopes against `actor` until `actor-destroyed-ack` arrives
/// or the bus exits. Shared verbatim by the forked and remote workers.
pub(crate) async fn serve(
    actor: ActorRef,
    mut inbox: UnboundedReceiver<Envelope>,
    connection: Arc<Connection>,
    registry: Arc<MarshallerRegistry>,
) {
    let children: DashMap<ActorId, ActorRef> = DashMap::new();
    for child in actor.child_refs() {
        children.insert(child.id(), child);
    }

    while let Some(envelope) = inbox.recv().await {
        match envelope.body {
            EnvelopeBody::ActorMessage(ref body) if is_control_topic(&body.topic) => {
                apply_control_topic(&actor, &children, &body.topic, &body.message);
            }
            EnvelopeBody::ActorMessage(ref body) => {
                let marshalled_types = parse_marshalled_type(&body.marshalled_type, body.message.len());
                let args = match registry.unmarshall_args(body.message.clone(), &marshalled_types) {
                    Ok(args) => args,
                    Err(err) => {
                        if body.receive {
                            let _ = connection.notify(envelope.respond_err(err.to_string())).await;
                        }
                        continue;
                    }
                };
                if body.receive {
                    let reply = match actor.send_and_receive(&body.topic, args).await {
                        Ok(value) => envelope.respond_ok(value),
                        Err(err) => envelope.respond_err(err.to_string()),
                    };
                    if let Err(err) = connection.notify(reply).await {
                        warn!(error = %err, "failed to send actor-response");
                    }
                } else if let Err(err) = actor.send(&body.topic, args).await {
                    warn!(topic = %body.topic, error = %err, "fire-and-forget dispatch failed in worker");
                }
            }
            EnvelopeBody::ActorTree => {
                let reply = match actor.tree().await {
                    Ok(tree) => envelope.respond_ok(serde_json::to_value(tree).unwrap_or(Value::Null)),
                    Err(err) => envelope.respond_err(err.to_string()),
                };
                let _ = connection.notify(reply).await;
            }
            EnvelopeBody::ActorMetrics => {
                let reply = match actor.metrics().await {
                    Ok(metrics) => envelope.respond_ok(metrics),
                    Err(err) => envelope.respond_err(err.to_string()),
                };
                let _ = connection.notify(reply).await;
            }
            EnvelopeBody::DestroyActor => {
                let _ = actor.destroy().await;
                let _ = connection
                    .notify(Envelope::new(envelope.actor_id, EnvelopeBody::ActorDestroyed))
                    .await;
            }
            EnvelopeBody::ActorDestroyedAck => break,
            EnvelopeBody::ParentPing => {
                let _ = connection
                    .notify(Envelope::new(envelope.actor_id, EnvelopeBody::ParentPong))
                    .await;
            }
            other => warn!(envelope = other.type_name(), "unexpected envelope in worker loop"),
        }
    }
}

fn is_control_topic(topic: &str) -> bool {
    use super::control_topics::*;
    matches!(topic, FORWARD_TO_PARENT | FORWARD_ALL_UNKNOWN_TO_PARENT | FORWARD_TO_CHILD)
}

fn apply_control_topic(actor: &ActorRef, children: &DashMap<ActorId, ActorRef>, topic: &str, message: &WireArgs) {
    use super::control_topics::*;
    let Some(payload) = message.0.first() else { return };
    let result = match topic {
        FORWARD_TO_PARENT => serde_json::from_value::<Vec<String>>(payload.clone())
            .map_err(|e| e.to_string())
            .and_then(|topics| actor.forward_to_parent(topics).map_err(|e| e.to_string())),
        FORWARD_ALL_UNKNOWN_TO_PARENT => actor.forward_all_unknown_to_parent().map_err(|e| e.to_string()),
        FORWARD_TO_CHILD => apply_forward_to_child(actor, children, payload),
        _ => Ok(()),
    };
    if let Err(err) = result {
        warn!(topic, error = %err, "failed to apply forward-list control topic");
    }
}

fn apply_forward_to_child(actor: &ActorRef, children: &DashMap<ActorId, ActorRef>, payload: &Value) -> Result<(), String> {
    let child_id: ActorId = serde_json::from_value(payload.get("child").cloned().unwrap_or(Value::Null))
        .map_err(|e| e.to_string())?;
    let topics: Vec<String> = serde_json::from_value(payload.get("topics").cloned().unwrap_or(Value::Null))
        .map_err(|e| e.to_string())?;
    let child = children
        .get(&child_id)
        .map(|entry| entry.clone())
        .ok_or_else(|| format!("unknown child {child_id}"))?;
    actor.forward_to_child(&child, topics).map_err(|e| e.to_string())
}

fn parse_marshalled_type(value: &Option<Value>, arity: usize) -> Vec<Option<String>> {
    match value {
        None => vec![None; arity],
        Some(Value::Array(values)) => values.iter().map(value_to_name).collect(),
        Some(single) => {
            let mut out = vec![None; arity];
            if let Some(first) = out.first_mut() {
                *first = value_to_name(single);
            }
            out
        }
    }
}

fn value_to_name(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Logs and exits the process — both workers terminate this way on a
/// failed handshake, since there is no parent to report back to yet.
pub(crate) fn die(context: &str, err: impl std::fmt::Display) -> ! {
    error!(context, error = %err, "worker failed to initialize");
    std::process::exit(1);
}
