// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
use super::args::WireArgs;
use crate::util::{ActorId, ActorMode, MessageId};

/// The sole protocol spoken between a parent proxy and its forked/remote
/// child, regardless of transport (§4.3). Every envelope carries
/// `{id, actorId, type, body?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    pub actor_id: ActorId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: EnvelopeBody,
}

impl Envelope {
    pub fn new(actor_id: ActorId, body: EnvelopeBody) -> Self {
        Self {
            id: MessageId::new(),
            actor_id,
            timestamp: Utc::now(),
            body,
        }
    }

    /// Build the `actor-response` envelope correlated to this request by
    /// reusing its `id`, carrying a success payload.
    pub fn respond_ok(&self, response: Value) -> Self {
        Self {
            id: self.id,
            actor_id: self.actor_id,
            timestamp: Utc::now(),
            body: EnvelopeBody::ActorResponse {
                response: Some(response),
                error: None,
            },
        }
    }

    /// Build the `actor-response` envelope correlated to this request,
    /// carrying a `{error}` payload per §7's handler-error propagation
    /// policy.
    pub fn respond_err(&self, error: String) -> Self {
        Self {
            id: self.id,
            actor_id: self.actor_id,
            timestamp: Utc::now(),
            body: EnvelopeBody::ActorResponse {
                response: None,
                error: Some(error),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.body.type_name()
    }
}

/// The type-specific body of an envelope. Tagged with `type` to match the
/// wire vocabulary of §6's table exactly (`create-actor`, `actor-message`,
/// …), with the remaining fields flattened alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EnvelopeBody {
    CreateActor(Box<CreateActorBody>),
    ActorMessage(ActorMessageBody),
    ActorResponse {
        response: Option<Value>,
        error: Option<String>,
    },
    ActorTree,
    ActorMetrics,
    DestroyActor,
    ActorDestroyed,
    ActorDestroyedAck,
    ParentPing,
    ParentPong,
}

impl EnvelopeBody {
    pub fn type_name(&self) -> &'static str {
        match self {
            EnvelopeBody::CreateActor(_) => "create-actor",
            EnvelopeBody::ActorMessage(_) => "actor-message",
            EnvelopeBody::ActorResponse { .. } => "actor-response",
            EnvelopeBody::ActorTree => "actor-tree",
            EnvelopeBody::ActorMetrics => "actor-metrics",
            EnvelopeBody::DestroyActor => "destroy-actor",
            EnvelopeBody::ActorDestroyed => "actor-destroyed",
            EnvelopeBody::ActorDestroyedAck => "actor-destroyed-ack",
            EnvelopeBody::ParentPing => "parent-ping",
            EnvelopeBody::ParentPong => "parent-pong",
        }
    }
}

/// Body of a `create-actor` envelope (parent → child, sent exactly once
/// per worker lifetime).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActorBody {
    pub id: ActorId,
    /// Module path dispatch only, per §9's design note — the core never
    /// ships arbitrary user source across the wire.
    pub definition: String,
    pub definition_format: DefinitionFormat,
    pub parent_id: Option<ActorId>,
    pub mode: ActorMode,
    pub config: Value,
    pub resources: Value,
    pub marshallers: Vec<String>,
    pub custom_parameters: HashMap<String, Value>,
    pub custom_parameters_marshalled_types: Option<HashMap<String, String>>,
    pub ping_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
    pub test: bool,
    pub debug: bool,
    pub additional_requires: Vec<String>,
    pub clusters: HashMap<String, Vec<String>>,
    pub name: Option<String>,
}

/// How `definition` should be interpreted by the worker's bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefinitionFormat {
    /// A registered module path the worker resolves through its own
    /// behaviour registry (the only format the core requires).
    ModulePath,
    /// Arbitrary serialized source, gated behind an explicit capability
    /// flag per §9 — not implemented by the core, reserved for an
    /// external collaborator.
    Source,
}

/// Body of an `actor-message` envelope — the wire shape of a `send`/
/// `sendAndReceive` call once it crosses a process or host boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorMessageBody {
    pub topic: String,
    pub message: WireArgs,
    pub marshalled_type: Option<Value>,
    pub receive: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn sample_actor_message() -> Envelope {
        Envelope::new(
            ActorId::new(),
            EnvelopeBody::ActorMessage(ActorMessageBody {
                topic: "hello".to_string(),
                message: WireArgs::single(Value::from(123)),
                marshalled_type: None,
                receive: true,
            }),
        )
    }

    #[test]
    fn type_name_matches_table() {
        let env = sample_actor_message();
        assert_eq!(env.type_name(), "actor-message");
        assert_eq!(EnvelopeBody::ActorTree.type_name(), "actor-tree");
        assert_eq!(EnvelopeBody::ParentPing.type_name(), "parent-ping");
    }

    #[test]
    fn respond_ok_preserves_correlation_id() {
        let request = sample_actor_message();
        let response = request.respond_ok(Value::from("Hello 123!"));
        assert_eq!(response.id, request.id);
        assert_eq!(response.actor_id, request.actor_id);
        match response.body {
            EnvelopeBody::ActorResponse { response, error } => {
                assert_eq!(response, Some(Value::from("Hello 123!")));
                assert!(error.is_none());
            }
            _ => panic!("expected actor-response"),
        }
    }

    #[test]
    fn respond_err_carries_error_not_response() {
        let request = sample_actor_message();
        let response = request.respond_err("boom".to_string());
        match response.body {
            EnvelopeBody::ActorResponse { response, error } => {
                assert!(response.is_none());
                assert_eq!(error, Some("boom".to_string()));
            }
            _ => panic!("expected actor-response"),
        }
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let env = sample_actor_message();
        let json = serde_json::to_string(&env).unwrap();
        let decoded: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, env.id);
        assert_eq!(decoded.type_name(), "actor-message");
    }

    #[test]
    fn create_actor_body_round_trips() {
        let body = CreateActorBody {
            id: ActorId::new(),
            definition: "my_crate::behaviours::Worker".to_string(),
            definition_format: DefinitionFormat::ModulePath,
            parent_id: Some(ActorId::new()),
            mode: ActorMode::Forked,
            config: Value::Null,
            resources: Value::Null,
            marshallers: vec!["my_crate::Payload".to_string()],
            custom_parameters: HashMap::new(),
            custom_parameters_marshalled_types: None,
            ping_timeout_ms: Some(5000),
            log_level: Some("info".to_string()),
            test: false,
            debug: false,
            additional_requires: vec![],
            clusters: HashMap::new(),
            name: Some("worker-1".to_string()),
        };
        let env = Envelope::new(body.id, EnvelopeBody::CreateActor(Box::new(body)));
        let json = serde_json::to_string(&env).unwrap();
        let decoded: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.type_name(), "create-actor");
    }
}
