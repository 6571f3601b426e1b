//! `hactor.InterProcessReference`: the system marshaller that lets an
//! `ActorRef` travel as an argument across a forked child's pipe bus
//! (§4.6). Produces/consumes an [`ActorRefToken`] rather than a live
//! `ActorRef` — reconstructing a usable reference additionally needs the
//! connection the token arrived on, which the stateless `Marshaller`
//! contract doesn't carry. The forked/remote receive loop resolves the
//! token into a live `ActorProxy` once it has that context (see
//! `forked::resolve_actor_ref_tokens`).

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::MarshalError;
use super::registry::Marshaller;
use crate::actor::{ActorRef, ActorRefToken, RefLocator};

pub struct InterProcessRef;

impl Marshaller for InterProcessRef {
    fn type_names(&self) -> &[&str] {
        &[super::INTER_PROCESS_TYPE_NAME]
    }

    fn marshall(&self, value: &dyn Any) -> Result<Value, MarshalError> {
        let actor_ref = value
            .downcast_ref::<ActorRef>()
            .ok_or_else(|| MarshalError::Encode("expected an ActorRef".to_string()))?;
        let token = ActorRefToken {
            id: actor_ref.id(),
            name: actor_ref.name().to_string(),
            mode: actor_ref.mode(),
            locator: RefLocator::Pipe,
        };
        serde_json::to_value(token).map_err(|e| MarshalError::Encode(e.to_string()))
    }

    fn unmarshall(&self, value: Value) -> Result<Box<dyn Any + Send>, MarshalError> {
        let token: ActorRefToken = serde_json::from_value(value).map_err(|e| MarshalError::Decode(e.to_string()))?;
        Ok(Box::new(token))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::test_support::noop_ref;

    #[test]
    fn marshalls_an_actor_ref_into_a_pipe_token() {
        let marshaller = InterProcessRef;
        let actor_ref = noop_ref("child");
        let value = marshaller.marshall(&actor_ref).unwrap();
        let decoded = marshaller.unmarshall(value).unwrap();
        let token = decoded.downcast_ref::<ActorRefToken>().unwrap();
        assert_eq!(token.id, actor_ref.id());
        assert!(matches!(token.locator, RefLocator::Pipe));
    }
}
