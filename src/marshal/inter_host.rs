//! `hactor.InterHostReference`: the system marshaller for `ActorRef`
//! arguments crossing a remote (TCP) boundary (§4.6). Like
//! [`super::inter_process::InterProcessRef`] this produces/consumes an
//! [`ActorRefToken`]; resolving the token back into a live `ActorProxy`
//! happens in `remote`'s receive loop, which has the connection cache
//! this stateless marshaller does not.

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::MarshalError;
use super::registry::Marshaller;
use crate::actor::{ActorRef, ActorRefToken, RefLocator};

/// Encodes an `ActorRef` as reachable at this process's own listening
/// address. A freshly built registry carries an unbound `InterHostRef`
/// that refuses to encode until `bind` is called with the address the
/// system's `ListeningServer` actually came up on (§4.9) — decoding
/// never needs the local address, only the token's own fields.
pub struct InterHostRef {
    address: parking_lot::RwLock<Option<(String, u16)>>,
}

impl Default for InterHostRef {
    fn default() -> Self {
        Self {
            address: parking_lot::RwLock::new(None),
        }
    }
}

impl InterHostRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound(host: impl Into<String>, port: u16) -> Self {
        Self {
            address: parking_lot::RwLock::new(Some((host.into(), port))),
        }
    }

    pub fn bind(&self, host: impl Into<String>, port: u16) {
        *self.address.write() = Some((host.into(), port));
    }
}

impl Marshaller for InterHostRef {
    fn type_names(&self) -> &[&str] {
        &[super::INTER_HOST_TYPE_NAME]
    }

    fn marshall(&self, value: &dyn Any) -> Result<Value, MarshalError> {
        let actor_ref = value
            .downcast_ref::<ActorRef>()
            .ok_or_else(|| MarshalError::Encode("expected an ActorRef".to_string()))?;
        let (host, port) = self.address.read().clone().ok_or_else(|| {
            MarshalError::Encode(
                "this system has no listening address configured; cannot marshal an ActorRef across a host boundary".to_string(),
            )
        })?;
        let token = ActorRefToken {
            id: actor_ref.id(),
            name: actor_ref.name().to_string(),
            mode: actor_ref.mode(),
            locator: RefLocator::Socket { host, port },
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
    fn unbound_marshaller_refuses_to_encode() {
        let marshaller = InterHostRef::new();
        let actor_ref = noop_ref("child");
        assert!(marshaller.marshall(&actor_ref).is_err());
    }

    #[test]
    fn bound_marshaller_encodes_host_and_port() {
        let marshaller = InterHostRef::bound("10.0.0.1", 6161);
        let actor_ref = noop_ref("child");
        let value = marshaller.marshall(&actor_ref).unwrap();
        let decoded = marshaller.unmarshall(value).unwrap();
        let token = decoded.downcast_ref::<ActorRefToken>().unwrap();
        match &token.locator {
            RefLocator::Socket { host, port } => {
                assert_eq!(host, "10.0.0.1");
                assert_eq!(*port, 6161);
            }
            other => panic!("expected a socket locator, got {other:?}"),
        }
    }

    #[test]
    fn bind_rebinds_an_existing_instance() {
        let marshaller = InterHostRef::new();
        marshaller.bind("example.test", 7000);
        let actor_ref = noop_ref("child");
        assert!(marshaller.marshall(&actor_ref).is_ok());
    }
}
