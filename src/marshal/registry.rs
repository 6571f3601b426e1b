//! Reference marshallers (§4.6): the type-name-keyed registry consulted
//! on every outbound `send`/`sendAndReceive` argument, plus the two
//! system-supplied actor-reference marshallers.

// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::MarshalError;
use crate::actor::ActorRef;
use crate::message::{Args, WireArgs};
use crate::util::ActorMode;

/// `{type, marshall(x), unmarshall(v), destroy?()}` (§4.6).
pub trait Marshaller: Send + Sync {
    fn type_names(&self) -> &[&str];
    fn marshall(&self, value: &dyn Any) -> Result<Value, MarshalError>;
    fn unmarshall(&self, value: Value) -> Result<Box<dyn Any + Send>, MarshalError>;
}

/// Keyed by type name; also holds the ordered list of custom
/// marshallers tried against an unclassified argument (§4.6 "the
/// registry is consulted by the argument's type name").
#[derive(Default)]
pub struct MarshallerRegistry {
    by_name: DashMap<String, Arc<dyn Marshaller>>,
}

impl MarshallerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, marshaller: Arc<dyn Marshaller>) {
        for name in marshaller.type_names() {
            self.by_name.insert((*name).to_string(), marshaller.clone());
        }
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Marshaller>> {
        self.by_name.get(name).map(|entry| entry.clone())
    }

    /// Marshal every argument in `args` into the envelope's wire form,
    /// tagging each with the `marshalledType` the receiver needs to
    /// reverse it (§4.6). `ActorRef` arguments always use the reference
    /// marshaller appropriate to `peer_mode`; everything else goes
    /// through the registry, falling back to a value already shaped as
    /// `serde_json::Value` (the in-memory boundary never needs this —
    /// only forked/remote sends call this at all).
    pub fn marshall_args(
        &self,
        args: &Args,
        peer_mode: ActorMode,
    ) -> Result<(WireArgs, Vec<Option<String>>), MarshalError> {
        let mut values = Vec::new();
        let mut kinds = Vec::new();
        for i in 0..args.len() {
            let arg = args
                .get(i)
                .ok_or_else(|| MarshalError::Encode(format!("missing argument at index {i}")))?;
            if let Some(actor_ref) = arg.downcast_ref::<ActorRef>() {
                let marshaller_name = match peer_mode {
                    ActorMode::Remote => "hactor.InterHostReference",
                    _ => "hactor.InterProcessReference",
                };
                let marshaller = self
                    .by_name(marshaller_name)
                    .ok_or_else(|| MarshalError::NoMarshallerFor(marshaller_name.to_string()))?;
                values.push(marshaller.marshall(actor_ref)?);
                kinds.push(Some(marshaller_name.to_string()));
                continue;
            }
            if let Some(value) = arg.downcast_ref::<Value>() {
                values.push(value.clone());
                kinds.push(None);
                continue;
            }
            return Err(MarshalError::NoMarshallerFor(
                "argument is neither an ActorRef nor a pre-marshalled JSON value".to_string(),
            ));
        }
        Ok((WireArgs::new(values), kinds))
    }

    /// Inverse of `marshall_args`: reconstructs `Args` from a decoded
    /// envelope's `message`/`marshalledType` fields.
    pub fn unmarshall_args(
        &self,
        wire: WireArgs,
        marshalled_types: &[Option<String>],
    ) -> Result<Args, MarshalError> {
        let mut args = Args::new();
        for (i, value) in wire.0.into_iter().enumerate() {
            match marshalled_types.get(i).cloned().flatten() {
                Some(name) => {
                    let marshaller = self
                        .by_name(&name)
                        .ok_or_else(|| MarshalError::NoMarshallerFor(name.clone()))?;
                    let decoded = marshaller.unmarshall(value)?;
                    args.push_boxed(decoded);
                }
                None => args.push(value),
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn registry_roundtrips_a_custom_marshaller() {
        struct EchoMarshaller;
        impl Marshaller for EchoMarshaller {
            fn type_names(&self) -> &[&str] {
                &["example.Echo"]
            }
            fn marshall(&self, value: &dyn Any) -> Result<Value, MarshalError> {
                let s = value
                    .downcast_ref::<String>()
                    .ok_or_else(|| MarshalError::Encode("expected String".to_string()))?;
                Ok(Value::from(s.clone()))
            }
            fn unmarshall(&self, value: Value) -> Result<Box<dyn Any + Send>, MarshalError> {
                let s = value
                    .as_str()
                    .ok_or_else(|| MarshalError::Decode("expected string".to_string()))?;
                Ok(Box::new(s.to_string()))
            }
        }

        let registry = MarshallerRegistry::new();
        registry.register(Arc::new(EchoMarshaller));
        let marshaller = registry.by_name("example.Echo").unwrap();
        let value = marshaller.marshall(&"hello".to_string()).unwrap();
        assert_eq!(value, Value::from("hello"));
        let decoded = marshaller.unmarshall(value).unwrap();
        assert_eq!(decoded.downcast_ref::<String>().unwrap(), "hello");
    }

    #[test]
    fn marshall_args_passes_through_pre_marshalled_json() {
        let registry = MarshallerRegistry::new();
        let mut args = Args::new();
        args.push(Value::from(3));
        let (wire, kinds) = registry.marshall_args(&args, ActorMode::Forked).unwrap();
        assert_eq!(wire.0, vec![Value::from(3)]);
        assert_eq!(kinds, vec![None]);
    }
}
