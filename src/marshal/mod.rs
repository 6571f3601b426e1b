//! Reference marshallers: the custom-payload registry that lets a
//! handler exchange non-JSON-native types across a process or host
//! boundary, plus the two system marshallers that make `ActorRef`
//! itself marshallable (§4.6).

mod error;
mod inter_host;
mod inter_process;
mod registry;

pub use error::MarshalError;
pub use inter_host::InterHostRef;
pub use inter_process::InterProcessRef;
pub use registry::{Marshaller, MarshallerRegistry};

/// The registry key both system marshallers are registered under,
/// matching the envelope `marshalledType` tag forked/remote sends use
/// for `ActorRef` arguments (§4.6).
pub const INTER_PROCESS_TYPE_NAME: &str = "hactor.InterProcessReference";
pub const INTER_HOST_TYPE_NAME: &str = "hactor.InterHostReference";

/// Builds a registry pre-populated with the two system reference
/// marshallers; every `ActorSystem` starts from this rather than an
/// empty registry so `ActorRef` arguments always marshal regardless of
/// whether the caller registered anything custom.
pub fn default_registry() -> MarshallerRegistry {
    let registry = MarshallerRegistry::new();
    registry.register(std::sync::Arc::new(InterProcessRef));
    registry.register(std::sync::Arc::new(InterHostRef::new()));
    registry
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_both_system_marshallers() {
        let registry = default_registry();
        assert!(registry.by_name(INTER_PROCESS_TYPE_NAME).is_some());
        assert!(registry.by_name(INTER_HOST_TYPE_NAME).is_some());
    }
}
