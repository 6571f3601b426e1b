//! Behaviour registry (§3 `definition`, §4.4 "definition (module path...)").
//! Forked and remote workers never receive arbitrary source over the
//! wire (§9's design note) — a `create-actor` envelope only ever carries
//! a `definition` string naming a factory the worker process already has
//! registered, typically by the embedding application at startup before
//! it calls [`crate::forked::maybe_run_as_worker`].

// Layer 1: Standard library imports
use std::sync::{Arc, OnceLock};

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::actor::{ActorError, Behaviour};

pub type BehaviourFactory = Arc<dyn Fn() -> Box<dyn Behaviour> + Send + Sync>;

/// Module-path → factory lookup consulted by a forked/remote worker's
/// bootstrap when it decodes the `create-actor` envelope's `definition`
/// field (§4.4).
#[derive(Default)]
pub struct BehaviourRegistry {
    factories: DashMap<String, BehaviourFactory>,
}

impl BehaviourRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module_path` so a worker process can construct this
    /// behaviour from a `create-actor` envelope's `definition` field.
    pub fn register<F>(&self, module_path: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Behaviour> + Send + Sync + 'static,
    {
        self.factories.insert(module_path.into(), Arc::new(factory));
    }

    pub fn create(&self, module_path: &str) -> Result<Box<dyn Behaviour>, ActorError> {
        self.factories
            .get(module_path)
            .map(|factory| factory())
            .ok_or_else(|| ActorError::Config(format!("no behaviour registered for module path {module_path}")))
    }
}

static GLOBAL: OnceLock<Arc<BehaviourRegistry>> = OnceLock::new();

/// The process-wide registry, lazily created on first access. The
/// embedding application populates it via `global().register(...)`
/// before spawning any forked/remote actor (and, for a worker process,
/// before the re-exec that becomes [`crate::forked::maybe_run_as_worker`]
/// hands control to the bootstrap).
pub fn global() -> Arc<BehaviourRegistry> {
    GLOBAL.get_or_init(|| Arc::new(BehaviourRegistry::new())).clone()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::{ActorContext, Dispatch, NullBehaviour};
    use crate::message::Args;
    use async_trait::async_trait;

    struct Marker;
    #[async_trait]
    impl Behaviour for Marker {
        async fn dispatch(&mut self, _topic: &str, args: Args, _ctx: &ActorContext) -> Dispatch {
            Dispatch::NoHandler(args)
        }
    }

    #[test]
    fn registers_and_creates_by_module_path() {
        let registry = BehaviourRegistry::new();
        registry.register("demo::Marker", || Box::new(Marker));
        assert!(registry.create("demo::Marker").is_ok());
    }

    #[test]
    fn unknown_module_path_errors() {
        let registry = BehaviourRegistry::new();
        assert!(registry.create("nope").is_err());
    }

    #[test]
    fn fallback_registers_null_behaviour() {
        let registry = BehaviourRegistry::new();
        registry.register("demo::Null", || Box::new(NullBehaviour));
        assert!(registry.create("demo::Null").is_ok());
    }
}
