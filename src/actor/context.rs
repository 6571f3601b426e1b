// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde_json::Value;

// Layer 3: Internal module imports
use crate::util::{ActorId, ActorMode};

/// Read-only metadata handed to every `Behaviour` hook: identity, mode,
/// and the `customParameters` map passed at `createActor` time (§3).
/// Kept deliberately thin — the context is a view, not a handle; actors
/// reach their parent/children through `ActorRef`s held by the
/// application, not through the context.
pub struct ActorContext {
    id: ActorId,
    name: String,
    mode: ActorMode,
    created_at: DateTime<Utc>,
    custom_parameters: HashMap<String, Value>,
}

impl ActorContext {
    pub fn new(id: ActorId, name: String, mode: ActorMode) -> Self {
        Self {
            id,
            name,
            mode,
            created_at: Utc::now(),
            custom_parameters: HashMap::new(),
        }
    }

    pub fn with_custom_parameters(mut self, params: HashMap<String, Value>) -> Self {
        self.custom_parameters = params;
        self
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ActorMode {
        self.mode
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn custom_parameter(&self, key: &str) -> Option<&Value> {
        self.custom_parameters.get(key)
    }

    pub fn custom_parameters(&self) -> &HashMap<String, Value> {
        &self.custom_parameters
    }
}
