//! Small identifier and locator types shared across the crate.

mod ids;

pub use ids::{ActorId, CorrelationId, MessageId, SequenceCounter};

use serde::{Deserialize, Serialize};

/// Execution locus of an actor relative to the process that created it.
///
/// This is the `mode` attribute of §3's Actor data model; it is also
/// carried in the `create-actor` envelope body (§6) so a worker process
/// knows which proxy shape to bootstrap itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorMode {
    InMemory,
    Forked,
    Remote,
}

impl ActorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorMode::InMemory => "in-memory",
            ActorMode::Forked => "forked",
            ActorMode::Remote => "remote",
        }
    }
}

impl std::fmt::Display for ActorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
