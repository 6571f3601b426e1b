//! Forked actor: a parent-owned child OS process talking the envelope
//! protocol over its own stdin/stdout, with an auxiliary Unix domain
//! socket for handle transfer. The child is owned and awaited rather than
//! left to run loose — its exit is observed by a watcher task, not
//! leaked.

mod parent;
mod worker;

pub use parent::ForkedActorParent;
pub use worker::{maybe_run_as_worker, run_worker};

/// Environment variable set on a spawned worker process so it knows to
/// run [`maybe_run_as_worker`]'s bootstrap instead of the embedding
/// application's own `main`.
pub(crate) const WORKER_MARKER_ENV: &str = "HACTOR_WORKER";

/// Environment variable carrying the raw fd number of the worker's end
/// of the handle-transfer side channel, when one was set up (unix only).
#[cfg(unix)]
pub(crate) const WORKER_SCM_FD_ENV: &str = "HACTOR_WORKER_SCM_FD";
