//! Remote actor: the same envelope protocol as `forked`, carried over TCP
//! instead of a worker's own stdio, with a periodic heartbeat and
//! respawn-on-crash. The child-side dispatcher mirrors `forked`'s worker
//! loop almost exactly, but over a [`crate::bus::SocketBus`].

mod heartbeat;
mod listening;
mod parent;
mod worker;

pub use listening::ListeningServer;
pub use parent::RemoteActorParent;
pub use worker::{maybe_run_as_remote_worker, run_remote_worker};

/// Default remote listen port (§0.2 `SystemConfig`, §4.9).
pub const DEFAULT_LISTEN_PORT: u16 = 6161;

/// Default interface a spawned remote worker binds its own persistent
/// listener to, unless the listening server was configured with a more
/// specific advertised host.
pub(crate) const DEFAULT_WORKER_BIND_HOST: &str = "0.0.0.0";

/// Environment variable set on a worker process spawned by
/// [`ListeningServer`] so it knows to run [`maybe_run_as_remote_worker`]'s
/// bootstrap instead of the embedding application's own `main`.
pub(crate) const REMOTE_WORKER_MARKER_ENV: &str = "HACTOR_REMOTE_WORKER";

/// Interface the worker's own persistent TCP listener should bind to.
pub(crate) const REMOTE_WORKER_HOST_ENV: &str = "HACTOR_REMOTE_WORKER_HOST";
