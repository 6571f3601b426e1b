//! Worker-side bootstrap. A forked child's `main` is expected to call
//! [`maybe_run_as_worker`] before doing anything else — when the process
//! was started by [`super::parent::ForkedActorParent::spawn`] this never
//! returns, handing control to the envelope-serving loop instead; in the
//! embedding application's own process it is a no-op.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use serde_json::Value;

// Layer 3: Internal module imports
use super::WORKER_MARKER_ENV;
use crate::actor::worker_loop::{build_actor, die, parent_ref, read_create_actor, serve};
use crate::actor::Connection;
use crate::bus::PipeBus;
use crate::marshal::default_registry;

/// Returns `true` (after never returning in practice — the process
/// exits from inside) when this process was spawned as a forked worker;
/// returns `false` immediately otherwise so the embedding application's
/// `main` can fall through to its normal startup.
pub fn maybe_run_as_worker() -> bool {
    if std::env::var(WORKER_MARKER_ENV).is_err() {
        return false;
    }
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("hactor: failed to start worker runtime: {err}");
            std::process::exit(1);
        }
    };
    runtime.block_on(run_worker())
}

/// Reads a single `create-actor` envelope from stdin, constructs the
/// requested actor in-memory, and serves `actor-message`/`actor-tree`/
/// `actor-metrics`/`destroy-actor` envelopes until `actor-destroyed-ack`
/// arrives or the bus reports `exit` (§4.4).
pub async fn run_worker() -> ! {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    #[cfg(unix)]
    let scm = resolve_scm_channel();
    #[cfg(unix)]
    let bus = PipeBus::new(Box::new(stdout), Box::new(stdin), scm);
    #[cfg(not(unix))]
    let bus = PipeBus::new(Box::new(stdout), Box::new(stdin));

    let connection = Connection::new(bus);
    let mut inbox = connection.requests();
    let registry = Arc::new(default_registry());

    let (envelope, body) = match read_create_actor(&mut inbox).await {
        Ok(pair) => pair,
        Err(err) => die("forked worker handshake", err),
    };
    let parent = parent_ref(&body, &connection, &registry);
    let actor = match build_actor(&body, parent).await {
        Ok(actor) => actor,
        Err(err) => die("forked worker actor construction", err),
    };
    if let Err(err) = connection.notify(envelope.respond_ok(Value::Null)).await {
        die("forked worker create-actor ack", err);
    }

    serve(actor, inbox, connection, registry).await;
    std::process::exit(0);
}

#[cfg(unix)]
fn resolve_scm_channel() -> Option<tokio::net::UnixStream> {
    use std::os::fd::FromRawFd;

    let fd: i32 = std::env::var(super::WORKER_SCM_FD_ENV).ok()?.parse().ok()?;
    // SAFETY: the parent dup'd this fd across exec specifically for us
    // and owns no other reference to it.
    let std_stream = unsafe { std::os::unix::net::UnixStream::from_raw_fd(fd) };
    std_stream.set_nonblocking(true).ok()?;
    tokio::net::UnixStream::from_std(std_stream).ok()
}
