//! Remote worker bootstrap. A remote child's `main` is expected to call
//! [`maybe_run_as_remote_worker`] before anything else, mirroring
//! [`crate::forked::maybe_run_as_worker`] — the only difference is that
//! after the `create-actor` handshake this worker reports back the
//! address of its *own* TCP listener and waits for the real parent to
//! connect there directly, instead of simply continuing to speak over
//! its spawner's stdio pipe (§4.5).

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

// Layer 3: Internal module imports
use super::{DEFAULT_WORKER_BIND_HOST, REMOTE_WORKER_HOST_ENV, REMOTE_WORKER_MARKER_ENV};
use crate::actor::worker_loop::{build_actor, die, parent_ref, read_create_actor, serve};
use crate::actor::Connection;
use crate::bus::{PipeBus, SocketBus};
use crate::marshal::default_registry;

/// Returns `true` (after never returning in practice) when this process
/// was spawned by [`super::listening::ListeningServer`]; returns `false`
/// immediately otherwise.
pub fn maybe_run_as_remote_worker() -> bool {
    if std::env::var(REMOTE_WORKER_MARKER_ENV).is_err() {
        return false;
    }
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("hactor: failed to start remote worker runtime: {err}");
            std::process::exit(1);
        }
    };
    runtime.block_on(run_remote_worker())
}

/// Reads one `create-actor` envelope off stdin, binds an ephemeral TCP
/// listener, reports `{host, port}` back over stdout, then accepts
/// exactly one connection on that listener and serves the actor over it
/// until `actor-destroyed-ack` or the socket closes.
pub async fn run_remote_worker() -> ! {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    #[cfg(unix)]
    let handshake_bus = PipeBus::new(Box::new(stdout), Box::new(stdin), None);
    #[cfg(not(unix))]
    let handshake_bus = PipeBus::new(Box::new(stdout), Box::new(stdin));

    let handshake = Connection::new(handshake_bus);
    let mut handshake_inbox = handshake.requests();

    let (envelope, body) = match read_create_actor(&mut handshake_inbox).await {
        Ok(pair) => pair,
        Err(err) => die("remote worker handshake", err),
    };

    let bind_host = std::env::var(REMOTE_WORKER_HOST_ENV).unwrap_or_else(|_| DEFAULT_WORKER_BIND_HOST.to_string());
    let listener = match TcpListener::bind((bind_host.as_str(), 0)).await {
        Ok(listener) => listener,
        Err(err) => die("remote worker listener bind", err),
    };
    let local_port = match listener.local_addr() {
        Ok(addr) => addr.port(),
        Err(err) => die("remote worker local_addr", err),
    };

    if let Err(err) = handshake
        .notify(envelope.respond_ok(json!({"port": local_port})))
        .await
    {
        die("remote worker handshake ack", err);
    }
    info!(port = local_port, "remote worker listening for its parent");

    let (stream, peer) = match listener.accept().await {
        Ok(pair) => pair,
        Err(err) => die("remote worker accept", err),
    };
    info!(%peer, "remote worker accepted parent connection");

    let connection = Connection::new(SocketBus::new(stream));
    let inbox = connection.requests();
    let registry = Arc::new(default_registry());

    let parent = parent_ref(&body, &connection, &registry);
    let actor = match build_actor(&body, parent).await {
        Ok(actor) => actor,
        Err(err) => die("remote worker actor construction", err),
    };

    serve(actor, inbox, connection, registry).await;
    std::process::exit(0);
}
