//! Listening server: binds a TCP port, accepts a short-lived
//! `create-actor` control connection per remote spawn, forks a worker
//! process to host the actor, relays the worker's single handshake reply
//! back to the caller, and detaches — the worker keeps running, serving
//! the actor directly over its own listener from then on.

// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::net::{TcpListener, TcpStream};
use tokio::process::Command;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::{REMOTE_WORKER_HOST_ENV, REMOTE_WORKER_MARKER_ENV};
use crate::actor::Connection;
use crate::bus::{PipeBus, SocketBus};
use crate::message::{Envelope, EnvelopeBody};

/// A bound remote-spawn endpoint (§4.9). Dropping it stops accepting new
/// connections; workers it already detached keep running independently.
pub struct ListeningServer {
    local_addr: SocketAddr,
    accept_task: tokio::task::JoinHandle<()>,
}

impl ListeningServer {
    /// Binds `host:port` and starts accepting `create-actor` requests in
    /// the background.
    pub async fn bind(host: &str, port: u16) -> std::io::Result<Arc<Self>> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "remote listening server bound");
        let accept_task = tokio::spawn(accept_loop(listener));
        Ok(Arc::new(Self { local_addr, accept_task }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections. Workers already handed off are
    /// unaffected.
    pub fn shutdown(&self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream).await {
                        warn!(%peer, error = %err, "remote spawn request failed");
                    }
                });
            }
            Err(err) => {
                warn!(error = %err, "listening server accept failed");
                break;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream) -> Result<(), String> {
    let local_host = stream
        .local_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let control = Connection::new(SocketBus::new(stream));
    let mut control_inbox = control.requests();

    let envelope = control_inbox
        .recv()
        .await
        .ok_or_else(|| "control connection closed before create-actor arrived".to_string())?;
    if !matches!(envelope.body, EnvelopeBody::CreateActor(_)) {
        let reply = envelope.respond_err(format!("expected create-actor, got {}", envelope.type_name()));
        let _ = control.notify(reply).await;
        return Err("non create-actor on control connection".to_string());
    }

    match spawn_worker_and_relay(&envelope, &local_host).await {
        Ok(port) => {
            control
                .notify(envelope.respond_ok(serde_json::json!({"port": port})))
                .await
                .map_err(|e| e.to_string())?;
            Ok(())
        }
        Err(err) => {
            let _ = control.notify(envelope.respond_err(err.clone())).await;
            Err(err)
        }
    }
}

/// Forks a worker process, forwards the `create-actor` envelope to it
/// over its stdio pipe, and returns the port it reports binding its own
/// persistent listener on. The worker process is then left to run
/// independently — only a reaper task watching `wait()` is kept.
async fn spawn_worker_and_relay(envelope: &Envelope, bind_host: &str) -> Result<u16, String> {
    let exe = std::env::current_exe().map_err(|e| e.to_string())?;

    let mut command = Command::new(&exe);
    command
        .env(REMOTE_WORKER_MARKER_ENV, "1")
        .env(REMOTE_WORKER_HOST_ENV, bind_host)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(false);

    let mut child = command.spawn().map_err(|e| format!("failed to spawn remote worker: {e}"))?;
    let pid = child.id();
    info!(pid, "remote worker process spawned");

    let stdin = child.stdin.take().ok_or_else(|| "remote worker has no stdin".to_string())?;
    let stdout = child.stdout.take().ok_or_else(|| "remote worker has no stdout".to_string())?;

    #[cfg(unix)]
    let bus = PipeBus::new(Box::new(stdin), Box::new(stdout), None);
    #[cfg(not(unix))]
    let bus = PipeBus::new(Box::new(stdin), Box::new(stdout));

    let worker_connection = Connection::new(bus);
    let reply = worker_connection
        .call(envelope.clone())
        .await
        .map_err(|e| format!("create-actor handshake with worker failed: {e}"))?;

    let port = match reply {
        EnvelopeBody::ActorResponse { error: Some(error), .. } => return Err(error),
        EnvelopeBody::ActorResponse { response: Some(value), .. } => value
            .get("port")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| "worker ack missing port".to_string())? as u16,
        other => return Err(format!("unexpected worker ack: {}", other.type_name())),
    };

    // Detach: the worker keeps serving the actor over its own listener.
    // Reap the process in the background so it doesn't become a zombie.
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => warn!(%status, pid, "remote worker exited non-zero"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, pid, "failed to wait on remote worker"),
        }
    });

    Ok(port)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let server = ListeningServer::bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        server.shutdown();
    }
}
