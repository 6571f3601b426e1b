//! Periodic `parent-ping`/`parent-pong` liveness check for remote peers.
//! Forked peers never get one — a dead same-host process is observed
//! directly through `wait()` on the child — but a remote peer's death is
//! only visible as a dropped socket or a missed pong, so the parent pings
//! it on an interval and counts misses.
//!
//! The heartbeat only runs when `on_crash: Respawn` is configured — a
//! parent that merely wants to observe `crashed` relies on the socket's
//! own exit event instead of spending a timer on every remote child it
//! owns.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::interval;
use tracing::warn;

// Layer 3: Internal module imports
use crate::actor::Connection;
use crate::message::{Envelope, EnvelopeBody};
use crate::util::ActorId;

/// Two missed pongs in a row mark the peer crashed (§4.5).
const MAX_MISSED_PONGS: u32 = 2;

/// Spawns the ping loop, taking ownership of `connection`'s pushed-
/// envelope stream — a `RemoteActorParent` never calls `requests()`
/// itself, so this is the sole consumer watching for `parent-pong`.
/// `on_crashed` fires (at most once) the moment the miss count reaches
/// [`MAX_MISSED_PONGS`] or the bus reports `exit`; the caller uses it to
/// mark its proxy crashed and, if configured, kick off a respawn.
pub(crate) fn spawn(
    actor_id: ActorId,
    connection: Arc<Connection>,
    mut inbox: UnboundedReceiver<Envelope>,
    period: Duration,
    on_crashed: impl Fn() + Send + Sync + 'static,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.tick().await; // first tick fires immediately; skip it
        let mut awaiting_pong = false;
        let mut missed = 0u32;

        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    if awaiting_pong {
                        missed += 1;
                        warn_if_missed(actor_id, missed);
                        if missed >= MAX_MISSED_PONGS {
                            on_crashed();
                            return;
                        }
                    }
                    let ping = Envelope::new(actor_id, EnvelopeBody::ParentPing);
                    if connection.notify(ping).await.is_err() {
                        on_crashed();
                        return;
                    }
                    awaiting_pong = true;
                }
                envelope = inbox.recv() => {
                    match envelope {
                        Some(Envelope { body: EnvelopeBody::ParentPong, .. }) => {
                            missed = 0;
                            awaiting_pong = false;
                        }
                        Some(_other) => {}
                        None => {
                            on_crashed();
                            return;
                        }
                    }
                }
            }
        }
    })
}

fn warn_if_missed(actor_id: ActorId, missed: u32) {
    if missed > 0 {
        warn!(%actor_id, missed, "remote peer missed a heartbeat pong");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bus::SocketBus;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    #[tokio::test]
    async fn fires_on_crashed_once_connection_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            stream
        });
        let client = TcpStream::connect(addr).await.unwrap();
        let server = accept.await.unwrap();
        let connection = Connection::new(SocketBus::new(client));
        let inbox = connection.requests();

        let crashed = Arc::new(AtomicBool::new(false));
        let crashed_clone = crashed.clone();
        let handle = spawn(
            ActorId::new(),
            connection,
            inbox,
            Duration::from_millis(20),
            move || {
                crashed_clone.store(true, Ordering::SeqCst);
            },
        );

        drop(server);
        let _ = timeout(Duration::from_secs(2), handle).await;
        assert!(crashed.load(Ordering::SeqCst));
    }
}
