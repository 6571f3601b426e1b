//! Request/response correlation over a single bus (§4.3, §6 "Correlated
//! by `id`"). One `Connection` wraps exactly one `PipeBus` or
//! `SocketBus` and is shared by every proxy/worker talking across it —
//! the proxies never call `MessageBus::subscribe` themselves, since a
//! bus only supports one subscriber.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::warn;

// Layer 3: Internal module imports
use crate::bus::{BusEvent, MessageBus, TransportError};
use crate::message::{Envelope, EnvelopeBody};
use crate::util::MessageId;

/// Demultiplexes inbound envelopes: a reply whose `id` matches an
/// outstanding `call` resolves that call's waiter, everything else is
/// handed to the owner through `requests()` as a "push" — the initial
/// `create-actor`, heartbeat `parent-ping`s, `destroy-actor`, and the
/// `actor-destroyed-ack` that triggers child teardown all arrive this
/// way (§6).
pub struct Connection {
    bus: Arc<dyn MessageBus>,
    pending: DashMap<MessageId, oneshot::Sender<EnvelopeBody>>,
    requests_tx: mpsc::UnboundedSender<Envelope>,
    requests_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    closed: std::sync::atomic::AtomicBool,
    exit_notify: Notify,
}

impl Connection {
    pub fn new(bus: Arc<dyn MessageBus>) -> Arc<Self> {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            bus,
            pending: DashMap::new(),
            requests_tx,
            requests_rx: parking_lot::Mutex::new(Some(requests_rx)),
            closed: std::sync::atomic::AtomicBool::new(false),
            exit_notify: Notify::new(),
        });
        connection.clone().spawn_router();
        connection
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    /// `true` once the underlying bus has reported `exit`. Remote/forked
    /// peers poll this (or await [`Connection::wait_closed`]) to notice a
    /// dead transport outside of a pending `call`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Resolves once the bus has reported `exit`. Resolves immediately if
    /// it already has.
    pub async fn wait_closed(&self) {
        loop {
            let notified = self.exit_notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
            if self.is_closed() {
                return;
            }
        }
    }

    fn spawn_router(self: Arc<Self>) {
        let mut events = self.bus.subscribe();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    BusEvent::Message(envelope, _handle) => {
                        if let Some((_, tx)) = self.pending.remove(&envelope.id) {
                            let _ = tx.send(envelope.body);
                        } else if self.requests_tx.send(envelope).is_err() {
                            break;
                        }
                    }
                    BusEvent::Exit => break,
                }
            }
            // Any calls still waiting will observe their oneshot
            // dropped and surface `TransportError::PeerUnreachable`.
            self.pending.clear();
            self.closed.store(true, std::sync::atomic::Ordering::Release);
            self.exit_notify.notify_waiters();
        });
    }

    /// Takes ownership of the push-envelope stream. Exactly one caller
    /// (the proxy/worker driving this connection) should hold this.
    pub fn requests(&self) -> mpsc::UnboundedReceiver<Envelope> {
        self.requests_rx
            .lock()
            .take()
            .unwrap_or_else(|| {
                let (_tx, rx) = mpsc::unbounded_channel();
                rx
            })
    }

    /// Sends `envelope` and awaits the reply correlated by `envelope.id`.
    pub async fn call(&self, envelope: Envelope) -> Result<EnvelopeBody, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(envelope.id, tx);
        if let Err(err) = self.bus.send(envelope.clone()).await {
            self.pending.remove(&envelope.id);
            return Err(err);
        }
        rx.await
            .map_err(|_| TransportError::PeerUnreachable("connection closed before reply".to_string()))
    }

    /// Sends `envelope` without awaiting a reply (`receive: false` sends,
    /// and one-way control envelopes like `actor-destroyed-ack`).
    pub async fn notify(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.bus.send(envelope).await
    }

    /// Resolves a pending `call` out of band — used when a reply arrives
    /// framed as a push because its `id` was generated by the peer
    /// (unused today, kept for symmetry with `requests`).
    pub fn cancel(&self, id: MessageId) {
        if self.pending.remove(&id).is_none() {
            warn!(?id, "cancel: no pending call for id");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::bus::PipeBus;
    use crate::util::ActorId;

    #[tokio::test]
    async fn call_resolves_on_matching_reply_id() {
        let (a, b) = tokio::io::duplex(4096);
        let (a_read, a_write) = tokio::io::split(a);
        let (b_read, b_write) = tokio::io::split(b);
        #[cfg(unix)]
        let bus_a = PipeBus::new(Box::new(a_write), Box::new(a_read), None);
        #[cfg(not(unix))]
        let bus_a = PipeBus::new(Box::new(a_write), Box::new(a_read));

        #[cfg(unix)]
        let bus_b = PipeBus::new(Box::new(b_write), Box::new(b_read), None);
        #[cfg(not(unix))]
        let bus_b = PipeBus::new(Box::new(b_write), Box::new(b_read));

        let conn_a = Connection::new(bus_a);
        let conn_b = Connection::new(bus_b);
        let mut requests_b = conn_b.requests();

        let actor_id = ActorId::new();
        let request = Envelope::new(actor_id, EnvelopeBody::ActorTree);
        let request_id = request.id;

        let responder = tokio::spawn(async move {
            let incoming = requests_b.recv().await.unwrap();
            assert_eq!(incoming.id, request_id);
            let reply = incoming.respond_ok(serde_json::json!({"id": actor_id}));
            conn_b.notify(reply).await.unwrap();
        });

        let reply_body = conn_a.call(request).await.unwrap();
        match reply_body {
            EnvelopeBody::ActorResponse { response, error } => {
                assert!(error.is_none());
                assert!(response.is_some());
            }
            other => panic!("unexpected reply body: {other:?}"),
        }
        responder.await.unwrap();
    }
}
