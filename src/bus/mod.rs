//! Message bus abstraction (§4.3): a uniform duplex channel between a
//! parent proxy and a forked/remote child, with two transports — the
//! pipe bus (parent↔forked-child IPC) and the socket bus (remote, framed
//! TCP). Both speak nothing but [`crate::message::Envelope`].

mod error;
mod handle;
mod pipe;
mod socket;

pub use error::TransportError;
pub use handle::{HandleKind, TransferableHandle};
pub use pipe::PipeBus;
pub use socket::SocketBus;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::message::Envelope;

/// Delivered to a bus's subscriber for every inbound envelope, and
/// exactly once when the peer endpoint becomes unreachable (§4.3).
pub enum BusEvent {
    Message(Envelope, Option<TransferableHandle>),
    Exit,
}

/// The bus contract shared by the pipe and socket implementations
/// (§4.3). `send`/`send_with_handle` are at-most-once deliveries whose
/// `Ok` return means only that the transport accepted the envelope, not
/// that the peer processed it.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Additionally transfers an OS-level listening socket alongside the
    /// envelope (§6 socket-handle sub-protocol). Only the pipe bus
    /// supports this; the socket bus returns
    /// `TransportError::HandleTransferUnsupported`.
    async fn send_with_handle(
        &self,
        envelope: Envelope,
        handle: TransferableHandle,
    ) -> Result<(), TransportError>;

    /// Takes the bus's single event receiver. Each bus endpoint has
    /// exactly one subscriber for its lifetime; calling this a second
    /// time is a caller bug.
    fn subscribe(&self) -> UnboundedReceiver<BusEvent>;

    fn supports_handle_transfer(&self) -> bool {
        false
    }
}
