//! Parent↔forked-child IPC bus. Envelopes are length-delimited JSON
//! frames over the worker's own stdin/stdout; handle transfer (§6) rides
//! a side-channel Unix domain socket established by `forked::spawn`
//! specifically because `SCM_RIGHTS` needs a real socket, not a pipe.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::warn;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::handle::{HandleKind, TransferableHandle};
use super::{BusEvent, MessageBus};
use crate::message::Envelope;

fn encode(envelope: &Envelope) -> Result<Bytes, TransportError> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(|e| TransportError::Framing(e.to_string()))
}

fn decode(bytes: BytesMut) -> Result<Envelope, TransportError> {
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Framing(e.to_string()))
}

/// Handle-transfer side channel. `None` when the worker process was
/// spawned without one (e.g. it will never host a listening server).
#[cfg(unix)]
type ScmChannel = Arc<tokio::net::UnixStream>;

pub struct PipeBus {
    writer: Mutex<FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LengthDelimitedCodec>>,
    #[cfg(unix)]
    scm: Option<ScmChannel>,
    events_tx: UnboundedSender<BusEvent>,
    events_rx: Mutex<Option<UnboundedReceiver<BusEvent>>>,
}

impl PipeBus {
    /// Spawns the background task reading inbound envelopes and wires up
    /// the write half. `scm` is the peer end of the handle-transfer Unix
    /// socket, present only when the worker might carry a listening
    /// handle across.
    pub fn new(
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        reader: Box<dyn AsyncRead + Send + Unpin>,
        #[cfg(unix)] scm: Option<tokio::net::UnixStream>,
    ) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let framed_writer = FramedWrite::new(writer, LengthDelimitedCodec::new());
        let bus = Arc::new(Self {
            writer: Mutex::new(framed_writer),
            #[cfg(unix)]
            scm: scm.map(Arc::new),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        });
        bus.clone().spawn_reader(reader);
        bus
    }

    fn spawn_reader(self: Arc<Self>, reader: Box<dyn AsyncRead + Send + Unpin>) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let mut framed = FramedRead::new(reader, LengthDelimitedCodec::new());
            while let Some(frame) = framed.next().await {
                match frame {
                    Ok(bytes) => match decode(bytes) {
                        Ok(envelope) => {
                            if tx.send(BusEvent::Message(envelope, None)).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "dropping malformed envelope frame"),
                    },
                    Err(err) => {
                        warn!(error = %err, "pipe bus read error, treating as exit");
                        break;
                    }
                }
            }
            let _ = tx.send(BusEvent::Exit);
        });
    }
}

#[async_trait::async_trait]
impl MessageBus for PipeBus {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let bytes = encode(&envelope)?;
        self.writer
            .lock()
            .send(bytes)
            .await
            .map_err(|e| TransportError::PeerUnreachable(e.to_string()))
    }

    #[cfg(unix)]
    async fn send_with_handle(
        &self,
        envelope: Envelope,
        handle: TransferableHandle,
    ) -> Result<(), TransportError> {
        use std::os::fd::AsRawFd;

        let scm = self
            .scm
            .clone()
            .ok_or(TransportError::HandleTransferUnsupported)?;
        super::handle::scm::send_fd(&scm, handle.listener.as_raw_fd())
            .await
            .map_err(TransportError::from)?;
        // The fd has been duplicated to the peer; drop our copy so
        // ownership matches §5's "owned by the receiver after transfer".
        drop(handle.listener);
        let mut rewritten = envelope;
        if let crate::message::EnvelopeBody::ActorMessage(ref mut body) = rewritten.body {
            body.message = crate::message::WireArgs::single(serde_json::json!({
                "handleType": handle_kind_label(handle.kind),
            }));
        }
        self.send(rewritten).await
    }

    #[cfg(not(unix))]
    async fn send_with_handle(
        &self,
        _envelope: Envelope,
        _handle: TransferableHandle,
    ) -> Result<(), TransportError> {
        Err(TransportError::HandleTransferUnsupported)
    }

    fn subscribe(&self) -> UnboundedReceiver<BusEvent> {
        self.events_rx.lock().take().unwrap_or_else(|| {
            let (_tx, rx) = mpsc::unbounded_channel();
            rx
        })
    }

    fn supports_handle_transfer(&self) -> bool {
        cfg!(unix)
    }
}

fn handle_kind_label(kind: HandleKind) -> &'static str {
    kind.as_wire_str()
}
