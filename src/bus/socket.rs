//! Remote bus: length-prefixed binary framing over a persistent TCP
//! socket (§4.3). Never supports handle transfer — the socket-handle
//! sub-protocol is pipe-bus-only (§6).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::warn;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::handle::TransferableHandle;
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

pub struct SocketBus {
    writer: Mutex<FramedWrite<tokio::net::tcp::OwnedWriteHalf, LengthDelimitedCodec>>,
    events_tx: UnboundedSender<BusEvent>,
    events_rx: Mutex<Option<UnboundedReceiver<BusEvent>>>,
}

impl SocketBus {
    pub fn new(stream: TcpStream) -> std::sync::Arc<Self> {
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let bus = std::sync::Arc::new(Self {
            writer: Mutex::new(FramedWrite::new(write_half, LengthDelimitedCodec::new())),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        });
        bus.clone().spawn_reader(read_half);
        bus
    }

    fn spawn_reader(self: std::sync::Arc<Self>, read_half: tokio::net::tcp::OwnedReadHalf) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let mut framed = FramedRead::new(read_half, LengthDelimitedCodec::new());
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
                        warn!(error = %err, "socket bus read error, treating as exit");
                        break;
                    }
                }
            }
            let _ = tx.send(BusEvent::Exit);
        });
    }
}

#[async_trait::async_trait]
impl MessageBus for SocketBus {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let bytes = encode(&envelope)?;
        self.writer
            .lock()
            .send(bytes)
            .await
            .map_err(|e| TransportError::PeerUnreachable(e.to_string()))
    }

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
}
