//! OS-level listening-socket handle transfer (§6 socket-handle
//! sub-protocol). Only the pipe bus can carry these — a `net.Server` (or
//! `http.Server`) listening handle travels over the bus's native
//! handle-transfer facility rather than through the marshaller registry
//! (§4.6).

// Layer 1: Standard library imports
use std::net::TcpListener;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

/// `{handleType: 'net.Server' | 'http.Server'}` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandleKind {
    NetServer,
    HttpServer,
}

impl HandleKind {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            HandleKind::NetServer => "net.Server",
            HandleKind::HttpServer => "http.Server",
        }
    }
}

/// A listening socket travelling alongside an envelope. Ownership
/// transfers to the receiver — per §5's shared-resource rule, the sender
/// must not keep using the socket after the bus accepts it for transfer.
pub struct TransferableHandle {
    pub kind: HandleKind,
    pub listener: TcpListener,
}

impl TransferableHandle {
    pub fn new(kind: HandleKind, listener: TcpListener) -> Self {
        Self { kind, listener }
    }
}

/// Unix `SCM_RIGHTS` fd passing backing the pipe bus's native
/// handle-transfer facility. Kept as free functions (rather than on
/// `PipeBus` directly) so both the parent and worker-side listener of
/// the auxiliary `UnixStream` share the same wire format: one control
/// message carrying exactly one fd, with a one-byte regular payload
/// (some platforms drop ancillary data on a zero-length payload).
#[cfg(unix)]
pub mod scm {
    use std::io::{self, IoSlice, IoSliceMut};
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

    use nix::sys::socket::{
        recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags,
    };
    use tokio::net::UnixStream;

    pub async fn send_fd(stream: &UnixStream, fd: RawFd) -> io::Result<()> {
        stream.writable().await?;
        let std_stream = stream.as_raw_fd();
        let payload = [0u8; 1];
        let iov = [IoSlice::new(&payload)];
        let cmsg = [ControlMessage::ScmRights(&[fd])];
        loop {
            match sendmsg::<()>(std_stream, &iov, &cmsg, MsgFlags::empty(), None) {
                Ok(_) => return Ok(()),
                Err(nix::errno::Errno::EAGAIN) => {
                    stream.writable().await?;
                    continue;
                }
                Err(err) => return Err(io::Error::from_raw_os_error(err as i32)),
            }
        }
    }

    pub async fn recv_fd(stream: &UnixStream) -> io::Result<OwnedFd> {
        stream.readable().await?;
        let std_stream = stream.as_raw_fd();
        let mut payload = [0u8; 1];
        let mut cmsg_buffer = nix::cmsg_space!([RawFd; 1]);
        loop {
            let mut iov = [IoSliceMut::new(&mut payload)];
            match recvmsg::<()>(
                std_stream,
                &mut iov,
                Some(&mut cmsg_buffer),
                MsgFlags::empty(),
            ) {
                Ok(msg) => {
                    for cmsg in msg.cmsgs() {
                        if let ControlMessageOwned::ScmRights(fds) = cmsg {
                            if let Some(fd) = fds.into_iter().next() {
                                // SAFETY: fd was just received via SCM_RIGHTS and is
                                // owned by this process from this point on.
                                return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
                            }
                        }
                    }
                    return Err(io::Error::other("no file descriptor in control message"));
                }
                Err(nix::errno::Errno::EAGAIN) => {
                    stream.readable().await?;
                    continue;
                }
                Err(err) => return Err(io::Error::from_raw_os_error(err as i32)),
            }
        }
    }
}
