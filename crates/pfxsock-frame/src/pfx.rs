use std::io::{IoSlice, IoSliceMut};

use pfxsock_transport::{
    byte_stream, ByteStream, Capability, Deadline, Handle, Interface, MessageSocket, Result,
    SockError,
};
use tracing::{debug, trace, warn};

use crate::codec::{encode_header, Header, HEADER_SIZE};
use crate::iov;

/// Identity capability of [`PfxSocket`].
pub const PFX: Capability = Capability::new("pfx");

/// Scratch size used when discarding messages during [`PfxSocket::stop`].
const DISCARD_CHUNK: usize = 8 * 1024;

/// State of the sending direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// Messages and the termination marker may still be sent.
    Active,
    /// The termination marker was written. Terminal.
    Done,
    /// A write failed. Terminal.
    Broken,
}

/// State of the receiving direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvState {
    /// Messages may still arrive.
    Active,
    /// The peer's termination marker was read. Terminal.
    PeerDone,
    /// A read failed or a message did not fit. Terminal.
    Broken,
}

/// Length-prefix framing over an owned byte-stream handle.
///
/// Each direction runs its own state machine. Failures are sticky: once a
/// direction is broken every later call on it fails with
/// [`SockError::ConnectionReset`] without touching the transport.
///
/// The socket is not internally synchronized; one send and one receive may
/// be in flight only if the caller serializes them.
pub struct PfxSocket<S> {
    inner: S,
    send: SendState,
    recv: RecvState,
}

impl<S: Handle> PfxSocket<S> {
    /// Wrap `inner`, taking ownership of it.
    ///
    /// Fails with [`SockError::Unsupported`] if `inner` is not a byte stream.
    /// The handle is consumed either way, so on failure it is dropped and
    /// therefore closed. Probe it with [`byte_stream`] first to keep it.
    pub fn start(mut inner: S) -> Result<Self> {
        byte_stream(&mut inner)?;
        debug!("pfx socket started");
        Ok(Self {
            inner,
            send: SendState::Active,
            recv: RecvState::Active,
        })
    }

    /// Current state of the sending direction.
    pub fn send_state(&self) -> SendState {
        self.send
    }

    /// Current state of the receiving direction.
    pub fn recv_state(&self) -> RecvState {
        self.recv
    }

    /// Whether the local termination marker has been sent.
    pub fn is_done(&self) -> bool {
        self.send == SendState::Done
    }

    /// Whether the peer's termination marker has been received.
    pub fn is_peer_done(&self) -> bool {
        self.recv == RecvState::PeerDone
    }

    /// Whether either direction is broken.
    pub fn is_broken(&self) -> bool {
        self.send == SendState::Broken || self.recv == RecvState::Broken
    }

    /// Borrow the wrapped transport.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Send the termination marker, bounded by `deadline`.
    ///
    /// A second call fails with [`SockError::Pipe`] and writes nothing.
    pub fn done_by(&mut self, deadline: Deadline) -> Result<()> {
        self.check_send()?;
        let marker = Header::Terminator.encode();
        if let Err(err) = self.with_stream(|s| s.send_all(&[IoSlice::new(&marker)], deadline)) {
            self.send = SendState::Broken;
            warn!(error = %err, "failed to send termination marker");
            return Err(err);
        }
        self.send = SendState::Done;
        debug!("termination marker sent");
        Ok(())
    }

    /// Complete the termination handshake and hand the transport back.
    ///
    /// Sends the local marker if that has not happened yet, then reads and
    /// discards incoming messages until the peer's marker arrives. The
    /// returned transport is positioned right after that marker.
    ///
    /// On any failure the transport is closed and the error returned.
    pub fn stop(mut self, deadline: Deadline) -> Result<S> {
        match self.handshake(deadline) {
            Ok(()) => {
                debug!("pfx handshake complete; releasing transport");
                Ok(self.inner)
            }
            Err(err) => {
                warn!(error = %err, "pfx stop failed; closing transport");
                Err(err)
            }
        }
    }

    fn handshake(&mut self, deadline: Deadline) -> Result<()> {
        if self.is_broken() {
            return Err(SockError::ConnectionReset);
        }
        if self.send == SendState::Active {
            self.done_by(deadline)?;
        }
        loop {
            match self.discard_msg(deadline) {
                Ok(size) => debug!(size, "discarded message during stop"),
                Err(SockError::Pipe) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    fn check_send(&self) -> Result<()> {
        match self.send {
            SendState::Active => Ok(()),
            SendState::Done => Err(SockError::Pipe),
            SendState::Broken => Err(SockError::ConnectionReset),
        }
    }

    fn check_recv(&self) -> Result<()> {
        match self.recv {
            RecvState::Active => Ok(()),
            RecvState::PeerDone => Err(SockError::Pipe),
            RecvState::Broken => Err(SockError::ConnectionReset),
        }
    }

    fn with_stream<T>(&mut self, op: impl FnOnce(&mut dyn ByteStream) -> Result<T>) -> Result<T> {
        byte_stream(&mut self.inner).and_then(op)
    }

    /// Read exactly `bufs` from the transport, breaking the receive path on
    /// failure.
    fn recv_body(&mut self, bufs: &mut [IoSliceMut<'_>], deadline: Deadline) -> Result<()> {
        let result = self.with_stream(|s| s.recv_exact(bufs, deadline));
        if let Err(err) = &result {
            self.recv = RecvState::Broken;
            warn!(error = %err, "receive failed; receive path broken");
        }
        result
    }

    /// Read the next header. Returns the declared message length.
    fn recv_header(&mut self, deadline: Deadline) -> Result<u64> {
        self.check_recv()?;
        let mut header = [0u8; HEADER_SIZE];
        self.recv_body(&mut [IoSliceMut::new(&mut header)], deadline)?;
        match Header::decode(header) {
            Header::Terminator => {
                self.recv = RecvState::PeerDone;
                debug!("peer termination marker received");
                Err(SockError::Pipe)
            }
            Header::Message(size) => Ok(size),
        }
    }

    /// Receive one message and drop its payload.
    fn discard_msg(&mut self, deadline: Deadline) -> Result<u64> {
        let size = self.recv_header(deadline)?;
        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut left = size;
        while left > 0 {
            let take = left.min(DISCARD_CHUNK as u64) as usize;
            self.recv_body(&mut [IoSliceMut::new(&mut scratch[..take])], deadline)?;
            left -= take as u64;
        }
        Ok(size)
    }
}

impl<S: Handle> MessageSocket for PfxSocket<S> {
    fn send_msg(&mut self, msg: &[IoSlice<'_>], deadline: Deadline) -> Result<()> {
        self.check_send()?;
        let len = iov::total_len(msg);
        let header = encode_header(len)?;
        let frame = iov::prepend(&header, msg);
        if let Err(err) = self.with_stream(|s| s.send_all(&frame, deadline)) {
            self.send = SendState::Broken;
            warn!(error = %err, len, "send failed; send path broken");
            return Err(err);
        }
        trace!(len, "message sent");
        Ok(())
    }

    fn recv_msg(&mut self, bufs: &mut [IoSliceMut<'_>], deadline: Deadline) -> Result<usize> {
        let size = self.recv_header(deadline)?;
        let capacity = iov::capacity(bufs);
        let len = match usize::try_from(size) {
            Ok(len) if len <= capacity => len,
            _ => {
                // The header is consumed and the body cannot be skipped
                // safely, so the stream is out of sync for good.
                self.recv = RecvState::Broken;
                warn!(size, capacity, "message exceeds receive capacity");
                return Err(SockError::MessageTooLarge {
                    size,
                    capacity: capacity as u64,
                });
            }
        };
        let mut dst = iov::cut_mut(bufs, len);
        self.recv_body(&mut dst, deadline)?;
        trace!(len, "message received");
        Ok(len)
    }
}

impl<S: Handle + 'static> Handle for PfxSocket<S> {
    fn query(&mut self, capability: Capability) -> Option<Interface<'_>> {
        if capability == Capability::MESSAGE_SOCKET {
            return Some(Interface::MessageSocket(self));
        }
        if capability == PFX {
            return Some(Interface::Identity(self));
        }
        None
    }

    /// Send the termination marker with no deadline.
    fn done(&mut self) -> Result<()> {
        self.done_by(Deadline::Never)
    }

    fn close(self)
    where
        Self: Sized,
    {
        debug!(send = ?self.send, recv = ?self.recv, "pfx socket closed");
    }
}

impl<S> std::fmt::Debug for PfxSocket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PfxSocket")
            .field("send", &self.send)
            .field("recv", &self.recv)
            .finish_non_exhaustive()
    }
}
