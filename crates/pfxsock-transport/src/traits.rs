use std::io::{IoSlice, IoSliceMut};

use crate::deadline::Deadline;
use crate::error::Result;

/// Byte-stream capability: blocking transfer of an exact number of bytes.
///
/// Both operations fail on short I/O ([`SockError::Closed`]), deadline expiry
/// ([`SockError::TimedOut`]) or a transport error, and both succeed trivially
/// when the buffers hold zero bytes.
///
/// [`SockError::Closed`]: crate::SockError::Closed
/// [`SockError::TimedOut`]: crate::SockError::TimedOut
pub trait ByteStream {
    /// Write every byte of `bufs`, in order, as one logical operation.
    fn send_all(&mut self, bufs: &[IoSlice<'_>], deadline: Deadline) -> Result<()>;

    /// Fill every byte of `bufs`, in order.
    ///
    /// The slice descriptors in `bufs` may be advanced past the bytes
    /// received; the memory they point to holds the data.
    fn recv_exact(&mut self, bufs: &mut [IoSliceMut<'_>], deadline: Deadline) -> Result<()>;
}

/// Message-socket capability: blocking transfer of whole messages.
pub trait MessageSocket {
    /// Send one message made of the concatenation of `msg`.
    fn send_msg(&mut self, msg: &[IoSlice<'_>], deadline: Deadline) -> Result<()>;

    /// Receive one message into `bufs`, filling them in order.
    ///
    /// Returns the message length; only that many leading bytes of `bufs`
    /// are written.
    fn recv_msg(&mut self, bufs: &mut [IoSliceMut<'_>], deadline: Deadline) -> Result<usize>;
}
