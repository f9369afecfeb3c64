use std::io::{ErrorKind, IoSlice, IoSliceMut, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;

use tracing::{debug, trace};

use crate::deadline::Deadline;
use crate::error::{Result, SockError};
use crate::handle::{Capability, Handle, Interface};
use crate::traits::ByteStream;

/// Identity capability of [`StreamSocket`].
pub const STREAM_SOCKET: Capability = Capability::new("unix-stream");

/// A connected Unix domain stream exposed as a byte-stream handle.
///
/// Socket timeouts are recomputed from the remaining deadline before every
/// system call, so one deadline bounds a whole `send_all`/`recv_exact`.
pub struct StreamSocket {
    stream: UnixStream,
    out_done: bool,
}

impl StreamSocket {
    /// Wrap a connected stream.
    pub fn from_unix(stream: UnixStream) -> Self {
        Self {
            stream,
            out_done: false,
        }
    }

    /// Create a connected pair of sockets.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &UnixStream {
        &self.stream
    }

    /// Consume the socket and return the underlying stream.
    pub fn into_inner(self) -> UnixStream {
        self.stream
    }

    /// Whether `done` has shut the write half down.
    pub fn is_done(&self) -> bool {
        self.out_done
    }
}

impl From<UnixStream> for StreamSocket {
    fn from(stream: UnixStream) -> Self {
        Self::from_unix(stream)
    }
}

impl ByteStream for StreamSocket {
    fn send_all(&mut self, bufs: &[IoSlice<'_>], deadline: Deadline) -> Result<()> {
        let total: usize = bufs.iter().map(|buf| buf.len()).sum();
        if total == 0 {
            return Ok(());
        }
        if self.out_done {
            return Err(SockError::Pipe);
        }

        let result = self.write_by(bufs, deadline);
        let cleared = self.stream.set_write_timeout(None);
        result?;
        cleared?;
        trace!(bytes = total, "stream send complete");
        Ok(())
    }

    fn recv_exact(&mut self, bufs: &mut [IoSliceMut<'_>], deadline: Deadline) -> Result<()> {
        let total: usize = bufs.iter().map(|buf| buf.len()).sum();
        if total == 0 {
            return Ok(());
        }

        let result = self.read_by(bufs, deadline);
        let cleared = self.stream.set_read_timeout(None);
        result?;
        cleared?;
        trace!(bytes = total, "stream recv complete");
        Ok(())
    }
}

impl StreamSocket {
    // Both loops leave a socket timeout behind; callers reset it to blocking.
    fn write_by(&mut self, bufs: &[IoSlice<'_>], deadline: Deadline) -> Result<()> {
        let mut owned = bufs.to_vec();
        let mut pending: &mut [IoSlice<'_>] = &mut owned;
        IoSlice::advance_slices(&mut pending, 0);

        while !pending.is_empty() {
            self.stream.set_write_timeout(deadline.remaining()?)?;
            match self.stream.write_vectored(pending) {
                Ok(0) => return Err(SockError::Closed),
                Ok(n) => IoSlice::advance_slices(&mut pending, n),
                Err(err) => retry_or_fail(err, &deadline)?,
            }
        }
        Ok(())
    }

    fn read_by(&mut self, bufs: &mut [IoSliceMut<'_>], deadline: Deadline) -> Result<()> {
        let mut pending: &mut [IoSliceMut<'_>] = bufs;
        IoSliceMut::advance_slices(&mut pending, 0);

        while !pending.is_empty() {
            self.stream.set_read_timeout(deadline.remaining()?)?;
            match self.stream.read_vectored(pending) {
                Ok(0) => return Err(SockError::Closed),
                Ok(n) => IoSliceMut::advance_slices(&mut pending, n),
                Err(err) => retry_or_fail(err, &deadline)?,
            }
        }
        Ok(())
    }
}

impl Handle for StreamSocket {
    fn query(&mut self, capability: Capability) -> Option<Interface<'_>> {
        if capability == Capability::BYTE_STREAM {
            return Some(Interface::ByteStream(self));
        }
        if capability == STREAM_SOCKET {
            return Some(Interface::Identity(self));
        }
        None
    }

    fn done(&mut self) -> Result<()> {
        if self.out_done {
            return Err(SockError::Pipe);
        }
        self.stream.shutdown(Shutdown::Write)?;
        self.out_done = true;
        debug!("stream write half shut down");
        Ok(())
    }
}

/// Decide whether a failed system call should be retried.
///
/// Interrupted calls always retry; socket timeouts retry only while the
/// deadline still has time left.
fn retry_or_fail(err: std::io::Error, deadline: &Deadline) -> Result<()> {
    match err.kind() {
        ErrorKind::Interrupted => Ok(()),
        ErrorKind::WouldBlock | ErrorKind::TimedOut => {
            deadline.remaining()?;
            Ok(())
        }
        _ => Err(SockError::Io(err)),
    }
}

impl Read for StreamSocket {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for StreamSocket {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl std::fmt::Debug for StreamSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSocket")
            .field("type", &"unix")
            .field("out_done", &self.out_done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::handle::{byte_stream, identity};

    #[test]
    fn vectored_roundtrip_over_pair() {
        let (mut left, mut right) = StreamSocket::pair().unwrap();

        left.send_all(
            &[IoSlice::new(b"hel"), IoSlice::new(b""), IoSlice::new(b"lo")],
            Deadline::Never,
        )
        .unwrap();

        let mut first = [0u8; 2];
        let mut second = [0u8; 3];
        right
            .recv_exact(
                &mut [IoSliceMut::new(&mut first), IoSliceMut::new(&mut second)],
                Deadline::Never,
            )
            .unwrap();

        assert_eq!(&first, b"he");
        assert_eq!(&second, b"llo");
    }

    #[test]
    fn zero_length_requests_ignore_expired_deadline() {
        let (mut left, mut right) = StreamSocket::pair().unwrap();
        let expired = Deadline::At(Instant::now() - Duration::from_millis(5));

        left.send_all(&[], expired).unwrap();
        left.send_all(&[IoSlice::new(b"")], expired).unwrap();
        right.recv_exact(&mut [], expired).unwrap();
    }

    #[test]
    fn expired_deadline_times_out() {
        let (mut left, _right) = StreamSocket::pair().unwrap();
        let expired = Deadline::At(Instant::now() - Duration::from_millis(5));

        let err = left.send_all(&[IoSlice::new(b"x")], expired).unwrap_err();
        assert!(matches!(err, SockError::TimedOut));
    }

    #[test]
    fn recv_times_out_when_no_data_arrives() {
        let (_left, mut right) = StreamSocket::pair().unwrap();
        let start = Instant::now();
        let mut buf = [0u8; 4];

        let err = right
            .recv_exact(
                &mut [IoSliceMut::new(&mut buf)],
                Deadline::after(Duration::from_millis(30)),
            )
            .unwrap_err();

        assert!(matches!(err, SockError::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn short_read_reports_closed() {
        let (mut left, mut right) = StreamSocket::pair().unwrap();
        left.send_all(&[IoSlice::new(b"ab")], Deadline::Never)
            .unwrap();
        drop(left);

        let mut buf = [0u8; 4];
        let err = right
            .recv_exact(&mut [IoSliceMut::new(&mut buf)], Deadline::Never)
            .unwrap_err();
        assert!(matches!(err, SockError::Closed));
    }

    #[test]
    fn done_shuts_write_half_and_rejects_repeat() {
        let (mut left, mut right) = StreamSocket::pair().unwrap();

        left.done().unwrap();
        assert!(left.is_done());
        assert!(matches!(left.done(), Err(SockError::Pipe)));
        assert!(matches!(
            left.send_all(&[IoSlice::new(b"x")], Deadline::Never),
            Err(SockError::Pipe)
        ));

        let mut buf = [0u8; 1];
        let err = right
            .recv_exact(&mut [IoSliceMut::new(&mut buf)], Deadline::Never)
            .unwrap_err();
        assert!(matches!(err, SockError::Closed));

        // The read half stays usable after done.
        right
            .send_all(&[IoSlice::new(b"z")], Deadline::Never)
            .unwrap();
        left.recv_exact(&mut [IoSliceMut::new(&mut buf)], Deadline::Never)
            .unwrap();
        assert_eq!(&buf, b"z");
    }

    #[test]
    fn answers_byte_stream_and_identity_queries() {
        let (mut left, _right) = StreamSocket::pair().unwrap();

        assert!(byte_stream(&mut left).is_ok());
        assert!(identity::<StreamSocket, _>(&mut left, STREAM_SOCKET).is_ok());
        assert!(left.query(Capability::MESSAGE_SOCKET).is_none());
    }

    #[test]
    fn large_transfer_across_threads() {
        let (mut left, mut right) = StreamSocket::pair().unwrap();
        let payload: Vec<u8> = (0..512 * 1024).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let writer = std::thread::spawn(move || {
            left.send_all(&[IoSlice::new(&payload)], Deadline::Never)
                .unwrap();
        });

        let mut received = vec![0u8; expected.len()];
        right
            .recv_exact(&mut [IoSliceMut::new(&mut received)], Deadline::Never)
            .unwrap();
        writer.join().unwrap();

        assert_eq!(received, expected);
    }

    #[test]
    fn timed_out_recv_leaves_stream_blocking() {
        let (mut left, mut right) = StreamSocket::pair().unwrap();
        let mut buf = [0u8; 1];
        let err = left
            .recv_exact(
                &mut [IoSliceMut::new(&mut buf)],
                Deadline::after(Duration::from_millis(50)),
            )
            .unwrap_err();
        assert!(matches!(err, SockError::TimedOut));
        assert_eq!(left.get_ref().read_timeout().unwrap(), None);

        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            right.write_all(b"z").unwrap();
            right
        });

        let start = Instant::now();
        assert_eq!(left.read(&mut buf).unwrap(), 1);
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert_eq!(buf, *b"z");
        drop(writer.join().unwrap());
    }

    #[test]
    fn bounded_send_leaves_stream_blocking() {
        let (mut left, _right) = StreamSocket::pair().unwrap();
        left.send_all(
            &[IoSlice::new(b"abc")],
            Deadline::after(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(left.get_ref().write_timeout().unwrap(), None);
    }
}
