use bytes::{Buf, BufMut};
use pfxsock_transport::{Result, SockError};

/// Frame header: big-endian payload length (8 bytes).
pub const HEADER_SIZE: usize = 8;

/// Reserved length value announcing that the sender is done.
pub const TERMINATOR: u64 = u64::MAX;

/// Largest length a message may declare.
pub const MAX_MESSAGE_LEN: u64 = TERMINATOR - 1;

/// Default receive capacity for callers without a better bound: 16 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 16 * 1024 * 1024;

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// A message of the given length follows.
    Message(u64),
    /// The peer will send no more messages.
    Terminator,
}

impl Header {
    /// Wire format:
    /// ```text
    /// ┌──────────────────────┬──────────────────┐
    /// │ Length (8B BE)       │ Payload          │
    /// │ 0xFFFF_FFFF_FFFF_FFFF│ (Length bytes)   │
    /// │ = terminator, no body│                  │
    /// └──────────────────────┴──────────────────┘
    /// ```
    pub fn encode(self) -> [u8; HEADER_SIZE] {
        let value = match self {
            Header::Message(len) => len,
            Header::Terminator => TERMINATOR,
        };
        let mut out = [0u8; HEADER_SIZE];
        let mut dst: &mut [u8] = &mut out;
        dst.put_u64(value);
        out
    }

    pub fn decode(src: [u8; HEADER_SIZE]) -> Self {
        let mut buf: &[u8] = &src;
        match buf.get_u64() {
            TERMINATOR => Header::Terminator,
            len => Header::Message(len),
        }
    }
}

/// Encode the header for a message of `len` bytes.
///
/// Fails with [`SockError::MessageTooLarge`] if `len` would collide with the
/// terminator.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_SIZE]> {
    let size = len as u64;
    if size > MAX_MESSAGE_LEN {
        return Err(SockError::MessageTooLarge {
            size,
            capacity: MAX_MESSAGE_LEN,
        });
    }
    Ok(Header::Message(size).encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian() {
        let header = encode_header(0x0102_0304).unwrap();
        assert_eq!(header, [0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_length_header() {
        assert_eq!(encode_header(0).unwrap(), [0u8; HEADER_SIZE]);
        assert_eq!(Header::decode([0u8; HEADER_SIZE]), Header::Message(0));
    }

    #[test]
    fn terminator_is_all_ones() {
        assert_eq!(Header::Terminator.encode(), [0xFF; HEADER_SIZE]);
        assert_eq!(Header::decode([0xFF; HEADER_SIZE]), Header::Terminator);
    }

    #[test]
    fn largest_legal_length_is_not_a_terminator() {
        let bytes = Header::Message(MAX_MESSAGE_LEN).encode();
        assert_eq!(bytes, [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(Header::decode(bytes), Header::Message(MAX_MESSAGE_LEN));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn terminator_length_is_rejected() {
        let err = encode_header(usize::MAX).unwrap_err();
        assert!(matches!(err, SockError::MessageTooLarge { size, .. } if size == TERMINATOR));
    }
}
