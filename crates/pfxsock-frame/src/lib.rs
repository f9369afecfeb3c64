//! Length-prefix message framing over a byte stream.
//!
//! [`PfxSocket`] turns any handle with the byte-stream capability into a
//! message socket. Every message goes on the wire as:
//! - an 8-byte big-endian payload length
//! - the payload itself
//!
//! The all-ones length is reserved as a termination marker. Each side sends
//! it once when it is done sending, and [`PfxSocket::stop`] waits for both
//! markers before handing the byte stream back for reuse.

pub mod codec;
pub mod iov;
pub mod pfx;

pub use codec::{
    encode_header, Header, DEFAULT_MAX_MESSAGE, HEADER_SIZE, MAX_MESSAGE_LEN, TERMINATOR,
};
pub use pfx::{PfxSocket, RecvState, SendState, PFX};
pub use pfxsock_transport::{Result, SockError};
