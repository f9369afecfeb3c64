//! Capability handles and byte-stream transports.
//!
//! Every socket in pfxsock is a [`Handle`]: an owned resource that can be
//! queried at runtime for the capabilities it provides. Layers compose by
//! owning the handle they wrap and answering queries for what they add.
//!
//! This crate is the lowest layer. It defines:
//! - the handle abstraction ([`Handle`], [`Capability`], [`Interface`])
//! - the capability contracts ([`ByteStream`], [`MessageSocket`])
//! - [`Deadline`], the absolute-time bound every blocking call takes
//! - a Unix domain socket byte stream ([`StreamSocket`], [`UnixDomainSocket`])

pub mod deadline;
pub mod error;
pub mod handle;
pub mod traits;

#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use deadline::Deadline;
pub use error::{Result, SockError};
pub use handle::{byte_stream, identity, message_socket, Capability, Handle, Interface};
pub use traits::{ByteStream, MessageSocket};

#[cfg(unix)]
pub use stream::{StreamSocket, STREAM_SOCKET};
#[cfg(unix)]
pub use uds::UnixDomainSocket;
