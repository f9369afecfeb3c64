//! Polymorphic socket handles.
//!
//! A handle owns one resource and answers capability queries. Wrapping a
//! handle moves it into the wrapper, so the original can no longer be used.

use std::any::Any;
use std::fmt;

use crate::error::{Result, SockError};
use crate::traits::{ByteStream, MessageSocket};

/// Named capability token.
///
/// Tokens compare by name, so each layer must pick a name no other layer uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    name: &'static str,
}

impl Capability {
    /// Reliable, ordered byte stream without message boundaries.
    pub const BYTE_STREAM: Capability = Capability::new("bytestream");
    /// Reliable, ordered stream of discrete messages.
    pub const MESSAGE_SOCKET: Capability = Capability::new("msock");

    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.name)
    }
}

/// A capability implementation borrowed from a handle.
pub enum Interface<'a> {
    ByteStream(&'a mut dyn ByteStream),
    MessageSocket(&'a mut dyn MessageSocket),
    /// The concrete object behind a layer's own identity capability.
    Identity(&'a mut dyn Any),
}

impl fmt::Debug for Interface<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Interface::ByteStream(_) => "ByteStream",
            Interface::MessageSocket(_) => "MessageSocket",
            Interface::Identity(_) => "Identity",
        };
        f.debug_tuple("Interface").field(&kind).finish()
    }
}

/// An owned socket resource.
///
/// Dropping a handle closes it, including any handle it wraps.
pub trait Handle {
    /// Look up a capability. `None` means unsupported; the query has no side
    /// effects either way.
    fn query(&mut self, capability: Capability) -> Option<Interface<'_>>;

    /// Signal that the local side will send nothing more. Resources stay open.
    fn done(&mut self) -> Result<()>;

    /// Release the handle and everything it owns.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

impl<H: Handle + ?Sized> Handle for Box<H> {
    fn query(&mut self, capability: Capability) -> Option<Interface<'_>> {
        (**self).query(capability)
    }

    fn done(&mut self) -> Result<()> {
        (**self).done()
    }
}

/// Borrow the byte-stream capability of `handle`.
pub fn byte_stream<H: Handle + ?Sized>(handle: &mut H) -> Result<&mut dyn ByteStream> {
    match handle.query(Capability::BYTE_STREAM) {
        Some(Interface::ByteStream(stream)) => Ok(stream),
        _ => Err(SockError::Unsupported(Capability::BYTE_STREAM)),
    }
}

/// Borrow the message-socket capability of `handle`.
pub fn message_socket<H: Handle + ?Sized>(handle: &mut H) -> Result<&mut dyn MessageSocket> {
    match handle.query(Capability::MESSAGE_SOCKET) {
        Some(Interface::MessageSocket(socket)) => Ok(socket),
        _ => Err(SockError::Unsupported(Capability::MESSAGE_SOCKET)),
    }
}

/// Borrow the concrete object registered under an identity capability.
pub fn identity<T: Any, H: Handle + ?Sized>(
    handle: &mut H,
    capability: Capability,
) -> Result<&mut T> {
    match handle.query(capability) {
        Some(Interface::Identity(object)) => object
            .downcast_mut::<T>()
            .ok_or(SockError::Unsupported(capability)),
        _ => Err(SockError::Unsupported(capability)),
    }
}
