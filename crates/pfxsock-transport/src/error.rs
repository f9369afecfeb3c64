use std::path::PathBuf;

use crate::handle::Capability;

/// Errors shared by every socket layer.
///
/// `Pipe` is the orderly-termination signal and is expected during normal
/// shutdown. Everything else is a hard failure of the path it occurred on.
#[derive(Debug, thiserror::Error)]
pub enum SockError {
    /// The handle does not provide the requested capability.
    #[error("capability '{0}' not supported")]
    Unsupported(Capability),

    /// Orderly termination was already signaled in this direction.
    #[error("broken pipe (orderly termination already signaled)")]
    Pipe,

    /// An earlier failure poisoned this path.
    #[error("connection reset (path broken by an earlier failure)")]
    ConnectionReset,

    /// A declared message length exceeds what the receiver can hold.
    #[error("message too large ({size} bytes, capacity {capacity})")]
    MessageTooLarge { size: u64, capacity: u64 },

    /// The deadline passed before the operation completed.
    #[error("deadline expired")]
    TimedOut,

    /// The peer closed the stream before the operation completed.
    #[error("connection closed by peer")]
    Closed,

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl SockError {
    /// True for the orderly-termination signal.
    pub fn is_pipe(&self) -> bool {
        matches!(self, SockError::Pipe)
    }
}

pub type Result<T> = std::result::Result<T, SockError>;
