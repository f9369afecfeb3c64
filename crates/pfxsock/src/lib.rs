//! Composable message sockets.
//!
//! pfxsock turns a reliable byte stream into a reliable stream of discrete
//! messages, with a two-sided termination handshake that hands the byte
//! stream back once both peers are done.
//!
//! # Crate Structure
//!
//! - [`transport`]: Capability handles, socket contracts, Unix domain sockets
//! - [`frame`]: Length-prefix framing engine ([`frame::PfxSocket`])

/// Re-export transport types.
pub mod transport {
    pub use pfxsock_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pfxsock_frame::*;
}
