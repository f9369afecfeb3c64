//! Minimal echo server: accepts one connection and echoes messages back.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send /tmp/pfxsock-echo-<pid>/echo.sock \
//!     --data hello --repeat 3 --wait

use std::fs;
use std::io::{IoSlice, IoSliceMut};

use pfxsock::frame::{PfxSocket, DEFAULT_MAX_MESSAGE};
use pfxsock::transport::{Deadline, MessageSocket, SockError, UnixDomainSocket};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("pfxsock-echo-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("echo.sock");

    let listener = UnixDomainSocket::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let mut sock = PfxSocket::start(listener.accept()?)?;
    eprintln!("Peer connected");

    let mut buf = vec![0u8; DEFAULT_MAX_MESSAGE];
    loop {
        match sock.recv_msg(&mut [IoSliceMut::new(&mut buf)], Deadline::Never) {
            Ok(size) => {
                eprintln!("Received {size} bytes");
                sock.send_msg(&[IoSlice::new(&buf[..size])], Deadline::Never)?;
            }
            Err(SockError::Pipe) => {
                eprintln!("Peer is done sending");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    sock.stop(Deadline::Never)?;
    drop(listener);
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
