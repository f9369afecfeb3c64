//! Termination handshake: both sides exchange framed messages, stop the
//! framing layer, and keep using the same byte stream afterwards.
//!
//! Run with:
//!   cargo run --example handshake

use std::io::{IoSlice, IoSliceMut};
use std::thread;
use std::time::Duration;

use pfxsock::frame::PfxSocket;
use pfxsock::transport::{ByteStream, Deadline, MessageSocket, SockError, StreamSocket};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left, right) = StreamSocket::pair()?;
    let deadline = Deadline::after(Duration::from_secs(5));

    let server = thread::spawn(move || -> Result<Vec<u8>, SockError> {
        let mut sock = PfxSocket::start(right)?;
        let mut buf = [0u8; 64];
        let size = sock.recv_msg(&mut [IoSliceMut::new(&mut buf)], deadline)?;
        eprintln!("[server] got {:?}", String::from_utf8_lossy(&buf[..size]));
        sock.send_msg(&[IoSlice::new(b"ack")], deadline)?;

        // Anything still in flight from the client is discarded here.
        let mut stream = sock.stop(deadline)?;

        let mut raw = [0u8; 4];
        stream.recv_exact(&mut [IoSliceMut::new(&mut raw)], deadline)?;
        Ok(raw.to_vec())
    });

    let mut sock = PfxSocket::start(left)?;
    sock.send_msg(&[IoSlice::new(b"hello, "), IoSlice::new(b"world")], deadline)?;
    sock.send_msg(&[IoSlice::new(b"never read")], deadline)?;

    let mut buf = [0u8; 64];
    let size = sock.recv_msg(&mut [IoSliceMut::new(&mut buf)], deadline)?;
    eprintln!("[client] got {:?}", String::from_utf8_lossy(&buf[..size]));

    let mut stream = sock.stop(deadline)?;
    stream.send_all(&[IoSlice::new(b"raw!")], deadline)?;

    let raw = server.join().map_err(|_| "server thread panicked")??;
    eprintln!("[server] raw bytes after handshake: {:?}", String::from_utf8_lossy(&raw));
    Ok(())
}
