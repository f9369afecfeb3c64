use std::io::{IoSlice, IoSliceMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pfxsock_frame::PfxSocket;
use pfxsock_transport::{
    Deadline, Handle, MessageSocket, Result as SockResult, SockError, UnixDomainSocket,
};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, EchoArgs};
use crate::exit::{sock_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: EchoArgs) -> CliResult<i32> {
    let handshake_timeout = parse_duration(&args.timeout)?;
    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| sock_error("bind failed", err))?;
    info!(path = %listener.path().display(), "echo server listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let stream = match listener.accept() {
            Ok(stream) => stream,
            Err(err) => return Err(sock_error("accept failed", err)),
        };
        let sock = match PfxSocket::start(stream) {
            Ok(sock) => sock,
            Err(err) => return Err(sock_error("start failed", err)),
        };
        match serve(sock, args.max_size, handshake_timeout) {
            Ok(count) => info!(count, "session closed"),
            Err(err) => warn!(error = %err, "session failed"),
        }
    }

    Ok(SUCCESS)
}

/// Echo every message until the peer signals done, then complete the
/// closing handshake. Returns the number of messages echoed.
pub fn serve<S: Handle>(
    mut sock: PfxSocket<S>,
    max_size: usize,
    handshake_timeout: Duration,
) -> SockResult<usize> {
    let mut buf = vec![0u8; max_size];
    let mut count = 0usize;
    loop {
        let size = match sock.recv_msg(&mut [IoSliceMut::new(&mut buf)], Deadline::Never) {
            Ok(size) => size,
            Err(SockError::Pipe) => break,
            Err(err) => return Err(err),
        };
        sock.send_msg(&[IoSlice::new(&buf[..size])], Deadline::Never)?;
        debug!(size, "echoed message");
        count += 1;
    }
    sock.stop(Deadline::after(handshake_timeout))?;
    Ok(count)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        // A second interrupt while blocked in accept exits immediately.
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(130);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfxsock_transport::StreamSocket;
    use std::thread;

    #[test]
    fn echoes_until_peer_done() {
        let (client, server) = StreamSocket::pair().unwrap();
        let worker = thread::spawn(move || {
            let sock = PfxSocket::start(server).unwrap();
            serve(sock, 64, Duration::from_secs(5))
        });

        let mut sock = PfxSocket::start(client).unwrap();
        let deadline = Deadline::after(Duration::from_secs(5));
        let mut buf = [0u8; 64];
        for payload in [&b"one"[..], b"", b"three"] {
            sock.send_msg(&[IoSlice::new(payload)], deadline).unwrap();
            let size = sock
                .recv_msg(&mut [IoSliceMut::new(&mut buf)], deadline)
                .unwrap();
            assert_eq!(&buf[..size], payload);
        }
        sock.stop(deadline).unwrap();

        assert_eq!(worker.join().unwrap().unwrap(), 3);
    }

    #[test]
    fn oversized_message_fails_the_session() {
        let (client, server) = StreamSocket::pair().unwrap();
        let worker = thread::spawn(move || {
            let sock = PfxSocket::start(server).unwrap();
            serve(sock, 4, Duration::from_secs(5))
        });

        let mut sock = PfxSocket::start(client).unwrap();
        sock.send_msg(&[IoSlice::new(b"too long")], Deadline::Never)
            .unwrap();

        let err = worker.join().unwrap().unwrap_err();
        assert!(matches!(err, SockError::MessageTooLarge { size: 8, capacity: 4 }));
    }
}
