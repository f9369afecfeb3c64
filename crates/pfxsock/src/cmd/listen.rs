use std::io::IoSliceMut;

use pfxsock_frame::PfxSocket;
use pfxsock_transport::{Deadline, MessageSocket, SockError, UnixDomainSocket};
use tracing::{debug, info};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{sock_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let handshake_timeout = parse_duration(&args.timeout)?;
    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| sock_error("bind failed", err))?;
    info!(path = %listener.path().display(), "listening");

    let stream = listener
        .accept()
        .map_err(|err| sock_error("accept failed", err))?;
    let peer = listener.path().display().to_string();
    let mut sock = PfxSocket::start(stream).map_err(|err| sock_error("start failed", err))?;

    let mut buf = vec![0u8; args.max_size];
    let mut received = 0usize;
    loop {
        if args.count.is_some_and(|count| received >= count) {
            break;
        }
        let size = match sock.recv_msg(&mut [IoSliceMut::new(&mut buf)], Deadline::Never) {
            Ok(size) => size,
            Err(SockError::Pipe) => {
                debug!("peer finished sending");
                break;
            }
            Err(err) => return Err(sock_error("receive failed", err)),
        };
        print_message(received, &buf[..size], &peer, format);
        received = received.saturating_add(1);
    }

    sock.stop(Deadline::after(handshake_timeout))
        .map_err(|err| sock_error("close handshake failed", err))?;
    info!(received, "session closed");
    Ok(SUCCESS)
}
