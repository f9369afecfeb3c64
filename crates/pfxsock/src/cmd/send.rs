use std::fs;
use std::io::{IoSlice, IoSliceMut};

use pfxsock_frame::PfxSocket;
use pfxsock_transport::{Deadline, MessageSocket, Result as SockResult, UnixDomainSocket};
use tracing::{debug, info};

use crate::cmd::{deadline_from, SendArgs};
use crate::exit::{sock_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let deadline = deadline_from(&args.timeout)?;
    let peer = args.path.display().to_string();

    let stream = UnixDomainSocket::connect_by(&args.path, deadline)
        .map_err(|err| sock_error("connect failed", err))?;
    let mut sock = PfxSocket::start(stream).map_err(|err| sock_error("start failed", err))?;
    debug!(path = %peer, "connected");

    let mut reply = if args.wait {
        vec![0u8; args.max_size]
    } else {
        Vec::new()
    };
    for index in 0..args.repeat {
        sock.send_msg(&[IoSlice::new(&payload)], deadline)
            .map_err(|err| sock_error("send failed", err))?;

        if args.wait {
            let size = recv_reply(&mut sock, &mut reply, deadline)
                .map_err(|err| sock_error("receive failed", err))?;
            print_message(index, &reply[..size], &peer, format);
        }
    }

    sock.stop(deadline)
        .map_err(|err| sock_error("close handshake failed", err))?;
    info!(count = args.repeat, size = payload.len(), "messages sent");
    Ok(SUCCESS)
}

fn recv_reply<M: MessageSocket>(sock: &mut M, buf: &mut [u8], deadline: Deadline) -> SockResult<usize> {
    sock.recv_msg(&mut [IoSliceMut::new(buf)], deadline)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}
