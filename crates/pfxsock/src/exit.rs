use std::fmt;
use std::io;

use pfxsock_transport::SockError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(&err), format!("{context}: {err}"))
}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    }
}

pub fn sock_error(context: &str, err: SockError) -> CliError {
    let code = match &err {
        SockError::Bind { source, .. }
        | SockError::Connect { source, .. }
        | SockError::Accept(source)
        | SockError::Io(source) => io_code(source),
        SockError::TimedOut => TIMEOUT,
        SockError::MessageTooLarge { .. } => DATA_INVALID,
        SockError::PathTooLong { .. } => USAGE,
        SockError::Pipe | SockError::Closed => FAILURE,
        SockError::ConnectionReset => TRANSPORT_ERROR,
        SockError::Unsupported(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_protocol_errors_to_exit_codes() {
        assert_eq!(sock_error("x", SockError::TimedOut).code, TIMEOUT);
        assert_eq!(
            sock_error(
                "x",
                SockError::MessageTooLarge {
                    size: 10,
                    capacity: 1
                }
            )
            .code,
            DATA_INVALID
        );
        assert_eq!(sock_error("x", SockError::ConnectionReset).code, TRANSPORT_ERROR);
        assert_eq!(sock_error("x", SockError::Closed).code, FAILURE);
    }

    #[test]
    fn unwraps_io_sources() {
        let err = SockError::Connect {
            path: "/tmp/missing.sock".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let cli = sock_error("connect failed", err);
        assert_eq!(cli.code, PERMISSION_DENIED);
        assert!(cli.message.starts_with("connect failed: "));
        assert!(cli.message.contains("/tmp/missing.sock"));
    }
}
