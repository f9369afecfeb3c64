use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use pfxsock_frame::DEFAULT_MAX_MESSAGE;
use pfxsock_transport::Deadline;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept connections and echo every message back.
    Echo(EchoArgs),
    /// Connect and send messages, then perform the closing handshake.
    Send(SendArgs),
    /// Accept one connection and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Largest message accepted, in bytes.
    #[arg(long, env = "PFXSOCK_MAX_SIZE", default_value_t = DEFAULT_MAX_MESSAGE)]
    pub max_size: usize,
    /// Per-session deadline for the closing handshake (e.g. 5s, 500ms).
    #[arg(long, env = "PFXSOCK_TIMEOUT", default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Send the payload this many times.
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
    /// Wait for one reply per message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Deadline for connecting, sending, replies, and the handshake (e.g. 5s, 500ms).
    #[arg(long, env = "PFXSOCK_TIMEOUT", default_value = "5s")]
    pub timeout: String,
    /// Largest reply accepted, in bytes.
    #[arg(long, env = "PFXSOCK_MAX_SIZE", default_value_t = DEFAULT_MAX_MESSAGE)]
    pub max_size: usize,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Stop after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Largest message accepted, in bytes.
    #[arg(long, env = "PFXSOCK_MAX_SIZE", default_value_t = DEFAULT_MAX_MESSAGE)]
    pub max_size: usize,
    /// Deadline for the closing handshake (e.g. 5s, 500ms).
    #[arg(long, env = "PFXSOCK_TIMEOUT", default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Deadline `input` from now.
pub fn deadline_from(input: &str) -> CliResult<Deadline> {
    parse_duration(input).map(Deadline::after)
}
