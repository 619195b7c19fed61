use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod checksum;
pub mod decode;
pub mod encode;
pub mod input;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a payload into a single wire frame.
    Encode(EncodeArgs),
    /// Decode a captured byte stream and print every event.
    Decode(DecodeArgs),
    /// Print the CRC-16/USB checksum of a payload.
    Checksum(ChecksumArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (whitespace and a leading 0x are ignored).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame ID, decimal or 0x-prefixed hex (max 0xF0FF).
    #[arg(long, short = 'i', value_parser = input::parse_id)]
    pub id: u16,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Write the wire bytes to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured stream to decode. Reads stdin when omitted.
    pub path: Option<PathBuf>,
    /// Read from a TCP serial bridge (host:port) instead of a file.
    #[arg(long, value_name = "ADDR", conflicts_with = "path")]
    pub connect: Option<String>,
    /// Feed the decoder at most N bytes per read (captures only).
    #[arg(long, value_name = "N", conflicts_with = "connect")]
    pub chunk_size: Option<usize>,
    /// Largest payload accepted; larger frames are reported and skipped.
    #[arg(long, value_name = "BYTES", env = "UARTFRAME_MAX_PAYLOAD")]
    pub max_payload: Option<usize>,
    /// Abandon a partial frame after this long (e.g. 500ms, 2s).
    #[arg(long, value_name = "DURATION")]
    pub frame_timeout: Option<String>,
    /// Give up when the link is silent this long (--connect only).
    #[arg(long, value_name = "DURATION", requires = "connect")]
    pub read_timeout: Option<String>,
    /// Print frames only and exit 0 even if decode errors were seen.
    #[arg(long)]
    pub frames_only: bool,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
