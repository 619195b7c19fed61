use std::fs::File;
use std::io::{self, Read};
use std::net::TcpStream;

use tracing::{info, warn};
use uartframe_frame::{DecodeEvent, FrameConfig, FrameError, FrameReader};

use crate::cmd::input::parse_duration;
use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_decode_error, print_frame, print_summary, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = build_config(&args)?;

    if let Some(addr) = &args.connect {
        let stream = TcpStream::connect(addr)
            .map_err(|err| io_error(&format!("connect to {addr} failed"), err))?;
        let reader = FrameReader::with_config_tcp(stream, config)
            .map_err(|err| frame_error("connect failed", err))?;
        return drain(reader, &args, format);
    }

    let source: Box<dyn Read> = match &args.path {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let source = ChunkedRead {
        inner: source,
        limit: args.chunk_size.unwrap_or(usize::MAX),
    };
    drain(FrameReader::with_config(source, config), &args, format)
}

fn build_config(args: &DecodeArgs) -> CliResult<FrameConfig> {
    if args.chunk_size == Some(0) {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }

    let mut config = FrameConfig::default();
    if let Some(max) = args.max_payload {
        config.max_payload_size = max;
    }
    if let Some(timeout) = &args.frame_timeout {
        config.frame_timeout = Some(parse_duration(timeout)?);
    }
    if let Some(timeout) = &args.read_timeout {
        config.read_timeout = Some(parse_duration(timeout)?);
    }
    Ok(config)
}

fn drain<R: Read>(
    mut reader: FrameReader<R>,
    args: &DecodeArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    loop {
        match reader.read_event() {
            Ok(DecodeEvent::Frame(frame)) => print_frame(&frame, format),
            Ok(DecodeEvent::Error(err)) => {
                if !args.frames_only {
                    print_decode_error(&err, format);
                }
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }

    if reader.decoder().in_frame() {
        warn!(
            buffered = reader.decoder().buffered(),
            "input ended inside a frame"
        );
    }

    let stats = reader.decoder().stats();
    info!(
        frames = stats.frames_decoded,
        errors = stats.errors,
        skipped = stats.bytes_skipped,
        "decode finished"
    );
    if args.frames_only {
        return Ok(SUCCESS);
    }

    print_summary(&stats, format);
    if stats.errors > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Caps every read, to replay a capture the way a UART driver hands it over.
struct ChunkedRead<R> {
    inner: R,
    limit: usize,
}

impl<R: Read> Read for ChunkedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.limit);
        self.inner.read(&mut buf[..len])
    }
}
