mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "uartframe", version, about = "UART framing toolkit")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true, env = "UARTFRAME_FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "UARTFRAME_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from(["uartframe", "encode", "--id", "0x1337", "--hex", "000102"])
            .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => assert_eq!(args.id, 0x1337),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "uartframe",
            "encode",
            "--id",
            "1",
            "--hex",
            "00",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_reserved_frame_id() {
        let err = Cli::try_parse_from(["uartframe", "encode", "--id", "0xF100", "--data", "x"])
            .expect_err("reserved id should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_decode_subcommand() {
        let cli = Cli::try_parse_from([
            "uartframe",
            "decode",
            "capture.bin",
            "--chunk-size",
            "7",
            "--frames-only",
        ])
        .expect("decode args should parse");

        match cli.command {
            Command::Decode(args) => {
                assert_eq!(args.chunk_size, Some(7));
                assert!(args.frames_only);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decode_path_conflicts_with_connect() {
        let err = Cli::try_parse_from([
            "uartframe",
            "decode",
            "capture.bin",
            "--connect",
            "127.0.0.1:2000",
        ])
        .expect_err("path and --connect should conflict");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
