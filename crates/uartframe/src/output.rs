use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use uartframe_frame::{DecodeError, DecoderStats, Frame, FrameHeader};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventOutput {
    Frame {
        id: u16,
        payload_size: usize,
        payload: String,
    },
    Error {
        kind: &'static str,
        message: String,
    },
}

#[derive(Serialize)]
struct EncodedOutput {
    id: u16,
    payload_size: usize,
    length: u16,
    wire_size: usize,
    wire: String,
}

#[derive(Serialize)]
struct ChecksumOutput {
    algorithm: &'static str,
    payload_size: usize,
    checksum: String,
}

#[derive(Serialize)]
struct SummaryOutput {
    event: &'static str,
    frames: u64,
    errors: u64,
    bytes_skipped: u64,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput::Frame {
            id: frame.id,
            payload_size: frame.payload.len(),
            payload: payload_preview(frame.payload.as_ref()),
        }),
        OutputFormat::Table => {
            print_table(
                vec!["ID", "SIZE", "PAYLOAD"],
                vec![
                    format_id(frame.id),
                    frame.payload.len().to_string(),
                    payload_preview(frame.payload.as_ref()),
                ],
            );
        }
        OutputFormat::Pretty => {
            println!(
                "frame id={} size={} payload={}",
                format_id(frame.id),
                frame.payload.len(),
                payload_preview(frame.payload.as_ref())
            );
        }
        OutputFormat::Raw => print_raw(frame.payload.as_ref()),
    }
}

pub fn print_decode_error(err: &DecodeError, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput::Error {
            kind: error_kind(err),
            message: err.to_string(),
        }),
        OutputFormat::Table => {
            print_table(vec!["ERROR", "DETAIL"], vec![error_kind(err).to_string(), err.to_string()]);
        }
        OutputFormat::Pretty => println!("error kind={} {err}", error_kind(err)),
        OutputFormat::Raw => {}
    }
}

pub fn print_summary(stats: &DecoderStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            event: "summary",
            frames: stats.frames_decoded,
            errors: stats.errors,
            bytes_skipped: stats.bytes_skipped,
        }),
        OutputFormat::Table => {
            print_table(
                vec!["FRAMES", "ERRORS", "SKIPPED BYTES"],
                vec![
                    stats.frames_decoded.to_string(),
                    stats.errors.to_string(),
                    stats.bytes_skipped.to_string(),
                ],
            );
        }
        OutputFormat::Pretty => println!(
            "summary frames={} errors={} skipped={}",
            stats.frames_decoded, stats.errors, stats.bytes_skipped
        ),
        OutputFormat::Raw => {}
    }
}

pub fn print_encoded(header: &FrameHeader, payload_size: usize, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            id: header.id(),
            payload_size,
            length: header.length(),
            wire_size: wire.len(),
            wire: to_hex(wire),
        }),
        OutputFormat::Table => {
            print_table(
                vec!["ID", "SIZE", "LENGTH", "WIRE"],
                vec![
                    format_id(header.id()),
                    payload_size.to_string(),
                    header.length().to_string(),
                    to_hex(wire),
                ],
            );
        }
        OutputFormat::Pretty => {
            println!(
                "frame id={} size={} length={} wire={}",
                format_id(header.id()),
                payload_size,
                header.length(),
                to_hex(wire)
            );
        }
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_checksum(value: u16, payload_size: usize, format: OutputFormat) {
    let checksum = format!("0x{value:04X}");
    match format {
        OutputFormat::Json => print_json(&ChecksumOutput {
            algorithm: "CRC-16/USB",
            payload_size,
            checksum,
        }),
        OutputFormat::Table => {
            print_table(
                vec!["ALGORITHM", "SIZE", "CHECKSUM"],
                vec!["CRC-16/USB".to_string(), payload_size.to_string(), checksum],
            );
        }
        OutputFormat::Pretty => println!("crc16/usb={checksum} size={payload_size}"),
        // Wire order.
        OutputFormat::Raw => print_raw(&value.to_le_bytes()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    println!("{table}");
}

fn error_kind(err: &DecodeError) -> &'static str {
    match err {
        DecodeError::InvalidId { .. } => "invalid_id",
        DecodeError::LengthOverflow { .. } => "length_overflow",
        DecodeError::UnexpectedEndOfHeader { .. } => "unexpected_end_of_header",
        DecodeError::InvalidCharacter { .. } => "invalid_character",
        DecodeError::CrcMismatch { .. } => "crc_mismatch",
        DecodeError::Timeout { .. } => "timeout",
        DecodeError::CapacityExceeded { .. } => "capacity_exceeded",
    }
}

fn format_id(id: u16) -> String {
    format!("0x{id:04X}")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
