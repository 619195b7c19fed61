use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use uartframe_frame::ID_MAX;

use crate::cmd::PayloadArgs;
use crate::exit::{io_error, CliError, CliResult, USAGE};

/// Parse a frame ID given as decimal or `0x`-prefixed hex.
pub fn parse_id(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse::<u16>(),
    };
    let id = parsed.map_err(|_| format!("invalid frame id: {input}"))?;
    if id > ID_MAX {
        return Err(format!("frame id 0x{id:04X} is reserved (max 0x{ID_MAX:04X})"));
    }
    Ok(id)
}

/// Parse a hex string into bytes. Whitespace, `:` separators and a leading
/// `0x` are accepted.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if let Some(bad) = digits.iter().find(|b| !b.is_ascii_hexdigit()) {
        return Err(CliError::new(
            USAGE,
            format!("--hex has invalid digit {:?}", char::from(*bad)),
        ));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("--hex has an odd number of digits ({})", digits.len()),
        ));
    }

    Ok(digits
        .chunks_exact(2)
        .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
        .collect())
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Resolve the payload from whichever of `--data`, `--hex` or `--file` was
/// given. No source means an empty payload.
pub fn resolve_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return read_file_or_stdin(path);
    }
    Ok(Vec::new())
}

fn read_file_or_stdin(path: &Path) -> CliResult<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(buf);
    }
    fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

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

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn payload(data: Option<&str>, hex: Option<&str>, file: Option<PathBuf>) -> PayloadArgs {
        PayloadArgs {
            data: data.map(str::to_string),
            hex: hex.map(str::to_string),
            file,
        }
    }

    #[test]
    fn parse_id_accepts_decimal_and_hex() {
        assert_eq!(parse_id("0"), Ok(0));
        assert_eq!(parse_id("4919"), Ok(0x1337));
        assert_eq!(parse_id("0x1337"), Ok(0x1337));
        assert_eq!(parse_id("0XF0FF"), Ok(0xF0FF));
    }

    #[test]
    fn parse_id_rejects_reserved_and_garbage() {
        assert!(parse_id("0xF100").is_err());
        assert!(parse_id("65535").is_err());
        assert!(parse_id("65536").is_err());
        assert!(parse_id("frame").is_err());
    }

    #[test]
    fn parse_hex_variants() {
        assert_eq!(parse_hex("000102").unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_hex("0xF1FF").unwrap(), vec![0xF1, 0xFF]);
        assert_eq!(parse_hex("de ad:be\nef").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }

    #[test]
    fn resolve_payload_sources() {
        assert_eq!(resolve_payload(&payload(Some("hi"), None, None)).unwrap(), b"hi");
        assert_eq!(
            resolve_payload(&payload(None, Some("0001"), None)).unwrap(),
            vec![0, 1]
        );
        assert!(resolve_payload(&payload(None, None, None)).unwrap().is_empty());

        let path = std::env::temp_dir().join(format!("uartframe-input-{}", std::process::id()));
        fs::write(&path, b"from file").unwrap();
        let from_file = resolve_payload(&payload(None, None, Some(path.clone()))).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(from_file, b"from file");
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
