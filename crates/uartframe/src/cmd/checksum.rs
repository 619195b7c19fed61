use uartframe_frame::checksum;

use crate::cmd::input::resolve_payload;
use crate::cmd::ChecksumArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_checksum, OutputFormat};

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;
    print_checksum(checksum(&payload), payload.len(), format);
    Ok(SUCCESS)
}
