use std::fs;

use tracing::info;
use uartframe_frame::{encode, FrameHeader};

use crate::cmd::input::resolve_payload;
use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;
    let header =
        FrameHeader::new(args.id, payload.len()).map_err(|err| frame_error("encode failed", err))?;
    let wire = encode(args.id, &payload).map_err(|err| frame_error("encode failed", err))?;

    if let Some(path) = &args.output {
        fs::write(path, &wire)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        info!(path = %path.display(), wire_size = wire.len(), "frame written");
        if matches!(format, OutputFormat::Raw) {
            return Ok(SUCCESS);
        }
    }

    print_encoded(&header, payload.len(), &wire, format);
    Ok(SUCCESS)
}
