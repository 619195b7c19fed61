//! `tokio_util::codec` adapter for async serial ports and sockets.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::decoder::{DecodeEvent, StreamDecoder};
use crate::error::{FrameError, Result};

/// Frame codec for `FramedRead` / `FramedWrite`.
///
/// Decoding yields every [`DecodeEvent`], errors included; filter with
/// [`DecodeEvent::into_frame`] to see frames only. Bytes are moved out of the
/// read buffer into the inner [`StreamDecoder`] as it makes room for them.
#[derive(Debug, Default)]
pub struct SerialCodec {
    decoder: StreamDecoder,
}

impl SerialCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            decoder: StreamDecoder::with_config(config),
        }
    }

    /// The underlying stream decoder.
    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }

    fn check_size(&self, len: usize) -> Result<()> {
        let max = self.decoder.config().max_payload_size;
        if len > max {
            return Err(FrameError::PayloadTooLarge { size: len, max });
        }
        Ok(())
    }
}

impl Decoder for SerialCodec {
    type Item = DecodeEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DecodeEvent>> {
        loop {
            if let Some(event) = self.decoder.next_event() {
                return Ok(Some(event));
            }
            if src.is_empty() {
                return Ok(None);
            }
            let accepted = self.decoder.push(src);
            if accepted == 0 {
                return Ok(Some(DecodeEvent::Error(self.decoder.overflow())));
            }
            src.advance(accepted);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<DecodeEvent>> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        if self.decoder.in_frame() {
            debug!(
                buffered = self.decoder.buffered(),
                "stream ended inside a frame"
            );
        }
        self.decoder.reset();
        Ok(None)
    }
}

impl Encoder<Frame> for SerialCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        self.check_size(item.payload.len())?;
        encode_frame(item.id, &item.payload, dst)
    }
}

impl<'a> Encoder<(u16, &'a [u8])> for SerialCodec {
    type Error = FrameError;

    fn encode(&mut self, (id, payload): (u16, &'a [u8]), dst: &mut BytesMut) -> Result<()> {
        self.check_size(payload.len())?;
        encode_frame(id, payload, dst)
    }
}
