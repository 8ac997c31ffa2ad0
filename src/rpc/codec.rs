//! Line codec for the host-facing frame stream.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a fixed maximum line
//! length to prevent memory exhaustion from an unterminated or
//! maliciously large inbound frame.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::{BridgeError, Result};

/// Maximum line length accepted on the inbound stream: 1 MiB.
///
/// Lines exceeding this limit cause [`FrameCodec::decode`] to return
/// [`BridgeError::Protocol`] with `"line too long"` rather than allocating
/// unbounded memory for a single frame.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Newline-delimited frame codec.
///
/// Each `\n`-terminated UTF-8 string is one complete protocol frame.
/// The max-length limit is a decoder-side concern and is not enforced
/// during encoding.
#[derive(Debug)]
pub struct FrameCodec(LinesCodec);

impl FrameCodec {
    /// Codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

impl Encoder<String> for FrameCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

fn map_codec_error(err: LinesCodecError) -> BridgeError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => {
            BridgeError::Protocol(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => BridgeError::Io(io_err.to_string()),
    }
}
