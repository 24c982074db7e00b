/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for FIX message framing.
//!
//! Decoding delegates to [`decode_frame`]: complete messages come out as
//! [`InboundFrame::Message`], checksum failures as
//! [`InboundFrame::Discarded`] so the stream keeps running, and fatal
//! framing errors end the stream. Encoding serializes a [`Message`] with
//! [`encode`].

use bytes::{Bytes, BytesMut};
use fixline_core::error::{EncodeError, FrameError};
use fixline_core::message::Message;
use fixline_tagvalue::{DEFAULT_MAX_MESSAGE_SIZE, decode_frame_with_limit, encode};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// Errors that can occur during codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The inbound stream cannot be framed any further.
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// An outbound message could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// One item of the inbound frame stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A complete, checksum-verified message.
    Message(Bytes),
    /// A message dropped for a recoverable framing error.
    Discarded(FrameError),
}

/// Tokio codec for FIX message framing.
#[derive(Debug, Clone, Copy)]
pub struct FixCodec {
    /// Maximum message size in bytes.
    max_message_size: usize,
}

impl Default for FixCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FixCodec {
    /// Creates a new codec accepting frames up to 1 MiB.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Sets the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Returns the maximum message size.
    #[inline]
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Decoder for FixCodec {
    type Item = InboundFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_frame_with_limit(src, self.max_message_size) {
            Ok(frame) => Ok(frame.map(InboundFrame::Message)),
            Err(err) if err.is_fatal() => Err(CodecError::Frame(err)),
            Err(err) => Ok(Some(InboundFrame::Discarded(err))),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = self.decode(src)?;
        if frame.is_none() && !src.is_empty() {
            debug!(bytes = src.len(), "dropping partial frame at end of stream");
            src.clear();
        }
        Ok(frame)
    }
}

impl Encoder<&Message> for FixCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = encode(item)?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(seq: u64) -> Message {
        Message::new()
            .with(8, "FIX.4.2")
            .with(35, "0")
            .with(34, seq.to_string())
            .with(49, "SNDR")
            .with(56, "TRGT")
            .with(52, "20121105-23:24:06.000")
    }

    fn wire(msg: &Message) -> BytesMut {
        let mut dst = BytesMut::new();
        FixCodec::new().encode(msg, &mut dst).unwrap();
        dst
    }

    #[test]
    fn test_codec_encode_matches_message_codec() {
        let msg = heartbeat(1);
        assert_eq!(wire(&msg), encode(&msg).unwrap());
    }

    #[test]
    fn test_codec_decode_complete_and_incomplete() {
        let full = wire(&heartbeat(1));
        let mut codec = FixCodec::new();

        let mut buf = BytesMut::from(&full[..full.len() - 5]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&full[full.len() - 5..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(InboundFrame::Message(full.freeze()))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_checksum_mismatch_is_discarded() {
        let mut bad = wire(&heartbeat(1));
        let idx = bad.len() - 2;
        bad[idx] = if bad[idx] == b'9' { b'0' } else { bad[idx] + 1 };
        let good = wire(&heartbeat(2));

        let mut buf = bad;
        buf.extend_from_slice(&good);
        let mut codec = FixCodec::new();

        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(InboundFrame::Discarded(FrameError::ChecksumMismatch { .. }))
        ));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(InboundFrame::Message(good.freeze()))
        );
    }

    #[test]
    fn test_codec_fatal_frame_error() {
        let mut buf = BytesMut::from(&b"8=FIX.4.2\x019=abc\x0135=0\x01"[..]);
        assert!(matches!(
            FixCodec::new().decode(&mut buf),
            Err(CodecError::Frame(FrameError::InvalidBodyLength { .. }))
        ));
    }

    #[test]
    fn test_codec_rejects_oversized_frame() {
        let full = wire(&heartbeat(1));
        let mut codec = FixCodec::new().with_max_message_size(full.len() - 1);
        assert_eq!(codec.max_message_size(), full.len() - 1);

        let mut buf = full.clone();
        assert_eq!(
            codec.decode(&mut buf),
            Err(CodecError::Frame(FrameError::MessageTooLarge {
                size: full.len(),
                max_size: full.len() - 1,
            }))
        );

        let mut buf = BytesMut::from(&b"8=FIX.4.2\x019=999999999\x0135=0\x01"[..]);
        assert!(matches!(
            FixCodec::new().decode(&mut buf),
            Err(CodecError::Frame(FrameError::MessageTooLarge { .. }))
        ));
    }

    #[test]
    fn test_codec_encode_missing_field() {
        let mut msg = heartbeat(1);
        msg.remove(34);
        let mut dst = BytesMut::new();
        assert_eq!(
            FixCodec::new().encode(&msg, &mut dst),
            Err(CodecError::Encode(EncodeError::MissingRequiredField { tag: 34 }))
        );
    }

    #[test]
    fn test_decode_eof_drops_partial_frame() {
        let full = wire(&heartbeat(1));
        let mut buf = BytesMut::from(&full[..20]);
        assert_eq!(FixCodec::new().decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }
}
