/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Incremental frame decoder.
//!
//! Cuts a byte stream into complete, checksum-verified messages using the
//! BodyLength field. The search for the end of BodyLength starts at a fixed
//! offset that assumes a 7-character BeginString (`8=FIX.4.2<SOH>` is 10
//! bytes). Versions of another width (e.g. `FIXT.1.1`) are not framed
//! correctly and surface as [`FrameError::InvalidBodyLength`].

use crate::checksum::checksum;
use crate::decoder::SOH;
use bytes::{Bytes, BytesMut};
use fixline_core::error::FrameError;
use memchr::memchr;
use tracing::warn;

/// Byte length of the BeginString field assumed by the frame decoder.
pub const BEGIN_STRING_FIELD_LEN: usize = 10;

/// Offset of the BodyLength value (after `9=`).
const BODY_LENGTH_VALUE_OFFSET: usize = BEGIN_STRING_FIELD_LEN + 2;

/// Width of the trailer, `10=DDD<SOH>`.
pub const CHECKSUM_FIELD_LEN: usize = 7;

/// Buffered bytes after which a missing BodyLength terminator is fatal.
pub const MAX_UNFRAMED_BYTES: usize = 100;

/// Default upper bound on a frame's total length (1 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Extracts one complete message from the front of `buf`, accepting frames
/// up to [`DEFAULT_MAX_MESSAGE_SIZE`].
///
/// # Errors
/// See [`decode_frame_with_limit`].
#[inline]
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
    decode_frame_with_limit(buf, DEFAULT_MAX_MESSAGE_SIZE)
}

/// Extracts one complete message from the front of `buf`.
///
/// # Returns
/// - `Ok(Some(frame))` with the message removed from `buf`
/// - `Ok(None)` if more data is needed
///
/// # Errors
/// - fatal [`FrameError`] if BodyLength cannot be located or parsed, or
///   declares a frame longer than `max_message_size`; `buf` is left
///   untouched
/// - [`FrameError::ChecksumMismatch`] if the trailer does not match; the
///   offending message has already been removed from `buf`, so the caller
///   may keep decoding
pub fn decode_frame_with_limit(
    buf: &mut BytesMut,
    max_message_size: usize,
) -> Result<Option<Bytes>, FrameError> {
    if buf.len() <= BEGIN_STRING_FIELD_LEN {
        return Ok(None);
    }

    let Some(pos) = memchr(SOH, &buf[BEGIN_STRING_FIELD_LEN..]) else {
        if buf.len() > MAX_UNFRAMED_BYTES {
            return Err(FrameError::MissingBodyLengthTerminator {
                buffered: buf.len(),
            });
        }
        return Ok(None);
    };
    let body_length_end = BEGIN_STRING_FIELD_LEN + pos;

    let value = buf
        .get(BODY_LENGTH_VALUE_OFFSET..body_length_end)
        .unwrap_or_default();
    let body_length = parse_body_length(value).ok_or_else(|| FrameError::InvalidBodyLength {
        value: String::from_utf8_lossy(value).into_owned(),
    })?;

    let total_length = body_length_end + 1 + body_length + CHECKSUM_FIELD_LEN;
    if total_length > max_message_size {
        return Err(FrameError::MessageTooLarge {
            size: total_length,
            max_size: max_message_size,
        });
    }
    if buf.len() < total_length {
        buf.reserve(total_length - buf.len());
        return Ok(None);
    }

    let frame = buf.split_to(total_length).freeze();

    let calculated = checksum(&frame[..total_length - CHECKSUM_FIELD_LEN]);
    let declared = &frame[total_length - 4..total_length - 1];
    if calculated.as_bytes() != declared {
        let err = FrameError::ChecksumMismatch {
            calculated,
            declared: String::from_utf8_lossy(declared).into_owned(),
        };
        warn!(error = %err, frame = %String::from_utf8_lossy(&frame), "frame discarded");
        return Err(err);
    }

    Ok(Some(frame))
}

#[inline]
fn parse_body_length(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() || bytes.len() > 9 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Stateful frame decoder owning its accumulation buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    max_message_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates a decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Sets the maximum frame length.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Returns the maximum frame length.
    #[inline]
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Appends `data` and returns an iterator over every frame now
    /// extractable.
    ///
    /// Checksum mismatches are yielded as `Err` and decoding continues with
    /// the remaining bytes. A fatal error is yielded once and ends the
    /// iteration.
    pub fn feed(&mut self, data: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(data);
        Frames {
            decoder: self,
            done: false,
        }
    }

    /// Extracts the next frame from the buffered bytes.
    ///
    /// # Errors
    /// See [`decode_frame`].
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        decode_frame_with_limit(&mut self.buffer, self.max_message_size)
    }

    /// Returns the number of buffered, not yet framed bytes.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Iterator returned by [`FrameDecoder::feed`].
#[derive(Debug)]
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Bytes, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = err.is_fatal();
                Some(Err(err))
            }
        }
    }
}
