/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message encoder.
//!
//! This module provides an encoder for building FIX messages in the
//! standard tag=value format, and [`encode`] which serializes a [`Message`]
//! with the session header laid out in its fixed order.

use crate::checksum::{calculate_checksum, format_checksum};
use bytes::{BufMut, BytesMut};
use fixline_core::error::EncodeError;
use fixline_core::message::Message;
use fixline_core::tags;
use fixline_core::types::Timestamp;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// FIX message encoder.
///
/// Fields are appended in call order to the region between BodyLength and
/// Checksum. BeginString, BodyLength and Checksum are written by
/// [`Encoder::finish`].
#[derive(Debug)]
pub struct Encoder {
    /// Buffer for everything between BodyLength and Checksum.
    body: BytesMut,
    /// The BeginString value (e.g., "FIX.4.2").
    begin_string: String,
}

impl Encoder {
    /// Creates a new encoder with the specified BeginString.
    #[must_use]
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self {
            body: BytesMut::with_capacity(256),
            begin_string: begin_string.into(),
        }
    }

    /// Appends a field with a string value.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) {
        self.put_raw(tag, value.as_bytes());
    }

    /// Appends a field with an unsigned integer value.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        let s = buf.format(value);
        self.put_raw(tag, s.as_bytes());
    }

    /// Appends a field with raw bytes.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) {
        let mut tag_buf = itoa::Buffer::new();
        let tag_str = tag_buf.format(tag);

        self.body.put_slice(tag_str.as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
    }

    /// Finalizes the message: prepends `8=` and `9=`, appends `10=`.
    #[must_use]
    pub fn finish(self) -> BytesMut {
        let body_len = self.body.len();
        let mut len_buf = itoa::Buffer::new();
        let len_str = len_buf.format(body_len);

        let mut message =
            BytesMut::with_capacity(self.begin_string.len() + len_str.len() + body_len + 14);
        message.put_slice(b"8=");
        message.put_slice(self.begin_string.as_bytes());
        message.put_u8(SOH);
        message.put_slice(b"9=");
        message.put_slice(len_str.as_bytes());
        message.put_u8(SOH);
        message.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&message));
        message.put_slice(b"10=");
        message.put_slice(&checksum);
        message.put_u8(SOH);

        message
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

/// Serializes a message to wire format.
///
/// Caller-supplied BodyLength and CheckSum are ignored and recomputed. The
/// header block is written as `35, 52, 49, 56, 34`, followed by every other
/// tag in the message's own order. SendingTime defaults to now when absent.
///
/// # Errors
/// Returns `EncodeError::MissingRequiredField` if BeginString, MsgType,
/// SenderCompID, TargetCompID or MsgSeqNum is absent.
pub fn encode(message: &Message) -> Result<BytesMut, EncodeError> {
    let required = |tag: u32| {
        message
            .get(tag)
            .ok_or(EncodeError::MissingRequiredField { tag })
    };

    let mut encoder = Encoder::new(required(tags::BEGIN_STRING)?);
    for tag in tags::HEADER_ORDER {
        match message.get(tag) {
            Some(value) => encoder.put_str(tag, value),
            None if tag == tags::SENDING_TIME => {
                encoder.put_str(tag, &Timestamp::now().format_millis());
            }
            None => return Err(EncodeError::MissingRequiredField { tag }),
        }
    }

    for (tag, value) in message.iter() {
        if !is_envelope_tag(tag) {
            encoder.put_str(tag, value);
        }
    }

    Ok(encoder.finish())
}

/// Serializes a message without requiring any header field.
///
/// Header fields are laid out as in [`encode`] but absent ones are skipped,
/// SendingTime included. An absent BeginString is written empty. Used to
/// persist inbound messages that fail header validation.
#[must_use]
pub fn encode_lenient(message: &Message) -> BytesMut {
    let mut encoder = Encoder::new(message.get(tags::BEGIN_STRING).unwrap_or_default());
    for tag in tags::HEADER_ORDER {
        if let Some(value) = message.get(tag) {
            encoder.put_str(tag, value);
        }
    }
    for (tag, value) in message.iter() {
        if !is_envelope_tag(tag) {
            encoder.put_str(tag, value);
        }
    }
    encoder.finish()
}

/// Tags the encoder positions itself rather than copying from the body.
#[inline]
fn is_envelope_tag(tag: u32) -> bool {
    matches!(
        tag,
        tags::BEGIN_STRING | tags::BODY_LENGTH | tags::CHECKSUM
    ) || tags::HEADER_ORDER.contains(&tag)
}
