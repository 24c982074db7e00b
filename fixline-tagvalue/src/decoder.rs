/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tag=value message decoder.
//!
//! Splits framed message text on the SOH separator and each field on the
//! first `=`, producing a [`Message`]. Framing and checksum validation are
//! the frame decoder's job; this layer only fails on text that cannot be
//! split into fields at all.

use fixline_core::error::DecodeError;
use fixline_core::message::Message;
use memchr::memchr;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// Iterator over the `(tag, value)` fields of a message buffer.
///
/// Empty segments and segments with an empty tag (for example the one after a
/// trailing separator) are skipped.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder over the given message bytes.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidUtf8` if the input is not valid UTF-8.
    pub fn new(input: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            input: std::str::from_utf8(input)?,
            offset: 0,
        })
    }

    /// Parses the next field, or `None` once the buffer is exhausted.
    ///
    /// # Errors
    /// Returns `DecodeError` for a segment that is not `tag=value`.
    pub fn next_field(&mut self) -> Option<Result<(u32, &'a str), DecodeError>> {
        loop {
            if self.offset >= self.input.len() {
                return None;
            }

            let remaining = &self.input[self.offset..];
            let end = memchr(SOH, remaining.as_bytes()).unwrap_or(remaining.len());
            let segment = &remaining[..end];
            self.offset += end + 1;

            if segment.is_empty() {
                continue;
            }

            let Some(eq_pos) = memchr(EQUALS, segment.as_bytes()) else {
                return Some(Err(DecodeError::MissingDelimiter(segment.to_string())));
            };

            let tag_text = &segment[..eq_pos];
            if tag_text.is_empty() {
                continue;
            }

            return Some(match parse_tag(tag_text.as_bytes()) {
                Some(tag) => Ok((tag, &segment[eq_pos + 1..])),
                None => Err(DecodeError::InvalidTag(tag_text.to_string())),
            });
        }
    }

    /// Returns true if the buffer has been fully consumed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.input.len()
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<(u32, &'a str), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_field()
    }
}

/// Decodes raw message text into a tag→value [`Message`].
///
/// A tag appearing twice keeps its first position and its last value.
///
/// # Errors
/// Returns `DecodeError` if the input is not valid UTF-8 or contains a
/// segment that is not `tag=value`.
pub fn decode(raw: &[u8]) -> Result<Message, DecodeError> {
    let mut message = Message::new();
    for field in Decoder::new(raw)? {
        let (tag, value) = field?;
        message.set(tag, value);
    }
    Ok(message)
}

/// Parses a tag number from ASCII bytes.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }

    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    Some(result)
}
