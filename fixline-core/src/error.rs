/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the fixline session engine.
//!
//! Every layer has its own `thiserror` enum; [`FixError`] aggregates them for
//! callers that only want a single error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all fixline operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error while splitting a message into fields.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error while serializing a message.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error while framing a byte stream.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How serious a reported condition is.
///
/// `Fatal` conditions always end the session; the others leave it running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The session cannot continue.
    Fatal,
    /// A message was rejected but the session continues.
    Error,
    /// Recoverable protocol irregularity.
    Warn,
}

impl Severity {
    /// Returns the upper-case label used in log lines and notifications.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
        }
    }

    /// Returns true for [`Severity::Fatal`].
    #[inline]
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that occur while splitting raw message text into fields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A field has no `=` between tag and value.
    #[error("field without tag/value delimiter: {0:?}")]
    MissingDelimiter(String),

    /// Invalid tag format (not a valid integer).
    #[error("invalid tag format: {0:?}")]
    InvalidTag(String),

    /// Invalid UTF-8 in the message text.
    #[error("invalid utf-8 in message: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Errors that occur during message encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Missing required header field during encoding.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },
}

/// Errors raised by the frame decoder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// No separator ends the body length field after too many buffered bytes.
    #[error("body length not extractable after {buffered} buffered bytes, stream malformed")]
    MissingBodyLengthTerminator {
        /// Number of bytes buffered when the search gave up.
        buffered: usize,
    },

    /// The body length value is not an integer.
    #[error("unable to parse body length {value:?}, stream malformed")]
    InvalidBodyLength {
        /// The offending text.
        value: String,
    },

    /// The declared message length exceeds the configured maximum.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Total frame length implied by BodyLength.
        size: usize,
        /// Maximum allowed frame length.
        max_size: usize,
    },

    /// Checksum mismatch; the message was discarded.
    #[error("discarding message, checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        calculated: String,
        /// Checksum carried in the trailer.
        declared: String,
    },
}

impl FrameError {
    /// Returns true if the stream cannot be framed any further.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Returns the severity to report for this error.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        if self.is_fatal() {
            Severity::Fatal
        } else {
            Severity::Error
        }
    }
}

/// Errors in session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An inbound message carries no message type while awaiting logon.
    #[error("message contains no tag 35, unable to continue")]
    MissingMsgType,

    /// The first inbound message was not a logon.
    #[error("first message must be logon, received msg type {msg_type}")]
    FirstMessageNotLogon {
        /// Message type actually received.
        msg_type: String,
    },

    /// Logon without a usable heartbeat interval.
    #[error("logon rejected: heartbeat interval (tag 108) missing or invalid")]
    MissingHeartbeatInterval,

    /// Message lacks one of the envelope tags 34, 35, 49, 56, 52.
    #[error("message does not contain one of required tags 34,35,49,56,52 (missing {tag})")]
    MissingRequiredTag {
        /// First missing tag.
        tag: u32,
    },

    /// Sequence reset without a usable new sequence number.
    #[error("sequence reset without a valid new sequence number (tag 36)")]
    MissingNewSeqNo,

    /// Incoming sequence number lower than expected without possible duplicate flag.
    #[error("incoming sequence number {received} lower than expected {expected}")]
    SequenceTooLow {
        /// Next expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// A sequence reset tried to lower the incoming counter.
    #[error("sequence reset may not decrement sequence numbers: current {current}, requested {requested}")]
    SequenceResetDecrement {
        /// Current expected sequence number.
        current: u64,
        /// Requested new sequence number.
        requested: u64,
    },

    /// No traffic from the counterparty for twice the heartbeat interval.
    #[error("no heartbeat from counter party in {elapsed_ms} milliseconds")]
    HeartbeatTimeout {
        /// Inbound silence in milliseconds.
        elapsed_ms: u64,
    },

    /// Operation attempted after the session ended.
    #[error("session has ended")]
    Ended,

    /// Message store failure surfaced through the session.
    #[error("store failure: {0}")]
    Store(String),

    /// Session configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Returns the severity with which this error is reported.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::MissingMsgType
            | Self::FirstMessageNotLogon { .. }
            | Self::SequenceTooLow { .. }
            | Self::SequenceResetDecrement { .. }
            | Self::HeartbeatTimeout { .. }
            | Self::Ended => Severity::Fatal,
            Self::MissingHeartbeatInterval | Self::Configuration(_) => Severity::Error,
            Self::MissingRequiredTag { .. } | Self::MissingNewSeqNo | Self::Store(_) => {
                Severity::Warn
            }
        }
    }
}

/// Errors in message store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to append a message.
    #[error("failed to append message for {session}: {reason}")]
    AppendFailed {
        /// Session log that was written.
        session: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to replay a session log.
    #[error("failed to replay log for {session}: {reason}")]
    ReplayFailed {
        /// Session log that was read.
        session: String,
        /// Reason for failure.
        reason: String,
    },

    /// Store is corrupted.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the corruption.
        reason: String,
    },
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
