/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core types shared by every layer:
//! - [`SessionId`]: the (version, sender, target) identity of a session
//! - [`Timestamp`]: UTC timestamp rendered in FIX `SendingTime` format

use arrayvec::ArrayString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a running session and namespace of its persisted log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId {
    /// BeginString (FIX version).
    pub begin_string: String,
    /// Local SenderCompID.
    pub sender_comp_id: String,
    /// Remote TargetCompID.
    pub target_comp_id: String,
}

impl SessionId {
    /// Creates a new session ID.
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
        }
    }

    /// Returns the identity seen from the other side of the connection.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(
            self.begin_string.clone(),
            self.target_comp_id.clone(),
            self.sender_comp_id.clone(),
        )
    }
}

/// Renders as `BEGIN-SENDER-TARGET`, which is also the store key.
impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )
    }
}

/// UTC timestamp with millisecond wire precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time.
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    ///
    /// Out-of-range values clamp to the epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }

    /// Returns milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub fn as_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Formats as `YYYYMMDD-HH:MM:SS.mmm`.
    #[must_use]
    pub fn format_millis(self) -> ArrayString<21> {
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(
            &mut buf,
            format_args!("{}", self.0.format("%Y%m%d-%H:%M:%S%.3f")),
        );
        buf
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_millis())
    }
}
