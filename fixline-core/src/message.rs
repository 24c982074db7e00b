/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message representation for the session layer.
//!
//! This module provides:
//! - [`Message`]: ordered tag→value association with typed envelope accessors
//! - [`MsgType`]: the session-level message types plus a catch-all

use crate::tags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session-level FIX message types.
///
/// Application message types are carried verbatim in [`MsgType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    /// Heartbeat (0).
    Heartbeat,
    /// Test Request (1).
    TestRequest,
    /// Resend Request (2).
    ResendRequest,
    /// Reject (3).
    Reject,
    /// Sequence Reset (4).
    SequenceReset,
    /// Logout (5).
    Logout,
    /// Logon (A).
    Logon,
    /// Any other (application) message type.
    Other(String),
}

impl FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            other => Self::Other(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire representation of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Returns true if this is an administrative (session level) message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Returns true if a resend replaces this message with a gap-fill
    /// instead of replaying its content.
    #[must_use]
    pub fn is_gap_filled_on_resend(&self) -> bool {
        matches!(
            self,
            Self::Logon
                | Self::Logout
                | Self::ResendRequest
                | Self::Heartbeat
                | Self::TestRequest
                | Self::SequenceReset
        )
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A FIX message as an ordered collection of unique `(tag, value)` pairs.
///
/// Insertion order is preserved; setting an existing tag replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    fields: Vec<(u32, String)>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates an empty message carrying only a message type.
    #[must_use]
    pub fn of_type(msg_type: MsgType) -> Self {
        Self::new().with(tags::MSG_TYPE, msg_type.as_str())
    }

    /// Builder-style [`Message::set`].
    #[must_use]
    pub fn with(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.set(tag, value);
        self
    }

    /// Sets a field, replacing an existing value for the same tag in place.
    pub fn set(&mut self, tag: u32, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, tag: u32) -> Option<String> {
        let pos = self.fields.iter().position(|(t, _)| *t == tag)?;
        Some(self.fields.remove(pos).1)
    }

    /// Gets a field value by tag.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Gets a field value parsed as `T`; `None` if absent or unparsable.
    #[must_use]
    pub fn get_as<T: FromStr>(&self, tag: u32) -> Option<T> {
        self.get(tag).and_then(|v| v.trim().parse().ok())
    }

    /// Returns true if the tag is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.fields.iter().any(|(t, _)| *t == tag)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.fields.iter().map(|(t, v)| (*t, v.as_str()))
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the message has no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copies every field of `other` into `self`, overriding existing values.
    pub fn merge(&mut self, other: &Message) {
        for (tag, value) in other.iter() {
            self.set(tag, value);
        }
    }

    /// BeginString (8).
    #[must_use]
    pub fn begin_string(&self) -> Option<&str> {
        self.get(tags::BEGIN_STRING)
    }

    /// MsgType (35).
    #[must_use]
    pub fn msg_type(&self) -> Option<MsgType> {
        self.get(tags::MSG_TYPE).and_then(|v| v.parse().ok())
    }

    /// MsgSeqNum (34).
    #[must_use]
    pub fn seq_num(&self) -> Option<u64> {
        self.get_as(tags::MSG_SEQ_NUM)
    }

    /// SenderCompID (49).
    #[must_use]
    pub fn sender_comp_id(&self) -> Option<&str> {
        self.get(tags::SENDER_COMP_ID)
    }

    /// TargetCompID (56).
    #[must_use]
    pub fn target_comp_id(&self) -> Option<&str> {
        self.get(tags::TARGET_COMP_ID)
    }

    /// SendingTime (52).
    #[must_use]
    pub fn sending_time(&self) -> Option<&str> {
        self.get(tags::SENDING_TIME)
    }

    /// HeartBtInt (108) in seconds.
    #[must_use]
    pub fn heart_bt_int(&self) -> Option<u64> {
        self.get_as(tags::HEART_BT_INT)
    }

    /// NewSeqNo (36).
    #[must_use]
    pub fn new_seq_no(&self) -> Option<u64> {
        self.get_as(tags::NEW_SEQ_NO)
    }

    /// TestReqID (112).
    #[must_use]
    pub fn test_req_id(&self) -> Option<&str> {
        self.get(tags::TEST_REQ_ID)
    }

    /// True when PossDupFlag (43) is `Y`.
    #[must_use]
    pub fn is_poss_dup(&self) -> bool {
        self.get(tags::POSS_DUP_FLAG) == Some("Y")
    }

    /// True when GapFillFlag (123) is `Y`.
    #[must_use]
    pub fn is_gap_fill(&self) -> bool {
        self.get(tags::GAP_FILL_FLAG) == Some("Y")
    }
}

impl FromIterator<(u32, String)> for Message {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        let mut msg = Self::new();
        for (tag, value) in iter {
            msg.set(tag, value);
        }
        msg
    }
}

impl IntoIterator for Message {
    type Item = (u32, String);
    type IntoIter = std::vec::IntoIter<(u32, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Renders the message with `|` in place of the field separator.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tag, value) in self.iter() {
            write!(f, "{tag}={value}|")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_from_str() {
        assert_eq!("0".parse::<MsgType>().unwrap(), MsgType::Heartbeat);
        assert_eq!("A".parse::<MsgType>().unwrap(), MsgType::Logon);
        assert_eq!(
            "D".parse::<MsgType>().unwrap(),
            MsgType::Other("D".to_string())
        );
        assert_eq!(MsgType::SequenceReset.as_str(), "4");
    }

    #[test]
    fn test_msg_type_gap_fill_set() {
        assert!(MsgType::Logon.is_gap_filled_on_resend());
        assert!(MsgType::SequenceReset.is_gap_filled_on_resend());
        assert!(!MsgType::Reject.is_gap_filled_on_resend());
        assert!(MsgType::Reject.is_admin());
        assert!(!MsgType::Other("D".into()).is_gap_filled_on_resend());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut msg = Message::new().with(35, "D").with(55, "IBM").with(38, "100");
        msg.set(55, "MSFT");

        let tags: Vec<u32> = msg.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec![35, 55, 38]);
        assert_eq!(msg.get(55), Some("MSFT"));
        assert_eq!(msg.len(), 3);
    }

    #[test]
    fn test_typed_accessors() {
        let msg = Message::new()
            .with(8, "FIX.4.2")
            .with(35, "A")
            .with(34, "12")
            .with(49, "EXEC")
            .with(56, "BANZAI")
            .with(108, "30")
            .with(43, "Y");

        assert_eq!(msg.begin_string(), Some("FIX.4.2"));
        assert_eq!(msg.msg_type(), Some(MsgType::Logon));
        assert_eq!(msg.seq_num(), Some(12));
        assert_eq!(msg.sender_comp_id(), Some("EXEC"));
        assert_eq!(msg.target_comp_id(), Some("BANZAI"));
        assert_eq!(msg.heart_bt_int(), Some(30));
        assert!(msg.is_poss_dup());
        assert!(!msg.is_gap_fill());
        assert_eq!(msg.new_seq_no(), None);
    }

    #[test]
    fn test_merge_and_remove() {
        let mut base = Message::new().with(8, "FIX.4.2").with(34, "1");
        base.merge(&Message::new().with(34, "7").with(58, "hi"));
        assert_eq!(base.seq_num(), Some(7));
        assert_eq!(base.remove(58).as_deref(), Some("hi"));
        assert!(!base.contains(58));
        assert_eq!(base.to_string(), "8=FIX.4.2|34=7|");
    }
}
