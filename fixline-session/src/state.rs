/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session lifecycle state and runtime-state snapshots.
//!
//! A session moves `AwaitingLogon → LoggedIn → Ended`; `Ended` is terminal
//! and reachable from either earlier state.

use fixline_core::types::Timestamp;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No logon processed yet; only a Logon is acceptable.
    #[default]
    AwaitingLogon,
    /// Logon processed; normal traffic flows.
    LoggedIn,
    /// Terminal state after a fatal error or completed logout.
    Ended,
}

impl SessionState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingLogon => "AwaitingLogon",
            Self::LoggedIn => "LoggedIn",
            Self::Ended => "Ended",
        }
    }

    /// Returns true once logged in and not yet ended.
    #[inline]
    #[must_use]
    pub const fn is_logged_in(self) -> bool {
        matches!(self, Self::LoggedIn)
    }

    /// Returns true for the terminal state.
    #[inline]
    #[must_use]
    pub const fn is_ended(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial runtime flags applied by `Session::modify_behavior`.
///
/// `None` leaves the current setting unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Behavior {
    /// Send heartbeats when silent.
    pub send_heartbeats: Option<bool>,
    /// Test and time out a silent counterparty.
    pub expect_heartbeats: Option<bool>,
    /// Answer inbound logons.
    pub respond_to_logon: Option<bool>,
}

impl Behavior {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            send_heartbeats: None,
            expect_heartbeats: None,
            respond_to_logon: None,
        }
    }

    /// Stops all liveness checking; used when the transport has gone away.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self::new().send_heartbeats(false).expect_heartbeats(false)
    }

    /// Sets the heartbeat sending flag.
    #[must_use]
    pub const fn send_heartbeats(mut self, send: bool) -> Self {
        self.send_heartbeats = Some(send);
        self
    }

    /// Sets the heartbeat expectation flag.
    #[must_use]
    pub const fn expect_heartbeats(mut self, expect: bool) -> Self {
        self.expect_heartbeats = Some(expect);
        self
    }

    /// Sets the logon response flag.
    #[must_use]
    pub const fn respond_to_logon(mut self, respond: bool) -> Self {
        self.respond_to_logon = Some(respond);
        self
    }
}

/// Partial snapshot of session runtime state.
///
/// Only the fields touched by the triggering transition are populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateChange {
    /// Next expected incoming sequence number.
    pub incoming_seq_num: Option<u64>,
    /// Next outgoing sequence number.
    pub outgoing_seq_num: Option<u64>,
    /// Logged-in flag.
    pub is_logged_in: Option<bool>,
    /// Outstanding resend request flag.
    pub is_resend_requested: Option<bool>,
    /// Locally initiated logout flag.
    pub is_logout_requested: Option<bool>,
    /// Negotiated heartbeat interval.
    pub heartbeat_interval: Option<Duration>,
    /// Whether a heartbeat timer is running.
    pub heartbeat_active: Option<bool>,
    /// Time the last inbound message was processed.
    pub last_incoming: Option<Timestamp>,
    /// Time the last outbound message was sent.
    pub last_outgoing: Option<Timestamp>,
    /// Id of the last TestRequest sent.
    pub test_request_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_flags() {
        assert_eq!(SessionState::default(), SessionState::AwaitingLogon);
        assert!(SessionState::LoggedIn.is_logged_in());
        assert!(!SessionState::AwaitingLogon.is_logged_in());
        assert!(SessionState::Ended.is_ended());
        assert_eq!(SessionState::LoggedIn.to_string(), "LoggedIn");
    }

    #[test]
    fn test_behavior_builders() {
        assert_eq!(
            Behavior::disconnected(),
            Behavior {
                send_heartbeats: Some(false),
                expect_heartbeats: Some(false),
                respond_to_logon: None,
            }
        );
        assert_eq!(Behavior::new().respond_to_logon(true).respond_to_logon, Some(true));
    }
}
