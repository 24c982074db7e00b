/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Notifications a session emits to its environment.

use crate::state::StateChange;
use fixline_core::error::Severity;
use fixline_core::message::Message;

/// Everything a session reports, in emission order, over its event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An accepted inbound message.
    Msg(Message),
    /// A fully stamped outbound message to be written to the wire.
    OutMsg(Message),
    /// Runtime state changed.
    State(StateChange),
    /// A failure; `Fatal` is always followed by [`SessionEvent::EndSession`].
    Error {
        /// How serious the failure is.
        severity: Severity,
        /// Human-readable description.
        description: String,
    },
    /// The counterparty's logon was accepted.
    Logon,
    /// The session ended; emitted exactly once.
    EndSession,
}

impl SessionEvent {
    /// Returns a short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Msg(_) => "msg",
            Self::OutMsg(_) => "out_msg",
            Self::State(_) => "state",
            Self::Error { .. } => "error",
            Self::Logon => "logon",
            Self::EndSession => "end_session",
        }
    }
}

/// Outcome of a non-fatal `Session::process_incoming` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Accepted and dispatched as [`SessionEvent::Msg`].
    Dispatched,
    /// Already processed possible duplicate; ignored.
    Duplicate,
    /// Dropped without dispatch; the session continues.
    Rejected,
}
