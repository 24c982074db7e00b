/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Engine error types.

use fixline_core::error::SessionError;
use fixline_core::types::SessionId;
use fixline_transport::{CodecError, ConnectionError};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while accepting, connecting or running sessions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Socket error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The inbound stream failed before a session was identified.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Session creation or recovery failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The session's connection has stopped.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A connection for this identity is already running.
    #[error("session {0} is already connected")]
    DuplicateSession(SessionId),

    /// The first message did not carry a usable identity.
    #[error("first message from {peer} lacks BeginString, SenderCompID or TargetCompID")]
    Unidentified {
        /// Remote address of the connection.
        peer: SocketAddr,
    },

    /// The connection task panicked or was cancelled.
    #[error("session task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let id = SessionId::new("FIX.4.2", "SERVER", "CLIENT");
        assert_eq!(
            EngineError::DuplicateSession(id.clone()).to_string(),
            "session FIX.4.2-SERVER-CLIENT is already connected"
        );
        assert_eq!(
            EngineError::from(ConnectionError::Closed(id)).to_string(),
            "session FIX.4.2-SERVER-CLIENT is no longer running"
        );
        assert_eq!(
            EngineError::from(SessionError::Ended).to_string(),
            "session error: session has ended"
        );
    }
}
