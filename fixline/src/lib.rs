/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline
//!
//! A FIX session-layer engine for Rust.
//!
//! fixline frames and parses tag=value messages, runs the session protocol
//! (logon, sequencing, gap detection and resend servicing, heartbeats,
//! logout) and persists every message so a restarted session resumes its
//! sequence numbers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fixline::prelude::*;
//!
//! let acceptor = EngineBuilder::new()
//!     .with_application(MyApplication)
//!     .with_store(Arc::new(FileStore::open("./store").await?))
//!     .acceptor("0.0.0.0:9878")
//!     .await?;
//! acceptor.run().await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Messages, identities, timestamps and error types
//! - [`tagvalue`]: Tag=value encoding, decoding and stream framing
//! - [`session`]: Session layer protocol implementation
//! - [`store`]: Message persistence
//! - [`transport`]: Tokio codec and connection driver
//! - [`engine`]: Acceptor, initiator and application callbacks

pub mod core {
    //! Messages, identities, timestamps and error types.
    pub use fixline_core::*;
}

pub mod tagvalue {
    //! Tag=value encoding, decoding and stream framing.
    pub use fixline_tagvalue::*;
}

pub mod session {
    //! Session layer protocol implementation.
    pub use fixline_session::*;
}

pub mod store {
    //! Message persistence.
    pub use fixline_store::*;
}

pub mod transport {
    //! Tokio codec and connection driver.
    pub use fixline_transport::*;
}

pub mod engine {
    //! Acceptor, initiator and application callbacks.
    pub use fixline_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fixline_core::{
        DecodeError, EncodeError, FixError, FrameError, Message, MsgType, Result, SessionError,
        SessionId, Severity, StoreError, Timestamp,
    };

    // Tag-value encoding
    pub use fixline_tagvalue::{FrameDecoder, checksum, decode, encode};

    // Session
    pub use fixline_session::{
        Behavior, Disposition, Session, SessionConfig, SessionConfigBuilder, SessionEvent,
        SessionState,
    };

    // Store
    pub use fixline_store::{FileStore, MemoryStore, MessageStore};

    // Transport
    pub use fixline_transport::{Connection, FixCodec, SessionHandle};

    // Engine
    pub use fixline_engine::{
        Acceptor, Application, EngineBuilder, EngineError, Initiator, NoOpApplication,
        RunningSession,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let id = SessionId::new("FIX.4.2", "SENDER", "TARGET");
        let config = SessionConfig::new("FIX.4.2", "SENDER", "TARGET");
        assert_eq!(config.session_id(), id);
        assert_eq!(Severity::Fatal.to_string(), "FATAL");
    }

    #[test]
    fn test_codec_through_facade() {
        let message = Message::of_type(MsgType::Heartbeat)
            .with(8, "FIX.4.2")
            .with(34, "1")
            .with(49, "SENDER")
            .with(56, "TARGET")
            .with(52, "20121105-23:24:06.000");
        let wire = encode(&message).unwrap();

        let mut frames = FrameDecoder::new();
        let decoded: Vec<_> = frames.feed(&wire).collect();
        assert_eq!(decoded.len(), 1);
    }
}
