/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! This module provides configuration options for FIX sessions.

use fixline_core::error::SessionError;
use fixline_core::types::SessionId;
use std::time::Duration;

/// Default heartbeat interval advertised in outgoing logons.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Largest heartbeat interval accepted from a counterparty's logon.
pub const MAX_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(86_400);

/// Configuration for a FIX session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// FIX version BeginString (e.g., "FIX.4.2").
    pub begin_string: String,
    /// Sender CompID (tag 49).
    pub sender_comp_id: String,
    /// Target CompID (tag 56).
    pub target_comp_id: String,
    /// Heartbeat interval sent in our own logons.
    pub heartbeat_interval: Duration,
    /// Whether to send heartbeats when we have been silent.
    pub send_heartbeats: bool,
    /// Whether to test and time out a silent counterparty.
    pub expect_heartbeats: bool,
    /// Whether to answer an inbound logon with a logon.
    pub respond_to_logon: bool,
    /// First expected incoming sequence number.
    pub incoming_seq_num: u64,
    /// First outgoing sequence number.
    pub outgoing_seq_num: u64,
}

impl SessionConfig {
    /// Creates a new session configuration with required fields.
    ///
    /// # Arguments
    /// * `begin_string` - The FIX version string
    /// * `sender_comp_id` - The sender CompID
    /// * `target_comp_id` - The target CompID
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
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            send_heartbeats: true,
            expect_heartbeats: true,
            respond_to_logon: false,
            incoming_seq_num: 1,
            outgoing_seq_num: 1,
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets whether heartbeats are sent.
    #[must_use]
    pub const fn with_send_heartbeats(mut self, send: bool) -> Self {
        self.send_heartbeats = send;
        self
    }

    /// Sets whether heartbeats are expected.
    #[must_use]
    pub const fn with_expect_heartbeats(mut self, expect: bool) -> Self {
        self.expect_heartbeats = expect;
        self
    }

    /// Sets whether inbound logons are answered.
    #[must_use]
    pub const fn with_respond_to_logon(mut self, respond: bool) -> Self {
        self.respond_to_logon = respond;
        self
    }

    /// Sets the initial sequence numbers.
    #[must_use]
    pub const fn with_seq_nums(mut self, incoming: u64, outgoing: u64) -> Self {
        self.incoming_seq_num = incoming;
        self.outgoing_seq_num = outgoing;
        self
    }

    /// Returns the heartbeat interval in seconds.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }

    /// Returns the identity of this session.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        SessionId::new(
            self.begin_string.clone(),
            self.sender_comp_id.clone(),
            self.target_comp_id.clone(),
        )
    }
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    begin_string: Option<String>,
    sender_comp_id: Option<String>,
    target_comp_id: Option<String>,
    heartbeat_interval: Option<Duration>,
    send_heartbeats: Option<bool>,
    expect_heartbeats: Option<bool>,
    respond_to_logon: Option<bool>,
    incoming_seq_num: Option<u64>,
    outgoing_seq_num: Option<u64>,
}

impl SessionConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the FIX version.
    #[must_use]
    pub fn begin_string(mut self, version: impl Into<String>) -> Self {
        self.begin_string = Some(version.into());
        self
    }

    /// Sets the sender CompID.
    #[must_use]
    pub fn sender_comp_id(mut self, id: impl Into<String>) -> Self {
        self.sender_comp_id = Some(id.into());
        self
    }

    /// Sets the target CompID.
    #[must_use]
    pub fn target_comp_id(mut self, id: impl Into<String>) -> Self {
        self.target_comp_id = Some(id.into());
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Sets whether heartbeats are sent.
    #[must_use]
    pub const fn send_heartbeats(mut self, send: bool) -> Self {
        self.send_heartbeats = Some(send);
        self
    }

    /// Sets whether heartbeats are expected.
    #[must_use]
    pub const fn expect_heartbeats(mut self, expect: bool) -> Self {
        self.expect_heartbeats = Some(expect);
        self
    }

    /// Sets whether inbound logons are answered.
    #[must_use]
    pub const fn respond_to_logon(mut self, respond: bool) -> Self {
        self.respond_to_logon = Some(respond);
        self
    }

    /// Sets the first expected incoming sequence number.
    #[must_use]
    pub const fn incoming_seq_num(mut self, seq: u64) -> Self {
        self.incoming_seq_num = Some(seq);
        self
    }

    /// Sets the first outgoing sequence number.
    #[must_use]
    pub const fn outgoing_seq_num(mut self, seq: u64) -> Self {
        self.outgoing_seq_num = Some(seq);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if an identity field is missing
    /// or empty, or a sequence number is zero.
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        let required = |value: Option<String>, name: &str| match value {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(SessionError::Configuration(format!("{name} is required"))),
        };

        let begin_string = required(self.begin_string, "begin_string")?;
        let sender = required(self.sender_comp_id, "sender_comp_id")?;
        let target = required(self.target_comp_id, "target_comp_id")?;

        let mut config = SessionConfig::new(begin_string, sender, target);
        if let Some(interval) = self.heartbeat_interval {
            config.heartbeat_interval = interval;
        }
        if let Some(send) = self.send_heartbeats {
            config.send_heartbeats = send;
        }
        if let Some(expect) = self.expect_heartbeats {
            config.expect_heartbeats = expect;
        }
        if let Some(respond) = self.respond_to_logon {
            config.respond_to_logon = respond;
        }
        if let Some(seq) = self.incoming_seq_num {
            config.incoming_seq_num = seq;
        }
        if let Some(seq) = self.outgoing_seq_num {
            config.outgoing_seq_num = seq;
        }

        if config.incoming_seq_num == 0 || config.outgoing_seq_num == 0 {
            return Err(SessionError::Configuration(
                "sequence numbers start at 1".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("FIX.4.2", "SENDER", "TARGET");

        assert_eq!(config.sender_comp_id, "SENDER");
        assert_eq!(config.target_comp_id, "TARGET");
        assert_eq!(config.begin_string, "FIX.4.2");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert!(config.send_heartbeats);
        assert!(config.expect_heartbeats);
        assert!(!config.respond_to_logon);
        assert_eq!((config.incoming_seq_num, config.outgoing_seq_num), (1, 1));
        assert_eq!(config.session_id().to_string(), "FIX.4.2-SENDER-TARGET");
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfigBuilder::new()
            .begin_string("FIX.4.2")
            .sender_comp_id("SENDER")
            .target_comp_id("TARGET")
            .heartbeat_interval(Duration::from_secs(60))
            .respond_to_logon(true)
            .send_heartbeats(false)
            .incoming_seq_num(5)
            .build()
            .unwrap();

        assert_eq!(config.heartbeat_interval_secs(), 60);
        assert!(config.respond_to_logon);
        assert!(!config.send_heartbeats);
        assert!(config.expect_heartbeats);
        assert_eq!(config.incoming_seq_num, 5);
    }

    #[test]
    fn test_session_config_builder_rejects_incomplete() {
        let err = SessionConfigBuilder::new()
            .begin_string("FIX.4.2")
            .sender_comp_id("SENDER")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::Configuration("target_comp_id is required".to_string())
        );

        let err = SessionConfigBuilder::new()
            .begin_string("FIX.4.2")
            .sender_comp_id("SENDER")
            .target_comp_id("TARGET")
            .outgoing_seq_num(0)
            .build();
        assert!(matches!(err, Err(SessionError::Configuration(_))));
    }
}
