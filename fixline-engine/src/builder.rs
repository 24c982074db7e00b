/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Engine builder for fluent configuration.
//!
//! This module provides a builder API for configuring acceptors and
//! initiators.

use crate::acceptor::Acceptor;
use crate::application::{Application, NoOpApplication};
use crate::initiator::Initiator;
use fixline_core::types::SessionId;
use fixline_session::SessionConfig;
use fixline_session::config::DEFAULT_HEARTBEAT_INTERVAL;
use fixline_store::{MemoryStore, MessageStore};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::ToSocketAddrs;

/// Session options shared by every session an engine creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Heartbeat interval proposed in outgoing logons.
    pub heartbeat_interval: Duration,
    /// Whether sessions send heartbeats.
    pub send_heartbeats: bool,
    /// Whether sessions expect heartbeats.
    pub expect_heartbeats: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            send_heartbeats: true,
            expect_heartbeats: true,
        }
    }
}

impl SessionSettings {
    /// Creates the configuration of the session identified by `id`.
    #[must_use]
    pub fn config_for(&self, id: &SessionId) -> SessionConfig {
        SessionConfig::new(
            id.begin_string.clone(),
            id.sender_comp_id.clone(),
            id.target_comp_id.clone(),
        )
        .with_heartbeat_interval(self.heartbeat_interval)
        .with_send_heartbeats(self.send_heartbeats)
        .with_expect_heartbeats(self.expect_heartbeats)
    }
}

/// Builder for configuring a FIX engine.
pub struct EngineBuilder<A: Application = NoOpApplication> {
    /// Application callback handler.
    application: Arc<A>,
    /// Message store shared by all sessions.
    store: Arc<dyn MessageStore>,
    /// Defaults for created sessions.
    settings: SessionSettings,
}

impl Default for EngineBuilder<NoOpApplication> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<NoOpApplication> {
    /// Creates a new engine builder with default settings and an
    /// in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            application: Arc::new(NoOpApplication),
            store: Arc::new(MemoryStore::new()),
            settings: SessionSettings::default(),
        }
    }
}

impl<A: Application> fmt::Debug for EngineBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("application", &std::any::type_name::<A>())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<A: Application> EngineBuilder<A> {
    /// Sets the application callback handler.
    #[must_use]
    pub fn with_application<B: Application>(self, application: B) -> EngineBuilder<B> {
        self.with_shared_application(Arc::new(application))
    }

    /// Sets an application callback handler the caller keeps a reference to.
    #[must_use]
    pub fn with_shared_application<B: Application>(self, application: Arc<B>) -> EngineBuilder<B> {
        EngineBuilder {
            application,
            store: self.store,
            settings: self.settings,
        }
    }

    /// Sets the message store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets the heartbeat interval proposed in outgoing logons.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.settings.heartbeat_interval = interval;
        self
    }

    /// Sets whether sessions send heartbeats.
    #[must_use]
    pub const fn with_send_heartbeats(mut self, enabled: bool) -> Self {
        self.settings.send_heartbeats = enabled;
        self
    }

    /// Sets whether sessions expect heartbeats.
    #[must_use]
    pub const fn with_expect_heartbeats(mut self, enabled: bool) -> Self {
        self.settings.expect_heartbeats = enabled;
        self
    }

    /// Returns the session defaults.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Returns the application handler.
    #[must_use]
    pub fn application(&self) -> Arc<A> {
        Arc::clone(&self.application)
    }

    /// Returns the message store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.store)
    }

    /// Binds an acceptor to `addr`.
    ///
    /// # Errors
    /// Returns an I/O error if the address cannot be bound.
    pub async fn acceptor(self, addr: impl ToSocketAddrs) -> std::io::Result<Acceptor<A>> {
        Acceptor::bind(addr, self.application, self.store, self.settings).await
    }

    /// Creates an initiator for the session identified by `id`.
    #[must_use]
    pub fn initiator(self, id: &SessionId) -> Initiator<A> {
        Initiator::new(self.settings.config_for(id), self.application, self.store)
    }

    /// Creates an initiator with an explicit session configuration.
    #[must_use]
    pub fn initiator_with_config(self, config: SessionConfig) -> Initiator<A> {
        Initiator::new(config, self.application, self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tests::RecordingApplication;

    #[test]
    fn test_engine_builder_default() {
        let builder = EngineBuilder::new();
        assert_eq!(builder.settings(), &SessionSettings::default());
        assert_eq!(builder.settings().heartbeat_interval, Duration::from_secs(30));
        assert!(builder.settings().send_heartbeats);
        assert!(builder.settings().expect_heartbeats);
    }

    #[test]
    fn test_engine_builder_fluent() {
        let app = Arc::new(RecordingApplication::default());
        let builder = EngineBuilder::new()
            .with_heartbeat_interval(Duration::from_secs(10))
            .with_send_heartbeats(false)
            .with_shared_application(Arc::clone(&app));

        assert_eq!(builder.settings().heartbeat_interval, Duration::from_secs(10));
        assert!(!builder.settings().send_heartbeats);
        assert!(Arc::ptr_eq(&builder.application(), &app));
    }

    #[test]
    fn test_settings_config_for() {
        let settings = SessionSettings {
            heartbeat_interval: Duration::from_secs(5),
            send_heartbeats: true,
            expect_heartbeats: false,
        };
        let config = settings.config_for(&SessionId::new("FIX.4.4", "BUY", "SELL"));

        assert_eq!(config.begin_string, "FIX.4.4");
        assert_eq!(config.sender_comp_id, "BUY");
        assert_eq!(config.target_comp_id, "SELL");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert!(!config.expect_heartbeats);
        assert!(!config.respond_to_logon);
    }

    #[test]
    fn test_initiator_uses_settings() {
        let id = SessionId::new("FIX.4.2", "CLIENT", "SERVER");
        let initiator = EngineBuilder::new()
            .with_heartbeat_interval(Duration::from_secs(20))
            .initiator(&id);

        assert_eq!(initiator.config().session_id(), id);
        assert_eq!(initiator.config().heartbeat_interval, Duration::from_secs(20));
    }
}
