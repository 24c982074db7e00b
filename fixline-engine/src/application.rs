/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! This module defines the callback interface through which an engine
//! reports session activity, following the QuickFIX pattern with async
//! support.

use async_trait::async_trait;
use fixline_core::error::Severity;
use fixline_core::message::Message;
use fixline_core::types::SessionId;
use fixline_session::SessionEvent;
use tracing::trace;

/// Application callback interface for handling FIX sessions.
///
/// Implement this trait to receive callbacks for session events
/// and message processing.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    /// Called when a session is created, before any traffic is processed.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    async fn on_create(&self, session_id: &SessionId);

    /// Called when the counterparty's logon has been accepted.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    async fn on_logon(&self, session_id: &SessionId);

    /// Called for every inbound message the session accepted.
    ///
    /// # Arguments
    /// * `message` - The received message
    /// * `session_id` - The session identifier
    async fn on_message(&self, message: &Message, session_id: &SessionId);

    /// Called for every message written to the counterparty.
    async fn on_outbound(&self, _message: &Message, _session_id: &SessionId) {}

    /// Called when the session reports an error.
    async fn on_error(&self, _severity: Severity, _description: &str, _session_id: &SessionId) {}

    /// Called when the session has ended.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    async fn on_logout(&self, session_id: &SessionId);
}

/// Default no-op application implementation.
#[derive(Debug, Default)]
pub struct NoOpApplication;

#[async_trait]
impl Application for NoOpApplication {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {}

    async fn on_message(&self, _message: &Message, _session_id: &SessionId) {}

    async fn on_logout(&self, _session_id: &SessionId) {}
}

/// Routes one session event to the matching callback.
pub async fn dispatch<A>(application: &A, session_id: &SessionId, event: &SessionEvent)
where
    A: Application + ?Sized,
{
    match event {
        SessionEvent::Msg(message) => application.on_message(message, session_id).await,
        SessionEvent::OutMsg(message) => application.on_outbound(message, session_id).await,
        SessionEvent::Error {
            severity,
            description,
        } => {
            application
                .on_error(*severity, description, session_id)
                .await;
        }
        SessionEvent::Logon => application.on_logon(session_id).await,
        SessionEvent::EndSession => application.on_logout(session_id).await,
        SessionEvent::State(change) => trace!(session = %session_id, ?change, "state change"),
    }
}
