/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Spawning connections and feeding their events to the application.

use crate::application::{Application, dispatch};
use crate::error::EngineError;
use fixline_core::types::SessionId;
use fixline_session::Session;
use fixline_transport::{Connection, SessionHandle};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::JoinHandle;
use tracing::debug;

/// A session whose connection runs on its own task.
#[derive(Debug)]
pub struct RunningSession {
    handle: SessionHandle,
    task: JoinHandle<Session>,
}

impl RunningSession {
    /// Returns the session identity.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        self.handle.id()
    }

    /// Returns a handle for sending commands to the session.
    #[must_use]
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Waits for the connection to finish.
    ///
    /// Every application callback for the session has completed by the
    /// time this returns.
    ///
    /// # Errors
    /// Returns `EngineError::Task` if the connection task panicked or was
    /// cancelled.
    pub async fn join(self) -> Result<Session, EngineError> {
        self.task
            .await
            .map_err(|err| EngineError::Task(err.to_string()))
    }
}

/// Spawns `connection` along with a task that dispatches its events to
/// `application` in order.
pub(crate) fn spawn<T, A>(
    connection: Connection<T>,
    handle: SessionHandle,
    application: Arc<A>,
) -> RunningSession
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    A: Application + ?Sized,
{
    let id = handle.id().clone();
    let (observer, mut observed) = unbounded_channel();

    let pump = tokio::spawn(async move {
        while let Some(event) = observed.recv().await {
            dispatch(application.as_ref(), &id, &event).await;
        }
        debug!(session = %id, "event dispatch finished");
    });

    let task = tokio::spawn(async move {
        let session = connection.with_observer(observer).run().await;
        if let Err(err) = pump.await {
            debug!(session = %session.id(), error = %err, "event dispatch task failed");
        }
        session
    });

    RunningSession { handle, task }
}
