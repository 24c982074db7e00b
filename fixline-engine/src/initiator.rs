/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Client side of a FIX connection.

use crate::application::{Application, NoOpApplication};
use crate::error::EngineError;
use crate::runner::{self, RunningSession};
use fixline_session::{Session, SessionConfig};
use fixline_store::MessageStore;
use fixline_transport::Connection;
use std::fmt;
use std::sync::Arc;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

/// Opens connections for one session identity.
pub struct Initiator<A: Application = NoOpApplication> {
    config: SessionConfig,
    application: Arc<A>,
    store: Arc<dyn MessageStore>,
}

impl<A: Application> fmt::Debug for Initiator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initiator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<A: Application> Initiator<A> {
    pub(crate) fn new(
        config: SessionConfig,
        application: Arc<A>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            config,
            application,
            store,
        }
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connects to `addr` and starts the session.
    ///
    /// Sequence numbers are recovered from the store before the connection
    /// starts. No logon is sent; call [`SessionHandle::logon`] on the
    /// returned session's handle.
    ///
    /// [`SessionHandle::logon`]: fixline_transport::SessionHandle::logon
    ///
    /// # Errors
    /// Returns an error if the connection fails or the store cannot be
    /// replayed.
    pub async fn connect(&self, addr: impl ToSocketAddrs) -> Result<RunningSession, EngineError> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        let peer = socket.peer_addr()?;

        let (tx, rx) = unbounded_channel();
        let session = Session::recover(self.config.clone(), Arc::clone(&self.store), tx).await?;
        info!(session = %session.id(), %peer, "connected");

        self.application.on_create(session.id()).await;
        let (connection, handle) = Connection::new(socket, session, rx);
        Ok(runner::spawn(
            connection,
            handle,
            Arc::clone(&self.application),
        ))
    }
}
