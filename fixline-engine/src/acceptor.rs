/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Server side of FIX connections.
//!
//! Sessions are created lazily: the first framed message on a socket names
//! the session (`8`, its `56` as our sender, its `49` as our target). The
//! acceptor keeps one registry entry per running identity and refuses a
//! second connection for an identity that is still connected.

use crate::application::{Application, NoOpApplication};
use crate::builder::SessionSettings;
use crate::error::EngineError;
use crate::runner;
use fixline_core::message::Message;
use fixline_core::types::SessionId;
use fixline_session::Session;
use fixline_store::MessageStore;
use fixline_tagvalue::decode;
use fixline_transport::{Connection, FixCodec, InboundFrame, SessionHandle};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// State shared between the accept loop and connection tasks.
struct Shared<A: ?Sized> {
    application: Arc<A>,
    store: Arc<dyn MessageStore>,
    settings: SessionSettings,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

/// Accepts connections and runs one session per counterparty.
pub struct Acceptor<A: Application = NoOpApplication> {
    listener: TcpListener,
    shared: Arc<Shared<A>>,
}

impl<A: Application> fmt::Debug for Acceptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acceptor")
            .field("listener", &self.listener)
            .field("settings", &self.shared.settings)
            .field("sessions", &self.sessions())
            .finish_non_exhaustive()
    }
}

impl<A: Application> Acceptor<A> {
    pub(crate) async fn bind(
        addr: impl ToSocketAddrs,
        application: Arc<A>,
        store: Arc<dyn MessageStore>,
        settings: SessionSettings,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "acceptor listening");
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                application,
                store,
                settings,
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    /// Returns an I/O error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the identities with a registered connection.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.shared.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns a handle to the running session `id`, if connected.
    #[must_use]
    pub fn session(&self, id: &SessionId) -> Option<SessionHandle> {
        self.shared
            .sessions
            .lock()
            .get(id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Accepts connections until the listener fails.
    ///
    /// Each connection is served on its own task.
    ///
    /// # Errors
    /// Returns the I/O error that stopped the listener.
    pub async fn run(&self) -> Result<(), EngineError> {
        loop {
            let (socket, peer) = self.listener.accept().await?;
            debug!(%peer, "accepted connection");
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                if let Err(err) = serve(shared, socket, peer).await {
                    warn!(%peer, error = %err, "connection refused");
                }
            });
        }
    }
}

/// Identifies, registers and runs the session on one accepted socket.
async fn serve<A: Application>(
    shared: Arc<Shared<A>>,
    socket: TcpStream,
    peer: SocketAddr,
) -> Result<(), EngineError> {
    socket.set_nodelay(true)?;
    let mut framed = Framed::new(socket, FixCodec::new());
    let Some(first) = first_message(&mut framed, peer).await? else {
        debug!(%peer, "peer closed before sending a message");
        return Ok(());
    };
    let id = identify(&first).ok_or(EngineError::Unidentified { peer })?;

    let (tx, rx) = unbounded_channel();
    let config = shared.settings.config_for(&id).with_respond_to_logon(true);
    let session = Session::recover(config, Arc::clone(&shared.store), tx).await?;
    let (connection, handle) = Connection::from_framed(framed, session, rx);

    {
        let mut sessions = shared.sessions.lock();
        if sessions.get(&id).is_some_and(|live| !live.is_closed()) {
            return Err(EngineError::DuplicateSession(id));
        }
        sessions.insert(id.clone(), handle.clone());
    }
    info!(session = %id, %peer, "session registered");

    shared.application.on_create(&id).await;
    let running = runner::spawn(
        connection.with_pending(first),
        handle,
        Arc::clone(&shared.application),
    );
    let result = running.join().await;

    let mut sessions = shared.sessions.lock();
    if sessions.get(&id).is_some_and(SessionHandle::is_closed) {
        sessions.remove(&id);
        info!(session = %id, "session unregistered");
    }
    result.map(drop)
}

/// Reads up to the first decodable message, skipping discarded frames.
async fn first_message(
    framed: &mut Framed<TcpStream, FixCodec>,
    peer: SocketAddr,
) -> Result<Option<Message>, EngineError> {
    while let Some(frame) = framed.next().await {
        match frame? {
            InboundFrame::Message(raw) => match decode(&raw) {
                Ok(message) => return Ok(Some(message)),
                Err(err) => warn!(%peer, error = %err, "undecodable message before identification"),
            },
            InboundFrame::Discarded(err) => {
                warn!(%peer, error = %err, "discarded frame before identification");
            }
        }
    }
    Ok(None)
}

/// Derives the local session identity from a counterparty's message.
fn identify(message: &Message) -> Option<SessionId> {
    let begin_string = message.begin_string().filter(|s| !s.is_empty())?;
    let ours = message.target_comp_id().filter(|s| !s.is_empty())?;
    let theirs = message.sender_comp_id().filter(|s| !s.is_empty())?;
    Some(SessionId::new(begin_string, ours, theirs))
}
