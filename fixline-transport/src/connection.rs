/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Connection driver binding a byte stream to a session.
//!
//! One task owns the socket, the [`Session`] and its event receiver. A
//! biased `tokio::select!` loop handles, in priority order:
//! 1. session events (outbound writes, end of session)
//! 2. inbound frames
//! 3. the session's heartbeat deadline
//! 4. commands from [`SessionHandle`]s
//!
//! Only one of them runs at a time, so a heartbeat tick never observes a
//! half-processed message.

use crate::codec::{CodecError, FixCodec, InboundFrame};
use fixline_core::error::Severity;
use fixline_core::message::Message;
use fixline_core::types::SessionId;
use fixline_session::{Behavior, Session, SessionEvent};
use fixline_tagvalue::decode;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, sleep_until};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Capacity of a connection's command queue.
pub const COMMAND_BUFFER: usize = 64;

/// Requests a [`SessionHandle`] can make of a running connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send an application or session message.
    Send(Message),
    /// Send a Logon.
    Logon,
    /// Send a Logout.
    Logoff,
    /// Change heartbeat and logon-response behavior.
    ModifyBehavior(Behavior),
    /// End the session and close the connection.
    Disconnect,
}

/// Errors returned by [`SessionHandle`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection driving the session has stopped.
    #[error("session {0} is no longer running")]
    Closed(SessionId),
}

/// Cloneable handle for talking to a running connection.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Returns the identity of the session behind this handle.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns true once the connection has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Queues a message for sending.
    ///
    /// # Errors
    /// Returns `ConnectionError::Closed` if the connection has stopped.
    pub async fn send(&self, message: Message) -> Result<(), ConnectionError> {
        self.command(Command::Send(message)).await
    }

    /// Queues a Logon.
    ///
    /// # Errors
    /// Returns `ConnectionError::Closed` if the connection has stopped.
    pub async fn logon(&self) -> Result<(), ConnectionError> {
        self.command(Command::Logon).await
    }

    /// Queues a Logout.
    ///
    /// # Errors
    /// Returns `ConnectionError::Closed` if the connection has stopped.
    pub async fn logoff(&self) -> Result<(), ConnectionError> {
        self.command(Command::Logoff).await
    }

    /// Queues a behavior change.
    ///
    /// # Errors
    /// Returns `ConnectionError::Closed` if the connection has stopped.
    pub async fn modify_behavior(&self, behavior: Behavior) -> Result<(), ConnectionError> {
        self.command(Command::ModifyBehavior(behavior)).await
    }

    /// Ends the session and closes the connection.
    ///
    /// # Errors
    /// Returns `ConnectionError::Closed` if the connection has stopped.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.command(Command::Disconnect).await
    }

    async fn command(&self, command: Command) -> Result<(), ConnectionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ConnectionError::Closed(self.id.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Close,
}

/// A session bound to a byte stream.
pub struct Connection<T> {
    framed: Framed<T, FixCodec>,
    session: Session,
    events: UnboundedReceiver<SessionEvent>,
    commands: mpsc::Receiver<Command>,
    observer: Option<UnboundedSender<SessionEvent>>,
    pending: Option<Message>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Binds `session` to `io`.
    ///
    /// `events` must be the receiving half of the channel the session was
    /// created with.
    #[must_use]
    pub fn new(
        io: T,
        session: Session,
        events: UnboundedReceiver<SessionEvent>,
    ) -> (Self, SessionHandle) {
        Self::from_framed(Framed::new(io, FixCodec::new()), session, events)
    }

    /// Binds `session` to an already framed stream.
    ///
    /// Bytes still buffered in `framed` are decoded before anything new is
    /// read, so a caller may inspect the first frames itself and then hand
    /// the stream over.
    #[must_use]
    pub fn from_framed(
        framed: Framed<T, FixCodec>,
        session: Session,
        events: UnboundedReceiver<SessionEvent>,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SessionHandle {
            id: session.id().clone(),
            commands: tx,
        };
        let connection = Self {
            framed,
            session,
            events,
            commands: rx,
            observer: None,
            pending: None,
        };
        (connection, handle)
    }

    /// Forwards every session event to `observer` after the connection has
    /// acted on it.
    #[must_use]
    pub fn with_observer(mut self, observer: UnboundedSender<SessionEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Processes `message` as the first inbound message once the
    /// connection runs, ahead of anything read from the stream.
    #[must_use]
    pub fn with_pending(mut self, message: Message) -> Self {
        self.pending = Some(message);
        self
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drives the connection until the session ends or the peer goes away.
    ///
    /// # Returns
    /// The session, for inspection or reuse of its state.
    pub async fn run(mut self) -> Session {
        info!(session = %self.session.id(), "connection started");

        if let Some(message) = self.pending.take() {
            self.process(message).await;
        }

        loop {
            let deadline = self.session.heartbeat_deadline();
            let step = tokio::select! {
                biased;

                Some(event) = self.events.recv() => self.on_event(event).await,

                frame = self.framed.next() => self.on_frame(frame).await,

                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_tick().await
                }

                Some(command) = self.commands.recv() => self.on_command(command).await,
            };
            if step == Step::Close {
                break;
            }
        }

        if let Err(err) = SinkExt::<&Message>::close(&mut self.framed).await {
            debug!(session = %self.session.id(), error = %err, "error closing connection");
        }
        while let Ok(event) = self.events.try_recv() {
            self.forward(event);
        }
        info!(session = %self.session.id(), "connection closed");
        self.session
    }

    async fn on_event(&mut self, event: SessionEvent) -> Step {
        let step = match &event {
            SessionEvent::OutMsg(message) => match self.framed.send(message).await {
                Ok(()) => Step::Continue,
                Err(CodecError::Encode(err)) => {
                    warn!(session = %self.session.id(), error = %err, "outbound message not encodable");
                    Step::Continue
                }
                Err(err) => {
                    warn!(session = %self.session.id(), error = %err, "write failed");
                    self.session.modify_behavior(Behavior::disconnected());
                    Step::Close
                }
            },
            SessionEvent::EndSession => Step::Close,
            _ => Step::Continue,
        };
        self.forward(event);
        step
    }

    async fn on_frame(&mut self, frame: Option<Result<InboundFrame, CodecError>>) -> Step {
        match frame {
            Some(Ok(InboundFrame::Message(raw))) => {
                match decode(&raw) {
                    Ok(message) => self.process(message).await,
                    Err(err) => {
                        self.session
                            .raise(Severity::Warn, format!("undecodable message: {err}"));
                    }
                }
                Step::Continue
            }
            Some(Ok(InboundFrame::Discarded(err))) => {
                self.session.raise(err.severity(), err.to_string());
                Step::Continue
            }
            Some(Err(CodecError::Frame(err))) => {
                self.session.raise(err.severity(), err.to_string());
                Step::Continue
            }
            Some(Err(err)) => {
                warn!(session = %self.session.id(), error = %err, "read failed");
                self.session.modify_behavior(Behavior::disconnected());
                Step::Close
            }
            None => {
                info!(session = %self.session.id(), "peer closed connection");
                self.session.modify_behavior(Behavior::disconnected());
                Step::Close
            }
        }
    }

    async fn process(&mut self, message: Message) {
        if let Err(err) = self.session.process_incoming(message).await {
            debug!(session = %self.session.id(), error = %err, "session stopped");
        }
    }

    async fn on_tick(&mut self) -> Step {
        if let Err(err) = self.session.on_heartbeat_tick().await {
            debug!(session = %self.session.id(), error = %err, "heartbeat check ended session");
        }
        Step::Continue
    }

    async fn on_command(&mut self, command: Command) -> Step {
        let result = match command {
            Command::Send(message) => self.session.send_msg(message).await.map(drop),
            Command::Logon => self.session.send_logon().await.map(drop),
            Command::Logoff => self.session.send_logoff().await.map(drop),
            Command::ModifyBehavior(behavior) => {
                self.session.modify_behavior(behavior);
                Ok(())
            }
            Command::Disconnect => {
                self.session.end_session();
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(session = %self.session.id(), error = %err, "command failed");
        }
        Step::Continue
    }

    fn forward(&self, event: SessionEvent) {
        if let Some(observer) = &self.observer
            && observer.send(event).is_err()
        {
            debug!(session = %self.session.id(), "observer dropped");
        }
    }
}
