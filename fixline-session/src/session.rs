/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The session state machine.
//!
//! A [`Session`] consumes decoded inbound messages one at a time, enforces
//! logon ordering, sequencing, heartbeat liveness and resend recovery, and
//! reports everything it does as [`SessionEvent`]s on an unbounded channel.
//! It never touches a socket: outbound messages leave as
//! [`SessionEvent::OutMsg`] and the transport writes them.
//!
//! All methods take `&mut self`, so heartbeat ticks and message processing
//! cannot interleave.

use crate::config::{MAX_HEARTBEAT_INTERVAL, SessionConfig};
use crate::event::{Disposition, SessionEvent};
use crate::heartbeat::HeartbeatTimer;
use crate::sequence::{SequenceManager, SequenceResult};
use crate::state::{Behavior, SessionState, StateChange};
use fixline_core::error::{SessionError, Severity};
use fixline_core::message::{Message, MsgType};
use fixline_core::tags;
use fixline_core::types::{SessionId, Timestamp};
use fixline_store::MessageStore;
use fixline_tagvalue::{decode, encode_lenient};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Sending half of a session's event channel.
pub type EventSender = UnboundedSender<SessionEvent>;

/// A FIX session bound to one counterparty identity.
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    store: Arc<dyn MessageStore>,
    events: EventSender,
    state: SessionState,
    sequences: SequenceManager,
    is_resend_requested: bool,
    is_logout_requested: bool,
    /// Interval negotiated by the accepted logon.
    negotiated_interval: Option<Duration>,
    heartbeat: Option<HeartbeatTimer>,
    last_incoming: Instant,
    last_outgoing: Instant,
    next_test_request_id: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("sequences", &self.sequences)
            .field("is_resend_requested", &self.is_resend_requested)
            .field("is_logout_requested", &self.is_logout_requested)
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with the configured sequence numbers, without
    /// consulting the store.
    #[must_use]
    pub fn new(config: SessionConfig, store: Arc<dyn MessageStore>, events: EventSender) -> Self {
        let now = Instant::now();
        Self {
            id: config.session_id(),
            sequences: SequenceManager::new(config.outgoing_seq_num, config.incoming_seq_num),
            config,
            store,
            events,
            state: SessionState::AwaitingLogon,
            is_resend_requested: false,
            is_logout_requested: false,
            negotiated_interval: None,
            heartbeat: None,
            last_incoming: now,
            last_outgoing: now,
            next_test_request_id: 1,
        }
    }

    /// Creates a session whose counters continue from its persisted log.
    ///
    /// The whole log is replayed before the session is returned. Records
    /// sent by the local sender raise the outgoing counter, all others the
    /// incoming one, each to one past the highest sequence number seen.
    ///
    /// # Errors
    /// Returns `SessionError::Store` if the log cannot be read.
    pub async fn recover(
        config: SessionConfig,
        store: Arc<dyn MessageStore>,
        events: EventSender,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(config, store, events);
        let records = session.store.records(&session.id).await?;

        let mut replayed = 0usize;
        let mut last_outgoing: Option<u64> = None;
        let mut last_incoming: Option<u64> = None;
        for raw in records {
            replayed += 1;
            let message = match decode(&raw) {
                Ok(message) => message,
                Err(err) => {
                    warn!(session = %session.id, error = %err, "skipping undecodable record");
                    continue;
                }
            };
            let Some(seq) = message.seq_num() else {
                continue;
            };
            let slot = if session.is_local_sender(&message) {
                &mut last_outgoing
            } else {
                &mut last_incoming
            };
            *slot = Some(slot.map_or(seq, |last| last.max(seq)));
        }

        session.sequences.recover(last_outgoing, last_incoming);
        info!(
            session = %session.id,
            replayed,
            outgoing = session.sequences.next_outgoing(),
            incoming = session.sequences.next_incoming(),
            "recovered sequence numbers"
        );
        Ok(session)
    }

    /// Returns the session identity.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the current configuration, including runtime behavior flags.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while logged in.
    #[inline]
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }

    /// Next expected incoming sequence number.
    #[inline]
    #[must_use]
    pub fn incoming_seq_num(&self) -> u64 {
        self.sequences.next_incoming()
    }

    /// Next outgoing sequence number.
    #[inline]
    #[must_use]
    pub fn outgoing_seq_num(&self) -> u64 {
        self.sequences.next_outgoing()
    }

    /// Returns true while a resend request for a gap is outstanding.
    #[inline]
    #[must_use]
    pub fn is_resend_requested(&self) -> bool {
        self.is_resend_requested
    }

    /// Returns true once the local side has sent a logout.
    #[inline]
    #[must_use]
    pub fn is_logout_requested(&self) -> bool {
        self.is_logout_requested
    }

    /// Returns the interval negotiated at logon.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.negotiated_interval
    }

    /// Returns when the next heartbeat tick is due, if a timer is running.
    #[must_use]
    pub fn heartbeat_deadline(&self) -> Option<Instant> {
        self.heartbeat.map(|timer| timer.deadline())
    }

    /// Processes one decoded inbound message.
    ///
    /// # Returns
    /// How the message was disposed of when the session survives it.
    ///
    /// # Errors
    /// Returns the fatal `SessionError` that ended the session, or
    /// `SessionError::Ended` if it had already ended.
    pub async fn process_incoming(
        &mut self,
        message: Message,
    ) -> Result<Disposition, SessionError> {
        if self.state.is_ended() {
            return Err(SessionError::Ended);
        }

        self.last_incoming = Instant::now();
        self.emit_state(StateChange {
            last_incoming: Some(Timestamp::now()),
            ..StateChange::default()
        });

        if self.state == SessionState::AwaitingLogon {
            match message.msg_type() {
                None => return Err(self.fail(SessionError::MissingMsgType)),
                Some(MsgType::Logon) => {}
                Some(other) => {
                    return Err(self.fail(SessionError::FirstMessageNotLogon {
                        msg_type: other.to_string(),
                    }));
                }
            }
            if let Err(err) = self.accept_logon(&message).await {
                self.report(&err);
                return Ok(Disposition::Rejected);
            }
        }

        self.persist(&message).await;

        let (msg_type, seq) = match envelope(&message) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.reject(&message, err).await?;
                return Ok(Disposition::Rejected);
            }
        };
        debug!(session = %self.id, msg_type = %msg_type, seq, "processing message");

        let is_reset = msg_type == MsgType::SequenceReset && !message.is_gap_fill();
        let is_gap_fill = msg_type == MsgType::SequenceReset && message.is_gap_fill();

        if is_reset {
            let Some(new_seq) = message.new_seq_no() else {
                self.reject(&message, SessionError::MissingNewSeqNo).await?;
                return Ok(Disposition::Rejected);
            };
            self.reset_incoming(new_seq)?;
        }

        let mut resend_serviced = false;
        if !is_reset {
            match self.sequences.validate_incoming(seq) {
                SequenceResult::Ok => {
                    self.sequences.increment_incoming();
                    self.is_resend_requested = false;
                    self.emit_state(StateChange {
                        incoming_seq_num: Some(self.sequences.next_incoming()),
                        is_resend_requested: Some(false),
                        ..StateChange::default()
                    });
                }
                SequenceResult::TooLow { expected, received } => {
                    if message.is_poss_dup() {
                        debug!(session = %self.id, seq = received, "ignoring possible duplicate");
                        return Ok(Disposition::Duplicate);
                    }
                    return Err(self.fail(SessionError::SequenceTooLow { expected, received }));
                }
                SequenceResult::Gap { expected, received } => {
                    warn!(session = %self.id, expected, received, "sequence gap detected");
                    if msg_type == MsgType::ResendRequest {
                        self.service_resend(&message).await?;
                        resend_serviced = true;
                    }
                    if !self.is_resend_requested {
                        self.request_resend(expected).await?;
                    }
                }
            }
        }

        if is_gap_fill {
            let Some(new_seq) = message.new_seq_no() else {
                self.reject(&message, SessionError::MissingNewSeqNo).await?;
                return Ok(Disposition::Rejected);
            };
            self.reset_incoming(new_seq)?;
        }

        match msg_type {
            MsgType::ResendRequest if !resend_serviced => {
                self.service_resend(&message).await?;
            }
            MsgType::TestRequest => {
                let mut heartbeat = Message::of_type(MsgType::Heartbeat);
                if let Some(id) = message.test_req_id() {
                    heartbeat.set(tags::TEST_REQ_ID, id);
                }
                self.send_msg(heartbeat).await?;
            }
            MsgType::Logout if self.is_logout_requested => {
                info!(session = %self.id, "logout confirmed");
                self.emit(SessionEvent::Msg(message));
                self.end_session();
                return Ok(Disposition::Dispatched);
            }
            MsgType::Logout => {
                info!(session = %self.id, "counterparty logout, acknowledging");
                self.send_msg(Message::of_type(MsgType::Logout)).await?;
            }
            _ => {}
        }

        self.emit(SessionEvent::Msg(message));
        Ok(Disposition::Dispatched)
    }

    /// Stamps and sends a message.
    ///
    /// Header defaults (8, 49, 56, 34, 52) are applied first and any of them
    /// present in `message` override the default. A sequence number is only
    /// allocated, and the message only persisted, when `message` carries no
    /// MsgSeqNum of its own.
    ///
    /// # Returns
    /// The message as sent.
    ///
    /// # Errors
    /// - `SessionError::Ended` after the session has ended
    /// - `SessionError::MissingRequiredTag` if `message` has no MsgType
    pub async fn send_msg(&mut self, message: Message) -> Result<Message, SessionError> {
        if self.state.is_ended() {
            return Err(SessionError::Ended);
        }
        if !message.contains(tags::MSG_TYPE) {
            return Err(SessionError::MissingRequiredTag {
                tag: tags::MSG_TYPE,
            });
        }

        let fresh = !message.contains(tags::MSG_SEQ_NUM);
        let mut outbound = Message::new()
            .with(tags::BEGIN_STRING, &self.config.begin_string)
            .with(tags::SENDER_COMP_ID, &self.config.sender_comp_id)
            .with(tags::TARGET_COMP_ID, &self.config.target_comp_id);
        if fresh {
            outbound.set(
                tags::MSG_SEQ_NUM,
                self.sequences.allocate_outgoing().to_string(),
            );
        }
        let now = Timestamp::now();
        outbound.set(tags::SENDING_TIME, now.format_millis().as_str());
        outbound.merge(&message);

        self.last_outgoing = Instant::now();
        if fresh {
            self.persist(&outbound).await;
        }

        debug!(
            session = %self.id,
            msg_type = outbound.get(tags::MSG_TYPE).unwrap_or_default(),
            seq = outbound.get(tags::MSG_SEQ_NUM).unwrap_or_default(),
            resend = !fresh,
            "sending message"
        );
        self.emit(SessionEvent::OutMsg(outbound.clone()));
        self.emit_state(StateChange {
            outgoing_seq_num: Some(self.sequences.next_outgoing()),
            last_outgoing: Some(now),
            ..StateChange::default()
        });
        Ok(outbound)
    }

    /// Sends a Logon advertising the configured heartbeat interval.
    ///
    /// # Errors
    /// See [`Session::send_msg`].
    pub async fn send_logon(&mut self) -> Result<Message, SessionError> {
        let logon = Message::of_type(MsgType::Logon)
            .with(tags::ENCRYPT_METHOD, "0")
            .with(
                tags::HEART_BT_INT,
                self.config.heartbeat_interval_secs().to_string(),
            );
        info!(session = %self.id, "sending logon");
        self.send_msg(logon).await
    }

    /// Sends a Logout; the session ends when the counterparty confirms it.
    ///
    /// # Errors
    /// See [`Session::send_msg`].
    pub async fn send_logoff(&mut self) -> Result<Message, SessionError> {
        self.is_logout_requested = true;
        self.emit_state(StateChange {
            is_logout_requested: Some(true),
            ..StateChange::default()
        });
        info!(session = %self.id, "sending logout");
        self.send_msg(Message::of_type(MsgType::Logout)).await
    }

    /// Applies runtime behavior flags.
    ///
    /// Disabling both heartbeat sending and expectation cancels the timer;
    /// re-enabling either restarts it if a logon has been accepted.
    pub fn modify_behavior(&mut self, behavior: Behavior) {
        if let Some(send) = behavior.send_heartbeats {
            self.config.send_heartbeats = send;
        }
        if let Some(expect) = behavior.expect_heartbeats {
            self.config.expect_heartbeats = expect;
        }
        if let Some(respond) = behavior.respond_to_logon {
            self.config.respond_to_logon = respond;
        }

        let liveness = self.config.send_heartbeats || self.config.expect_heartbeats;
        if !liveness {
            if self.heartbeat.take().is_some() {
                debug!(session = %self.id, "heartbeat timer cancelled");
            }
        } else if self.heartbeat.is_none()
            && self.state.is_logged_in()
            && let Some(interval) = self.negotiated_interval
        {
            self.heartbeat = HeartbeatTimer::start(interval, Instant::now());
        }

        self.emit_state(StateChange {
            heartbeat_active: Some(self.heartbeat.is_some()),
            ..StateChange::default()
        });
    }

    /// Runs the heartbeat checks that are due.
    ///
    /// Call when [`Session::heartbeat_deadline`] has passed.
    ///
    /// # Errors
    /// Returns `SessionError::HeartbeatTimeout` (after ending the session)
    /// when the counterparty has been silent for two intervals, or
    /// `SessionError::Ended` if the session had already ended.
    pub async fn on_heartbeat_tick(&mut self) -> Result<(), SessionError> {
        if self.state.is_ended() {
            return Err(SessionError::Ended);
        }
        let now = Instant::now();
        let Some(timer) = self.heartbeat.as_mut() else {
            return Ok(());
        };
        timer.advance(now);
        let timer = *timer;

        let since_outgoing = now.saturating_duration_since(self.last_outgoing);
        let since_incoming = now.saturating_duration_since(self.last_incoming);
        let check = timer.check(
            since_outgoing,
            since_incoming,
            self.config.send_heartbeats,
            self.config.expect_heartbeats,
        );

        if check.send_heartbeat {
            self.send_msg(Message::of_type(MsgType::Heartbeat)).await?;
        }
        if check.send_test_request {
            let id = self.next_test_request_id;
            self.next_test_request_id = id.wrapping_add(1);
            self.emit_state(StateChange {
                test_request_id: Some(id),
                ..StateChange::default()
            });
            debug!(session = %self.id, id, "counterparty silent, sending test request");
            self.send_msg(
                Message::of_type(MsgType::TestRequest).with(tags::TEST_REQ_ID, id.to_string()),
            )
            .await?;
        }
        if check.timed_out {
            let elapsed_ms = u64::try_from(since_incoming.as_millis()).unwrap_or(u64::MAX);
            return Err(self.fail(SessionError::HeartbeatTimeout { elapsed_ms }));
        }
        Ok(())
    }

    /// Ends the session: cancels the heartbeat timer and emits
    /// [`SessionEvent::EndSession`]. Later calls do nothing.
    pub fn end_session(&mut self) {
        if self.state.is_ended() {
            return;
        }
        self.heartbeat = None;
        self.state = SessionState::Ended;
        info!(session = %self.id, "session ended");
        self.emit_state(StateChange {
            is_logged_in: Some(false),
            heartbeat_active: Some(false),
            ..StateChange::default()
        });
        self.emit(SessionEvent::EndSession);
    }

    /// Reports a condition detected outside the session, such as a framing
    /// error on the transport. A `Fatal` severity ends the session.
    pub fn raise(&mut self, severity: Severity, description: impl Into<String>) {
        if self.state.is_ended() {
            return;
        }
        let description = description.into();
        match severity {
            Severity::Fatal => error!(session = %self.id, error = %description, "fatal transport error"),
            _ => warn!(session = %self.id, error = %description, "transport warning"),
        }
        self.emit(SessionEvent::Error {
            severity,
            description,
        });
        if severity.is_fatal() {
            self.end_session();
        }
    }

    async fn accept_logon(&mut self, logon: &Message) -> Result<(), SessionError> {
        let secs = logon
            .heart_bt_int()
            .filter(|secs| *secs <= MAX_HEARTBEAT_INTERVAL.as_secs())
            .ok_or(SessionError::MissingHeartbeatInterval)?;
        let interval = Duration::from_secs(secs);

        self.negotiated_interval = Some(interval);
        self.heartbeat = HeartbeatTimer::start(interval, Instant::now());

        if self.config.respond_to_logon {
            let response = Message::of_type(MsgType::Logon)
                .with(tags::ENCRYPT_METHOD, "0")
                .with(tags::HEART_BT_INT, secs.to_string());
            self.send_msg(response).await?;
        }

        self.state = SessionState::LoggedIn;
        info!(session = %self.id, heartbeat_secs = secs, "logon accepted");
        self.emit(SessionEvent::Logon);
        self.emit_state(StateChange {
            is_logged_in: Some(true),
            heartbeat_interval: Some(interval),
            heartbeat_active: Some(self.heartbeat.is_some()),
            ..StateChange::default()
        });
        Ok(())
    }

    async fn request_resend(&mut self, from: u64) -> Result<(), SessionError> {
        self.is_resend_requested = true;
        self.emit_state(StateChange {
            is_resend_requested: Some(true),
            ..StateChange::default()
        });
        info!(session = %self.id, from, "requesting resend");
        let request = Message::of_type(MsgType::ResendRequest)
            .with(tags::BEGIN_SEQ_NO, from.to_string())
            .with(tags::END_SEQ_NO, "0");
        self.send_msg(request).await?;
        Ok(())
    }

    /// Replays our persisted outbound messages within the requested range,
    /// replacing administrative ones with gap-fills.
    async fn service_resend(&mut self, request: &Message) -> Result<(), SessionError> {
        let begin = request.get_as::<u64>(tags::BEGIN_SEQ_NO).unwrap_or(1);
        let end = request
            .get_as::<u64>(tags::END_SEQ_NO)
            .filter(|&end| end != 0)
            .unwrap_or(u64::MAX);
        info!(session = %self.id, begin, end, "servicing resend request");

        let records = match self.store.records(&self.id).await {
            Ok(records) => records,
            Err(err) => {
                self.report(&SessionError::from(err));
                return Ok(());
            }
        };

        for raw in records {
            let stored = match decode(&raw) {
                Ok(stored) => stored,
                Err(err) => {
                    warn!(session = %self.id, error = %err, "skipping undecodable record");
                    continue;
                }
            };
            if !self.is_local_sender(&stored) {
                continue;
            }
            let (Some(seq), Some(msg_type)) = (stored.seq_num(), stored.msg_type()) else {
                continue;
            };
            if seq < begin || seq > end {
                continue;
            }

            let resend = if msg_type.is_gap_filled_on_resend() {
                Message::of_type(MsgType::SequenceReset)
                    .with(tags::MSG_SEQ_NUM, seq.to_string())
                    .with(tags::POSS_DUP_FLAG, "Y")
                    .with(tags::GAP_FILL_FLAG, "Y")
                    .with(tags::NEW_SEQ_NO, seq.saturating_add(1).to_string())
            } else {
                let mut resend = stored;
                resend.remove(tags::BODY_LENGTH);
                resend.remove(tags::CHECKSUM);
                resend.set(tags::POSS_DUP_FLAG, "Y");
                resend
            };
            self.send_msg(resend).await?;
        }
        Ok(())
    }

    fn reset_incoming(&mut self, new_seq: u64) -> Result<(), SessionError> {
        if let Err(err) = self.sequences.reset_incoming(new_seq) {
            return Err(self.fail(err));
        }
        info!(session = %self.id, new_seq, "incoming sequence reset");
        self.emit_state(StateChange {
            incoming_seq_num: Some(new_seq),
            ..StateChange::default()
        });
        Ok(())
    }

    /// Answers a malformed message with a session-level Reject and reports
    /// the problem; the session continues.
    async fn reject(&mut self, message: &Message, err: SessionError) -> Result<(), SessionError> {
        let mut reject = Message::of_type(MsgType::Reject);
        if let Some(seq) = message.get(tags::MSG_SEQ_NUM) {
            reject.set(tags::REF_SEQ_NUM, seq);
        }
        reject.set(tags::TEXT, err.to_string());
        self.send_msg(reject).await?;
        self.report(&err);
        Ok(())
    }

    /// Appends `message` to the store, malformed headers included.
    async fn persist(&self, message: &Message) {
        let bytes = encode_lenient(message);
        if let Err(err) = self.store.add(&self.id, &bytes).await {
            self.report(&SessionError::from(err));
        }
    }

    fn is_local_sender(&self, message: &Message) -> bool {
        message.sender_comp_id() == Some(self.config.sender_comp_id.as_str())
    }

    /// Reports a fatal error and ends the session.
    fn fail(&mut self, err: SessionError) -> SessionError {
        self.report(&err);
        self.end_session();
        err
    }

    fn report(&self, err: &SessionError) {
        let severity = err.severity();
        match severity {
            Severity::Fatal => error!(session = %self.id, error = %err, "fatal session error"),
            Severity::Error => warn!(session = %self.id, error = %err, "message rejected"),
            Severity::Warn => warn!(session = %self.id, error = %err, "session warning"),
        }
        self.emit(SessionEvent::Error {
            severity,
            description: err.to_string(),
        });
    }

    fn emit_state(&self, change: StateChange) {
        self.emit(SessionEvent::State(change));
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!(session = %self.id, "event receiver dropped");
        }
    }
}

/// Checks the envelope tags 34, 35, 49, 56, 52 and returns the parsed
/// message type and sequence number.
fn envelope(message: &Message) -> Result<(MsgType, u64), SessionError> {
    let missing = tags::REQUIRED_ENVELOPE.into_iter().find(|&tag| {
        if tag == tags::MSG_SEQ_NUM {
            message.seq_num().is_none()
        } else {
            !message.contains(tag)
        }
    });
    if let Some(tag) = missing {
        return Err(SessionError::MissingRequiredTag { tag });
    }
    match (message.msg_type(), message.seq_num()) {
        (Some(msg_type), Some(seq)) => Ok((msg_type, seq)),
        (None, _) => Err(SessionError::MissingRequiredTag {
            tag: tags::MSG_TYPE,
        }),
        (_, None) => Err(SessionError::MissingRequiredTag {
            tag: tags::MSG_SEQ_NUM,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fixline_core::error::StoreError;
    use fixline_store::{MemoryStore, StoreRecords};
    use fixline_tagvalue::encode;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    struct Harness {
        session: Session,
        events: UnboundedReceiver<SessionEvent>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn drain(&mut self) -> Vec<SessionEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new("FIX.4.2", "SERVER", "CLIENT")
    }

    fn harness(config: SessionConfig) -> Harness {
        let (tx, rx) = unbounded_channel();
        let store = Arc::new(MemoryStore::new());
        Harness {
            session: Session::new(config, store.clone(), tx),
            events: rx,
            store,
        }
    }

    fn inbound(msg_type: &str, seq: u64) -> Message {
        Message::new()
            .with(8, "FIX.4.2")
            .with(35, msg_type)
            .with(34, seq.to_string())
            .with(49, "CLIENT")
            .with(56, "SERVER")
            .with(52, "20121105-23:24:06.000")
    }

    fn logon(seq: u64) -> Message {
        inbound("A", seq).with(98, "0").with(108, "30")
    }

    fn sent(events: &[SessionEvent]) -> Vec<&Message> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::OutMsg(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn dispatched(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Msg(_)))
            .count()
    }

    fn errors(events: &[SessionEvent]) -> Vec<Severity> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Error { severity, .. } => Some(*severity),
                _ => None,
            })
            .collect()
    }

    fn ended(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::EndSession))
            .count()
    }

    async fn logged_in(config: SessionConfig) -> Harness {
        let mut h = harness(config);
        h.session.process_incoming(logon(1)).await.unwrap();
        h.drain();
        h
    }

    #[tokio::test]
    async fn test_first_message_must_be_logon() {
        let mut h = harness(config());

        let err = h.session.process_incoming(inbound("D", 1)).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::FirstMessageNotLogon {
                msg_type: "D".to_string()
            }
        );

        let events = h.drain();
        assert_eq!(dispatched(&events), 0);
        assert_eq!(errors(&events), vec![Severity::Fatal]);
        assert_eq!(ended(&events), 1);
        assert_eq!(h.session.state(), SessionState::Ended);

        assert_eq!(
            h.session.process_incoming(logon(1)).await,
            Err(SessionError::Ended)
        );
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn test_missing_msg_type_before_logon_is_fatal() {
        let mut h = harness(config());
        let mut msg = logon(1);
        msg.remove(35);

        assert_eq!(
            h.session.process_incoming(msg).await,
            Err(SessionError::MissingMsgType)
        );
        assert!(h.session.state().is_ended());
    }

    #[tokio::test]
    async fn test_logon_without_interval_is_rejected() {
        let mut h = harness(config());
        let mut msg = logon(1);
        msg.remove(108);

        assert_eq!(
            h.session.process_incoming(msg).await,
            Ok(Disposition::Rejected)
        );
        let events = h.drain();
        assert_eq!(errors(&events), vec![Severity::Error]);
        assert_eq!(dispatched(&events), 0);
        assert_eq!(h.session.state(), SessionState::AwaitingLogon);

        assert_eq!(
            h.session.process_incoming(logon(1)).await,
            Ok(Disposition::Dispatched)
        );
        assert!(h.session.is_logged_in());
    }

    #[tokio::test]
    async fn test_logon_with_oversized_interval_is_rejected() {
        let mut h = harness(config());

        for secs in [u64::MAX, MAX_HEARTBEAT_INTERVAL.as_secs() + 1] {
            let msg = logon(1).with(108, secs.to_string());
            assert_eq!(
                h.session.process_incoming(msg).await,
                Ok(Disposition::Rejected)
            );
            assert_eq!(errors(&h.drain()), vec![Severity::Error]);
            assert_eq!(h.session.state(), SessionState::AwaitingLogon);
            assert!(h.session.heartbeat_deadline().is_none());
        }

        let msg = logon(1).with(108, MAX_HEARTBEAT_INTERVAL.as_secs().to_string());
        assert_eq!(
            h.session.process_incoming(msg).await,
            Ok(Disposition::Dispatched)
        );
        assert_eq!(h.session.heartbeat_interval(), Some(MAX_HEARTBEAT_INTERVAL));
    }

    #[tokio::test]
    async fn test_reset_to_max_sequence_number() {
        let mut h = logged_in(config()).await;

        let reset = inbound("4", 2).with(36, u64::MAX.to_string());
        h.session.process_incoming(reset).await.unwrap();
        assert_eq!(h.session.incoming_seq_num(), u64::MAX);

        assert_eq!(
            h.session.process_incoming(inbound("D", u64::MAX)).await,
            Ok(Disposition::Dispatched)
        );
        assert_eq!(h.session.incoming_seq_num(), u64::MAX);
    }

    #[tokio::test]
    async fn test_logon_response() {
        let mut h = harness(config().with_respond_to_logon(true));

        let disposition = h.session.process_incoming(logon(1)).await.unwrap();
        assert_eq!(disposition, Disposition::Dispatched);

        let events = h.drain();
        assert!(events.contains(&SessionEvent::Logon));
        let out = sent(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].msg_type(), Some(MsgType::Logon));
        assert_eq!(out[0].heart_bt_int(), Some(30));
        assert_eq!(out[0].seq_num(), Some(1));
        assert_eq!(out[0].sender_comp_id(), Some("SERVER"));
        assert_eq!(out[0].target_comp_id(), Some("CLIENT"));

        assert!(h.session.is_logged_in());
        assert_eq!(h.session.incoming_seq_num(), 2);
        assert_eq!(h.session.outgoing_seq_num(), 2);
        assert_eq!(h.session.heartbeat_interval(), Some(Duration::from_secs(30)));
        assert!(h.session.heartbeat_deadline().is_some());
        // inbound logon and our response
        assert_eq!(h.store.message_count(h.session.id()), 2);
    }

    #[tokio::test]
    async fn test_in_order_message_advances_and_clears_resend_flag() {
        let mut h = logged_in(config()).await;

        h.session.process_incoming(inbound("D", 5)).await.unwrap();
        let events = h.drain();
        let out = sent(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].msg_type(), Some(MsgType::ResendRequest));
        assert_eq!(out[0].get(7), Some("2"));
        assert_eq!(out[0].get(16), Some("0"));
        assert!(h.session.is_resend_requested());
        assert_eq!(h.session.incoming_seq_num(), 2);

        h.session.process_incoming(inbound("D", 6)).await.unwrap();
        assert!(sent(&h.drain()).is_empty());

        h.session.process_incoming(inbound("D", 2)).await.unwrap();
        assert_eq!(h.session.incoming_seq_num(), 3);
        assert!(!h.session.is_resend_requested());
    }

    #[tokio::test]
    async fn test_lower_sequence_number() {
        let mut h = logged_in(config()).await;
        h.session.process_incoming(inbound("D", 2)).await.unwrap();
        h.drain();

        let dup = inbound("D", 1).with(43, "Y");
        assert_eq!(
            h.session.process_incoming(dup).await,
            Ok(Disposition::Duplicate)
        );
        let events = h.drain();
        assert_eq!(dispatched(&events), 0);
        assert!(errors(&events).is_empty());
        assert_eq!(h.session.incoming_seq_num(), 3);

        assert_eq!(
            h.session.process_incoming(inbound("D", 1)).await,
            Err(SessionError::SequenceTooLow {
                expected: 3,
                received: 1
            })
        );
        let events = h.drain();
        assert_eq!(errors(&events), vec![Severity::Fatal]);
        assert_eq!(ended(&events), 1);
        assert_eq!(dispatched(&events), 0);
    }

    #[tokio::test]
    async fn test_missing_required_tag_is_rejected() {
        let mut h = logged_in(config()).await;
        let stored = h.store.message_count(h.session.id());
        let mut msg = inbound("D", 2);
        msg.remove(52);

        assert_eq!(
            h.session.process_incoming(msg).await,
            Ok(Disposition::Rejected)
        );
        let events = h.drain();
        let out = sent(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].msg_type(), Some(MsgType::Reject));
        assert_eq!(out[0].get(45), Some("2"));
        assert!(out[0].get(58).is_some_and(|text| text.contains("52")));
        assert_eq!(errors(&events), vec![Severity::Warn]);
        assert_eq!(dispatched(&events), 0);
        // the inbound message and our Reject
        assert_eq!(h.store.message_count(h.session.id()), stored + 2);

        let mut msg = inbound("D", 2);
        msg.remove(34);
        msg.remove(49);
        assert_eq!(
            h.session.process_incoming(msg).await,
            Ok(Disposition::Rejected)
        );
        h.drain();
        assert_eq!(h.store.message_count(h.session.id()), stored + 4);
        let last = h.store.records(h.session.id()).await.unwrap().last().unwrap();
        let persisted = decode(&last).unwrap();
        assert_eq!(persisted.get(35), Some("D"));
        assert!(!persisted.contains(34));

        assert_eq!(h.session.incoming_seq_num(), 2);
        assert_eq!(
            h.session.process_incoming(inbound("D", 2)).await,
            Ok(Disposition::Dispatched)
        );
    }

    #[tokio::test]
    async fn test_sequence_reset_mode() {
        let mut h = logged_in(config()).await;

        let reset = inbound("4", 99).with(36, "10");
        h.session.process_incoming(reset).await.unwrap();
        assert_eq!(h.session.incoming_seq_num(), 10);
        assert!(sent(&h.drain()).is_empty());

        assert_eq!(
            h.session.process_incoming(inbound("4", 10)).await,
            Ok(Disposition::Rejected)
        );
        assert_eq!(errors(&h.drain()), vec![Severity::Warn]);

        let decrement = inbound("4", 10).with(123, "N").with(36, "5");
        assert_eq!(
            h.session.process_incoming(decrement).await,
            Err(SessionError::SequenceResetDecrement {
                current: 10,
                requested: 5
            })
        );
        assert!(h.session.state().is_ended());
    }

    #[tokio::test]
    async fn test_gap_fill() {
        let mut h = logged_in(config()).await;

        let fill = inbound("4", 2).with(43, "Y").with(123, "Y").with(36, "5");
        assert_eq!(
            h.session.process_incoming(fill).await,
            Ok(Disposition::Dispatched)
        );
        assert_eq!(h.session.incoming_seq_num(), 5);
        assert!(sent(&h.drain()).is_empty());
    }

    #[tokio::test]
    async fn test_test_request_is_answered() {
        let mut h = logged_in(config()).await;

        h.session
            .process_incoming(inbound("1", 2).with(112, "PING"))
            .await
            .unwrap();
        let events = h.drain();
        let out = sent(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].msg_type(), Some(MsgType::Heartbeat));
        assert_eq!(out[0].test_req_id(), Some("PING"));
        assert_eq!(dispatched(&events), 1);
    }

    #[tokio::test]
    async fn test_logout_handling() {
        let mut h = logged_in(config()).await;

        h.session.process_incoming(inbound("5", 2)).await.unwrap();
        let events = h.drain();
        let out = sent(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].msg_type(), Some(MsgType::Logout));
        assert_eq!(out[0].sender_comp_id(), Some("SERVER"));
        assert_eq!(ended(&events), 0);
        assert!(h.session.is_logged_in());

        h.session.send_logoff().await.unwrap();
        assert!(h.session.is_logout_requested());
        h.drain();

        assert_eq!(
            h.session.process_incoming(inbound("5", 3)).await,
            Ok(Disposition::Dispatched)
        );
        let events = h.drain();
        assert_eq!(dispatched(&events), 1);
        assert_eq!(ended(&events), 1);
        assert!(sent(&events).is_empty());
        assert!(h.session.heartbeat_deadline().is_none());
    }

    #[tokio::test]
    async fn test_resend_request_with_gap() {
        let mut h = harness(config().with_respond_to_logon(true));
        h.session.process_incoming(logon(1)).await.unwrap();
        h.session
            .send_msg(Message::of_type(MsgType::Other("D".into())).with(11, "ORD1"))
            .await
            .unwrap();
        h.drain();

        let request = inbound("2", 3).with(7, "1").with(16, "0");
        h.session.process_incoming(request).await.unwrap();
        let events = h.drain();
        let out = sent(&events);
        assert_eq!(out.len(), 3);

        assert_eq!(out[0].msg_type(), Some(MsgType::SequenceReset));
        assert_eq!(out[0].seq_num(), Some(1));
        assert!(out[0].is_gap_fill());
        assert!(out[0].is_poss_dup());
        assert_eq!(out[0].new_seq_no(), Some(2));

        assert_eq!(out[1].get(35), Some("D"));
        assert_eq!(out[1].seq_num(), Some(2));
        assert_eq!(out[1].get(11), Some("ORD1"));
        assert!(out[1].is_poss_dup());

        assert_eq!(out[2].msg_type(), Some(MsgType::ResendRequest));
        assert_eq!(out[2].seq_num(), Some(3));
        assert_eq!(out[2].get(7), Some("2"));

        assert_eq!(h.session.outgoing_seq_num(), 4);
        // logon in, logon out, order, resend request in, resend request out
        assert_eq!(h.store.message_count(h.session.id()), 5);
    }

    #[tokio::test]
    async fn test_resend_request_range() {
        let mut h = logged_in(config()).await;
        for id in ["A1", "A2", "A3"] {
            h.session
                .send_msg(Message::of_type(MsgType::Other("D".into())).with(11, id))
                .await
                .unwrap();
        }
        h.drain();

        let request = inbound("2", 2).with(7, "2").with(16, "2");
        h.session.process_incoming(request).await.unwrap();
        let out: Vec<Message> = sent(&h.drain()).into_iter().cloned().collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get(11), Some("A2"));
        assert_eq!(out[0].seq_num(), Some(2));
    }

    #[tokio::test]
    async fn test_send_msg_stamps_header() {
        let mut h = logged_in(config()).await;

        let sent = h
            .session
            .send_msg(
                Message::of_type(MsgType::Other("D".into()))
                    .with(56, "OTHER")
                    .with(11, "X"),
            )
            .await
            .unwrap();
        assert_eq!(sent.begin_string(), Some("FIX.4.2"));
        assert_eq!(sent.sender_comp_id(), Some("SERVER"));
        assert_eq!(sent.target_comp_id(), Some("OTHER"));
        assert_eq!(sent.seq_num(), Some(1));
        assert_eq!(sent.sending_time().map(str::len), Some(21));
        assert_eq!(h.session.outgoing_seq_num(), 2);

        let events = h.drain();
        assert!(matches!(&events[0], SessionEvent::OutMsg(m) if *m == sent));
        assert!(matches!(
            &events[1],
            SessionEvent::State(StateChange { outgoing_seq_num: Some(2), .. })
        ));

        assert_eq!(
            h.session.send_msg(Message::new().with(11, "X")).await,
            Err(SessionError::MissingRequiredTag { tag: 35 })
        );
        assert_eq!(h.session.outgoing_seq_num(), 2);
    }

    #[tokio::test]
    async fn test_recover_from_store() {
        let store = Arc::new(MemoryStore::new());
        let id = config().session_id();
        for seq in [1, 2, 3] {
            let out = inbound("0", seq).with(49, "SERVER").with(56, "CLIENT");
            store.add(&id, &encode(&out).unwrap()).await.unwrap();
        }
        for seq in [1, 9, 10] {
            store
                .add(&id, &encode(&inbound("0", seq)).unwrap())
                .await
                .unwrap();
        }

        let (tx, _rx) = unbounded_channel();
        let session = Session::recover(config(), store, tx).await.unwrap();
        assert_eq!(session.outgoing_seq_num(), 4);
        assert_eq!(session.incoming_seq_num(), 11);
        assert_eq!(session.state(), SessionState::AwaitingLogon);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_scenario() {
        let start = Instant::now();
        let mut h = logged_in(config()).await;

        let mut timeline = Vec::new();
        let mut outcome = Ok(());
        while let Some(deadline) = h.session.heartbeat_deadline() {
            tokio::time::sleep_until(deadline).await;
            outcome = h.session.on_heartbeat_tick().await;
            let at = start.elapsed().as_secs();
            for msg in sent(&h.drain()) {
                timeline.push((at, msg.get(35).unwrap_or_default().to_string()));
            }
            if outcome.is_err() {
                break;
            }
        }

        // With the clock paused every tick lands exactly on a threshold, which
        // does not exceed it. In real time each action fires one tick earlier.
        assert_eq!(
            timeline,
            vec![
                (45, "0".to_string()),
                (60, "1".to_string()),
                (75, "1".to_string()),
            ]
        );
        assert_eq!(
            outcome,
            Err(SessionError::HeartbeatTimeout { elapsed_ms: 75_000 })
        );
        assert_eq!(start.elapsed(), Duration::from_secs(75));
        assert!(h.session.state().is_ended());
        assert!(h.session.heartbeat_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_request_ids_increment() {
        let mut h = logged_in(config().with_send_heartbeats(false)).await;

        tokio::time::advance(Duration::from_secs(46)).await;
        h.session.on_heartbeat_tick().await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        h.session.on_heartbeat_tick().await.unwrap();

        let events = h.drain();
        let ids: Vec<&str> = sent(&events)
            .into_iter()
            .filter_map(Message::test_req_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_modify_behavior_cancels_and_restarts_timer() {
        let mut h = logged_in(config()).await;
        assert!(h.session.heartbeat_deadline().is_some());

        h.session.modify_behavior(Behavior::disconnected());
        assert!(h.session.heartbeat_deadline().is_none());
        assert!(!h.session.config().send_heartbeats);
        assert!(h.session.is_logged_in());

        h.session
            .modify_behavior(Behavior::new().expect_heartbeats(true).respond_to_logon(true));
        assert!(h.session.heartbeat_deadline().is_some());
        assert!(h.session.config().respond_to_logon);
    }

    #[tokio::test]
    async fn test_end_session_is_idempotent() {
        let mut h = logged_in(config()).await;

        h.session.end_session();
        h.session.end_session();
        assert_eq!(ended(&h.drain()), 1);
        assert_eq!(
            h.session.send_msg(Message::of_type(MsgType::Heartbeat)).await,
            Err(SessionError::Ended)
        );
        assert_eq!(h.session.on_heartbeat_tick().await, Err(SessionError::Ended));
    }

    #[tokio::test]
    async fn test_raise() {
        let mut h = logged_in(config()).await;

        h.session.raise(Severity::Error, "checksum mismatch");
        assert!(h.session.is_logged_in());
        h.session.raise(Severity::Fatal, "unparsable body length");
        let events = h.drain();
        assert_eq!(errors(&events), vec![Severity::Error, Severity::Fatal]);
        assert_eq!(ended(&events), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn add(&self, session: &SessionId, _message: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::AppendFailed {
                session: session.to_string(),
                reason: "disk full".to_string(),
            })
        }

        async fn records(&self, _session: &SessionId) -> Result<StoreRecords, StoreError> {
            Ok(StoreRecords::empty())
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_a_warning() {
        let (tx, mut rx) = unbounded_channel();
        let mut session = Session::new(config(), Arc::new(FailingStore), tx);

        assert_eq!(
            session.process_incoming(logon(1)).await,
            Ok(Disposition::Dispatched)
        );
        assert!(session.is_logged_in());

        let mut warnings = 0;
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::Error { severity, description } = event {
                assert_eq!(severity, Severity::Warn);
                assert!(description.contains("disk full"));
                warnings += 1;
            }
        }
        assert_eq!(warnings, 1);
    }
}
