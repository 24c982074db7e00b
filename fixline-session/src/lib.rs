/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline Session
//!
//! FIX session layer protocol implementation for the fixline engine.
//!
//! This crate provides:
//! - **Session**: logon ordering, sequencing, gap detection and resend recovery
//! - **Sequence management**: monotonic incoming/outgoing counters
//! - **Heartbeat handling**: Heartbeat/TestRequest/timeout checks
//! - **Events**: the notifications a session reports to its environment
//! - **Configuration**: Session configuration options

pub mod config;
pub mod event;
pub mod heartbeat;
pub mod sequence;
pub mod session;
pub mod state;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use event::{Disposition, SessionEvent};
pub use heartbeat::{HeartbeatCheck, HeartbeatTimer};
pub use sequence::{SequenceManager, SequenceResult};
pub use session::{EventSender, Session};
pub use state::{Behavior, SessionState, StateChange};
