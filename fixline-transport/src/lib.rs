/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline Transport
//!
//! Network transport layer for the fixline FIX session engine.
//!
//! This crate provides:
//! - **Codec**: Tokio codec for FIX message framing
//! - **Connection**: task driving a session over any async byte stream
//! - **SessionHandle**: command channel into a running connection

pub mod codec;
pub mod connection;

pub use codec::{CodecError, FixCodec, InboundFrame};
pub use connection::{COMMAND_BUFFER, Command, Connection, ConnectionError, SessionHandle};
