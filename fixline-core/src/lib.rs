/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline Core
//!
//! Core types and error definitions for the fixline FIX session engine.
//!
//! This crate provides the building blocks used across all fixline crates:
//! - **Error types**: one `thiserror` enum per layer plus [`Severity`]
//! - **Message**: ordered tag→value [`Message`] and [`MsgType`]
//! - **Tags**: well-known session tag numbers
//! - **Identity**: [`SessionId`] and the [`Timestamp`] wire format

pub mod error;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{
    DecodeError, EncodeError, FixError, FrameError, Result, SessionError, Severity, StoreError,
};
pub use message::{Message, MsgType};
pub use types::{SessionId, Timestamp};
