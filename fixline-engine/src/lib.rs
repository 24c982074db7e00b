/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline Engine
//!
//! Runs FIX sessions over TCP.
//!
//! This crate provides:
//! - **Acceptor**: Server-side engine creating a session per counterparty
//! - **Initiator**: Client-side engine connecting one session
//! - **Application trait**: Callback interface for session activity
//! - **Builder API**: Fluent configuration for engine setup

pub mod acceptor;
pub mod application;
pub mod builder;
pub mod error;
pub mod initiator;
pub mod runner;

pub use acceptor::Acceptor;
pub use application::{Application, NoOpApplication, dispatch};
pub use builder::{EngineBuilder, SessionSettings};
pub use error::EngineError;
pub use initiator::Initiator;
pub use runner::RunningSession;
