/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixline Store
//!
//! Message persistence for the fixline FIX session engine.
//!
//! This crate provides:
//! - **MessageStore trait**: append-only per-session log with in-order replay
//! - **MemoryStore**: in-memory store for testing and simple use cases
//! - **FileStore**: one append-only file per session

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{MessageStore, StoreRecords};
