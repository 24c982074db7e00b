/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message store trait definition.
//!
//! This module defines the abstract interface for message storage implementations.

use async_trait::async_trait;
use bytes::Bytes;
use fixline_core::error::StoreError;
use fixline_core::types::SessionId;

/// Append-only persistence of raw wire messages, one log per session.
///
/// The log holds both directions; a record's direction is recovered by
/// comparing its SenderCompID to the session's own.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a raw message to the session's log.
    ///
    /// Appends for one session must be replayed in the order they were made.
    ///
    /// # Errors
    /// Returns `StoreError` if the message cannot be stored.
    async fn add(&self, session: &SessionId, message: &[u8]) -> Result<(), StoreError>;

    /// Returns a snapshot of the session's log in append order.
    ///
    /// Each call starts a fresh replay from the first record.
    ///
    /// # Errors
    /// Returns `StoreError` if the log cannot be read.
    async fn records(&self, session: &SessionId) -> Result<StoreRecords, StoreError>;
}

/// Finite, in-order replay of one session log.
#[derive(Debug, Default)]
pub struct StoreRecords {
    inner: std::vec::IntoIter<Bytes>,
}

impl StoreRecords {
    /// Creates a replay over the given records.
    #[must_use]
    pub fn new(records: Vec<Bytes>) -> Self {
        Self {
            inner: records.into_iter(),
        }
    }

    /// Returns an empty replay.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Iterator for StoreRecords {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for StoreRecords {}
