/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store implementation.
//!
//! This module provides a simple in-memory message store suitable for
//! testing and applications that don't require persistence.

use crate::traits::{MessageStore, StoreRecords};
use async_trait::async_trait;
use bytes::Bytes;
use fixline_core::error::StoreError;
use fixline_core::types::SessionId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory message store.
///
/// Not persistent - all data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: RwLock<HashMap<SessionId, Vec<Bytes>>>,
}

impl MemoryStore {
    /// Creates a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of messages logged for a session.
    #[must_use]
    pub fn message_count(&self, session: &SessionId) -> usize {
        self.logs.read().get(session).map_or(0, Vec::len)
    }

    /// Drops a session's log.
    pub fn clear(&self, session: &SessionId) {
        self.logs.write().remove(session);
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn add(&self, session: &SessionId, message: &[u8]) -> Result<(), StoreError> {
        self.logs
            .write()
            .entry(session.clone())
            .or_default()
            .push(Bytes::copy_from_slice(message));
        Ok(())
    }

    async fn records(&self, session: &SessionId) -> Result<StoreRecords, StoreError> {
        let logs = self.logs.read();
        Ok(logs
            .get(session)
            .map(|log| StoreRecords::new(log.clone()))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_append_order() {
        let store = MemoryStore::new();
        let id = SessionId::new("FIX.4.2", "SNDR", "TRGT");

        store.add(&id, b"message1").await.unwrap();
        store.add(&id, b"message2").await.unwrap();
        store.add(&id, b"message3").await.unwrap();

        let records: Vec<Bytes> = store.records(&id).await.unwrap().collect();
        assert_eq!(
            records,
            vec![
                Bytes::from_static(b"message1"),
                Bytes::from_static(b"message2"),
                Bytes::from_static(b"message3"),
            ]
        );
        assert_eq!(store.message_count(&id), 3);
    }

    #[tokio::test]
    async fn test_memory_store_sessions_are_isolated() {
        let store = MemoryStore::new();
        let a = SessionId::new("FIX.4.2", "A", "B");
        let b = a.reversed();

        store.add(&a, b"a1").await.unwrap();
        store.add(&b, b"b1").await.unwrap();
        store.add(&b, b"b2").await.unwrap();

        assert_eq!(store.records(&a).await.unwrap().len(), 1);
        assert_eq!(store.records(&b).await.unwrap().len(), 2);

        store.clear(&b);
        assert_eq!(store.message_count(&b), 0);
        assert_eq!(store.records(&b).await.unwrap().count(), 0);
    }
}
