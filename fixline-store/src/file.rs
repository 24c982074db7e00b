/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! File-backed message store.
//!
//! One append-only file per session under a root directory, named after the
//! session id (`FIX.4.2-SENDER-TARGET`). Each record is the message's decimal
//! byte length, a `:`, the raw message and a trailing `\n`, so message bytes
//! may contain any value.

use crate::traits::{MessageStore, StoreRecords};
use async_trait::async_trait;
use bytes::Bytes;
use fixline_core::error::StoreError;
use fixline_core::types::SessionId;
use memchr::memchr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Ends the length prefix of a record.
const LENGTH_TERMINATOR: u8 = b':';

/// Trails every record.
const RECORD_SEPARATOR: u8 = b'\n';

/// Persistent store writing each session log to its own file.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns `StoreError::Corrupted` if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Corrupted {
                reason: format!("cannot create {}: {e}", root.display()),
            })?;
        info!(root = %root.display(), "using file message store");
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the log file path for a session.
    #[must_use]
    pub fn path_for(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.to_string())
    }
}

#[async_trait]
impl MessageStore for FileStore {
    async fn add(&self, session: &SessionId, message: &[u8]) -> Result<(), StoreError> {
        let fail = |e: std::io::Error| StoreError::AppendFailed {
            session: session.to_string(),
            reason: e.to_string(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(session))
            .await
            .map_err(fail)?;

        let prefix = format!("{}{}", message.len(), char::from(LENGTH_TERMINATOR));
        let mut record = Vec::with_capacity(prefix.len() + message.len() + 1);
        record.extend_from_slice(prefix.as_bytes());
        record.extend_from_slice(message);
        record.push(RECORD_SEPARATOR);
        file.write_all(&record).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;

        debug!(session = %session, len = message.len(), "appended record");
        Ok(())
    }

    async fn records(&self, session: &SessionId) -> Result<StoreRecords, StoreError> {
        let path = self.path_for(session);
        let data = match fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(session = %session, "no message log yet");
                return Ok(StoreRecords::empty());
            }
            Err(e) => {
                return Err(StoreError::ReplayFailed {
                    session: session.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let records = split_records(&data).map_err(|reason| StoreError::ReplayFailed {
            session: session.to_string(),
            reason,
        })?;

        info!(session = %session, count = records.len(), "replaying message log");
        Ok(StoreRecords::new(records))
    }
}

/// Splits a log into its records.
///
/// A record cut short at the end of the log, as left by an interrupted
/// append, is dropped with a warning.
fn split_records(data: &Bytes) -> Result<Vec<Bytes>, String> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let Some(colon) = memchr(LENGTH_TERMINATOR, &data[pos..]).map(|i| pos + i) else {
            warn!(offset = pos, "dropping truncated record");
            break;
        };
        let len = std::str::from_utf8(&data[pos..colon])
            .ok()
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| format!("invalid record length at offset {pos}"))?;

        let start = colon + 1;
        let Some(end) = start.checked_add(len).filter(|&end| end < data.len()) else {
            warn!(offset = pos, len, "dropping truncated record");
            break;
        };
        if data[end] != RECORD_SEPARATOR {
            return Err(format!("missing record separator at offset {end}"));
        }
        records.push(data.slice(start..end));
        pos = end + 1;
    }
    Ok(records)
}
