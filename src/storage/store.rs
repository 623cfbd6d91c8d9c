// PacketStore - Persistent key-value storage using sled
//
// Provides typed access for storing:
// - Ledger state (packet records + id sequence)
// - The event log

use crate::events::EventEnvelope;
use crate::ledger::LedgerState;
use std::path::Path;
use thiserror::Error;

/// Key prefixes for organizing data
mod keys {
    pub const LEDGER_STATE: &[u8] = b"ledger:state";
    pub const EVENT_LOG: &[u8] = b"events:log";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Persistent store for ledger state and events
///
/// Uses sled for crash-safe, embedded storage. State and log are saved
/// together by callers so neither can outrun the other across restarts.
pub struct PacketStore {
    db: sled::Db,
}

impl PacketStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    // ========================================================================
    // RAW KEY-VALUE OPERATIONS
    // ========================================================================

    /// Put raw bytes
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    /// Get raw bytes
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    // ========================================================================
    // LEDGER STATE PERSISTENCE
    // ========================================================================

    /// Save the ledger state
    pub fn save_state(&self, state: &LedgerState) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(state)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.put_raw(keys::LEDGER_STATE, &bytes)
    }

    /// Load the ledger state
    pub fn load_state(&self) -> Result<Option<LedgerState>, StoreError> {
        match self.get_raw(keys::LEDGER_STATE)? {
            Some(bytes) => {
                let state = postcard::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // EVENT LOG PERSISTENCE
    // ========================================================================

    /// Save the event log
    pub fn save_events(&self, events: &[EventEnvelope]) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(events)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.put_raw(keys::EVENT_LOG, &bytes)
    }

    /// Load the event log
    pub fn load_events(&self) -> Result<Vec<EventEnvelope>, StoreError> {
        match self.get_raw(keys::EVENT_LOG)? {
            Some(bytes) => postcard::from_bytes(&bytes)
                .map_err(|e| StoreError::DeserializationFailed(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}
