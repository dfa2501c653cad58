//! Error types for the credential store

use thiserror::Error;
use zlm_keys::{KeyError, RecordError};

/// Credential store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown lock: {0}")]
    NotFound(String),

    #[error("Slot {slot} does not exist on lock {device_ieee}")]
    SlotNotFound { device_ieee: String, slot: u16 },

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored lock data is corrupt: {0}")]
    Corrupt(String),

    #[error("Store has been wiped")]
    Wiped,
}

pub type StoreResult<T> = Result<T, StoreError>;
