//! Error types for key management and durable records
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use thiserror::Error;

/// Durable record errors
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record is corrupt: {0}")]
    Corrupt(String),

    #[error("Record {name} has version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        name: String,
        found: u32,
        supported: u32,
    },
}

/// Key management errors
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Stored encryption key is corrupt: {0}")]
    CorruptKey(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Tampered, truncated or foreign ciphertext
    #[error("Invalid ciphertext")]
    InvalidCiphertext,

    #[error("Key storage error: {0}")]
    Storage(#[from] RecordError),
}

/// Result type for key operations
pub type KeyResult<T> = Result<T, KeyError>;
