//! Key management for the ZHA lock manager
//!
//! Provides the durable record storage the lock manager persists into, the
//! custodian of the single encryption key, and the cipher that protects
//! keypad codes at rest.
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


pub mod cipher;
pub mod custodian;
pub mod error;
pub mod key_types;
pub mod records;

pub use cipher::CodeCipher;
pub use custodian::{KeyCustodian, KEY_RECORD, KEY_RECORD_VERSION};
pub use error::{KeyError, KeyResult, RecordError};
pub use key_types::SecretKey;
pub use records::{FileRecordStore, MemoryRecordStore, RecordStore, VersionedRecord};
