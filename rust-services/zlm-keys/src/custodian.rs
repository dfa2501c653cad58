//! Custody of the code encryption key
//!
//! The key is generated once per record namespace and reused forever after:
//! a new key would orphan every code encrypted under the old one.
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


use crate::error::{KeyError, KeyResult};
use crate::key_types::SecretKey;
use crate::records::RecordStore;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Record holding the base64 encoded key
pub const KEY_RECORD: &str = "zha_lock_manager_key";
pub const KEY_RECORD_VERSION: u32 = 1;

/// Loads the persisted key, or creates and persists one on first use
pub struct KeyCustodian {
    records: Arc<dyn RecordStore>,
    key: OnceCell<SecretKey>,
}

impl KeyCustodian {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            key: OnceCell::new(),
        }
    }

    /// Return the namespace key, loading or generating it on the first call
    ///
    /// A key record that exists but cannot be read is fatal: falling back to a
    /// new key would silently make every stored code undecryptable.
    pub async fn obtain_key(&self) -> KeyResult<SecretKey> {
        let key = self
            .key
            .get_or_try_init(|| async { self.load_or_generate().await })
            .await?;
        Ok(key.clone())
    }

    async fn load_or_generate(&self) -> KeyResult<SecretKey> {
        let data = self.records.load_data(KEY_RECORD, KEY_RECORD_VERSION).await?;

        match data {
            Some(data) => {
                let encoded = data.get("key").and_then(|v| v.as_str()).ok_or_else(|| {
                    KeyError::CorruptKey("key record has no \"key\" field".to_string())
                })?;
                let key = SecretKey::from_base64(encoded)?;
                info!(record = KEY_RECORD, "Loaded code encryption key");
                Ok(key)
            }
            None => {
                warn!(
                    record = KEY_RECORD,
                    "No code encryption key found, generating a new one"
                );
                let key = SecretKey::generate();
                let encoded = key.to_base64();
                self.records
                    .save(KEY_RECORD, KEY_RECORD_VERSION, &json!({ "key": encoded.as_str() }))
                    .await?;
                Ok(key)
            }
        }
    }
}
