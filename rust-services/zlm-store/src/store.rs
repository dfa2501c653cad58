//! The credential store
//!
//! One `CredentialStore` exists per installation. It is handed to the command
//! surface and the event correlator as a [`SharedStore`]; every mutation is
//! followed by a full [`CredentialStore::save`] under the same write guard, so
//! the durable copy trails the in-memory one by at most one operation.
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


use crate::error::{StoreError, StoreResult};
use crate::model::{LockRecord, SlotRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;
use zlm_keys::{CodeCipher, KeyCustodian, RecordStore, SecretKey, KEY_RECORD};
use zlm_types::DEFAULT_MAX_SLOTS;

/// Record holding all locks and slots
pub const LOCKS_RECORD: &str = "zha_lock_manager";
pub const LOCKS_RECORD_VERSION: u32 = 1;

/// Handle through which the command surface and the correlator share the store
pub type SharedStore = Arc<RwLock<CredentialStore>>;

// ============================================================================
// Persisted shape
// ============================================================================

fn default_max_slots() -> u16 {
    DEFAULT_MAX_SLOTS
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    locks: BTreeMap<String, PersistedLock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedLock {
    name: String,
    entity_id: String,
    #[serde(default = "default_max_slots")]
    max_slots: u16,
    #[serde(default)]
    slot_offset: i32,
    /// Keyed by the absolute slot number rendered as a string
    #[serde(default)]
    slots: BTreeMap<String, PersistedSlot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSlot {
    #[serde(default)]
    label: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    code_encrypted: Option<String>,
}

impl PersistedLock {
    fn from_record(lock: &LockRecord) -> Self {
        Self {
            name: lock.name.clone(),
            entity_id: lock.entity_id.clone(),
            max_slots: lock.max_slots,
            slot_offset: lock.slot_offset,
            slots: lock
                .slots
                .values()
                .map(|s| {
                    (
                        s.slot.to_string(),
                        PersistedSlot {
                            label: s.label.clone(),
                            enabled: s.enabled,
                            code_encrypted: s.code_encrypted.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    fn into_record(self, device_ieee: &str) -> StoreResult<LockRecord> {
        let mut lock = LockRecord::new(
            device_ieee,
            self.entity_id,
            self.name,
            self.max_slots,
            self.slot_offset,
        );

        for (key, persisted) in self.slots {
            let slot: u16 = key.trim().parse().map_err(|_| {
                StoreError::Corrupt(format!(
                    "lock {} has non-numeric slot key {:?}",
                    device_ieee, key
                ))
            })?;
            lock.slots.insert(
                slot,
                SlotRecord {
                    slot,
                    label: persisted.label,
                    enabled: persisted.enabled,
                    code_encrypted: persisted.code_encrypted,
                },
            );
        }

        Ok(lock)
    }
}

// ============================================================================
// Store
// ============================================================================

/// In-memory lock records backed by a durable record
pub struct CredentialStore {
    records: Arc<dyn RecordStore>,
    cipher: CodeCipher,
    locks: BTreeMap<String, LockRecord>,
    wiped: bool,
}

impl CredentialStore {
    /// Obtain the namespace key and load the persisted locks
    ///
    /// Fails when the key record is unreadable or corrupt; there is no safe
    /// fallback key.
    pub async fn open(records: Arc<dyn RecordStore>) -> StoreResult<Self> {
        let key = KeyCustodian::new(records.clone()).obtain_key().await?;
        let mut store = Self::with_key(records, &key);
        store.load().await?;
        Ok(store)
    }

    /// Empty, unloaded store using an already obtained key
    pub fn with_key(records: Arc<dyn RecordStore>, key: &SecretKey) -> Self {
        Self {
            records,
            cipher: CodeCipher::new(key),
            locks: BTreeMap::new(),
            wiped: false,
        }
    }

    /// True once [`CredentialStore::wipe`] ran; nothing may be changed afterwards
    pub fn is_wiped(&self) -> bool {
        self.wiped
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Replace the in-memory state with the durable one
    pub async fn load(&mut self) -> StoreResult<()> {
        let data = self
            .records
            .load_data(LOCKS_RECORD, LOCKS_RECORD_VERSION)
            .await?;

        let state: PersistedState = match data {
            None | Some(serde_json::Value::Null) => PersistedState::default(),
            Some(data) => serde_json::from_value(data)?,
        };

        let mut locks = BTreeMap::new();
        for (device_ieee, persisted) in state.locks {
            let lock = persisted.into_record(&device_ieee)?;
            locks.insert(device_ieee, lock);
        }

        info!(locks = locks.len(), "Credential store loaded");
        self.locks = locks;
        Ok(())
    }

    /// Persist a full snapshot of all locks
    pub async fn save(&self) -> StoreResult<()> {
        if self.wiped {
            return Err(StoreError::Wiped);
        }

        let state = PersistedState {
            locks: self
                .locks
                .iter()
                .map(|(ieee, lock)| (ieee.clone(), PersistedLock::from_record(lock)))
                .collect(),
        };
        let data = serde_json::to_value(&state)?;

        self.records
            .save(LOCKS_RECORD, LOCKS_RECORD_VERSION, &data)
            .await?;

        debug!(locks = self.locks.len(), "Credential store saved");
        Ok(())
    }

    pub fn locks(&self) -> impl Iterator<Item = &LockRecord> {
        self.locks.values()
    }

    pub fn lock_ids(&self) -> impl Iterator<Item = &str> {
        self.locks.keys().map(String::as_str)
    }

    pub fn get_lock(&self, device_ieee: &str) -> Option<&LockRecord> {
        self.locks.get(device_ieee)
    }

    pub fn get_lock_mut(&mut self, device_ieee: &str) -> Option<&mut LockRecord> {
        self.locks.get_mut(device_ieee)
    }

    fn lock_mut(&mut self, device_ieee: &str) -> StoreResult<&mut LockRecord> {
        self.locks
            .get_mut(device_ieee)
            .ok_or_else(|| StoreError::NotFound(device_ieee.to_string()))
    }

    /// Start managing a lock. An existing record under the same address wins.
    pub fn insert_lock(&mut self, lock: LockRecord) -> bool {
        if self.locks.contains_key(lock.device_ieee()) {
            return false;
        }
        self.locks.insert(lock.device_ieee().to_string(), lock);
        true
    }

    /// Forget a lock together with every slot and code it holds
    pub fn remove_lock(&mut self, device_ieee: &str) -> Option<LockRecord> {
        self.locks.remove(device_ieee)
    }

    /// Existing slot, or a lazily created default one
    pub fn ensure_slot(&mut self, device_ieee: &str, slot: u16) -> StoreResult<&mut SlotRecord> {
        Ok(self.lock_mut(device_ieee)?.ensure_slot(slot))
    }

    /// Encrypt and store a code, creating the slot when needed
    pub fn set_code(
        &mut self,
        device_ieee: &str,
        slot: u16,
        code: &str,
        label: &str,
        enabled: bool,
    ) -> StoreResult<()> {
        let token = self.cipher.encrypt(code)?;
        let record = self.ensure_slot(device_ieee, slot)?;
        record.label = label.to_string();
        record.enabled = enabled;
        record.code_encrypted = Some(token);
        Ok(())
    }

    /// Drop the code and disable the slot; a missing slot is left missing
    pub fn clear_code(&mut self, device_ieee: &str, slot: u16) -> StoreResult<()> {
        if let Some(record) = self.lock_mut(device_ieee)?.slot_mut(slot) {
            record.code_encrypted = None;
            record.enabled = false;
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, device_ieee: &str, slot: u16, enabled: bool) -> StoreResult<()> {
        let lock = self.lock_mut(device_ieee)?;
        let record = lock.slot_mut(slot).ok_or_else(|| StoreError::SlotNotFound {
            device_ieee: device_ieee.to_string(),
            slot,
        })?;
        record.enabled = enabled;
        Ok(())
    }

    pub fn rename_slot(&mut self, device_ieee: &str, slot: u16, label: &str) -> StoreResult<()> {
        self.ensure_slot(device_ieee, slot)?.label = label.to_string();
        Ok(())
    }

    /// Decrypted code of a slot
    ///
    /// `None` covers a missing slot, an empty slot and an undecryptable one
    /// alike.
    pub fn get_plain_code(&self, device_ieee: &str, slot: u16) -> Option<Zeroizing<String>> {
        let token = self
            .locks
            .get(device_ieee)?
            .slot(slot)?
            .code_encrypted
            .as_deref()
            .filter(|t| !t.is_empty())?;

        match self.cipher.decrypt(token) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(
                    device_ieee = device_ieee,
                    slot = slot,
                    error = %e,
                    "Stored code could not be decrypted"
                );
                None
            }
        }
    }

    /// Erase every durable trace of this installation
    ///
    /// The store refuses to save afterwards: a later save would persist codes
    /// under a key that no longer exists.
    pub async fn wipe(&mut self) -> StoreResult<()> {
        Self::wipe_records(self.records.as_ref()).await?;
        self.locks.clear();
        self.wiped = true;
        Ok(())
    }

    /// Remove the lock and key records, whether or not a store was ever loaded
    pub async fn wipe_records(records: &dyn RecordStore) -> StoreResult<()> {
        records.remove(LOCKS_RECORD).await?;
        records.remove(KEY_RECORD).await?;
        warn!("Lock manager records wiped");
        Ok(())
    }
}
