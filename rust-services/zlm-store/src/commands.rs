//! Privileged command surface
//!
//! Every operation that touches lock hardware sends the hardware command
//! first and only mutates and persists the store once the lock acknowledged
//! it. The store write guard is held across the whole sequence so concurrent
//! commands cannot interleave between hardware and record.
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


use crate::error::StoreError;
use crate::model::LockRecord;
use crate::store::{CredentialStore, SharedStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use zlm_bus::traits::LockCommander;
use zlm_bus::MessageBusError;
use zlm_types::{LockAction, LockCommand, LockDescriptor, LockMetaUpdate, LockView, ReconcileReport};

const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 8;

/// Rejection of a command
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lock command failed: {0}")]
    Hardware(#[from] MessageBusError),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl CommandError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::NotFound(_) => "not_found",
            CommandError::InvalidState(_) => "invalid",
            CommandError::InvalidInput(_) => "invalid_input",
            CommandError::Hardware(_) => "hardware",
            CommandError::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for CommandError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(device_ieee) => {
                CommandError::NotFound(format!("lock {}", device_ieee))
            }
            StoreError::SlotNotFound { device_ieee, slot } => {
                CommandError::NotFound(format!("slot {} on lock {}", slot, device_ieee))
            }
            other => CommandError::Storage(other),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Codes are 4 to 8 ASCII digits
pub fn validate_code(code: &str) -> CommandResult<()> {
    let len_ok = (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len());
    if !len_ok || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommandError::InvalidInput(format!(
            "code must be {} to {} digits",
            MIN_CODE_LEN, MAX_CODE_LEN
        )));
    }
    Ok(())
}

/// Refuse work on a wiped store before any hardware traffic or mutation
fn ensure_live(store: &CredentialStore) -> CommandResult<()> {
    if store.is_wiped() {
        return Err(CommandError::Storage(StoreError::Wiped));
    }
    Ok(())
}

fn find_lock<'a>(store: &'a CredentialStore, device_ieee: &str) -> CommandResult<&'a LockRecord> {
    store
        .get_lock(device_ieee)
        .ok_or_else(|| CommandError::NotFound(format!("lock {}", device_ieee)))
}

/// Absolute slot for an operator-facing slot number
fn resolve_slot(lock: &LockRecord, relative: i64) -> CommandResult<u16> {
    if relative < 0 {
        return Err(CommandError::InvalidInput(format!(
            "slot {} is negative",
            relative
        )));
    }
    lock.absolute_slot(relative).ok_or_else(|| {
        CommandError::InvalidInput(format!(
            "slot {} with offset {} is not a valid slot number",
            relative, lock.slot_offset
        ))
    })
}

fn command_for(lock: &LockRecord, action: LockAction) -> LockCommand {
    LockCommand {
        device_ieee: lock.device_ieee().to_string(),
        entity_id: lock.entity_id.clone(),
        action,
    }
}

/// Operator-facing lock and code management
#[derive(Clone)]
pub struct LockManager {
    store: SharedStore,
    commander: Arc<dyn LockCommander>,
}

impl LockManager {
    pub fn new(store: SharedStore, commander: Arc<dyn LockCommander>) -> Self {
        Self { store, commander }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub async fn list_locks(&self) -> Vec<LockView> {
        let store = self.store.read().await;
        store.locks().map(LockRecord::view).collect()
    }

    pub async fn get_lock(&self, device_ieee: &str) -> CommandResult<LockView> {
        let store = self.store.read().await;
        Ok(find_lock(&store, device_ieee)?.view())
    }

    /// Program a code into a slot, then record it
    ///
    /// `label` replaces the slot label when given; otherwise the current label
    /// is kept.
    pub async fn set_code(
        &self,
        device_ieee: &str,
        slot: i64,
        code: &str,
        label: Option<&str>,
    ) -> CommandResult<LockView> {
        validate_code(code)?;

        let mut store = self.store.write().await;
        ensure_live(&store)?;
        let (absolute, command, label) = {
            let lock = find_lock(&store, device_ieee)?;
            let absolute = resolve_slot(lock, slot)?;
            let label = match label {
                Some(label) => label.to_string(),
                None => lock
                    .slot(absolute)
                    .map(|s| s.label.clone())
                    .unwrap_or_default(),
            };
            let command = command_for(
                lock,
                LockAction::SetUserCode {
                    slot: absolute,
                    code: code.to_string(),
                },
            );
            (absolute, command, label)
        };

        self.commander.send_command(&command).await?;

        store.set_code(device_ieee, absolute, code, &label, true)?;
        store.save().await?;

        info!(device_ieee = device_ieee, slot = absolute, "Code set");
        Ok(find_lock(&store, device_ieee)?.view())
    }

    pub async fn enable_code(&self, device_ieee: &str, slot: i64) -> CommandResult<LockView> {
        self.toggle_code(device_ieee, slot, true).await
    }

    pub async fn disable_code(&self, device_ieee: &str, slot: i64) -> CommandResult<LockView> {
        self.toggle_code(device_ieee, slot, false).await
    }

    async fn toggle_code(
        &self,
        device_ieee: &str,
        slot: i64,
        enabled: bool,
    ) -> CommandResult<LockView> {
        let mut store = self.store.write().await;
        ensure_live(&store)?;
        let (absolute, command) = {
            let lock = find_lock(&store, device_ieee)?;
            let absolute = resolve_slot(lock, slot)?;
            if !lock.slot(absolute).is_some_and(|s| s.has_code()) {
                return Err(CommandError::InvalidState(format!(
                    "slot {} has no code",
                    slot
                )));
            }
            let action = if enabled {
                LockAction::EnableUserCode { slot: absolute }
            } else {
                LockAction::DisableUserCode { slot: absolute }
            };
            (absolute, command_for(lock, action))
        };

        self.commander.send_command(&command).await?;

        store.set_enabled(device_ieee, absolute, enabled)?;
        store.save().await?;

        info!(
            device_ieee = device_ieee,
            slot = absolute,
            enabled = enabled,
            "Code toggled"
        );
        Ok(find_lock(&store, device_ieee)?.view())
    }

    /// Remove a code from the lock, then from the record
    pub async fn clear_code(&self, device_ieee: &str, slot: i64) -> CommandResult<LockView> {
        let mut store = self.store.write().await;
        ensure_live(&store)?;
        let (absolute, command) = {
            let lock = find_lock(&store, device_ieee)?;
            let absolute = resolve_slot(lock, slot)?;
            (
                absolute,
                command_for(lock, LockAction::ClearUserCode { slot: absolute }),
            )
        };

        self.commander.send_command(&command).await?;

        store.clear_code(device_ieee, absolute)?;
        store.save().await?;

        info!(device_ieee = device_ieee, slot = absolute, "Code cleared");
        Ok(find_lock(&store, device_ieee)?.view())
    }

    /// Change a slot label. Local only.
    pub async fn rename_code(
        &self,
        device_ieee: &str,
        slot: i64,
        label: &str,
    ) -> CommandResult<LockView> {
        let mut store = self.store.write().await;
        ensure_live(&store)?;
        let absolute = resolve_slot(find_lock(&store, device_ieee)?, slot)?;

        store.rename_slot(device_ieee, absolute, label)?;
        store.save().await?;

        Ok(find_lock(&store, device_ieee)?.view())
    }

    /// Edit name, capacity and offset of a managed lock
    ///
    /// Existing slots keep their absolute numbers; a new offset only changes
    /// how operator-facing numbers map onto them.
    pub async fn save_lock_meta(
        &self,
        device_ieee: &str,
        update: &LockMetaUpdate,
    ) -> CommandResult<LockView> {
        if update.max_slots == 0 {
            return Err(CommandError::InvalidInput(
                "max_slots must be greater than zero".to_string(),
            ));
        }
        let name = update.name.trim();
        if name.is_empty() {
            return Err(CommandError::InvalidInput("name must not be empty".to_string()));
        }

        let mut store = self.store.write().await;
        ensure_live(&store)?;
        let lock = store
            .get_lock_mut(device_ieee)
            .ok_or_else(|| CommandError::NotFound(format!("lock {}", device_ieee)))?;
        lock.name = name.to_string();
        lock.max_slots = update.max_slots;
        lock.slot_offset = update.slot_offset;
        store.save().await?;

        info!(
            device_ieee = device_ieee,
            max_slots = update.max_slots,
            slot_offset = update.slot_offset,
            "Lock metadata updated"
        );
        Ok(find_lock(&store, device_ieee)?.view())
    }

    /// Replace the lock selection. Deselected locks lose all their codes.
    pub async fn apply_selection(
        &self,
        selection: &[LockDescriptor],
    ) -> CommandResult<ReconcileReport> {
        let mut store = self.store.write().await;
        ensure_live(&store)?;
        let report = store.apply_selection(selection).await?;

        if !report.removed.is_empty() {
            warn!(
                removed = ?report.removed,
                "Deselected locks were removed together with their stored codes"
            );
        }
        Ok(report)
    }

    /// Erase all durable state. The running service keeps no usable store.
    pub async fn uninstall(&self) -> CommandResult<()> {
        let mut store = self.store.write().await;
        store.wipe().await?;
        Ok(())
    }
}
