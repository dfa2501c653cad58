//! Payload schemas shared by the store, the bus and the HTTP API
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


use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Default advisory slot capacity of a newly managed lock
pub const DEFAULT_MAX_SLOTS: u16 = 30;

/// Default offset between operator-facing and hardware slot numbers
pub const DEFAULT_SLOT_OFFSET: i32 = 0;

fn default_max_slots() -> u16 {
    DEFAULT_MAX_SLOTS
}

// ============================================================================
// Lock selection
// ============================================================================

/// One lock chosen by the operator for management
///
/// Fields are optional because selections come from hand-edited configuration;
/// incomplete descriptors keep an existing lock selected but never create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDescriptor {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub device_ieee: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_max_slots")]
    pub max_slots: u16,
    #[serde(default)]
    pub slot_offset: i32,
}

impl Default for LockDescriptor {
    fn default() -> Self {
        Self {
            entity_id: None,
            device_ieee: None,
            name: None,
            max_slots: DEFAULT_MAX_SLOTS,
            slot_offset: DEFAULT_SLOT_OFFSET,
        }
    }
}

impl LockDescriptor {
    pub fn new(
        device_ieee: impl Into<String>,
        entity_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            device_ieee: Some(device_ieee.into()),
            name: Some(name.into()),
            max_slots: DEFAULT_MAX_SLOTS,
            slot_offset: DEFAULT_SLOT_OFFSET,
        }
    }

    pub fn with_slot_offset(mut self, slot_offset: i32) -> Self {
        self.slot_offset = slot_offset;
        self
    }

    /// Hardware address, if present and non-empty
    pub fn hardware_identity(&self) -> Option<&str> {
        non_empty(&self.device_ieee)
    }

    pub fn entity_reference(&self) -> Option<&str> {
        non_empty(&self.entity_id)
    }

    pub fn display_name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Outcome of applying a lock selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Locks that started being managed
    pub added: Vec<String>,
    /// Locks whose records and codes were erased
    pub removed: Vec<String>,
}

// ============================================================================
// API views
// ============================================================================

/// Public view of a managed lock. Never carries codes or ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockView {
    pub name: String,
    pub entity_id: String,
    pub device_ieee: String,
    pub max_slots: u16,
    pub slot_offset: i32,
    /// Sorted by absolute slot number
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    /// Absolute (hardware) slot number
    pub slot: u16,
    /// Operator-facing slot number under the current offset
    pub relative_slot: i64,
    pub label: String,
    pub enabled: bool,
    pub has_code: bool,
}

// ============================================================================
// API requests
// ============================================================================

/// Body of a set-code request
#[derive(Clone, Deserialize, Serialize)]
pub struct SetCodeRequest {
    pub code: String,
    /// Replaces the slot label when present
    #[serde(default)]
    pub label: Option<String>,
}

impl fmt::Debug for SetCodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetCodeRequest")
            .field("code", &"[REDACTED]")
            .field("label", &self.label)
            .finish()
    }
}

/// Body of a slot rename request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenameSlotRequest {
    pub label: String,
}

/// Editable lock metadata
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LockMetaUpdate {
    pub name: String,
    pub max_slots: u16,
    pub slot_offset: i32,
}

// ============================================================================
// Hardware commands
// ============================================================================

/// Code-slot operation understood by the lock command layer
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LockAction {
    SetUserCode { slot: u16, code: String },
    EnableUserCode { slot: u16 },
    DisableUserCode { slot: u16 },
    ClearUserCode { slot: u16 },
}

impl LockAction {
    pub fn name(&self) -> &'static str {
        match self {
            LockAction::SetUserCode { .. } => "set_user_code",
            LockAction::EnableUserCode { .. } => "enable_user_code",
            LockAction::DisableUserCode { .. } => "disable_user_code",
            LockAction::ClearUserCode { .. } => "clear_user_code",
        }
    }

    /// Absolute slot the action targets
    pub fn slot(&self) -> u16 {
        match self {
            LockAction::SetUserCode { slot, .. }
            | LockAction::EnableUserCode { slot }
            | LockAction::DisableUserCode { slot }
            | LockAction::ClearUserCode { slot } => *slot,
        }
    }
}

impl fmt::Debug for LockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(slot={})", self.name(), self.slot())
    }
}

/// Command addressed to one lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockCommand {
    pub device_ieee: String,
    pub entity_id: String,
    pub action: LockAction,
}

/// Reply of the lock command layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Alarm
// ============================================================================

/// Disarm request for the alarm panel
///
/// The code is wiped from memory when the request is dropped. On the wire it
/// is a plain string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisarmRequest {
    pub entity_id: String,
    pub code: Zeroizing<String>,
}

impl fmt::Debug for DisarmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisarmRequest")
            .field("entity_id", &self.entity_id)
            .field("code", &"[REDACTED]")
            .finish()
    }
}
