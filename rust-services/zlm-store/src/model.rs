//! Lock and slot records

use std::collections::BTreeMap;
use std::fmt;
use zlm_types::{LockView, SlotView};

/// One keypad code slot on one lock
#[derive(Clone, PartialEq, Eq)]
pub struct SlotRecord {
    /// Absolute (hardware) slot number
    pub slot: u16,
    pub label: String,
    pub enabled: bool,
    /// Ciphertext token; `None` when no code is configured
    pub code_encrypted: Option<String>,
}

impl SlotRecord {
    /// A freshly referenced slot: enabled, no code
    pub fn new(slot: u16) -> Self {
        Self {
            slot,
            label: String::new(),
            enabled: true,
            code_encrypted: None,
        }
    }

    pub fn has_code(&self) -> bool {
        self.code_encrypted.as_deref().is_some_and(|c| !c.is_empty())
    }
}

impl fmt::Debug for SlotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRecord")
            .field("slot", &self.slot)
            .field("label", &self.label)
            .field("enabled", &self.enabled)
            .field("has_code", &self.has_code())
            .finish()
    }
}

/// One managed physical lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub name: String,
    pub entity_id: String,
    device_ieee: String,
    /// Advisory capacity
    pub max_slots: u16,
    /// Added to operator-facing slot numbers to get hardware slot numbers
    pub slot_offset: i32,
    pub slots: BTreeMap<u16, SlotRecord>,
}

impl LockRecord {
    pub fn new(
        device_ieee: impl Into<String>,
        entity_id: impl Into<String>,
        name: impl Into<String>,
        max_slots: u16,
        slot_offset: i32,
    ) -> Self {
        Self {
            name: name.into(),
            entity_id: entity_id.into(),
            device_ieee: device_ieee.into(),
            max_slots,
            slot_offset,
            slots: BTreeMap::new(),
        }
    }

    /// Hardware address; fixed for the lifetime of the record
    pub fn device_ieee(&self) -> &str {
        &self.device_ieee
    }

    /// Absolute slot for an operator-facing slot, if it is a valid slot number
    pub fn absolute_slot(&self, relative: i64) -> Option<u16> {
        relative
            .checked_add(i64::from(self.slot_offset))
            .and_then(|absolute| u16::try_from(absolute).ok())
    }

    pub fn relative_slot(&self, absolute: u16) -> i64 {
        i64::from(absolute) - i64::from(self.slot_offset)
    }

    pub fn slot(&self, slot: u16) -> Option<&SlotRecord> {
        self.slots.get(&slot)
    }

    pub fn slot_mut(&mut self, slot: u16) -> Option<&mut SlotRecord> {
        self.slots.get_mut(&slot)
    }

    /// Existing slot, or a new default one
    pub fn ensure_slot(&mut self, slot: u16) -> &mut SlotRecord {
        self.slots.entry(slot).or_insert_with(|| SlotRecord::new(slot))
    }

    pub fn view(&self) -> LockView {
        LockView {
            name: self.name.clone(),
            entity_id: self.entity_id.clone(),
            device_ieee: self.device_ieee.clone(),
            max_slots: self.max_slots,
            slot_offset: self.slot_offset,
            slots: self
                .slots
                .values()
                .map(|s| SlotView {
                    slot: s.slot,
                    relative_slot: self.relative_slot(s.slot),
                    label: s.label.clone(),
                    enabled: s.enabled,
                    has_code: s.has_code(),
                })
                .collect(),
        }
    }
}
