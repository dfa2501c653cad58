//! Lock selection reconciliation
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
use crate::model::LockRecord;
use crate::store::CredentialStore;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use zlm_types::{LockDescriptor, ReconcileReport};

/// Bring the managed locks in line with the operator's selection
///
/// Complete descriptors for unmanaged locks create empty records. Managed locks
/// missing from the selection are deleted with all their codes. Managed locks
/// still selected are left exactly as they are; their metadata only changes
/// through an explicit metadata update.
///
/// Only the in-memory state changes; see [`CredentialStore::apply_selection`].
pub fn reconcile(store: &mut CredentialStore, selection: &[LockDescriptor]) -> ReconcileReport {
    let selected: HashSet<&str> = selection
        .iter()
        .filter_map(LockDescriptor::hardware_identity)
        .collect();

    let mut report = ReconcileReport::default();

    for descriptor in selection {
        let (Some(device_ieee), Some(entity_id), Some(name)) = (
            descriptor.hardware_identity(),
            descriptor.entity_reference(),
            descriptor.display_name(),
        ) else {
            debug!(descriptor = ?descriptor, "Incomplete lock descriptor, not creating a record");
            continue;
        };

        let lock = LockRecord::new(
            device_ieee,
            entity_id,
            name,
            descriptor.max_slots,
            descriptor.slot_offset,
        );
        if store.insert_lock(lock) {
            info!(device_ieee = device_ieee, name = name, "Lock added to management");
            report.added.push(device_ieee.to_string());
        }
    }

    let deselected: Vec<String> = store
        .lock_ids()
        .filter(|ieee| !selected.contains(ieee))
        .map(str::to_string)
        .collect();

    for device_ieee in deselected {
        if let Some(lock) = store.remove_lock(&device_ieee) {
            warn!(
                device_ieee = %device_ieee,
                slots = lock.slots.len(),
                "Lock deselected, its slots and codes were erased"
            );
            report.removed.push(device_ieee);
        }
    }

    report
}

impl CredentialStore {
    /// Reconcile with `selection` and persist the result
    pub async fn apply_selection(
        &mut self,
        selection: &[LockDescriptor],
    ) -> StoreResult<ReconcileReport> {
        if self.is_wiped() {
            return Err(StoreError::Wiped);
        }
        let report = reconcile(self, selection);
        self.save().await?;
        Ok(report)
    }
}
