//! Credential store for Zigbee keypad locks
//!
//! Keeps the authoritative, encrypted-at-rest record of which code occupies
//! which slot on each managed lock, reconciles it with the operator's lock
//! selection and exposes the privileged command surface that keeps lock
//! hardware and the record in step.
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


pub mod commands;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod store;

pub use commands::{CommandError, CommandResult, LockManager};
pub use error::{StoreError, StoreResult};
pub use model::{LockRecord, SlotRecord};
pub use reconcile::reconcile;
pub use store::{CredentialStore, SharedStore, LOCKS_RECORD, LOCKS_RECORD_VERSION};
