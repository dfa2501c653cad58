//! ZHA Lock Manager Library
//!
//! This library provides the service side of the lock manager:
//! - Correlation of keypad unlocks with stored codes (alarm disarm)
//! - HTTP command API for managing locks and code slots
//! - Service wiring and shutdown handling
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


pub mod api;
pub mod boundary;
pub mod correlator;
pub mod service;

pub use api::router;
pub use boundary::best_effort;
pub use correlator::{EventCorrelator, Outcome};
