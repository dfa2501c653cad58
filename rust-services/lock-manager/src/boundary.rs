//! Boundary for best-effort work
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


use std::fmt::Display;
use tracing::warn;

/// Log and discard the failure of an operation nobody waits on
///
/// Disarm dispatch and shutdown cleanup go through here so that their
/// failures are visible in the logs without being propagated.
pub fn best_effort<T, E: Display>(operation: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation = operation, error = %e, "Best-effort operation failed");
            None
        }
    }
}
