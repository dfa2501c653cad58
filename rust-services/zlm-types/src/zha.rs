//! Decoding of ZHA door-lock notifications
//!
//! Coordinator payloads are loosely typed: every field may be missing or carry
//! an unexpected JSON type. [`UnlockNotification::decode`] turns the raw
//! payload into either a typed unlock notification or a [`Rejection`] that
//! explains why the event is of no interest.
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


use serde_json::Value;
use std::fmt;

/// Cluster command name of door-lock operation notifications
pub const OPERATION_EVENT_NOTIFICATION: &str = "operation_event_notification";

/// Operation name reported when the bolt was retracted
pub const UNLOCK_OPERATION: &str = "Unlock";

/// Origin of a lock operation as reported by the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSource {
    Keypad,
    Rf,
    Manual,
    Rfid,
    Other(String),
}

impl TriggerSource {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Keypad" => TriggerSource::Keypad,
            "RF" => TriggerSource::Rf,
            "Manual" => TriggerSource::Manual,
            "RFID" => TriggerSource::Rfid,
            other => TriggerSource::Other(other.to_string()),
        }
    }

    /// Only code-bearing sources may drive the disarm flow.
    pub fn is_authorized(&self) -> bool {
        matches!(self, TriggerSource::Keypad | TriggerSource::Rf)
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Keypad => f.write_str("Keypad"),
            TriggerSource::Rf => f.write_str("RF"),
            TriggerSource::Manual => f.write_str("Manual"),
            TriggerSource::Rfid => f.write_str("RFID"),
            TriggerSource::Other(raw) => f.write_str(raw),
        }
    }
}

/// Reason an inbound event did not lead to a disarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not a door-lock operation notification
    NotOperationNotification,
    /// An operation notification for something other than an unlock
    NotUnlock,
    /// Unlock by a source that carries no code (key, thumb-turn, ...)
    UnauthorizedSource(Option<String>),
    /// The device is not a managed lock
    UnknownLock,
    /// No usable slot number in the notification
    MissingSlot,
    /// Slot number plus offset leaves the valid slot range
    SlotOutOfRange,
    /// Alarm integration switched off or without a target
    IntegrationDisabled,
    /// Nothing decryptable stored in the resolved slot
    NoCode,
}

impl Rejection {
    /// Short machine-readable reason used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NotOperationNotification => "not_operation_notification",
            Rejection::NotUnlock => "not_unlock",
            Rejection::UnauthorizedSource(_) => "unauthorized_source",
            Rejection::UnknownLock => "unknown_lock",
            Rejection::MissingSlot => "missing_slot",
            Rejection::SlotOutOfRange => "slot_out_of_range",
            Rejection::IntegrationDisabled => "integration_disabled",
            Rejection::NoCode => "no_code",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unlock performed through the keypad or RF, as reported by a lock
///
/// The device address and slot stay optional here: whether they are usable is
/// decided later, against the managed locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockNotification {
    pub device_ieee: Option<String>,
    pub source: TriggerSource,
    pub code_slot: Option<u16>,
}

impl UnlockNotification {
    /// Decode a raw `zha_event` payload.
    pub fn decode(payload: &Value) -> Result<Self, Rejection> {
        let command = payload.get("command").and_then(Value::as_str);
        let args = payload.get("args");
        let operation = args
            .and_then(|a| a.get("operation"))
            .and_then(Value::as_str);

        if command != Some(OPERATION_EVENT_NOTIFICATION) {
            return Err(Rejection::NotOperationNotification);
        }
        if operation != Some(UNLOCK_OPERATION) {
            return Err(Rejection::NotUnlock);
        }

        let source = match args.and_then(|a| a.get("source")).and_then(Value::as_str) {
            Some(raw) => TriggerSource::parse(raw),
            None => return Err(Rejection::UnauthorizedSource(None)),
        };
        if !source.is_authorized() {
            return Err(Rejection::UnauthorizedSource(Some(source.to_string())));
        }

        let device_ieee = payload
            .get("device_ieee")
            .and_then(Value::as_str)
            .filter(|ieee| !ieee.is_empty())
            .map(str::to_string);

        let code_slot = args.and_then(|a| a.get("code_slot")).and_then(parse_slot);

        Ok(Self {
            device_ieee,
            source,
            code_slot,
        })
    }
}

/// Slot numbers arrive as JSON integers or as numeric strings.
fn parse_slot(raw: &Value) -> Option<u16> {
    match raw {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(source: &str, operation: &str, slot: Value) -> Value {
        json!({
            "device_ieee": "00:0d:6f:ff:fe:a1:b2:c3",
            "command": "operation_event_notification",
            "args": {
                "source": source,
                "operation": operation,
                "code_slot": slot,
            }
        })
    }

    #[test]
    fn test_decode_keypad_unlock() {
        let decoded = UnlockNotification::decode(&notification("Keypad", "Unlock", json!(3))).unwrap();
        assert_eq!(decoded.device_ieee.as_deref(), Some("00:0d:6f:ff:fe:a1:b2:c3"));
        assert_eq!(decoded.source, TriggerSource::Keypad);
        assert_eq!(decoded.code_slot, Some(3));
    }

    #[test]
    fn test_decode_rf_unlock_with_string_slot() {
        let decoded = UnlockNotification::decode(&notification("RF", "Unlock", json!("7"))).unwrap();
        assert_eq!(decoded.source, TriggerSource::Rf);
        assert_eq!(decoded.code_slot, Some(7));
    }

    #[test]
    fn test_rejects_other_commands() {
        let payload = json!({ "command": "toggle", "args": { "operation": "Unlock" } });
        assert_eq!(
            UnlockNotification::decode(&payload),
            Err(Rejection::NotOperationNotification)
        );
    }

    #[test]
    fn test_rejects_lock_operation() {
        assert_eq!(
            UnlockNotification::decode(&notification("Keypad", "Lock", json!(3))),
            Err(Rejection::NotUnlock)
        );
    }

    #[test]
    fn test_rejects_manual_source() {
        assert_eq!(
            UnlockNotification::decode(&notification("Manual", "Unlock", json!(3))),
            Err(Rejection::UnauthorizedSource(Some("Manual".to_string())))
        );
    }

    #[test]
    fn test_rejects_missing_source() {
        let payload = json!({
            "command": "operation_event_notification",
            "args": { "operation": "Unlock", "code_slot": 3 }
        });
        assert_eq!(
            UnlockNotification::decode(&payload),
            Err(Rejection::UnauthorizedSource(None))
        );
    }

    #[test]
    fn test_unparseable_slot_is_kept_as_missing() {
        for slot in [json!(null), json!(-1), json!("abc"), json!(70000), json!([1])] {
            let decoded = UnlockNotification::decode(&notification("Keypad", "Unlock", slot)).unwrap();
            assert_eq!(decoded.code_slot, None);
        }
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        assert_eq!(
            UnlockNotification::decode(&json!("garbage")),
            Err(Rejection::NotOperationNotification)
        );
        assert_eq!(
            UnlockNotification::decode(&Value::Null),
            Err(Rejection::NotOperationNotification)
        );
    }
}
