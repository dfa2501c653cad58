//! Event envelope carried on the message bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, ZlmError};

/// Event type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Raw notification forwarded from the Zigbee coordinator
    #[serde(rename = "zha_event")]
    ZhaEvent,

    /// Code-slot command addressed to a lock
    #[serde(rename = "lock.command")]
    LockCommand,

    /// Disarm request addressed to the alarm panel
    #[serde(rename = "alarm.disarm")]
    AlarmDisarm,
}

impl EventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ZhaEvent => "zha_event",
            EventType::LockCommand => "lock.command",
            EventType::AlarmDisarm => "alarm.disarm",
        }
    }
}

/// Base event structure
///
/// `Debug` leaves the payload out: disarm and lock-command payloads carry
/// plaintext codes.
#[derive(Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type identifier
    pub event_type: EventType,

    /// Unique event identifier
    pub event_id: Uuid,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Source service that published the event
    pub source: String,

    /// Event payload (type depends on event_type)
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event
    pub fn new(
        event_type: EventType,
        source: impl Into<String>,
        payload: impl Serialize,
    ) -> Result<Self> {
        let payload_value = serde_json::to_value(payload)?;

        Ok(Self {
            event_type,
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload: payload_value,
        })
    }

    /// Deserialize the payload into a specific type
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| ZlmError::InvalidPayload(e.to_string()))
    }

    /// Deserialize the payload after checking the event type
    pub fn expect_payload<T: for<'de> Deserialize<'de>>(&self, expected: EventType) -> Result<T> {
        if self.event_type != expected {
            return Err(ZlmError::InvalidEventType {
                expected: expected.as_str().to_string(),
                actual: self.event_type.as_str().to_string(),
            });
        }
        self.payload_as()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("event_id", &self.event_id)
            .field("timestamp", &self.timestamp)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
