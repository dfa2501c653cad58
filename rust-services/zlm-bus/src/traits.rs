//! Traits for the lock manager's external collaborators

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use zlm_types::{DisarmRequest, Event, LockCommand};

use crate::error::MessageBusError;

/// Stream of events delivered by a subscription
pub type EventStream<'a> =
    Pin<Box<dyn Stream<Item = std::result::Result<Event, MessageBusError>> + Send + 'a>>;

/// Source of raw lock notifications from the Zigbee coordinator
pub trait LockEventSource: Send + Sync {
    /// Subscribe to `zha_event` notifications
    fn subscribe_lock_events(&self) -> EventStream<'_>;
}

/// Capability to program code slots on lock hardware
#[async_trait]
pub trait LockCommander: Send + Sync {
    /// Send a command and wait until the lock acknowledged or refused it
    async fn send_command(&self, command: &LockCommand) -> Result<(), MessageBusError>;
}

/// Downstream alarm panel
#[async_trait]
pub trait AlarmPanel: Send + Sync {
    /// Ask the panel to disarm with the given code
    async fn disarm(&self, request: &DisarmRequest) -> Result<(), MessageBusError>;
}
