//! Event correlator
//!
//! Turns keypad/RF unlock notifications into alarm disarm requests carrying
//! the code stored for the slot that was used. Everything that is not such an
//! unlock, or that cannot be matched to a stored code, is dropped quietly.
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


use crate::boundary::best_effort;
use serde_json::Value;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use zlm_bus::traits::{AlarmPanel, LockEventSource};
use zlm_store::SharedStore;
use zlm_types::{DisarmRequest, Event, EventType, Rejection, UnlockNotification};

/// What became of one inbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rejected(Rejection),
    /// A disarm request was handed off for the given absolute slot
    Dispatched { device_ieee: String, slot: u16 },
}

struct Dispatch {
    device_ieee: String,
    slot: u16,
    request: DisarmRequest,
}

/// Stateless filter-and-dispatch over unlock notifications
pub struct EventCorrelator {
    store: SharedStore,
    alarm: Arc<dyn AlarmPanel>,
    /// Disarm target; `None` when the integration is off
    target: Option<String>,
}

impl EventCorrelator {
    pub fn new(store: SharedStore, alarm: Arc<dyn AlarmPanel>, target: Option<String>) -> Self {
        Self {
            store,
            alarm,
            target,
        }
    }

    /// Consume notifications until the stream ends
    pub async fn run(&self, source: &dyn LockEventSource) -> anyhow::Result<()> {
        info!("Subscribing to lock notifications");

        let mut event_stream = source.subscribe_lock_events();

        while let Some(event_result) = event_stream.next().await {
            match event_result {
                Ok(event) => {
                    self.handle_event(&event).await;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving event from message bus");
                }
            }
        }

        warn!("Event stream ended");
        Ok(())
    }

    /// Handle one bus envelope
    pub async fn handle_event(&self, event: &Event) -> Outcome {
        if event.event_type != EventType::ZhaEvent {
            debug!(
                event_id = %event.event_id,
                event_type = event.event_type.as_str(),
                "Ignoring event of unexpected type"
            );
            return Outcome::Rejected(Rejection::NotOperationNotification);
        }
        self.handle(&event.payload).await
    }

    /// Handle one raw `zha_event` payload
    pub async fn handle(&self, payload: &Value) -> Outcome {
        let dispatch = match self.correlate(payload).await {
            Ok(dispatch) => dispatch,
            Err(rejection) => {
                debug!(reason = rejection.as_str(), "Notification dropped");
                return Outcome::Rejected(rejection);
            }
        };

        info!(
            device_ieee = %dispatch.device_ieee,
            slot = dispatch.slot,
            target = %dispatch.request.entity_id,
            "Keypad unlock matched a stored code, disarming"
        );

        let outcome = Outcome::Dispatched {
            device_ieee: dispatch.device_ieee,
            slot: dispatch.slot,
        };

        // Fire and forget: the correlator never waits on the alarm panel
        let alarm = self.alarm.clone();
        let request = dispatch.request;
        tokio::spawn(async move {
            best_effort("alarm disarm", alarm.disarm(&request).await);
        });

        outcome
    }

    async fn correlate(&self, payload: &Value) -> Result<Dispatch, Rejection> {
        let notification = UnlockNotification::decode(payload)?;

        // Read guard is released when this function returns, before dispatch
        let store = self.store.read().await;

        let device_ieee = notification
            .device_ieee
            .as_deref()
            .ok_or(Rejection::UnknownLock)?;
        let lock = store.get_lock(device_ieee).ok_or(Rejection::UnknownLock)?;

        let relative = notification.code_slot.ok_or(Rejection::MissingSlot)?;
        let slot = lock
            .absolute_slot(i64::from(relative))
            .ok_or(Rejection::SlotOutOfRange)?;

        let target = self
            .target
            .as_deref()
            .ok_or(Rejection::IntegrationDisabled)?;

        let code = store
            .get_plain_code(device_ieee, slot)
            .ok_or(Rejection::NoCode)?;

        Ok(Dispatch {
            device_ieee: device_ieee.to_string(),
            slot,
            request: DisarmRequest {
                entity_id: target.to_string(),
                code,
            },
        })
    }
}
