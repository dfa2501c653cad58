//! NATS implementation of the lock manager transports
//!
//! Core NATS only: disarm requests and set-code commands carry plaintext
//! codes, which must not be retained by a persistent stream.
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


use async_trait::async_trait;
use std::time::Duration;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, error, info};
use zlm_types::{CommandReply, DisarmRequest, Event, EventType, LockCommand};

use crate::error::{MessageBusError, Result};
use crate::traits::{AlarmPanel, EventStream, LockCommander, LockEventSource};

/// Name this service stamps on the events it publishes
const EVENT_SOURCE: &str = "lock-manager";

/// NATS message bus client
pub struct NatsClient {
    client: async_nats::Client,
    subject_prefix: String,
    request_timeout: Duration,
}

impl NatsClient {
    /// Connect to a NATS server
    pub async fn new(url: &str, subject_prefix: &str, request_timeout: Duration) -> Result<Self> {
        info!(url = url, "Connecting to NATS server");

        let client = async_nats::connect(url)
            .await
            .map_err(|e| MessageBusError::Connection(e.to_string()))?;

        info!(subject_prefix = subject_prefix, "NATS client initialized");

        Ok(Self {
            client,
            subject_prefix: subject_prefix.to_string(),
            request_timeout,
        })
    }

    /// Get the subject for an event type
    fn subject_for(&self, event_type: EventType) -> String {
        subject_for(&self.subject_prefix, event_type)
    }

    /// Push out anything still buffered
    pub async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| MessageBusError::Publish(e.to_string()))
    }
}

/// `<prefix>.<event type>` with dots in the type flattened
pub fn subject_for(prefix: &str, event_type: EventType) -> String {
    format!("{}.{}", prefix, event_type.as_str().replace('.', "_"))
}

impl LockEventSource for NatsClient {
    fn subscribe_lock_events(&self) -> EventStream<'_> {
        let subject = self.subject_for(EventType::ZhaEvent);

        info!(subject = subject, "Subscribing to lock notifications");

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event>>(100);
        let client = self.client.clone();

        // Spawn a task to handle the subscription
        tokio::spawn(async move {
            match client.subscribe(subject.clone()).await {
                Ok(mut subscriber) => {
                    info!(subject = subject, "Subscription created, waiting for messages");

                    while let Some(message) = subscriber.next().await {
                        let item = serde_json::from_slice::<Event>(&message.payload)
                            .map_err(MessageBusError::Serialization);

                        if let Err(e) = &item {
                            error!(error = %e, "Failed to deserialize event");
                        }

                        if tx.send(item).await.is_err() {
                            debug!("Receiver dropped, stopping subscription");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to create subscription");
                    let _ = tx.send(Err(MessageBusError::Subscribe(e.to_string()))).await;
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

#[async_trait]
impl LockCommander for NatsClient {
    async fn send_command(&self, command: &LockCommand) -> Result<()> {
        let subject = self.subject_for(EventType::LockCommand);
        let event = Event::new(EventType::LockCommand, EVENT_SOURCE, command)?;
        let payload = serde_json::to_vec(&event)?;

        debug!(
            device_ieee = %command.device_ieee,
            action = command.action.name(),
            slot = command.action.slot(),
            "Sending lock command"
        );

        let reply = tokio::time::timeout(
            self.request_timeout,
            self.client.request(subject, payload.into()),
        )
        .await
        .map_err(|_| MessageBusError::Timeout)?
        .map_err(|e| MessageBusError::Request(e.to_string()))?;

        let reply: CommandReply = serde_json::from_slice(&reply.payload)?;
        if !reply.success {
            return Err(MessageBusError::Rejected(
                reply
                    .error
                    .unwrap_or_else(|| "lock refused the command".to_string()),
            ));
        }

        info!(
            device_ieee = %command.device_ieee,
            action = command.action.name(),
            slot = command.action.slot(),
            "Lock command acknowledged"
        );
        Ok(())
    }
}

#[async_trait]
impl AlarmPanel for NatsClient {
    async fn disarm(&self, request: &DisarmRequest) -> Result<()> {
        let subject = self.subject_for(EventType::AlarmDisarm);
        let event = Event::new(EventType::AlarmDisarm, EVENT_SOURCE, request)?;
        let payload = serde_json::to_vec(&event)?;

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| MessageBusError::Publish(e.to_string()))?;

        info!(
            entity_id = %request.entity_id,
            event_id = %event.event_id,
            "Disarm request published"
        );
        Ok(())
    }
}
