//! End-to-end flow over NATS
//!
//! These tests require a NATS server on localhost:4222.

use futures::StreamExt;
use lock_manager::EventCorrelator;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use zlm_bus::nats::{subject_for, NatsClient};
use zlm_keys::MemoryRecordStore;
use zlm_store::{CredentialStore, LockRecord};
use zlm_types::{DisarmRequest, Event, EventType};

const NATS_URL: &str = "nats://localhost:4222";
const FRONT: &str = "00:0d:6f:ff:fe:a1:b2:c3";

#[tokio::test]
#[ignore] // Requires NATS server
async fn test_keypad_unlock_over_nats_publishes_disarm() {
    let prefix = "zlm-e2e";

    let mut store = CredentialStore::open(Arc::new(MemoryRecordStore::new()))
        .await
        .unwrap();
    store.insert_lock(LockRecord::new(FRONT, "lock.front_door", "Front door", 30, 16));
    store.set_code(FRONT, 19, "4711", "Cleaner", true).unwrap();

    let bus = Arc::new(
        NatsClient::new(NATS_URL, prefix, Duration::from_secs(2))
            .await
            .expect("Failed to connect to NATS"),
    );
    let correlator = EventCorrelator::new(
        store.into_shared(),
        bus.clone(),
        Some("alarm_control_panel.alarmo".to_string()),
    );
    let events = bus.clone();
    tokio::spawn(async move { correlator.run(events.as_ref()).await });

    let raw = async_nats::connect(NATS_URL).await.unwrap();
    let mut disarms = raw
        .subscribe(subject_for(prefix, EventType::AlarmDisarm))
        .await
        .unwrap();

    // Give the correlator subscription time to register
    tokio::time::sleep(Duration::from_millis(300)).await;

    let event = Event::new(
        EventType::ZhaEvent,
        "zha-bridge",
        json!({
            "device_ieee": FRONT,
            "command": "operation_event_notification",
            "args": { "source": "Keypad", "operation": "Unlock", "code_slot": 3 }
        }),
    )
    .unwrap();
    raw.publish(
        subject_for(prefix, EventType::ZhaEvent),
        serde_json::to_vec(&event).unwrap().into(),
    )
    .await
    .unwrap();
    raw.flush().await.unwrap();

    let message = tokio::time::timeout(Duration::from_secs(5), disarms.next())
        .await
        .expect("No disarm request received")
        .unwrap();
    let envelope: Event = serde_json::from_slice(&message.payload).unwrap();
    let request: DisarmRequest = envelope.expect_payload(EventType::AlarmDisarm).unwrap();
    assert_eq!(request.code.as_str(), "4711");
    println!("✅ Disarm request received for {}", request.entity_id);
}
