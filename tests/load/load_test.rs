//! Contention tests for the shared credential store
//!
//! Commands and unlock notifications hit one store concurrently; every
//! command must end up both in memory and on disk.

use async_trait::async_trait;
use lock_manager::{EventCorrelator, Outcome};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use zlm_bus::traits::{AlarmPanel, LockCommander};
use zlm_bus::MessageBusError;
use zlm_keys::FileRecordStore;
use zlm_store::{CredentialStore, LockManager};
use zlm_types::{DisarmRequest, LockCommand, LockDescriptor};

const FRONT: &str = "00:0d:6f:ff:fe:a1:b2:c3";
const SLOTS: i64 = 40;
const UNLOCKS: usize = 200;

/// Slow lock, so commands overlap with notifications
struct SlowLock;

#[async_trait]
impl LockCommander for SlowLock {
    async fn send_command(&self, _command: &LockCommand) -> Result<(), MessageBusError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(())
    }
}

#[derive(Default)]
struct CountingPanel(AtomicUsize);

#[async_trait]
impl AlarmPanel for CountingPanel {
    async fn disarm(&self, _request: &DisarmRequest) -> Result<(), MessageBusError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_and_unlocks() {
    let dir = tempfile::tempdir().unwrap();
    let records = Arc::new(FileRecordStore::new(dir.path()).await.unwrap());
    let store = CredentialStore::open(records).await.unwrap().into_shared();

    let manager = Arc::new(LockManager::new(store.clone(), Arc::new(SlowLock)));
    manager
        .apply_selection(&[LockDescriptor::new(FRONT, "lock.front_door", "Front door")])
        .await
        .unwrap();

    let panel = Arc::new(CountingPanel::default());
    let correlator = Arc::new(EventCorrelator::new(
        store.clone(),
        panel.clone(),
        Some("alarm_control_panel.alarmo".to_string()),
    ));

    let start = Instant::now();
    let mut handles = Vec::new();

    for slot in 1..=SLOTS {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let code = format!("{:04}", 1000 + slot);
            manager.set_code(FRONT, slot, &code, None).await.map(|_| ())
        }));
    }

    let mut unlocks = Vec::new();
    for i in 0..UNLOCKS {
        let correlator = correlator.clone();
        unlocks.push(tokio::spawn(async move {
            let slot = (i as i64 % SLOTS) + 1;
            correlator
                .handle(&json!({
                    "device_ieee": FRONT,
                    "command": "operation_event_notification",
                    "args": { "source": "Keypad", "operation": "Unlock", "code_slot": slot }
                }))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let mut dispatched = 0;
    for unlock in unlocks {
        if matches!(unlock.await.unwrap(), Outcome::Dispatched { .. }) {
            dispatched += 1;
        }
    }

    println!(
        "{} commands and {} unlocks in {:?} ({} dispatched)",
        SLOTS,
        UNLOCKS,
        start.elapsed(),
        dispatched
    );

    // Every code is in memory
    {
        let store = store.read().await;
        for slot in 1..=SLOTS {
            let code = store.get_plain_code(FRONT, slot as u16).unwrap();
            assert_eq!(code.as_str(), format!("{:04}", 1000 + slot));
        }
    }

    // And on disk
    let records = Arc::new(FileRecordStore::new(dir.path()).await.unwrap());
    let reopened = CredentialStore::open(records).await.unwrap();
    assert_eq!(reopened.get_lock(FRONT).unwrap().slots.len(), SLOTS as usize);

    // Dispatches are spawned; let them land
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(panel.0.load(Ordering::SeqCst), dispatched);
}
