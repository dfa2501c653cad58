//! End-to-end flow without a message bus
//!
//! Operator programs a code through the command surface, the service restarts,
//! and a keypad unlock with that code disarms the alarm.

use async_trait::async_trait;
use lock_manager::{EventCorrelator, Outcome};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use zlm_bus::traits::{AlarmPanel, LockCommander};
use zlm_bus::MessageBusError;
use zlm_keys::FileRecordStore;
use zlm_store::{CredentialStore, LockManager, SharedStore};
use zlm_types::{DisarmRequest, LockCommand, LockDescriptor};

const FRONT: &str = "00:0d:6f:ff:fe:a1:b2:c3";
const ALARM: &str = "alarm_control_panel.alarmo";

struct AcceptingLock;

#[async_trait]
impl LockCommander for AcceptingLock {
    async fn send_command(&self, _command: &LockCommand) -> Result<(), MessageBusError> {
        Ok(())
    }
}

struct ChannelPanel(mpsc::UnboundedSender<DisarmRequest>);

#[async_trait]
impl AlarmPanel for ChannelPanel {
    async fn disarm(&self, request: &DisarmRequest) -> Result<(), MessageBusError> {
        let _ = self.0.send(request.clone());
        Ok(())
    }
}

async fn open(dir: &Path) -> SharedStore {
    let records = Arc::new(FileRecordStore::new(dir).await.unwrap());
    CredentialStore::open(records).await.unwrap().into_shared()
}

fn keypad_unlock(slot: u16) -> serde_json::Value {
    json!({
        "device_ieee": FRONT,
        "command": "operation_event_notification",
        "args": { "source": "Keypad", "operation": "Unlock", "code_slot": slot }
    })
}

#[tokio::test]
async fn test_code_programmed_before_restart_disarms_after() {
    let dir = tempfile::tempdir().unwrap();

    {
        let manager = LockManager::new(open(dir.path()).await, Arc::new(AcceptingLock));
        manager
            .apply_selection(&[
                LockDescriptor::new(FRONT, "lock.front_door", "Front door").with_slot_offset(16)
            ])
            .await
            .unwrap();
        manager
            .set_code(FRONT, 3, "4711", Some("Cleaner"))
            .await
            .unwrap();
    }

    // Nothing on disk may reveal the code
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(!content.contains("4711"));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let correlator = EventCorrelator::new(
        open(dir.path()).await,
        Arc::new(ChannelPanel(tx)),
        Some(ALARM.to_string()),
    );

    let outcome = correlator.handle(&keypad_unlock(3)).await;
    assert!(matches!(outcome, Outcome::Dispatched { slot: 19, .. }));

    let request = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.entity_id, ALARM);
    assert_eq!(request.code.as_str(), "4711");
}

#[tokio::test]
async fn test_deselected_lock_no_longer_disarms() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path()).await;
    let manager = LockManager::new(store.clone(), Arc::new(AcceptingLock));
    let front = LockDescriptor::new(FRONT, "lock.front_door", "Front door").with_slot_offset(16);

    manager.apply_selection(&[front.clone()]).await.unwrap();
    manager.set_code(FRONT, 3, "4711", None).await.unwrap();
    manager.apply_selection(&[]).await.unwrap();
    manager.apply_selection(&[front]).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let correlator = EventCorrelator::new(store, Arc::new(ChannelPanel(tx)), Some(ALARM.to_string()));

    let outcome = correlator.handle(&keypad_unlock(3)).await;
    assert!(matches!(outcome, Outcome::Rejected(_)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}
