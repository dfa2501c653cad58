//! Command API tests over a real listener

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use zlm_bus::traits::LockCommander;
use zlm_bus::MessageBusError;
use zlm_keys::FileRecordStore;
use zlm_store::{CredentialStore, LockManager};
use zlm_types::{LockAction, LockCommand, LockView, ReconcileReport};

const TOKEN: &str = "s3cret-token";
const FRONT: &str = "00:0d:6f:ff:fe:a1:b2:c3";

/// Accepts everything except programming slot 99
struct AcceptingLock;

#[async_trait]
impl LockCommander for AcceptingLock {
    async fn send_command(&self, command: &LockCommand) -> Result<(), MessageBusError> {
        match command.action {
            LockAction::SetUserCode { slot: 99, .. } => {
                Err(MessageBusError::Rejected("slot not supported".to_string()))
            }
            _ => Ok(()),
        }
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let records = Arc::new(FileRecordStore::new(dir.path()).await.unwrap());
        let store = CredentialStore::open(records).await.unwrap().into_shared();
        let manager = LockManager::new(store, Arc::new(AcceptingLock));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let router = lock_manager::router(manager, TOKEN);
        tokio::spawn(lock_manager::api::serve(
            listener,
            router,
            std::future::pending(),
        ));

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(TOKEN)
    }

    async fn select_front_door(&self) {
        let response = self
            .authed(self.client.put(self.url("/api/selection")))
            .json(&json!({
                "locks": [{
                    "device_ieee": FRONT,
                    "entity_id": "lock.front_door",
                    "name": "Front door",
                    "slot_offset": 16
                }]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report: ReconcileReport = response.json().await.unwrap();
        assert_eq!(report.added, vec![FRONT.to_string()]);
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let server = TestServer::start().await;
    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_token() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/api/locks")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .client
        .get(server.url("/api/locks"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unauthorized");

    let response = server
        .authed(server.client.get(server.url("/api/locks")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_code_lifecycle() {
    let server = TestServer::start().await;
    server.select_front_door().await;

    let response = server
        .authed(
            server
                .client
                .put(server.url(&format!("/api/locks/{}/slots/3/code", FRONT))),
        )
        .json(&json!({"code": "4711", "label": "Cleaner"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(!body.contains("4711"));
    let view: LockView = serde_json::from_str(&body).unwrap();
    assert_eq!(view.slots[0].slot, 19);
    assert!(view.slots[0].has_code);

    let response = server
        .authed(
            server
                .client
                .post(server.url(&format!("/api/locks/{}/slots/3/disable", FRONT))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: LockView = response.json().await.unwrap();
    assert!(!view.slots[0].enabled);

    let response = server
        .authed(
            server
                .client
                .delete(server.url(&format!("/api/locks/{}/slots/3/code", FRONT))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Enabling an empty slot is a state conflict
    let response = server
        .authed(
            server
                .client
                .post(server.url(&format!("/api/locks/{}/slots/3/enable", FRONT))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid");
}

#[tokio::test]
async fn test_rejections() {
    let server = TestServer::start().await;
    server.select_front_door().await;

    let response = server
        .authed(server.client.get(server.url("/api/locks/ff:ff")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .authed(
            server
                .client
                .put(server.url(&format!("/api/locks/{}/slots/3/code", FRONT))),
        )
        .json(&json!({"code": "12"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Relative 83 + offset 16 = slot 99, which the lock refuses
    let response = server
        .authed(
            server
                .client
                .put(server.url(&format!("/api/locks/{}/slots/83/code", FRONT))),
        )
        .json(&json!({"code": "1234"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let view: LockView = server
        .authed(server.client.get(server.url(&format!("/api/locks/{}", FRONT))))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(view.slots.is_empty());
}

#[tokio::test]
async fn test_metadata_and_label() {
    let server = TestServer::start().await;
    server.select_front_door().await;

    let response = server
        .authed(
            server
                .client
                .put(server.url(&format!("/api/locks/{}/slots/2/label", FRONT))),
        )
        .json(&json!({"label": "Guests"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .authed(server.client.put(server.url(&format!("/api/locks/{}", FRONT))))
        .json(&json!({"name": "Porch", "max_slots": 10, "slot_offset": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: LockView = response.json().await.unwrap();
    assert_eq!(view.name, "Porch");
    assert_eq!(view.slots[0].slot, 18);
    assert_eq!(view.slots[0].relative_slot, 18);
    assert_eq!(view.slots[0].label, "Guests");
}

#[tokio::test]
async fn test_uninstall() {
    let server = TestServer::start().await;
    server.select_front_door().await;

    let response = server
        .authed(server.client.delete(server.url("/api/store")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let locks: Vec<LockView> = server
        .authed(server.client.get(server.url("/api/locks")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(locks.is_empty());
}
