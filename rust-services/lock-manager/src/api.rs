//! HTTP command API
//!
//! Every route under `/api` requires `Authorization: Bearer <token>`.
//! `/health` is open for orchestration health checks.
//!
//! Slot numbers in paths are operator-facing (relative) numbers.
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


use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tracing::{info, warn};
use zlm_store::{CommandError, LockManager};
use zlm_types::{
    LockDescriptor, LockMetaUpdate, LockView, ReconcileReport, RenameSlotRequest, SetCodeRequest,
};

#[derive(Clone)]
struct ApiState {
    manager: LockManager,
    token: Arc<str>,
}

/// Body of a selection update
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub locks: Vec<LockDescriptor>,
}

/// Structured rejection returned by every failing route
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthorized",
            message: "missing or invalid bearer token".to_string(),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(error: CommandError) -> Self {
        let status = match &error {
            CommandError::NotFound(_) => StatusCode::NOT_FOUND,
            CommandError::InvalidState(_) => StatusCode::CONFLICT,
            CommandError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CommandError::Hardware(_) => StatusCode::BAD_GATEWAY,
            CommandError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %error, "Command failed");
        }
        Self {
            status,
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the application router
pub fn router(manager: LockManager, token: &str) -> Router {
    let state = ApiState {
        manager,
        token: Arc::from(token),
    };

    let api = Router::new()
        .route("/locks", get(list_locks))
        .route("/locks/:ieee", get(get_lock).put(save_lock_meta))
        .route("/locks/:ieee/slots/:slot/code", put(set_code).delete(clear_code))
        .route("/locks/:ieee/slots/:slot/enable", post(enable_code))
        .route("/locks/:ieee/slots/:slot/disable", post(disable_code))
        .route("/locks/:ieee/slots/:slot/label", put(rename_code))
        .route("/selection", put(apply_selection))
        .route("/store", delete(uninstall))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
}

/// Serve `router` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Command API listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Command API server error: {}", e))?;

    info!("Command API stopped");
    Ok(())
}

async fn require_token(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if bool::from(token.as_bytes().ct_eq(state.token.as_bytes())) => {
            next.run(request).await
        }
        _ => ApiError::unauthorized().into_response(),
    }
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "lock-manager",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_locks(State(state): State<ApiState>) -> Json<Vec<LockView>> {
    Json(state.manager.list_locks().await)
}

async fn get_lock(State(state): State<ApiState>, Path(ieee): Path<String>) -> ApiResult<LockView> {
    Ok(Json(state.manager.get_lock(&ieee).await?))
}

async fn save_lock_meta(
    State(state): State<ApiState>,
    Path(ieee): Path<String>,
    Json(update): Json<LockMetaUpdate>,
) -> ApiResult<LockView> {
    Ok(Json(state.manager.save_lock_meta(&ieee, &update).await?))
}

async fn set_code(
    State(state): State<ApiState>,
    Path((ieee, slot)): Path<(String, i64)>,
    Json(request): Json<SetCodeRequest>,
) -> ApiResult<LockView> {
    let view = state
        .manager
        .set_code(&ieee, slot, &request.code, request.label.as_deref())
        .await?;
    Ok(Json(view))
}

async fn clear_code(
    State(state): State<ApiState>,
    Path((ieee, slot)): Path<(String, i64)>,
) -> ApiResult<LockView> {
    Ok(Json(state.manager.clear_code(&ieee, slot).await?))
}

async fn enable_code(
    State(state): State<ApiState>,
    Path((ieee, slot)): Path<(String, i64)>,
) -> ApiResult<LockView> {
    Ok(Json(state.manager.enable_code(&ieee, slot).await?))
}

async fn disable_code(
    State(state): State<ApiState>,
    Path((ieee, slot)): Path<(String, i64)>,
) -> ApiResult<LockView> {
    Ok(Json(state.manager.disable_code(&ieee, slot).await?))
}

async fn rename_code(
    State(state): State<ApiState>,
    Path((ieee, slot)): Path<(String, i64)>,
    Json(request): Json<RenameSlotRequest>,
) -> ApiResult<LockView> {
    Ok(Json(
        state.manager.rename_code(&ieee, slot, &request.label).await?,
    ))
}

/// Replace the lock selection. Deselected locks lose every stored code.
async fn apply_selection(
    State(state): State<ApiState>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<ReconcileReport> {
    Ok(Json(state.manager.apply_selection(&request.locks).await?))
}

async fn uninstall(State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
    state.manager.uninstall().await?;
    Ok(StatusCode::NO_CONTENT)
}
