//! Service wiring
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


use crate::api;
use crate::boundary::best_effort;
use crate::correlator::EventCorrelator;
use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use zlm_bus::nats::NatsClient;
use zlm_config::AppConfig;
use zlm_keys::FileRecordStore;
use zlm_store::{CredentialStore, LockManager, SharedStore};

/// Open the credential store and apply the configured lock selection
///
/// An empty `locks` list leaves the persisted selection alone; selection is
/// then managed through the API only.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    let records = FileRecordStore::new(&config.storage.path)
        .await
        .with_context(|| format!("Failed to open storage at {}", config.storage.path))?;

    let mut store = CredentialStore::open(Arc::new(records))
        .await
        .context("Failed to open credential store")?;

    if !config.locks.is_empty() {
        let report = store
            .apply_selection(&config.locks)
            .await
            .context("Failed to apply configured lock selection")?;
        if !report.removed.is_empty() {
            warn!(
                removed = ?report.removed,
                "Locks missing from the configuration were removed with their codes"
            );
        }
        info!(
            added = report.added.len(),
            removed = report.removed.len(),
            "Configured lock selection applied"
        );
    }

    Ok(store.into_shared())
}

/// Run the lock manager until a shutdown signal arrives
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let token = config
        .api
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .context("api.token must be set (ZLM_API__TOKEN)")?;

    let store = open_store(&config).await?;

    // Connect to message bus
    let message_bus = NatsClient::new(
        config.message_bus_url(),
        &config.message_bus.subject_prefix,
        config.message_bus.command_timeout(),
    )
    .await
    .context("Failed to connect to message bus")?;
    let message_bus = Arc::new(message_bus);

    info!("Connected to message bus");

    let target = config.alarm.active_target().map(str::to_string);
    match &target {
        Some(entity_id) => info!(entity_id = %entity_id, "Alarm integration enabled"),
        None => info!("Alarm integration disabled"),
    }

    let correlator = EventCorrelator::new(store.clone(), message_bus.clone(), target);
    let manager = LockManager::new(store, message_bus.clone());

    let events = message_bus.clone();
    let correlator_handle = tokio::spawn(async move {
        if let Err(e) = correlator.run(events.as_ref()).await {
            error!(error = %e, "Correlator error");
        }
    });

    let listener = TcpListener::bind(&config.api.bind)
        .await
        .with_context(|| format!("Failed to bind command API to {}", config.api.bind))?;

    info!("Lock manager running. Press Ctrl+C to stop.");
    let served = api::serve(listener, api::router(manager, &token), shutdown_signal()).await;

    // Cancel the correlator
    correlator_handle.abort();
    best_effort("message bus flush", message_bus.flush().await);
    info!("Lock manager stopped");

    served
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal (Ctrl+C) received");
        },
        _ = terminate => {
            info!("Shutdown signal (SIGTERM) received");
        },
    }
}
