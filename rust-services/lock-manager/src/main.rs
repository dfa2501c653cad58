//! ZHA Lock Manager
//!
//! Keeps keypad codes for Zigbee locks encrypted at rest, programs them into
//! the locks on request and disarms the alarm panel when a stored code is used
//! at a keypad.

use anyhow::{Context, Result};
use tracing::info;
use zlm_config::AppConfig;
use zlm_logging::init_from_config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // Initialize logging
    init_from_config("lock-manager", &config);

    info!("Starting ZHA Lock Manager");
    info!(
        message_bus_url = config.message_bus_url(),
        storage_path = %config.storage.path,
        locks = config.locks.len(),
        "Configuration loaded"
    );

    lock_manager::service::run(config).await
}
