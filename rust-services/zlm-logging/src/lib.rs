//! Structured logging setup for the lock manager services

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use zlm_config::{AppConfig, LogFormat};

/// Initialize logging as selected by the application configuration
pub fn init_from_config(service_name: &str, config: &AppConfig) {
    match config.log_format {
        LogFormat::Json => init_logging(service_name, config.log_level()),
        LogFormat::Console => init_console_logging(service_name, config.log_level()),
    }
}

/// Initialize structured logging
///
/// This sets up:
/// - JSON formatted logs (for production)
/// - Environment-based log level filtering (`RUST_LOG` wins over the default)
/// - Service name tagging
pub fn init_logging(service_name: &str, default_level: &str) {
    let registry = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(false)
                .with_span_list(false),
        );

    if registry.try_init().is_ok() {
        tracing::info!(
            service = service_name,
            "Logging initialized"
        );
    }
}

/// Initialize simple console logging (for development)
pub fn init_console_logging(service_name: &str, default_level: &str) {
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!(
            service = service_name,
            "Console logging initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}
