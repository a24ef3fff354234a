//! Tracing/logging setup shared by binaries and examples embedding the widgets.

pub mod config;
pub mod tracing;

pub use config::{LogConfig, LogConfigError, LogFormat};

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops. An
/// invalid `ORGKIT_LOG_FORMAT` falls back to JSON.
pub fn init() {
    let config = LogConfig::from_env().unwrap_or_default();
    tracing::init_with(&config);
}

/// Initialize process-wide logging with an explicit configuration.
pub fn init_with(config: &LogConfig) {
    tracing::init_with(config);
}
