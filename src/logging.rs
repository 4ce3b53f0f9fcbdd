//! Tracing subscriber set-up.
//!
//! Installs a global `fmt` subscriber once per process. Later calls are
//! no-ops, so every bridge can ask for logging without coordinating.
//! `RUST_LOG` takes precedence over the configured level.

use std::io;

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, LogFormat};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

const CRATES: [&str; 5] = [
    "dynbridge",
    "dynbridge_core",
    "dynbridge_registry",
    "dynbridge_dispatch",
    "dynbridge_runtime",
];

/// Initialize logging from the environment alone.
pub fn init() {
    let config = crate::BridgeConfig::default().with_env_overrides();
    init_with_config(&config.log);
}

/// Initialize logging with `config`. Only the first call has any effect.
pub fn init_with_config(config: &LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(config)));

        let registry = tracing_subscriber::registry().with(env_filter);
        // Another subscriber may already be installed by the embedding host.
        let result = match config.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(io::stderr).with_target(true))
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_thread_ids(cfg!(debug_assertions)),
                )
                .try_init(),
        };
        if result.is_ok() {
            tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
        }
    });
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

fn directives(config: &LogConfig) -> String {
    let level = match config.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => config.level.as_str(),
        _ => "info",
    };
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
