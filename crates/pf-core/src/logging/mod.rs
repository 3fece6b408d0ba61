//! Diagnostic logging for pfinder.
//!
//! Two output modes, both on stderr:
//! - human-readable console lines for interactive use
//! - JSONL for scripts that capture diagnostics
//!
//! stdout carries only query results, whatever the log settings.
//!
//! ```ignore
//! use pf_core::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::from_env(Some(LogLevel::Debug), None);
//! init_logging(&config);
//! tracing::debug!(target: "pf_core::locate", path = "/var/log/syslog", "scan started");
//! ```

pub mod config;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel, LOG_FORMAT_ENV, LOG_LEVEL_ENV};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events pass the default filter.
const LOG_TARGETS: &[&str] = &["pf_core", "pf_config", "pfinder"];

/// Filter directives for `level` across the pfinder crates.
pub fn default_directives(level: LogLevel) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    // RUST_LOG carries full directives; it only applies when the
    // pfinder-specific variable is absent.
    if std::env::var_os(LOG_LEVEL_ENV).is_none() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(default_directives(config.level))
}

/// Install the global subscriber.
///
/// Returns false when a subscriber was already installed; the existing one
/// stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = build_filter(config);

    let installed = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(JsonlLayer::stderr())
            .try_init(),
    };
    installed.is_ok()
}
