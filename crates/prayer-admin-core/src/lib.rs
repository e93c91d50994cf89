//! Core types and utilities for the prayer admin dashboard

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{BackendConfig, Config, HeartbeatConfig, LoggingConfig, UiConfig};
pub use error::{Error, Result};
pub use types::{
    ApprovalStatus, DeletionRequest, EmailSettings, NewPrayerType, PrayerType, PrayerTypeUpdate,
    PreferenceChangeRequest, Session, Theme, UpdateDeletionRequest,
};

/// Initialize the logging system.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let installed = if logging.is_json() {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    };

    installed.map_err(|e| Error::configuration(format!("logging already initialized: {e}")))
}
