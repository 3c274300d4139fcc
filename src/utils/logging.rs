//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, LogFormat},
    error::LifecycleError,
};

/// Build the log filter: `RUST_LOG` wins, otherwise the configured level
pub fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("orders={},tower_http=info", config.log_level()))
    })
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed; the caller reports that on
/// stderr since there is no logger to report it through.
pub fn init_tracing(config: &Config) -> Result<(), LifecycleError> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));

    let result = match config.log_format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    result.map_err(|e| LifecycleError::Logging(e.to_string()))
}
