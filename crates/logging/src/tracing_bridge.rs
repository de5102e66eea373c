//! Subscriber installation driven by [`VerbosityConfig`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! let config = VerbosityConfig::from_verbose_level(2);
//! init_tracing(&config);
//!
//! tracing::info!(target: "client::merge", "resolved");
//! ```

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::config::VerbosityConfig;

/// Environment variable consulted before the configured directives.
pub const LOG_ENV_VAR: &str = "CLIENT_ENGINE_LOG";

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
pub enum InitError {
    /// The directives built from the configuration were rejected.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Builds the filter for `config`, letting [`LOG_ENV_VAR`] take precedence.
pub fn build_filter(config: &VerbosityConfig) -> Result<EnvFilter, InitError> {
    if let Ok(directives) = std::env::var(LOG_ENV_VAR)
        && !directives.trim().is_empty()
    {
        return Ok(EnvFilter::try_new(directives)?);
    }
    Ok(EnvFilter::try_new(config.directives())?)
}

/// Installs a formatting subscriber filtered by `config`.
pub fn try_init_tracing(config: &VerbosityConfig) -> Result<(), InitError> {
    let filter = build_filter(config)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;
    Ok(())
}

/// Installs the subscriber, ignoring the error if one is already present.
///
/// Embedders that own their own subscriber simply never call this.
pub fn init_tracing(config: &VerbosityConfig) {
    if let Err(error) = try_init_tracing(config) {
        tracing::debug!(target: "client::protocol", "tracing init skipped: {error}");
    }
}
