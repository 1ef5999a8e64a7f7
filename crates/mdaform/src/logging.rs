#![forbid(unsafe_code)]

//! Global `tracing` subscriber setup.
//!
//! The filter comes from `MDAFORM_LOG` using `EnvFilter` directive syntax
//! (`info`, `mdaform_runtime=debug`, ...). Unset or unparsable values fall
//! back to [`DEFAULT_DIRECTIVE`].
//!
//! ```no_run
//! mdaform::logging::init().expect("no other subscriber installed");
//! ```

use std::fmt;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Variable holding the filter directives.
pub const ENV_LOG: &str = "MDAFORM_LOG";

/// Filter used when [`ENV_LOG`] is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Subscriber installation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    SubscriberAlreadySet,
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberAlreadySet => f.write_str("a global tracing subscriber is already set"),
        }
    }
}

impl std::error::Error for LoggingError {}

/// Filter built from `directives`, or from [`DEFAULT_DIRECTIVE`] when they
/// are absent or do not parse.
#[must_use]
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn env_filter() -> EnvFilter {
    filter_from(std::env::var(ENV_LOG).ok().as_deref())
}

/// Install a human-readable subscriber.
pub fn init() -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .finish()
        .try_init()
        .map_err(|_| LoggingError::SubscriberAlreadySet)?;
    tracing::debug!(format = "text", "logging initialised");
    Ok(())
}

/// Install a JSON-lines subscriber.
#[cfg(feature = "log-json")]
pub fn init_json() -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(false)
        .finish()
        .try_init()
        .map_err(|_| LoggingError::SubscriberAlreadySet)?;
    tracing::debug!(format = "json", "logging initialised");
    Ok(())
}
