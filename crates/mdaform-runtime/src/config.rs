#![forbid(unsafe_code)]

//! Editor configuration.
//!
//! Defaults suit an interactive record form. Hosts adjust them with the
//! `with_*` builders or from the environment:
//!
//! | Variable | Field | Values |
//! |----------|-------|--------|
//! | `MDAFORM_AUTOSAVE_MS` | `autosave_delay` | milliseconds, `> 0` |
//! | `MDAFORM_RECENT_LIMIT` | `recent_limit` | integer, `> 0` |
//! | `MDAFORM_LOAD_DETECTION` | `load_detection` | `heuristic` \| `explicit` |
//! | `MDAFORM_SHORTCUTS` | `keyboard_shortcuts` | `0`/`false`/`off` disables |

use std::fmt;
use std::time::Duration;

use mdaform_core::LoadDetection;

use crate::autosave::DEFAULT_AUTOSAVE_DELAY;
use crate::notify::DEFAULT_TTL;
use crate::persistence::DEFAULT_RECENT_LIMIT;

pub const ENV_AUTOSAVE_MS: &str = "MDAFORM_AUTOSAVE_MS";
pub const ENV_RECENT_LIMIT: &str = "MDAFORM_RECENT_LIMIT";
pub const ENV_LOAD_DETECTION: &str = "MDAFORM_LOAD_DETECTION";
pub const ENV_SHORTCUTS: &str = "MDAFORM_SHORTCUTS";

/// An environment value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The value does not parse for this variable.
    Invalid { var: &'static str, value: String },
    /// The value parses but is out of range.
    OutOfRange {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { var, value } => write!(f, "invalid value for {var}: `{value}`"),
            Self::OutOfRange { var, value, reason } => {
                write!(f, "value for {var} out of range: `{value}` ({reason})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for record editors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Idle time before an autosave fires.
    pub autosave_delay: Duration,
    /// Cap on the recent-items list.
    pub recent_limit: usize,
    /// How the dirty tracker spots a record load.
    pub load_detection: LoadDetection,
    /// Whether the save chords are bound.
    pub keyboard_shortcuts: bool,
    /// Auto-dismiss time for non-error notifications.
    pub notification_ttl: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            recent_limit: DEFAULT_RECENT_LIMIT,
            load_detection: LoadDetection::Heuristic,
            keyboard_shortcuts: true,
            notification_ttl: DEFAULT_TTL,
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    #[must_use]
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    #[must_use]
    pub fn with_load_detection(mut self, policy: LoadDetection) -> Self {
        self.load_detection = policy;
        self
    }

    #[must_use]
    pub fn with_keyboard_shortcuts(mut self, enabled: bool) -> Self {
        self.keyboard_shortcuts = enabled;
        self
    }

    #[must_use]
    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    /// Defaults overridden by `MDAFORM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_AUTOSAVE_MS) {
            let ms = parse_positive(ENV_AUTOSAVE_MS, &value)?;
            config.autosave_delay = Duration::from_millis(ms);
        }

        if let Some(value) = lookup(ENV_RECENT_LIMIT) {
            let limit = parse_positive(ENV_RECENT_LIMIT, &value)?;
            config.recent_limit = usize::try_from(limit).map_err(|_| ConfigError::OutOfRange {
                var: ENV_RECENT_LIMIT,
                value: value.clone(),
                reason: "too large",
            })?;
        }

        if let Some(value) = lookup(ENV_LOAD_DETECTION) {
            config.load_detection = match value.trim().to_lowercase().as_str() {
                "heuristic" => LoadDetection::Heuristic,
                "explicit" => LoadDetection::Explicit,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: ENV_LOAD_DETECTION,
                        value,
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_SHORTCUTS) {
            config.keyboard_shortcuts = match value.trim().to_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: ENV_SHORTCUTS,
                        value,
                    });
                }
            };
        }

        tracing::debug!(
            autosave_ms = config.autosave_delay.as_millis() as u64,
            recent_limit = config.recent_limit,
            load_detection = ?config.load_detection,
            keyboard_shortcuts = config.keyboard_shortcuts,
            "editor config loaded"
        );
        Ok(config)
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let n: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_owned(),
    })?;
    if n == 0 {
        return Err(ConfigError::OutOfRange {
            var,
            value: value.to_owned(),
            reason: "must be greater than zero",
        });
    }
    Ok(n)
}
