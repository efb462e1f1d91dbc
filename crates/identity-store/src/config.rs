//! Store configuration.
//!
//! Settings come from the environment by default and can be overridden by
//! the caller (the CLI maps its flags onto the same struct).

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the persistent storage directory.
pub const DIR_ENV: &str = "IDSTORE_DIR";

/// Environment variable overriding the poll interval, in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "IDSTORE_POLL_INTERVAL_MS";

/// How often login state is re-read when no native change events exist.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Directory under `$HOME` used when `IDSTORE_DIR` is unset.
const DEFAULT_DIR_NAME: &str = ".identity-store";

/// Where and how the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Persistent storage directory. `None` selects the in-memory fallback.
    pub dir: Option<PathBuf>,
    /// Poll period for change detection without native events.
    pub poll_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Read configuration from the process environment.
    ///
    /// `IDSTORE_DIR` wins; otherwise `$HOME/.identity-store` is used when
    /// `HOME` is set. An unparsable poll interval is ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dir = lookup(DIR_ENV)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(DEFAULT_DIR_NAME)));

        let poll_interval = match lookup(POLL_INTERVAL_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => {
                    log::warn!("ignoring {POLL_INTERVAL_ENV}={raw:?}: {e}");
                    DEFAULT_POLL_INTERVAL
                }
            },
            None => DEFAULT_POLL_INTERVAL,
        };

        Self { dir, poll_interval }
    }

    /// Use `dir` for persistent storage.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Poll for external changes every `interval`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
