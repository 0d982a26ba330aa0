//! Pipeline configuration via `scribe.toml`
//!
//! The config file lives next to the index data. On first use a default
//! `scribe.toml` is written; edit it and restart the pipeline to change
//! settings.

use scribe_core::{ScribeError, ScribeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name placed in the index data directory.
pub const CONFIG_FILE_NAME: &str = "scribe.toml";

/// How operation factories route records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Per-transaction buffer, flushed into the queue on commit
    Buffered,
    /// Apply and flush immediately on a supplied connection, bypassing the
    /// buffer and the queue
    Synchronous,
}

/// Pipeline configuration loaded from `scribe.toml`.
///
/// # Example
///
/// ```toml
/// index_path = "index"
/// flush_threshold = 20
/// poll_timeout_ms = 60000
/// auto_refresh_ms = 20000
/// dispatch = "buffered"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScribeConfig {
    /// Index directory, relative paths resolve against the config file
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    /// Records applied between two connection flushes.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    /// Bounded wait of the worker on an empty queue, in milliseconds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Staleness window of cached search connections, in milliseconds.
    #[serde(default = "default_auto_refresh_ms")]
    pub auto_refresh_ms: u64,
    /// Dispatch mode: `"buffered"` or `"synchronous"`.
    #[serde(default = "default_dispatch_str")]
    pub dispatch: String,
    /// Push an unresolvable Add/Modify back onto the queue once.
    #[serde(default)]
    pub requeue_unresolved: bool,
    /// Invalidate cached search connections after every worker flush.
    #[serde(default)]
    pub invalidate_on_flush: bool,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("index")
}

fn default_flush_threshold() -> usize {
    20
}

fn default_poll_timeout_ms() -> u64 {
    60_000
}

fn default_auto_refresh_ms() -> u64 {
    20_000
}

fn default_dispatch_str() -> String {
    "buffered".to_string()
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            flush_threshold: default_flush_threshold(),
            poll_timeout_ms: default_poll_timeout_ms(),
            auto_refresh_ms: default_auto_refresh_ms(),
            dispatch: default_dispatch_str(),
            requeue_unresolved: false,
            invalidate_on_flush: false,
        }
    }
}

impl ScribeConfig {
    /// Parse the dispatch string into a `DispatchMode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"buffered"` or `"synchronous"`.
    pub fn dispatch_mode(&self) -> ScribeResult<DispatchMode> {
        match self.dispatch.as_str() {
            "buffered" => Ok(DispatchMode::Buffered),
            "synchronous" => Ok(DispatchMode::Synchronous),
            other => Err(ScribeError::config(format!(
                "Invalid dispatch mode '{}' in scribe.toml. Expected \"buffered\" or \"synchronous\".",
                other
            ))),
        }
    }

    /// Worker poll timeout
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Connection hub staleness window
    pub fn auto_refresh(&self) -> Duration {
        Duration::from_millis(self.auto_refresh_ms)
    }

    /// Check every value; called eagerly by `from_file`.
    pub fn validate(&self) -> ScribeResult<()> {
        self.dispatch_mode()?;
        if self.flush_threshold == 0 {
            return Err(ScribeError::config("flush_threshold must be at least 1"));
        }
        if self.poll_timeout_ms == 0 {
            return Err(ScribeError::config("poll_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Index directory, resolved against `base` when relative.
    pub fn resolve_index_path(&self, base: &Path) -> PathBuf {
        if self.index_path.is_absolute() {
            self.index_path.clone()
        } else {
            base.join(&self.index_path)
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Scribe indexing pipeline configuration
#
# Index directory. Relative paths resolve against this file's directory.
index_path = "index"

# Records applied by the worker between two index flushes (default: 20)
flush_threshold = 20

# How long the worker waits on an empty queue before flushing pending
# records, in milliseconds (default: 60000)
poll_timeout_ms = 60000

# Cached search connections are reopened at least this often, in
# milliseconds (default: 20000)
auto_refresh_ms = 20000

# Dispatch mode: "buffered" (default) or "synchronous"
#   "buffered"    = buffer per transaction, enqueue on commit, apply in the worker
#   "synchronous" = apply and flush immediately on a supplied connection (tests only)
dispatch = "buffered"

# Retry an Add/Modify whose object could not be resolved, exactly once
requeue_unresolved = false

# Invalidate cached search connections after each worker flush
invalidate_on_flush = false
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> ScribeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScribeError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ScribeConfig = toml::from_str(&content).map_err(|e| {
            ScribeError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> ScribeResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                ScribeError::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> ScribeResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScribeError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            ScribeError::internal(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
