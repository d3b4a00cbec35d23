//! Session-wide settings: retry budgets, lock recovery, library location.

use std::os::raw::c_int;
use std::path::PathBuf;
use std::time::Duration;

use crate::sys;

/// Command that makes the desktop's automounter let go of the camera.
pub const DEFAULT_UNMOUNT_COMMAND: &str = "gvfs-mount -s gphoto2";

/// Settings shared by every camera created from one [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Extra attempts after the first, for init and capture
    pub retries: u32,
    /// Run on a lock error before retrying init; `None` disables
    pub unmount_command: Option<String>,
    /// Pause after the unmount command
    pub unmount_settle: Duration,
    /// Statuses after which capture and preview are attempted again
    pub capture_retry_codes: Vec<c_int>,
    /// Explicit path of the shared library
    pub library_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            retries: 1,
            unmount_command: Some(DEFAULT_UNMOUNT_COMMAND.to_string()),
            unmount_settle: Duration::from_secs(1),
            capture_retry_codes: vec![
                sys::GP_ERROR,
                sys::GP_ERROR_IO,
                sys::GP_ERROR_CAMERA_BUSY,
            ],
            library_path: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `GPBIND_*` environment variables.
    ///
    /// - `GPBIND_RETRIES`: extra attempts
    /// - `GPBIND_UNMOUNT_CMD`: unmount command, empty to disable
    /// - `GPBIND_UNMOUNT_SETTLE_MS`: settle delay in milliseconds
    /// - `GPBIND_LIBRARY`: path of libgphoto2
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup("GPBIND_RETRIES") {
            match value.trim().parse() {
                Ok(retries) => config.retries = retries,
                Err(_) => tracing::warn!("ignoring GPBIND_RETRIES={:?}", value),
            }
        }
        if let Some(value) = lookup("GPBIND_UNMOUNT_CMD") {
            let value = value.trim();
            config.unmount_command = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        if let Some(value) = lookup("GPBIND_UNMOUNT_SETTLE_MS") {
            match value.trim().parse() {
                Ok(ms) => config.unmount_settle = Duration::from_millis(ms),
                Err(_) => tracing::warn!("ignoring GPBIND_UNMOUNT_SETTLE_MS={:?}", value),
            }
        }
        if let Some(value) = lookup("GPBIND_LIBRARY") {
            if !value.is_empty() {
                config.library_path = Some(PathBuf::from(value));
            }
        }

        config
    }

    /// Extra attempts for init and capture.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Command run on a lock error; `None` disables it.
    pub fn with_unmount_command(mut self, command: Option<String>) -> Self {
        self.unmount_command = command;
        self
    }

    /// Wait after the unmount command.
    pub fn with_unmount_settle(mut self, settle: Duration) -> Self {
        self.unmount_settle = settle;
        self
    }

    /// Capture statuses that are worth another attempt.
    pub fn with_capture_retry_codes(mut self, codes: Vec<c_int>) -> Self {
        self.capture_retry_codes = codes;
        self
    }

    /// Load libgphoto2 from this path.
    pub fn with_library_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// True if a capture that failed with `code` should be attempted again.
    pub fn is_capture_retryable(&self, code: c_int) -> bool {
        self.capture_retry_codes.contains(&code)
    }
}
