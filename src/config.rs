// src/config.rs
// Environment-driven settings, loaded once at startup.
//
// Everything on stdout belongs to the browser, so diagnostics default to
// stderr; EDITBRIDGE_LOG redirects them to a file (value may be a directory
// or a full path). Detector timings are overridable mainly so the
// integration tests do not have to sleep through production delays.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::watch::Timings;

const LOG_FILE_NAME: &str = "editbridge.log";

#[derive(Debug, Clone)]
pub struct Config {
    /// Debug-log destination: a directory or a full file path.
    pub log_destination: Option<String>,
    /// Maximum log level (`error`..`trace`).
    pub log_level: String,
    /// Skip the notify probe and poll the scratch file's mtime instead.
    pub force_poll: bool,
    /// Grace period before save detection starts.
    pub arming_delay_ms: u64,
    /// Quiet window that turns a burst of write events into one save.
    pub debounce_ms: u64,
    /// Sampling interval for the polling fallback.
    pub poll_interval_ms: u64,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => match val.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                eprintln!("editbridge: ignoring unparseable {key}='{val}'");
                default
            }
        },
        Err(_) => default,
    }
}

/// Boolean env flags accept 1/true/yes in any case.
fn env_flag(key: &str) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => false,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_destination: std::env::var("EDITBRIDGE_LOG").ok().filter(|v| !v.is_empty()),
            log_level: env_var_or("EDITBRIDGE_LOG_LEVEL", "warn".to_string()),
            force_poll: env_flag("EDITBRIDGE_FORCE_POLL"),
            arming_delay_ms: env_var_or("EDITBRIDGE_ARMING_DELAY_MS", 300),
            debounce_ms: env_var_or("EDITBRIDGE_DEBOUNCE_MS", 100),
            poll_interval_ms: env_var_or("EDITBRIDGE_POLL_INTERVAL_MS", 100),
        }
    }

    /// Detector timings for the session.
    pub fn timings(&self) -> Timings {
        Timings {
            arming_delay: Duration::from_millis(self.arming_delay_ms),
            debounce: Duration::from_millis(self.debounce_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Where log output should go. `None` means stderr.
    ///
    /// An explicit destination always wins; a directory gets the default
    /// file name appended. With no destination, debug and trace levels are
    /// verbose enough that they go to a file in the temp directory rather
    /// than cluttering the browser's stderr capture.
    pub fn log_file(&self) -> Option<PathBuf> {
        if let Some(dest) = &self.log_destination {
            let path = PathBuf::from(dest);
            if path.is_dir() {
                return Some(path.join(LOG_FILE_NAME));
            }
            return Some(path);
        }

        match self.log_level.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(std::env::temp_dir().join(LOG_FILE_NAME)),
            _ => None,
        }
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            log_destination: None,
            log_level: "warn".to_string(),
            force_poll: false,
            arming_delay_ms: 300,
            debounce_ms: 100,
            poll_interval_ms: 100,
        }
    }

    #[test]
    fn default_timings_match_detector_contract() {
        let timings = base_config().timings();
        assert_eq!(timings.arming_delay, Duration::from_millis(300));
        assert_eq!(timings.debounce, Duration::from_millis(100));
        assert_eq!(timings.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn warn_level_without_destination_logs_to_stderr() {
        assert_eq!(base_config().log_file(), None);
    }

    #[test]
    fn debug_level_defaults_to_temp_dir_file() {
        let mut config = base_config();
        config.log_level = "debug".to_string();
        let path = config.log_file().expect("debug level should pick a file");
        assert_eq!(path, std::env::temp_dir().join(LOG_FILE_NAME));
    }

    #[test]
    fn directory_destination_gets_file_name_appended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = base_config();
        config.log_destination = Some(dir.path().to_string_lossy().into_owned());
        let path = config.log_file().expect("destination set");
        assert_eq!(path, dir.path().join(LOG_FILE_NAME));
    }

    #[test]
    fn file_destination_is_used_verbatim() {
        let mut config = base_config();
        config.log_destination = Some("/var/log/bridge.log".to_string());
        assert_eq!(config.log_file(), Some(PathBuf::from("/var/log/bridge.log")));
    }
}
