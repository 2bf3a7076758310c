//! Server configuration, read from `CODEPULSE_*` environment variables.

use std::{path::PathBuf, time::Duration};

use crate::timer::{ControllerOptions, RetryPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// SQLite file, or `:memory:`.
    pub db_path: PathBuf,
    /// JSON file holding per-user break preferences.
    pub prefs_path: PathBuf,
    /// Header carrying the authenticated user id.
    pub user_header: String,
    pub tick_ms: u64,
    pub persist_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".into(),
            db_path: PathBuf::from("codepulse.sqlite3"),
            prefs_path: PathBuf::from("codepulse-preferences.json"),
            user_header: "x-user-id".into(),
            tick_ms: 1000,
            persist_retries: 3,
            retry_backoff_ms: 250,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("CODEPULSE_BIND", &defaults.bind_address),
            db_path: std::env::var_os("CODEPULSE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            prefs_path: std::env::var_os("CODEPULSE_PREFS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.prefs_path),
            user_header: env_or("CODEPULSE_USER_HEADER", &defaults.user_header).to_ascii_lowercase(),
            tick_ms: parse_env("CODEPULSE_TICK_MS", defaults.tick_ms),
            persist_retries: parse_env("CODEPULSE_PERSIST_RETRIES", defaults.persist_retries),
            retry_backoff_ms: parse_env("CODEPULSE_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            tick_interval: Some(Duration::from_millis(self.tick_ms.max(1))),
            retry: RetryPolicy {
                attempts: self.persist_retries.max(1),
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
            ..Default::default()
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_options_follow_config() {
        let config = Config {
            tick_ms: 0,
            persist_retries: 5,
            retry_backoff_ms: 10,
            ..Default::default()
        };
        let options = config.controller_options();
        assert_eq!(options.tick_interval, Some(Duration::from_millis(1)));
        assert_eq!(options.retry.attempts, 5);
        assert_eq!(options.retry.backoff, Duration::from_millis(10));
    }

    #[test]
    fn unparsable_values_fall_back() {
        assert_eq!(parse_env("CODEPULSE_TEST_UNSET_VARIABLE", 7u32), 7);
    }
}
