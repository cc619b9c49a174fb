//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const SESSION_DIR: &str = ".ridenow";
pub const SESSION_FILE_NAME: &str = "session.json";

/// Errors produced while building a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The backend base URL is not an `http://` or `https://` URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `RIDENOW_API_BASE_URL`: default `http://localhost:8080`
    /// - `RIDENOW_REQUEST_TIMEOUT_SECS`: default 30
    /// - `RIDENOW_CONNECT_TIMEOUT_SECS`: default 10
    /// - `RIDENOW_SESSION_FILE`: default `$HOME/.ridenow/session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an HTTP(S) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(
            &std::env::var("RIDENOW_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned()),
        )?;
        let timeouts = Timeouts {
            request_secs: env_parse_u64("RIDENOW_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("RIDENOW_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_file = std::env::var_os("RIDENOW_SESSION_FILE").map_or_else(default_session_file, PathBuf::from);

        Ok(Self { base_url, timeouts, session_file })
    }

    /// Replace the base URL, applying the same validation as [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an HTTP(S) URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_owned())
    } else {
        Err(ConfigError::InvalidBaseUrl(raw.to_owned()))
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from(SESSION_DIR), |home| PathBuf::from(home).join(SESSION_DIR))
        .join(SESSION_FILE_NAME)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
