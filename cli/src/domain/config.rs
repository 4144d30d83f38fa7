//! Domain types and validators for cloudimg configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::poll::PollSettings;
use crate::domain::port::parse_port;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api.url",
    "api.timeout_secs",
    "auth.callback_port",
    "auth.client_type",
    "auth.login_timeout_secs",
    "poll.interval_secs",
    "poll.timeout_secs",
];

pub const DEFAULT_API_URL: &str = "https://api.cloudimg.io";
pub const DEFAULT_CALLBACK_PORT: u16 = 3000;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.cloudimg/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub poll: PollConfig,
}

/// REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the image service.
    pub url: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Browser login settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Preferred local port for the OAuth callback listener.
    pub callback_port: u16,
    /// Client type reported when requesting the sign-in URL.
    pub client_type: String,
    /// How long to wait for the browser redirect.
    pub login_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            callback_port: DEFAULT_CALLBACK_PORT,
            client_type: "cli".to_string(),
            login_timeout_secs: 300,
        }
    }
}

/// Long-poll settings for image operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 45 * 60,
        }
    }
}

impl CliConfig {
    #[must_use]
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll.interval_secs),
            timeout: Duration::from_secs(self.poll.timeout_secs),
        }
    }

    #[must_use]
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.login_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Current value of a whitelisted key, as shown by `config show`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        Some(match key {
            "api.url" => self.api.url.clone(),
            "api.timeout_secs" => self.api.timeout_secs.to_string(),
            "auth.callback_port" => self.auth.callback_port.to_string(),
            "auth.client_type" => self.auth.client_type.clone(),
            "auth.login_timeout_secs" => self.auth.login_timeout_secs.to_string(),
            "poll.interval_secs" => self.poll.interval_secs.to_string(),
            "poll.timeout_secs" => self.poll.timeout_secs.to_string(),
            _ => return None,
        })
    }

    /// Validate and assign `value` to `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid for it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "api.url" => self.api.url = value.trim_end_matches('/').to_string(),
            "api.timeout_secs" => self.api.timeout_secs = parse_positive(key, value)?,
            "auth.callback_port" => {
                self.auth.callback_port = parse_port(value).ok_or_else(|| invalid(key, value))?;
            }
            "auth.client_type" => self.auth.client_type = value.to_string(),
            "auth.login_timeout_secs" => {
                self.auth.login_timeout_secs = parse_positive(key, value)?;
            }
            "poll.interval_secs" => self.poll.interval_secs = parse_positive(key, value)?,
            "poll.timeout_secs" => self.poll.timeout_secs = parse_positive(key, value)?,
            _ => return Err(unknown(key).into()),
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

fn unknown(key: &str) -> ConfigError {
    ConfigError::UnknownKey {
        key: key.to_string(),
        valid: VALID_CONFIG_KEYS.join(", "),
    }
}

fn expected_for(key: &str) -> &'static str {
    match key {
        "api.url" => "Expected an http:// or https:// URL",
        "auth.callback_port" => "Expected a port number between 1 and 65535",
        "auth.client_type" => "Expected a non-empty client type",
        _ => "Expected a positive whole number of seconds",
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected_for(key).to_string(),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, value).into()),
    }
}

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(unknown(key).into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let ok = match key {
        "api.url" => url::Url::parse(value)
            .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some()),
        "auth.callback_port" => parse_port(value).is_some(),
        "auth.client_type" => !value.trim().is_empty(),
        _ => value.parse::<u64>().is_ok_and(|n| n > 0),
    };
    if !ok {
        return Err(invalid(key, value).into());
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
