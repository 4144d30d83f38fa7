//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Auth errors ───────────────────────────────────────────────────────────────

/// Errors raised while obtaining a session through the browser login flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "No free port for the login callback. Tried: {}. Close the program using one of these ports and retry.",
        format_ports(.attempted)
    )]
    NoPortAvailable { attempted: Vec<u16> },

    #[error("Cannot start login callback listener on port {port}: {reason}")]
    Listener { port: u16, reason: String },

    #[error("Login callback did not include an authorization code{}", provider_detail(.provider_error))]
    MissingCode { provider_error: Option<String> },

    #[error("Login callback state did not match the sign-in request. Run 'cloudimg login' again.")]
    StateMismatch,

    #[error("Authentication timeout: please try again")]
    Timeout,

    #[error("Cannot request sign-in URL")]
    SignInUrl(#[source] ApiError),

    #[error("Token exchange failed ({code}): {message}")]
    TokenExchange { code: String, message: String },

    #[error("Not logged in. Run 'cloudimg login' first.")]
    NotLoggedIn,

    #[error("Session expired. Run 'cloudimg login' again.")]
    SessionExpired,
}

fn format_ports(ports: &[u16]) -> String {
    if ports.is_empty() {
        return "(none)".to_string();
    }
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn provider_detail(provider_error: &Option<String>) -> String {
    provider_error
        .as_deref()
        .map(|e| format!(" (provider said: {e})"))
        .unwrap_or_default()
}

// ── API errors ────────────────────────────────────────────────────────────────

/// Errors returned by the remote REST API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication rejected (401). Run 'cloudimg login' to start a new session.")]
    Unauthorized,

    #[error("access denied (403): {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected ({status}{}): {message}", code_detail(.code))]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid identifier {0:?}: must be a single non-empty path segment")]
    InvalidId(String),
}

fn code_detail(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(", {c}")).unwrap_or_default()
}

impl ApiError {
    /// Network blips and 5xx responses are worth another attempt; anything
    /// the server rejected on purpose is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }

    /// Server-supplied error code, or the HTTP status as text.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Network(_) => "network".to_string(),
            Self::Unauthorized => "401".to_string(),
            Self::Forbidden(_) => "403".to_string(),
            Self::NotFound(_) => "404".to_string(),
            Self::Rejected { status, code, .. } => {
                code.clone().unwrap_or_else(|| status.to_string())
            }
            Self::Server { status, .. } => status.to_string(),
            Self::InvalidResponse(_) => "invalid_response".to_string(),
            Self::InvalidId(_) => "invalid_id".to_string(),
        }
    }
}

// ── Image errors ──────────────────────────────────────────────────────────────

/// Terminal failures of long-running image operations.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{operation} of {target} failed with status {status}{}", message_detail(.message))]
    Failed {
        operation: &'static str,
        target: String,
        status: String,
        message: Option<String>,
    },

    #[error(
        "{operation} of {target} timed out after {}; it may still be in progress. Check with 'cloudimg image list'.",
        waited_detail(.waited)
    )]
    TimedOut {
        operation: &'static str,
        target: String,
        waited: Duration,
    },

    #[error("Image creation task {task_id} finished without reporting an image id")]
    MissingResult { task_id: String },

    #[error("Invalid image name '{0}': must match ^[a-z0-9][a-z0-9._-]{{0,62}}$")]
    InvalidName(String),
}

fn message_detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

fn waited_detail(waited: &Duration) -> String {
    format_duration(*waited)
}

/// Render a duration as `1h 5m`, `45m` or `30s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

/// Stable machine-readable code for an error chain, used by `--json` output.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AuthError>() {
            return match e {
                AuthError::NoPortAvailable { .. } => "no_port_available",
                AuthError::Listener { .. } => "callback_listener",
                AuthError::MissingCode { .. } => "missing_code",
                AuthError::StateMismatch => "state_mismatch",
                AuthError::Timeout => "auth_timeout",
                AuthError::SignInUrl(_) => "sign_in_url",
                AuthError::TokenExchange { .. } => "token_exchange",
                AuthError::NotLoggedIn => "not_logged_in",
                AuthError::SessionExpired => "session_expired",
            };
        }
        if let Some(e) = cause.downcast_ref::<ImageError>() {
            return match e {
                ImageError::Failed { .. } => "task_failed",
                ImageError::TimedOut { .. } => "poll_timeout",
                ImageError::MissingResult { .. } => "missing_result",
                ImageError::InvalidName(_) => "invalid_name",
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return "config";
        }
        if let Some(e) = cause.downcast_ref::<ApiError>() {
            return match e {
                ApiError::Unauthorized => "unauthorized",
                ApiError::NotFound(_) => "not_found",
                ApiError::InvalidId(_) => "invalid_id",
                _ => "api_error",
            };
        }
    }
    "error"
}
