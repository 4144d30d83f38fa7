//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod image;
pub mod oauth;
pub mod poll;
pub mod port;
pub mod retry;

pub use config::{CliConfig, validate_config_key, validate_config_value};
pub use error::{ApiError, AuthError, ConfigError, ImageError};
pub use poll::{Classification, PollOutcome, PollSettings, PollTarget, StatusVocabulary};
pub use retry::RetryPolicy;
