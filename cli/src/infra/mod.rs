//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: HTTP calls to the image
//! service, the local OAuth callback server, port probing, browser launch,
//! and config/credential files.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod api_client;
pub mod browser;
pub mod callback;
pub mod config;
pub mod port_probe;
pub mod token_store;
