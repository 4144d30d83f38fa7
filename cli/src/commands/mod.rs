//! Command implementations

pub mod auth;
pub mod config;
pub mod image;
pub mod login;
pub mod logout;
pub mod version;
