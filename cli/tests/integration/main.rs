//! Integration tests for the cloudimg CLI
//!
//! These tests spawn the actual binary or bind real sockets on 127.0.0.1.
//! They are slower and should be run separately from unit tests.

mod callback_listener;
mod image_command;
mod login_e2e;
mod port_allocator;
mod support;
