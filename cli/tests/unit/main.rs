//! Unit tests for the cloudimg CLI
//!
//! These tests use fake ports and run fast without external I/O.

mod image_ops;
mod property_tests;
