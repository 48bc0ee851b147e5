//! Test utilities for `kvbench`.
//!
//! This crate provides an in-process mock of the key-value service and a logger for tests. See
//! the modules for all available utilities.

pub mod server;
pub mod tracing;
