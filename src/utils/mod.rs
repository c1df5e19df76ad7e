//! Shared utilities

pub mod signal;
