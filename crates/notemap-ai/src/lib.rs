//! Analysis oracle bridge for Notemap
//!
//! This crate frames notebook snippets for an external analysis service,
//! validates what comes back against the read/write schema, and retries
//! transient failures.

pub mod bridge;
pub mod config;
pub mod prompt;
pub mod providers;
pub mod retry;

#[cfg(test)]
pub mod tests;

pub use bridge::*;
pub use config::OracleConfig;
pub use retry::{analyze_with_retry, RetryPolicy};
