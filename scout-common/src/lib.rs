//! # Scout Common Library
//!
//! Shared code for the Scout discovery crates:
//! - Error type and `Result` alias
//! - TOML configuration loading and root folder resolution
//! - SQLite schema initialisation for the discovery cache and pending queue

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use error::{Error, Result};

/// Normalise an artist/candidate name into its lookup key.
///
/// Every dedupe and cache key in Scout goes through this function.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}
