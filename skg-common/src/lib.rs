//! # SKG Common Library
//!
//! Shared code for the supplement knowledge graph tooling:
//! - Error types
//! - Bootstrap configuration (TOML) and root folder resolution
//! - User-agent string for outbound HTTP clients

pub mod config;
pub mod error;

pub use error::{Error, Result};
