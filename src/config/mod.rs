//! Configuration module for marktabs
//!
//! This module handles user preferences, including serialization to JSON and
//! persistent storage in the platform-specific config directory.

mod persistence;
mod preferences;

pub use persistence::*;
pub use preferences::*;
