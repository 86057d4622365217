//! # SongStep Common Library
//!
//! Shared code for the SongStep services including:
//! - Common error type
//! - Configuration file model and data root resolution
//! - Credential sanitizing and masking helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod secrets;
pub mod time;

pub use error::{Error, Result};
