//! # Roster Common Library
//!
//! Shared code for the roster service including:
//! - Error taxonomy shared by the import pipeline, query builder and HTTP layer
//! - Configuration loading (TOML bootstrap file + compiled defaults)
//! - Database initialization and the person/saved-filter models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
