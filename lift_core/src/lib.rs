#![forbid(unsafe_code)]

//! Core domain model and business logic for Lift Log.
//!
//! This crate provides:
//! - Domain types (users, sessions, sets, stats)
//! - Entry line parsing
//! - SQLite persistence with transactional invariants
//! - Session and set operations
//! - Exercise stats lookups

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod parser;
pub mod store;
pub mod service;
pub mod stats;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use parser::{normalize_name, parse_entry, ParsedEntry};
pub use store::Store;
pub use stats::exercise_stats;
