//! Database Backend Abstractions
//!
//! Connection handles, values and rows shared by every backend, plus the
//! SQLite implementation.

pub mod core;
pub mod sqlite;

// Re-export core traits and types
pub use core::*;
pub use sqlite::SqliteConnection;
