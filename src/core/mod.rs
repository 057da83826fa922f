/// Core Module for driver-snippets
///
/// This module contains the shared infrastructure every snippet builds on:
/// the error convention and the database lifecycle helpers (connection scope,
/// transaction runner, search index polling).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Lookup, Result, SnippetError};
