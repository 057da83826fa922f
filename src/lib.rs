// Core infrastructure modules
pub mod config;
pub mod core;
pub mod logging;

// Snippet catalogue and rendering
pub mod output;
pub mod snippets;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod integration_tests;
