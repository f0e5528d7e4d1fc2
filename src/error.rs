//! Error types for cache, coalescing and refresh operations
//!
//! All variants carry owned strings and the enum is `Clone`, so a single
//! failure outcome can be broadcast to any number of concurrent waiters.

use thiserror::Error;

/// Main error type for flowcache operations
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    /// A value generator failed
    #[error("Generator error: {0}")]
    Generator(String),

    /// An operation requiring a generator was called without one configured
    #[error("No generator configured")]
    NoGenerator,

    /// A source fetch failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A sink apply failed
    #[error("Apply error: {0}")]
    Apply(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for flowcache operations
pub type Result<T> = std::result::Result<T, FlowError>;

impl From<String> for FlowError {
    fn from(s: String) -> Self {
        FlowError::Other(s)
    }
}

impl From<&str> for FlowError {
    fn from(s: &str) -> Self {
        FlowError::Other(s.to_string())
    }
}
