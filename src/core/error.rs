//! Error types for terrasdf
//!
//! Only the configuration layer surfaces errors. The simulation core
//! substitutes sentinels and fallbacks instead of failing.

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}
