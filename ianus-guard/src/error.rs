//! Error types for license record handling.

use ianus_license::LicenseError;
use thiserror::Error;

/// Errors raised while looking up or storing license records.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The token could not be read when registering it.
    #[error("invalid license key: {0}")]
    InvalidLicense(#[from] LicenseError),

    /// No platform data directory to keep the record store in.
    #[error("no data directory available for the license store")]
    NoDataDirectory,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;
