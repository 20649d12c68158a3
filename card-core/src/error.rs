//! Error types for card operations.

use thiserror::Error;

/// Result type for card operations.
pub type CardResult<T> = Result<T, CardError>;

/// Errors that can occur in card operations.
#[derive(Debug, Error)]
pub enum CardError {
    /// Payload could not be decoded into daily log data.
    #[error("Payload decode failed: {0}")]
    Decode(String),

    /// Payload JSON was malformed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Secure payload has expired or carries a future timestamp.
    #[error("Payload expired or not yet valid: {0}")]
    Expired(String),

    /// Secure payload belongs to a different user.
    #[error("Payload user mismatch: expected {expected}, found {found}")]
    Unauthorized {
        /// User id taken from the query string.
        expected: String,
        /// User id found inside the decrypted envelope.
        found: String,
    },

    /// Decryption collaborator failed.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Uploaded file is not an accepted image type.
    #[error("Unsupported background image type: {0}")]
    UnsupportedImage(String),
}
