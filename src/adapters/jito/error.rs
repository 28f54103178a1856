//! Jito Error Types

use thiserror::Error;

use crate::ports::block_builder::BlockBuilderError;

/// Errors that can occur during Jito bundle operations
#[derive(Error, Debug, Clone)]
pub enum JitoError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Block Engine API error
    #[error("Block Engine error: {message} (code: {code})")]
    ApiError { code: i32, message: String },

    /// Invalid bundle (empty, too large, etc.)
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    /// Transaction could not be encoded
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Network/connection error
    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<reqwest::Error> for JitoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            JitoError::Timeout
        } else if err.is_connect() {
            JitoError::NetworkError(err.to_string())
        } else {
            JitoError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for JitoError {
    fn from(err: serde_json::Error) -> Self {
        JitoError::SerializationError(err.to_string())
    }
}

impl From<JitoError> for BlockBuilderError {
    fn from(err: JitoError) -> Self {
        match err {
            JitoError::RateLimited => BlockBuilderError::RateLimited,
            JitoError::InvalidBundle(reason) | JitoError::InvalidTransaction(reason) => {
                BlockBuilderError::InvalidBundle(reason)
            }
            other => BlockBuilderError::Submission(other.to_string()),
        }
    }
}
