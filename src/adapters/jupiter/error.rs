use thiserror::Error;

use crate::ports::swap::SwapBuildError;

#[derive(Debug, Clone, Error)]
pub enum JupiterError {
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("No route found")]
    NoRoute,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl From<JupiterError> for SwapBuildError {
    fn from(err: JupiterError) -> Self {
        SwapBuildError::Api(err.to_string())
    }
}
