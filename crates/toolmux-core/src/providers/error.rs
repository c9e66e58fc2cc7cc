//! Provider error types

use thiserror::Error;

/// Errors that can occur while generating with a model
#[derive(Error, Debug)]
pub enum ProviderError {
    /// API request failed
    #[error("{provider} API error: {message}")]
    ApiError { provider: String, message: String },

    /// Provider name the backend cannot route
    #[error("Unsupported provider: {0}")]
    Unsupported(String),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn api_error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
