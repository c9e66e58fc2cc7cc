//! Chat request errors

use std::time::Duration;
use thiserror::Error;

use crate::providers::ProviderError;

/// Errors that end a chat request
///
/// Per-server connection problems never show up here; they become failed
/// tool results or missing tools instead.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The model stream failed
    #[error("model stream failed: {0}")]
    ModelStream(#[from] ProviderError),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    /// The caller stopped reading the response
    #[error("caller disconnected")]
    Disconnected,
}

pub type ChatResult<T> = Result<T, ChatError>;
