//! Per-server connection errors

use std::time::Duration;
use thiserror::Error;

/// A failure scoped to one tool server
///
/// Every variant carries the server id so that callers can turn it into
/// status or partial-result data without losing attribution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("[{server}] connection failed: {message}")]
    Connect { server: String, message: String },

    #[error("[{server}] {operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        server: String,
        operation: &'static str,
        after: Duration,
    },

    #[error("[{server}] failed to list tools: {message}")]
    Manifest { server: String, message: String },

    #[error("[{server}] malformed manifest: {message}")]
    MalformedManifest { server: String, message: String },

    #[error("[{server}] call to '{tool}' failed: {message}")]
    Invoke {
        server: String,
        tool: String,
        message: String,
    },

    #[error("[{server}] connection is closed")]
    Closed { server: String },
}

impl ConnectionError {
    /// Id of the server this error belongs to
    pub fn server(&self) -> &str {
        match self {
            Self::Connect { server, .. }
            | Self::Timeout { server, .. }
            | Self::Manifest { server, .. }
            | Self::MalformedManifest { server, .. }
            | Self::Invoke { server, .. }
            | Self::Closed { server } => server,
        }
    }

    pub fn connect(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            server: server.into(),
            message: message.into(),
        }
    }

    pub fn timeout(server: impl Into<String>, operation: &'static str, after: Duration) -> Self {
        Self::Timeout {
            server: server.into(),
            operation,
            after,
        }
    }
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_server() {
        let err = ConnectionError::connect("math", "connection refused");
        assert_eq!(err.server(), "math");
        assert_eq!(err.to_string(), "[math] connection failed: connection refused");

        let err = ConnectionError::timeout("clock", "connect", Duration::from_millis(250));
        assert_eq!(err.to_string(), "[clock] connect timed out after 250ms");
    }
}
