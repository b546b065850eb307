//! # Error Types
//!
//! Custom error types for Racemap Logger using `thiserror`.

use thiserror::Error;

/// Main error type for Racemap Logger
#[derive(Debug, Error)]
pub enum RacemapLoggerError {
    /// Tracker API answered with something other than 200 OK
    #[error("got response code {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Connect or read timeout against the tracker API
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other network-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not valid JSON
    #[error("encountered malformed json: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Valid JSON, but not the document layout we expect
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Configuration value out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RacemapLoggerError {
    /// Whether another fetch attempt within the same cycle may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. } | Self::Timeout(_) | Self::Transport(_) | Self::MalformedJson(_)
        )
    }
}

impl From<reqwest::Error> for RacemapLoggerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result type alias for Racemap Logger
pub type Result<T> = std::result::Result<T, RacemapLoggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        let status = RacemapLoggerError::HttpStatus { status: 502, body: String::new() };
        assert!(status.is_retryable());
        assert!(RacemapLoggerError::Timeout("connect".into()).is_retryable());
        assert!(RacemapLoggerError::Transport("reset".into()).is_retryable());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(RacemapLoggerError::from(json_err).is_retryable());
    }

    #[test]
    fn test_shape_and_startup_errors_are_not_retryable() {
        assert!(!RacemapLoggerError::UnexpectedShape("no starters".into()).is_retryable());
        assert!(!RacemapLoggerError::Config("bad".into()).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!RacemapLoggerError::from(io).is_retryable());
    }

    #[test]
    fn test_http_status_message() {
        let err = RacemapLoggerError::HttpStatus { status: 503, body: "busy".into() };
        assert_eq!(err.to_string(), "got response code 503: busy");
    }
}
