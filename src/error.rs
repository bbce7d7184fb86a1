// Error types for snapdeck.
// Classifies photo API failures and wraps process-level errors.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The outcome class of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Forbidden,
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "Not found",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Transport => "Transport error",
        };
        f.write_str(label)
    }
}

/// A transport failure mapped onto the outcome the caller acts on.
///
/// Cloneable so one failed read can be handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// HTTP status of the response, if one was received.
    pub status: Option<u16>,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, Some(403), message)
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, status, message)
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let kind = match status {
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            _ => ErrorKind::Transport,
        };
        let message = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body)
        };
        Self::new(kind, Some(status.as_u16()), message)
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<reqwest::Error> for ClassifiedError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ClassifiedError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_kinds() {
        let cases = [
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized),
            (StatusCode::FORBIDDEN, ErrorKind::Forbidden),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Transport),
            (StatusCode::BAD_REQUEST, ErrorKind::Transport),
        ];

        for (status, kind) in cases {
            let err = ClassifiedError::from_status(status, "");
            assert_eq!(err.kind, kind, "status {}", status);
            assert_eq!(err.status, Some(status.as_u16()));
        }
    }

    #[test]
    fn test_display_includes_body() {
        let err = ClassifiedError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            err.to_string(),
            "Transport error: HTTP 502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn test_app_error_is_transparent_over_classified() {
        let err: AppError = ClassifiedError::forbidden("no access").into();
        assert_eq!(err.to_string(), "Forbidden: no access");
    }
}
