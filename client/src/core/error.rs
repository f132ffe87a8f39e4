//! # Common Error Types
//!
//! Consolidated error handling for the client core.
//!
//! Two layers are kept apart on purpose:
//!
//! - [`RemoteError`] is the normalized shape of a failure payload coming back from the
//!   remote service. The service may answer with a bare string or with a structured
//!   JSON body; both are folded into this tagged union before any pattern matching.
//! - [`AppError`] is the client-wide error type returned by operations that are not a
//!   single remote call (configuration, transport setup, session transitions).
//!
//! ## Error Categories
//!
//! - **Remote**: a remote procedure or provider rejected the call
//! - **Validation**: input rejected locally, before any remote call
//! - **Session**: no session / invalid session transition
//! - **Config**: invalid configuration values
//! - **Transport**: HTTP or WebSocket plumbing failures
//!
//! ## Usage Pattern
//!
//! ```rust
//! use client::core::error::{AppError, RemoteError};
//!
//! let err: RemoteError = serde_json::json!({
//!     "message": "insufficient funds",
//!     "code": "P0001"
//! }).into();
//!
//! assert_eq!(err.message(), "insufficient funds");
//! assert_eq!(err.code(), Some("P0001"));
//!
//! let app_err = AppError::from(err);
//! assert_eq!(app_err.to_string(), "Remote error: insufficient funds");
//! ```

use serde_json::Value;
use shared::ErrorResponse;
use thiserror::Error;

/// Failure payload returned by a remote collaborator.
///
/// # Example
///
/// ```rust
/// use client::core::error::RemoteError;
///
/// let plain = RemoteError::from("Network request failed");
/// assert_eq!(plain.message(), "Network request failed");
/// assert!(plain.code().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service answered with a bare string.
    #[error("{0}")]
    Text(String),

    /// The service answered with a structured body.
    #[error("{message}")]
    Structured {
        message: String,
        code: Option<String>,
    },
}

impl RemoteError {
    /// Bare-string failure.
    pub fn text(message: impl Into<String>) -> Self {
        RemoteError::Text(message.into())
    }

    /// Structured failure with an optional machine code.
    pub fn structured(message: impl Into<String>, code: Option<String>) -> Self {
        RemoteError::Structured {
            message: message.into(),
            code,
        }
    }

    /// The human-readable part of the payload.
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Text(message) => message,
            RemoteError::Structured { message, .. } => message,
        }
    }

    /// The machine code, when the service sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Text(_) => None,
            RemoteError::Structured { code, .. } => code.as_deref(),
        }
    }
}

impl From<String> for RemoteError {
    fn from(message: String) -> Self {
        RemoteError::Text(message)
    }
}

impl From<&str> for RemoteError {
    fn from(message: &str) -> Self {
        RemoteError::Text(message.to_string())
    }
}

impl From<ErrorResponse> for RemoteError {
    fn from(body: ErrorResponse) -> Self {
        RemoteError::Structured {
            message: body.message,
            code: body.code,
        }
    }
}

impl From<Value> for RemoteError {
    fn from(value: Value) -> Self {
        match value {
            Value::String(message) => RemoteError::Text(message),
            Value::Object(ref map) => {
                let message = ["message", "error", "msg", "error_description"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str));

                match message {
                    Some(message) => {
                        let code = map.get("code").and_then(|code| match code {
                            Value::String(code) => Some(code.clone()),
                            Value::Number(code) => Some(code.to_string()),
                            _ => None,
                        });
                        RemoteError::Structured {
                            message: message.to_string(),
                            code,
                        }
                    }
                    None => RemoteError::Text(value.to_string()),
                }
            }
            other => RemoteError::Text(other.to_string()),
        }
    }
}

/// Anything that can be shown to the sanitizer without giving up ownership.
///
/// Tracked operations keep their own error type so callers can still branch on it;
/// this trait only lends a normalized view of the payload.
pub trait ErrorPayload {
    fn to_remote_error(&self) -> RemoteError;
}

impl ErrorPayload for RemoteError {
    fn to_remote_error(&self) -> RemoteError {
        self.clone()
    }
}

impl ErrorPayload for AppError {
    fn to_remote_error(&self) -> RemoteError {
        match self {
            AppError::Remote(err) => err.clone(),
            other => RemoteError::Text(other.to_string()),
        }
    }
}

impl ErrorPayload for String {
    fn to_remote_error(&self) -> RemoteError {
        RemoteError::Text(self.clone())
    }
}

impl ErrorPayload for &str {
    fn to_remote_error(&self) -> RemoteError {
        RemoteError::Text((*self).to_string())
    }
}

impl ErrorPayload for Value {
    fn to_remote_error(&self) -> RemoteError {
        RemoteError::from(self.clone())
    }
}

/// Client-wide error type.
///
/// # Example
///
/// ```rust
/// use client::core::error::AppError;
///
/// let err = AppError::Validation("Amount must be positive".to_string());
/// assert_eq!(err.to_string(), "Validation error: Amount must be positive");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// A remote procedure or provider rejected the call.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Input rejected locally before any remote call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Session-related failure (no active session, invalid transition).
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP / WebSocket plumbing failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_string_becomes_text() {
        let err = RemoteError::from(json!("JWT expired"));
        assert_eq!(err, RemoteError::text("JWT expired"));
    }

    #[test]
    fn test_value_object_becomes_structured() {
        let err = RemoteError::from(json!({"message": "duplicate key", "code": 23505}));
        assert_eq!(err.message(), "duplicate key");
        assert_eq!(err.code(), Some("23505"));
    }

    #[test]
    fn test_value_object_without_message_is_kept_as_text() {
        let err = RemoteError::from(json!({"status": 500}));
        assert_eq!(err.message(), r#"{"status":500}"#);
        assert!(err.code().is_none());
    }

    #[test]
    fn test_error_response_conversion() {
        let body = ErrorResponse {
            message: "Invalid login credentials".to_string(),
            code: Some("400".to_string()),
            details: Some("auth.users".to_string()),
            hint: None,
        };
        let err = RemoteError::from(body);
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(err.code(), Some("400"));
    }

    #[test]
    fn test_payload_of_app_error() {
        let remote = AppError::Remote(RemoteError::text("row level security"));
        assert_eq!(remote.to_remote_error().message(), "row level security");

        let validation = AppError::Validation("bad amount".to_string());
        assert_eq!(
            validation.to_remote_error().message(),
            "Validation error: bad amount"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AppError::Session("no active session".to_string()).to_string(),
            "Session error: no active session"
        );
        assert_eq!(RemoteError::structured("boom", None).to_string(), "boom");
    }
}
