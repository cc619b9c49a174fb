//! Error taxonomy shared by the gateway, the endpoint wrappers, and the
//! session context.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses are classified once, in [`ApiError::from_status`]:
//! 401 is an authentication failure, other 4xx are validation rejections
//! carrying the backend message, 5xx are server faults. Transport failures
//! never mutate session state.

use serde_json::Value;

/// Errors produced by backend calls and session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request could not reach the backend.
    #[error("network request failed: {0}")]
    Network(String),

    /// The backend rejected the credentials, or the session could not be renewed.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The backend rejected the request (4xx other than 401).
    #[error("request rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    /// The backend failed while handling the request (5xx).
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Login succeeded but the user profile could not be fetched.
    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),

    /// A response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// A header value (usually a token) contained invalid characters.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Classify a non-success HTTP status and its body.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = backend_message(body).unwrap_or_else(|| default_message(status));
        match status {
            401 => Self::Authentication { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Validation { status, message },
        }
    }

    /// Build a client-side validation error that never reached the backend.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Validation { status: 400, message: message.into() }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Authentication { .. } => "E_AUTHENTICATION",
            Self::Validation { .. } => "E_VALIDATION",
            Self::Server { .. } => "E_SERVER",
            Self::ProfileFetch(_) => "E_PROFILE_FETCH",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidHeader(_) => "E_INVALID_HEADER",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether repeating the same call later could reasonably succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }

    /// The message suitable for a user-facing notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Authentication { message } | Self::Validation { message, .. } | Self::Server { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Pull a human-readable message out of a backend error body.
///
/// Accepts `{"message": ...}` and the wrapped `{"error": {"message": ...}}`
/// shape; falls back to the raw body when it is short plain text.
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value
            .get("message")
            .or_else(|| value.get("error").and_then(|e| e.get("message")))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        Err(_) if trimmed.len() <= 200 && !trimmed.starts_with('<') => Some(trimmed.to_owned()),
        Err(_) => None,
    }
}

fn default_message(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), ToOwned::to_owned)
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
