use reqwest::StatusCode;
use thiserror::Error;

use super::response::ApiResponse;

/// Why the session ended and can no longer be recovered silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    RefreshTokenExpired,
    InvalidRefreshToken,
    MissingRefreshToken,
    /// The request was still unauthorized after a successful refresh.
    RetryRejected,
    /// Another request tore the session down while this one waited.
    SessionCleared,
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SessionEndReason::RefreshTokenExpired => "refresh token has expired",
            SessionEndReason::InvalidRefreshToken => "refresh token is invalid",
            SessionEndReason::MissingRefreshToken => "no refresh token was presented",
            SessionEndReason::RetryRejected => "request was rejected again after refresh",
            SessionEndReason::SessionCleared => "session was cleared",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Session expired: {0}")]
    SessionExpired(SessionEndReason),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Request rejected ({status}): {message}")]
    Validation {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Server error ({status}): {body}")]
    ServerError { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a non-2xx response. 4xx answers carrying a structured
    /// `{ code, message }` payload become `Validation`; everything else is
    /// a `ServerError` with the (truncated) body.
    pub fn from_response(response: &ApiResponse) -> Self {
        let status = response.status();
        if status.is_client_error() {
            if let Some(payload) = response.error_payload() {
                if let Some(message) = payload.message.filter(|m| !m.is_empty()) {
                    return ApiError::Validation {
                        status,
                        code: payload.code,
                        message,
                    };
                }
            }
        }
        ApiError::ServerError {
            status,
            body: Self::truncate_body(&response.text()),
        }
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        ApiError::Storage(format!("{:#}", err))
    }

    /// True when the UI should send the user back to the login screen.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }
}
