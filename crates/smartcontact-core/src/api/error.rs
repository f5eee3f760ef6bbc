use reqwest::StatusCode;
use thiserror::Error;
use validator::ValidationErrors;

use crate::forms::first_error;

/// User-facing text for an unreachable backend
pub const UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the server. Please check if the backend is running.";

/// Every failure the API client can report.
///
/// Transport library errors never leave the client un-normalized; UI code
/// matches on these variants only.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", first_error(.0).unwrap_or_else(|| "Invalid form data".to_string()))]
    Validation(#[from] ValidationErrors),

    #[error("Unable to connect to the server. Please check if the backend is running.")]
    Unreachable(#[source] reqwest::Error),

    #[error("Unauthorized - session is no longer valid")]
    Unauthorized { message: Option<String> },

    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Backend { status: u16, message: Option<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log output
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

    /// The `message` field of a JSON error body, if there is one.
    pub(crate) fn backend_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::backend_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { message },
            code => ApiError::Backend {
                status: code,
                message,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Text to show the user, falling back to `fallback` when the backend
    /// gave nothing better.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation(errors) => {
                first_error(errors).unwrap_or_else(|| fallback.to_string())
            }
            ApiError::Unreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            ApiError::Unauthorized { message } | ApiError::Backend { message, .. } => {
                message.clone().unwrap_or_else(|| fallback.to_string())
            }
            ApiError::InvalidResponse(_) => fallback.to_string(),
        }
    }
}
