use serde_json::Value;
use thiserror::Error;

use orgkit_auth::AuthError;

/// Failure talking to a management API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-success HTTP status (or an in-memory equivalent).
    #[error("{message} (HTTP {status})")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("no access token: {0}")]
    Auth(#[from] AuthError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl core::fmt::Display) -> Self {
        Self::status(404, "not_found", format!("{what} not found"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::status(409, "conflict", message)
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::status(400, code, message)
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// Build a status error from an error response body.
    ///
    /// Understands both `{ "error", "message" }` and problem+json
    /// (`{ "type", "title", "detail" }`); anything else is kept verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let field = |names: &[&str]| -> Option<String> {
            let obj = parsed.as_ref()?.as_object()?;
            names
                .iter()
                .find_map(|n| obj.get(*n).and_then(Value::as_str))
                .map(str::to_string)
        };

        let code = field(&["error", "code", "type"]).unwrap_or_else(|| "http_error".to_string());
        let message = field(&["detail", "message", "error_description", "title"])
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| format!("request failed with status {status}"));

        Self::status(status, code, message)
    }
}
