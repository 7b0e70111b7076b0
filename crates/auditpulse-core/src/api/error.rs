//! Uniform error for every API call.

use serde::Deserialize;
use serde_json::Value;

pub type ApiResult<T> = Result<T, ApiError>;

/// A failed API call, carrying a message ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    status: Option<u16>,
    message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Builds the error for a non-2xx response from its raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = parse_error_message(body)
            .unwrap_or_else(|| format!("Request failed with status {status}"));
        Self::new(Some(status), message)
    }

    /// The request never produced an HTTP status (connect, TLS, body read).
    pub fn transport(err: &reqwest::Error) -> Self {
        Self::new(None, format!("Request failed: {}", root_cause(err)))
    }

    /// A successful response whose body did not match the expected shape.
    pub fn decode(status: u16, detail: impl std::fmt::Display) -> Self {
        Self::new(Some(status), format!("Failed to decode response: {detail}"))
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Missing, expired, or rejected credentials. Fatal to the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }

    /// Validation or business-rule rejection that the initiating form should show.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status, Some(400..=499)) && !self.is_auth_failure()
    }

    /// The backend could not be reached at all.
    pub fn is_transport(&self) -> bool {
        self.status.is_none()
    }
}

#[derive(Deserialize)]
struct ValidationItem {
    msg: String,
}

/// Extracts a human-readable message from a JSON error envelope.
///
/// Accepts `{"detail": "..."}`, `{"message": "..."}`, and validation lists
/// `{"detail": [{"msg": "..."}]}`.
pub(crate) fn parse_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let envelope = value.as_object()?;

    let message = match envelope.get("detail") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(list @ Value::Array(_)) => {
            let items: Vec<ValidationItem> = serde_json::from_value(list.clone()).ok()?;
            let joined = items
                .into_iter()
                .map(|item| item.msg)
                .collect::<Vec<_>>()
                .join("; ");
            Some(joined)
        }
        _ => envelope
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }?;

    let trimmed = message.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn root_cause(err: &reqwest::Error) -> String {
    let mut source: &dyn std::error::Error = err;
    while let Some(next) = source.source() {
        source = next;
    }
    source.to_string()
}
