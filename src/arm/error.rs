//! Error taxonomy
//!
//! Every failure surfaces to the caller with its kind and, where the service
//! produced one, the service error payload. Nothing here is retried.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error payload reported by the service (`{"error": {"code": .., "message": ..}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ServiceError>,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    /// Extract an error from a response body.
    /// Accepts both the wrapped `{"error": {...}}` shape and a bare error object.
    pub fn from_body(body: &Value) -> Option<Self> {
        let candidate = body.get("error").unwrap_or(body);
        if !candidate.is_object() {
            return None;
        }
        let parsed: ServiceError = serde_json::from_value(candidate.clone()).ok()?;
        if parsed.code.is_empty() && parsed.message.is_empty() {
            None
        } else {
            Some(parsed)
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.code, self.message),
            (false, true) => f.write_str(&self.code),
            _ => f.write_str(&self.message),
        }
    }
}

/// Failure below the operation/paging layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {}", describe(.error))]
    Status {
        status: u16,
        error: Option<ServiceError>,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("credential unavailable: {0}")]
    Credential(String),

    #[error("failed to start blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

fn describe(error: &Option<ServiceError>) -> String {
    error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no error payload".to_string())
}

impl TransportError {
    /// HTTP status of a service rejection, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors returned by every library call.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("malformed resource identifier '{input}': {reason}")]
    MalformedIdentifier { input: String, reason: String },

    #[error("'{id}' is not a valid resource of type {expected}")]
    ResourceTypeMismatch { id: String, expected: String },

    #[error("long-running operation failed: {error}")]
    OperationFailed { error: ServiceError },

    /// The caller stopped waiting. The service-side operation may still be running.
    #[error("wait for long-running operation was canceled; the operation may still be running")]
    OperationCanceled,

    #[error("no operations registered for resource type {0}")]
    UnsupportedResourceType(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type ArmResult<T> = Result<T, ArmError>;

impl ArmError {
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// The service error attached to this failure, if any.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::OperationFailed { error } => Some(error),
            Self::Transport(TransportError::Status { error, .. }) => error.as_ref(),
            _ => None,
        }
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ArmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(TransportError::Request(e))
    }
}

impl From<serde_json::Error> for ArmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(TransportError::Decode(e))
    }
}

impl From<url::ParseError> for ArmError {
    fn from(e: url::ParseError) -> Self {
        Self::Transport(TransportError::InvalidRequest(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_error_from_wrapped_body() {
        let body = json!({"error": {"code": "NotFound", "message": "gone"}});
        let err = ServiceError::from_body(&body).unwrap();
        assert_eq!(err.code, "NotFound");
        assert_eq!(err.to_string(), "NotFound: gone");
    }

    #[test]
    fn test_service_error_from_bare_body() {
        let body = json!({"code": "Conflict", "message": "busy", "details": [{"code": "Inner"}]});
        let err = ServiceError::from_body(&body).unwrap();
        assert_eq!(err.details.len(), 1);
    }

    #[test]
    fn test_service_error_absent() {
        assert!(ServiceError::from_body(&json!({"value": []})).is_none());
        assert!(ServiceError::from_body(&Value::Null).is_none());
    }

    #[test]
    fn test_status_error_display() {
        let err: ArmError = TransportError::Status {
            status: 404,
            error: Some(ServiceError::new("ResourceNotFound", "missing")),
        }
        .into();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("ResourceNotFound"));
        assert_eq!(err.service_error().unwrap().code, "ResourceNotFound");
    }
}
