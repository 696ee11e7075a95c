//! HTTP transport for management-plane REST calls

use super::blocking;
use super::error::{ArmError, ArmResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const USER_AGENT: &str = concat!("armkit/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// One outgoing request, before policies and authentication are applied.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ArmRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status, headers and decoded JSON body of a service response.
/// An empty body decodes to `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-suggested delay before the next poll.
    ///
    /// Millisecond headers win over `Retry-After`, which may hold either
    /// delta-seconds or an HTTP date.
    pub fn retry_after(&self) -> Option<Duration> {
        for name in ["retry-after-ms", "x-ms-retry-after-ms"] {
            if let Some(ms) = self.header(name).and_then(|v| v.trim().parse::<u64>().ok()) {
                return Some(Duration::from_millis(ms));
            }
        }

        let value = self.header("retry-after")?.trim();
        if let Ok(secs) = value.parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }
        let at = DateTime::parse_from_rfc2822(value).ok()?;
        let delta = at.with_timezone(&Utc) - Utc::now();
        Some(delta.to_std().unwrap_or(Duration::ZERO))
    }
}

/// Sends one request and returns whatever the service answered, including
/// error statuses. Status handling belongs to the pipeline.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ArmRequest) -> ArmResult<RawResponse>;
}

type ClientFactory = Arc<dyn Fn() -> reqwest::Result<Client> + Send + Sync>;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Clients used by blocking calls on this thread, keyed by transport id.
    static BLOCKING_CLIENTS: RefCell<HashMap<u64, Client>> = RefCell::new(HashMap::new());
}

fn default_client() -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// `reqwest`-backed transport
///
/// Async callers share one connection pool. Blocking calls get a client per
/// thread from the factory: pooled connections are driven by the runtime
/// that opened them, and a blocking thread's runtime is idle between calls.
#[derive(Clone)]
pub struct ReqwestTransport {
    id: u64,
    client: Client,
    factory: ClientFactory,
}

impl ReqwestTransport {
    pub fn new() -> ArmResult<Self> {
        Self::with_factory(default_client)
    }

    /// Transport whose clients, shared and per blocking thread, come from `factory`.
    pub fn with_factory(
        factory: impl Fn() -> reqwest::Result<Client> + Send + Sync + 'static,
    ) -> ArmResult<Self> {
        let client = factory()?;
        Ok(Self {
            id: NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed),
            client,
            factory: Arc::new(factory),
        })
    }

    /// Use `client` for async calls. Blocking calls build default clients.
    pub fn with_client(client: Client) -> Self {
        Self {
            id: NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed),
            client,
            factory: Arc::new(default_client),
        }
    }

    fn client(&self) -> ArmResult<Client> {
        if !blocking::in_blocking_call() {
            return Ok(self.client.clone());
        }
        BLOCKING_CLIENTS.with(|clients| {
            if let Some(client) = clients.borrow().get(&self.id) {
                return Ok(client.clone());
            }
            let client = (self.factory)()?;
            tracing::debug!(
                "Created HTTP client {} for blocking calls on {:?}",
                self.id,
                std::thread::current().id()
            );
            clients.borrow_mut().insert(self.id, client.clone());
            Ok(client)
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ArmRequest) -> ArmResult<RawResponse> {
        let mut builder = self
            .client()?
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;
        let body = decode_body(status, &text)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Success bodies must be JSON. Error bodies that are not JSON are kept as a
/// string so they can still be logged.
fn decode_body(status: u16, text: &str) -> ArmResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(e) if (200..300).contains(&status) => Err(e.into()),
        Err(_) => Ok(Value::String(text.to_string())),
    }
}

/// Format an error for display
/// Security: avoids echoing raw service payloads to end users
pub fn format_arm_error(error: &ArmError) -> String {
    match error {
        ArmError::MalformedIdentifier { .. }
        | ArmError::ResourceTypeMismatch { .. }
        | ArmError::UnsupportedResourceType(_)
        | ArmError::Configuration(_)
        | ArmError::OperationCanceled => return error.to_string(),
        ArmError::OperationFailed { error } => {
            return format!("Operation failed ({}).", error.code);
        }
        ArmError::Transport(_) => {}
    }

    match error.status() {
        Some(401) => "Authentication failed. Check ARM_ACCESS_TOKEN.".to_string(),
        Some(403) => "Permission denied. Check your role assignments.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(503) => "Service temporarily unavailable. Please try again.".to_string(),
        _ => {
            let error_str = error.to_string();
            let sanitized = error_str
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(80)
                .collect::<String>();

            if sanitized.len() < error_str.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::error::{ServiceError, TransportError};

    #[test]
    fn test_blocking_client_cache_is_keyed_per_transport() {
        let a = ReqwestTransport::new().unwrap();
        let b = ReqwestTransport::new().unwrap();
        assert_eq!(a.clone().id, a.id);
        assert_ne!(a.id, b.id);
    }
    use serde_json::json;

    #[test]
    fn test_sanitize_truncates() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.starts_with(&"x".repeat(200)));
        assert!(out.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    #[test]
    fn test_retry_after_seconds_and_ms() {
        let r = RawResponse::new(202, Value::Null).with_header("Retry-After", "7");
        assert_eq!(r.retry_after(), Some(Duration::from_secs(7)));

        let r = r.with_header("retry-after-ms", "250");
        assert_eq!(r.retry_after(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_retry_after_http_date_in_past() {
        let r = RawResponse::new(202, Value::Null)
            .with_header("Retry-After", "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(r.retry_after(), Some(Duration::ZERO));
    }

    #[test]
    fn test_retry_after_absent_or_garbage() {
        assert!(RawResponse::new(200, Value::Null).retry_after().is_none());
        let r = RawResponse::new(202, Value::Null).with_header("Retry-After", "soon");
        assert!(r.retry_after().is_none());
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(204, "").unwrap(), Value::Null);
        assert_eq!(decode_body(200, "{\"a\":1}").unwrap(), json!({"a": 1}));
        assert!(decode_body(200, "<html>").is_err());
        assert_eq!(decode_body(502, "Bad Gateway").unwrap(), json!("Bad Gateway"));
    }

    #[test]
    fn test_format_arm_error() {
        let err: ArmError = TransportError::Status {
            status: 403,
            error: Some(ServiceError::new("AuthorizationFailed", "no")),
        }
        .into();
        assert_eq!(format_arm_error(&err), "Permission denied. Check your role assignments.");

        let err = ArmError::OperationFailed {
            error: ServiceError::new("QuotaExceeded", "too many cores"),
        };
        assert_eq!(format_arm_error(&err), "Operation failed (QuotaExceeded).");
    }
}
