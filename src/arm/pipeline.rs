//! Request pipeline
//!
//! Every request runs through the per-call policies, gets a bearer token,
//! runs through the per-retry policies and is then handed to the transport.
//! The pipeline makes exactly one attempt; non-2xx answers become
//! [`TransportError::Status`] carrying the parsed service error.

use super::credential::{TokenCredential, DEFAULT_SCOPES};
use super::error::{ArmResult, ServiceError, TransportError};
use super::http::{sanitize_for_log, ArmRequest, HttpTransport, RawResponse};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use std::fmt;
use std::sync::Arc;

pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Mutates a request before it is sent.
pub trait RequestPolicy: Send + Sync + fmt::Debug {
    fn apply(&self, request: &mut ArmRequest) -> ArmResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyPosition {
    /// Once per logical call, before authentication
    PerCall,
    /// Right before each transport attempt
    PerRetry,
}

/// Sets a fixed header on every request.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderPolicy {
    pub fn new(name: &str, value: &str) -> ArmResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header value: {}", e)))?;
        Ok(Self { name, value })
    }
}

impl RequestPolicy for HeaderPolicy {
    fn apply(&self, request: &mut ArmRequest) -> ArmResult<()> {
        request.headers.insert(self.name.clone(), self.value.clone());
        Ok(())
    }
}

/// Tags each request with a fresh `x-ms-client-request-id` unless the
/// caller already set one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientRequestIdPolicy;

impl RequestPolicy for ClientRequestIdPolicy {
    fn apply(&self, request: &mut ArmRequest) -> ArmResult<()> {
        if !request.headers.contains_key(CLIENT_REQUEST_ID_HEADER) {
            let id = uuid::Uuid::new_v4().to_string();
            let value = HeaderValue::from_str(&id)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            request
                .headers
                .insert(HeaderName::from_static(CLIENT_REQUEST_ID_HEADER), value);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Pipeline {
    transport: Arc<dyn HttpTransport>,
    credential: Option<Arc<dyn TokenCredential>>,
    scopes: Vec<String>,
    per_call: Vec<Arc<dyn RequestPolicy>>,
    per_retry: Vec<Arc<dyn RequestPolicy>>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            credential: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            per_call: vec![Arc::new(ClientRequestIdPolicy)],
            per_retry: Vec::new(),
        }
    }

    pub fn with_credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_policy(mut self, position: PolicyPosition, policy: Arc<dyn RequestPolicy>) -> Self {
        match position {
            PolicyPosition::PerCall => self.per_call.push(policy),
            PolicyPosition::PerRetry => self.per_retry.push(policy),
        }
        self
    }

    pub async fn send(&self, mut request: ArmRequest) -> ArmResult<RawResponse> {
        for policy in &self.per_call {
            policy.apply(&mut request)?;
        }

        if let Some(credential) = &self.credential {
            let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
            let token = credential.get_token(&scopes).await?;
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token))
                .map_err(|e| TransportError::Credential(e.to_string()))?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }

        for policy in &self.per_retry {
            policy.apply(&mut request)?;
        }

        let method = request.method.clone();
        let url = request.url.clone();
        tracing::debug!("{} {}", method, url);

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                "API error: {} {} - {} - {}",
                method,
                url,
                response.status,
                sanitize_for_log(&response.body.to_string())
            );
            return Err(TransportError::Status {
                status: response.status,
                error: ServiceError::from_body(&response.body),
            }
            .into());
        }

        Ok(response)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("authenticated", &self.credential.is_some())
            .field("scopes", &self.scopes)
            .field("per_call", &self.per_call)
            .field("per_retry", &self.per_retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::credential::StaticTokenCredential;
    use crate::arm::error::ArmError;
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use url::Url;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<ArmRequest>>,
        reply: Mutex<Option<RawResponse>>,
    }

    #[async_trait]
    impl HttpTransport for Recording {
        async fn send(&self, request: ArmRequest) -> ArmResult<RawResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(self
                .reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| RawResponse::new(200, Value::Null)))
        }
    }

    fn request() -> ArmRequest {
        ArmRequest::new(Method::GET, Url::parse("https://example.test/x").unwrap())
    }

    #[tokio::test]
    async fn test_policies_and_token_are_applied() {
        let transport = Arc::new(Recording::default());
        let pipeline = Pipeline::new(transport.clone())
            .with_credential(Arc::new(StaticTokenCredential::new("abc")))
            .with_policy(
                PolicyPosition::PerRetry,
                Arc::new(HeaderPolicy::new("x-custom", "1").unwrap()),
            );

        pipeline.send(request()).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        let headers = &seen[0].headers;
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.get("x-custom").unwrap(), "1");
        assert!(headers.contains_key(CLIENT_REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_client_request_id_kept_when_present() {
        let mut req = request();
        req.headers
            .insert(CLIENT_REQUEST_ID_HEADER, HeaderValue::from_static("fixed"));
        ClientRequestIdPolicy.apply(&mut req).unwrap();
        assert_eq!(req.headers.get(CLIENT_REQUEST_ID_HEADER).unwrap(), "fixed");
    }

    #[tokio::test]
    async fn test_error_status_becomes_transport_error() {
        let transport = Arc::new(Recording::default());
        *transport.reply.lock().unwrap() = Some(RawResponse::new(
            409,
            json!({"error": {"code": "Conflict", "message": "busy"}}),
        ));
        let pipeline = Pipeline::new(transport);

        let err = pipeline.send(request()).await.unwrap_err();
        match err {
            ArmError::Transport(TransportError::Status { status, error }) => {
                assert_eq!(status, 409);
                assert_eq!(error.unwrap().code, "Conflict");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_header_policy_rejects_bad_name() {
        assert!(HeaderPolicy::new("bad header", "v").is_err());
    }
}
