//! Bearer token sources
//!
//! Acquiring tokens is left to the caller. This module only defines the seam
//! the request pipeline pulls tokens through, plus a caching wrapper.

use super::error::{ArmResult, TransportError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for management-plane access
pub const DEFAULT_SCOPES: &[&str] = &["https://management.azure.com/.default"];

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Environment variable read by [`EnvironmentCredential`]
pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    /// `None` means the token never expires as far as the client knows
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_in(token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() + TOKEN_EXPIRY_BUFFER < at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the token itself
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[&str]) -> ArmResult<AccessToken>;
}

/// A fixed, caller-supplied token.
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[&str]) -> ArmResult<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Token taken from `ARM_ACCESS_TOKEN` each time one is needed.
#[derive(Clone, Copy, Default)]
pub struct EnvironmentCredential;

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    async fn get_token(&self, _scopes: &[&str]) -> ArmResult<AccessToken> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(AccessToken::new(token.trim())),
            _ => Err(TransportError::Credential(format!("{} is not set", ACCESS_TOKEN_ENV)).into()),
        }
    }
}

/// Caches the token of an inner credential until shortly before it expires.
#[derive(Clone)]
pub struct CachedCredential {
    inner: Arc<dyn TokenCredential>,
    cache: Arc<RwLock<Option<AccessToken>>>,
}

impl CachedCredential {
    pub fn new(inner: Arc<dyn TokenCredential>) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Drop the cached token so the next request fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[async_trait]
impl TokenCredential for CachedCredential {
    async fn get_token(&self, scopes: &[&str]) -> ArmResult<AccessToken> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self.inner.get_token(scopes).await?;
        *self.cache.write().await = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        ttl: Duration,
    }

    #[async_trait]
    impl TokenCredential for Counting {
        async fn get_token(&self, _scopes: &[&str]) -> ArmResult<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::expiring_in(format!("token-{}", n), self.ttl))
        }
    }

    #[tokio::test]
    async fn test_cached_credential_reuses_valid_token() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            ttl: Duration::from_secs(3600),
        });
        let cached = CachedCredential::new(inner.clone());

        let a = cached.get_token(DEFAULT_SCOPES).await.unwrap();
        let b = cached.get_token(DEFAULT_SCOPES).await.unwrap();
        assert_eq!(a.token, b.token);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        cached.invalidate().await;
        let c = cached.get_token(DEFAULT_SCOPES).await.unwrap();
        assert_eq!(c.token, "token-1");
    }

    #[tokio::test]
    async fn test_cached_credential_refreshes_near_expiry() {
        // TTL inside the expiry buffer is never considered valid
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            ttl: Duration::from_secs(30),
        });
        let cached = CachedCredential::new(inner.clone());
        cached.get_token(DEFAULT_SCOPES).await.unwrap();
        cached.get_token(DEFAULT_SCOPES).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_hides_token() {
        let token = AccessToken::new("secret");
        assert!(!format!("{:?}", token).contains("secret"));
    }
}
