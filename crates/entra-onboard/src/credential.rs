//! `OAuth2` client-credentials authentication against Entra ID.

use std::fmt;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::{OnboardError, OnboardResult};

/// Source of bearer tokens for a set of scopes.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Returns an access token valid for `scopes`, minting one if needed.
    async fn get_token(&self, scopes: &[String]) -> OnboardResult<String>;
}

/// OAuth2 token response from the identity provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    #[serde(default)]
    token_type: Option<String>,
}

/// OAuth2 error response (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Cached OAuth2 access token.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    scope: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the grace period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Options for [`ClientSecretCredential`].
#[derive(Debug, Clone)]
pub struct ClientSecretCredentialOptions {
    /// Identity provider base URL, e.g. `https://login.microsoftonline.com`.
    pub authority_host: Url,
    /// Deadline for each token request.
    pub timeout: StdDuration,
}

impl ClientSecretCredentialOptions {
    #[must_use]
    pub fn new(authority_host: Url) -> Self {
        Self {
            authority_host,
            timeout: StdDuration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Credential that authenticates an application with its client id and secret.
///
/// Tokens are cached in memory for the lifetime of the credential and
/// refreshed shortly before they expire. Nothing is persisted.
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
    authority_host: Url,
    http_client: reqwest::Client,
    cached_token: RwLock<Option<CachedToken>>,
    /// Grace period before expiry to trigger refresh (default: 5 minutes).
    grace_period: Duration,
}

impl ClientSecretCredential {
    /// Creates a credential after validating its inputs.
    ///
    /// # Errors
    ///
    /// Returns `OnboardError::Credential` if the tenant id, client id or
    /// secret is malformed, the authority host is not an http(s) URL, or the
    /// HTTP client cannot be built.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        options: ClientSecretCredentialOptions,
    ) -> OnboardResult<Self> {
        let tenant_id = tenant_id.into();
        let client_id = client_id.into();

        validate_tenant_id(&tenant_id)?;

        if client_id.trim().is_empty() {
            return Err(OnboardError::Credential("client id must not be empty".into()));
        }

        if client_secret.expose_secret().is_empty() {
            return Err(OnboardError::Credential(
                "client secret must not be empty".into(),
            ));
        }

        if !matches!(options.authority_host.scheme(), "http" | "https")
            || options.authority_host.host_str().is_none()
        {
            return Err(OnboardError::Credential(format!(
                "authority host must be an absolute http(s) URL, got '{}'",
                options.authority_host
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| OnboardError::Credential(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            authority_host: options.authority_host,
            http_client,
            cached_token: RwLock::new(None),
            grace_period: Duration::minutes(5),
        })
    }

    /// Tenant this credential authenticates against.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Application (client) id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Token endpoint for the client-credentials grant.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.as_str().trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Invalidates the cached token, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }

    /// Acquires a new access token using client credentials flow.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    async fn acquire_token(&self, scope: &str) -> OnboardResult<CachedToken> {
        let token_url = self.token_url();

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| OnboardError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{error}: {description}"),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => body,
            };
            return Err(OnboardError::Auth(format!(
                "Token request failed with status {status}: {detail}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| OnboardError::Auth(format!("Failed to parse token response: {e}")))?;

        let expires_at = Duration::try_seconds(token_response.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                OnboardError::Auth(format!(
                    "Token response has invalid expires_in: {}",
                    token_response.expires_in
                ))
            })?;

        debug!(
            "Acquired new token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedToken {
            access_token: token_response.access_token,
            scope: scope.to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    /// Gets a valid access token, refreshing if necessary.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    async fn get_token(&self, scopes: &[String]) -> OnboardResult<String> {
        let scope = scopes.join(" ");
        if scope.trim().is_empty() {
            return Err(OnboardError::Auth(
                "at least one scope is required to request a token".into(),
            ));
        }

        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if token.scope == scope && !token.is_expired(self.grace_period) {
                    debug!("Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Requesting access token");
        let new_token = self.acquire_token(&scope).await?;

        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authority_host", &self.authority_host.as_str())
            .finish_non_exhaustive()
    }
}

/// Tenant ids are GUIDs or verified domain names.
fn validate_tenant_id(tenant_id: &str) -> OnboardResult<()> {
    if tenant_id.is_empty() {
        return Err(OnboardError::Credential("tenant id must not be empty".into()));
    }

    if let Some(bad) = tenant_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
    {
        return Err(OnboardError::Credential(format!(
            "invalid tenant id '{tenant_id}': unexpected character '{bad}' \
             (only alphanumerics, '-' and '.' are allowed)"
        )));
    }

    Ok(())
}
