//! Request authentication backed by a token credential.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::credential::TokenCredential;
use crate::{OnboardError, OnboardResult};

/// Attaches authentication to outgoing requests.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync + fmt::Debug {
    /// Authenticates `request`, returning it ready to send.
    async fn authenticate(&self, request: Request) -> OnboardResult<Request>;
}

/// Authentication provider that obtains bearer tokens from a [`TokenCredential`].
///
/// Tokens are only attached to requests whose host is in the allowed list
/// (an empty list allows every host), and only over https unless the target
/// is a loopback address.
pub struct AzureIdentityAuthenticationProvider {
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
    allowed_hosts: HashSet<String>,
}

impl AzureIdentityAuthenticationProvider {
    /// Creates a provider with explicit scopes and allowed hosts.
    ///
    /// When `scopes` is empty the scope is derived per request as
    /// `{scheme}://{host}/.default`.
    ///
    /// # Errors
    ///
    /// Returns `OnboardError::Auth` if a scope is empty or an allowed host
    /// includes a URL scheme.
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
        allowed_hosts: Vec<String>,
    ) -> OnboardResult<Self> {
        if scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(OnboardError::Auth("scopes must not be empty strings".into()));
        }

        let mut hosts = HashSet::with_capacity(allowed_hosts.len());
        for host in allowed_hosts {
            let host = host.trim().to_ascii_lowercase();
            if host.contains("://") {
                return Err(OnboardError::Auth(format!(
                    "allowed host '{host}' must not include a scheme"
                )));
            }
            if !host.is_empty() {
                hosts.insert(host);
            }
        }

        Ok(Self {
            credential,
            scopes,
            allowed_hosts: hosts,
        })
    }

    /// Creates a provider scoped to a Microsoft Graph endpoint.
    ///
    /// The scope is `{graph}/.default` and only the Graph host receives tokens.
    ///
    /// # Errors
    ///
    /// Returns `OnboardError::Auth` if the endpoint has no host, or uses plain
    /// http for a host that is not loopback.
    pub fn for_graph(credential: Arc<dyn TokenCredential>, graph_endpoint: &Url) -> OnboardResult<Self> {
        let host = graph_endpoint.host_str().ok_or_else(|| {
            OnboardError::Auth(format!("graph endpoint '{graph_endpoint}' has no host"))
        })?;

        if graph_endpoint.scheme() != "https" && !is_loopback(graph_endpoint) {
            return Err(OnboardError::Auth(format!(
                "graph endpoint '{graph_endpoint}' must use https"
            )));
        }

        Self::new(
            credential,
            vec![default_scope(graph_endpoint)],
            vec![host.to_string()],
        )
    }

    /// Scopes requested for a given target URL.
    #[must_use]
    pub fn scopes_for(&self, url: &Url) -> Vec<String> {
        if self.scopes.is_empty() {
            vec![default_scope(url)]
        } else {
            self.scopes.clone()
        }
    }

    /// Returns true if tokens may be attached to requests for `url`.
    #[must_use]
    pub fn is_host_allowed(&self, url: &Url) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        url.host_str()
            .is_some_and(|host| self.allowed_hosts.contains(&host.to_ascii_lowercase()))
    }

    /// Acquires a token for `url` without building a request.
    ///
    /// # Errors
    ///
    /// Propagates token acquisition failures from the credential.
    pub async fn token_for(&self, url: &Url) -> OnboardResult<String> {
        self.credential.get_token(&self.scopes_for(url)).await
    }
}

#[async_trait]
impl AuthenticationProvider for AzureIdentityAuthenticationProvider {
    async fn authenticate(&self, mut request: Request) -> OnboardResult<Request> {
        if request.headers().contains_key(AUTHORIZATION) {
            debug!("Request already carries an Authorization header");
            return Ok(request);
        }

        if !self.is_host_allowed(request.url()) {
            warn!(
                host = request.url().host_str().unwrap_or_default(),
                "Host not in allowed list, sending request without a token"
            );
            return Ok(request);
        }

        if request.url().scheme() != "https" && !is_loopback(request.url()) {
            return Err(OnboardError::Auth(format!(
                "refusing to send a bearer token over {}: scheme must be https",
                request.url().scheme()
            )));
        }

        let token = self.token_for(request.url()).await?;

        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| OnboardError::Auth(format!("Invalid access token: {e}")))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);

        Ok(request)
    }
}

impl fmt::Debug for AzureIdentityAuthenticationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureIdentityAuthenticationProvider")
            .field("credential", &self.credential)
            .field("scopes", &self.scopes)
            .field("allowed_hosts", &self.allowed_hosts)
            .finish()
    }
}

fn default_scope(url: &Url) -> String {
    format!("{}/.default", url.origin().ascii_serialization())
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr.is_loopback(),
        Some(Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}
