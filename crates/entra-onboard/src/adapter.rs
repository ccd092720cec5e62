//! HTTP transport for Microsoft Graph requests.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::auth_provider::AuthenticationProvider;
use crate::{OnboardError, OnboardResult};

/// Graph API version used for every request.
pub const GRAPH_API_VERSION: &str = "v1.0";

/// `OData` error response from Microsoft Graph.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "innerError")]
    pub inner_error: Option<serde_json::Value>,
}

/// Request adapter that authenticates, sends and decodes Graph requests.
///
/// Each call is sent exactly once; there is no retry.
#[derive(Debug)]
pub struct GraphRequestAdapter {
    http_client: reqwest::Client,
    auth_provider: Arc<dyn AuthenticationProvider>,
    base_url: Url,
    timeout: Duration,
}

impl GraphRequestAdapter {
    /// Creates an adapter for `graph_endpoint` (e.g. `https://graph.microsoft.com`).
    ///
    /// # Errors
    ///
    /// Returns `OnboardError::Config` if the HTTP client cannot be built or
    /// the endpoint is not a base URL.
    pub fn new(
        auth_provider: Arc<dyn AuthenticationProvider>,
        graph_endpoint: &Url,
        timeout: Duration,
    ) -> OnboardResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("entra-onboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| adapter_error(format!("Failed to create HTTP client: {e}")))?;

        if graph_endpoint.cannot_be_a_base() {
            return Err(adapter_error(format!(
                "graph endpoint '{graph_endpoint}' cannot be used as a base URL"
            )));
        }

        let base_url = Url::parse(&format!(
            "{}/{}/",
            graph_endpoint.as_str().trim_end_matches('/'),
            GRAPH_API_VERSION
        ))
        .map_err(|e| adapter_error(format!("Invalid graph endpoint: {e}")))?;

        Ok(Self {
            http_client,
            auth_provider,
            base_url,
            timeout,
        })
    }

    /// Versioned base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Deadline applied to each request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a resource path (e.g. `users`) against the versioned base URL.
    ///
    /// # Errors
    ///
    /// Returns `OnboardError::Config` if the path does not form a valid URL.
    pub fn url_for(&self, path: &str) -> OnboardResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| adapter_error(format!("Invalid resource path '{path}': {e}")))
    }

    /// Sends an authenticated JSON request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `OnboardError::Auth` if authentication fails,
    /// `OnboardError::Timeout` if the deadline passes, `OnboardError::Http`
    /// for other transport failures and `OnboardError::GraphApi` for
    /// non-success responses.
    #[instrument(skip(self, body))]
    pub async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> OnboardResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path)?;

        let mut builder = self.http_client.request(method, url);
        if let Some(b) = body {
            builder = builder.json(b);
        }

        let request = builder.build()?;
        let request = self.auth_provider.authenticate(request).await?;

        debug!(url = %request.url(), "Sending Graph request");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(graph_error(status, &error_body))
    }

    fn transport_error(&self, e: reqwest::Error) -> OnboardError {
        if e.is_timeout() {
            OnboardError::Timeout(self.timeout)
        } else {
            OnboardError::Http(e)
        }
    }
}

/// Converts a non-success Graph response into an error, preferring the
/// `OData` error envelope when present.
pub(crate) fn graph_error(status: StatusCode, body: &str) -> OnboardError {
    if let Ok(odata_error) = serde_json::from_str::<ODataError>(body) {
        return OnboardError::GraphApi {
            status: status.as_u16(),
            code: odata_error.error.code,
            message: odata_error.error.message,
        };
    }

    OnboardError::GraphApi {
        status: status.as_u16(),
        code: status.to_string(),
        message: body.to_string(),
    }
}

fn adapter_error(message: String) -> OnboardError {
    OnboardError::Config(crate::config::ConfigError::InvalidValue(
        "request adapter".into(),
        message,
    ))
}
