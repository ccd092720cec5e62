//! Common test utilities for entra-onboard integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::env::VarError;

use entra_onboard::OnboardConfig;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TENANT: &str = "test-tenant";
pub const TEST_TOKEN: &str = "mock-access-token";

/// Creates a created-user response as returned by Graph.
pub fn create_created_user(id: &str, upn: &str) -> Value {
    json!({
        "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users/$entity",
        "id": id,
        "displayName": "Go App User",
        "userPrincipalName": upn,
        "mailNickname": "goappuser",
        "accountEnabled": true
    })
}

/// Creates an OData error response.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "innerError": {
                "date": "2026-10-16T09:00:00",
                "request-id": "5b2a4f1e-0000-0000-0000-000000000000"
            }
        }
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Mock server wrapper with common setup helpers.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    /// Creates a new mock identity + Graph server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Configuration pointing both the authority and Graph at this server.
    pub fn config(&self, domain: &str) -> OnboardConfig {
        self.config_with(HashMap::from([("AZURE_AD_DOMAIN", domain.to_string())]))
    }

    /// Configuration with extra variables layered over the defaults.
    pub fn config_with(&self, extra: HashMap<&str, String>) -> OnboardConfig {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("AZURE_CLIENT_ID".to_string(), "test-client".to_string()),
            ("AZURE_CLIENT_SECRET".to_string(), "test-secret".to_string()),
            ("AZURE_TENANT_ID".to_string(), TEST_TENANT.to_string()),
            ("AZURE_AUTHORITY_HOST".to_string(), self.url()),
            ("GRAPH_ENDPOINT".to_string(), self.url()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value);
        }

        OnboardConfig::from_reader(move |key: &str| vars.get(key).cloned().ok_or(VarError::NotPresent))
            .expect("test config should load")
    }

    /// Sets up OAuth token endpoint, expecting `times` requests.
    pub async fn mock_token_endpoint(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/{TEST_TENANT}/oauth2/v2.0/token")))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(create_token_response(TEST_TOKEN, 3600)),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Sets up a failing OAuth token endpoint.
    pub async fn mock_token_rejected(&self) {
        Mock::given(method("POST"))
            .and(path(format!("/{TEST_TENANT}/oauth2/v2.0/token")))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Sets up user creation endpoint, expecting `times` requests.
    pub async fn mock_create_user_endpoint(&self, created_user: Value, times: u64) {
        Mock::given(method("POST"))
            .and(path("/v1.0/users"))
            .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(created_user))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Sets up user creation endpoint returning an error.
    pub async fn mock_create_user_error(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v1.0/users"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Asserts that no request reaches the users collection.
    pub async fn expect_no_create(&self) {
        Mock::given(method("POST"))
            .and(path("/v1.0/users"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}
