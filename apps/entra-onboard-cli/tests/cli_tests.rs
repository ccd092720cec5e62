//! End-to-end tests for the entra-onboard binary
//!
//! Tests cover:
//! - Missing configuration
//! - Settings file handling
//! - Dry-run payload output
//! - Successful creation against a mock Graph server
//! - Identity and directory failures

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "test-tenant";

/// Command with a clean environment, run from an empty directory.
fn onboard(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_entra-onboard"));
    cmd.env_clear().current_dir(dir).env("RUST_LOG", "off");
    cmd
}

fn with_credentials<'a>(cmd: &'a mut Command, domain: &str) -> &'a mut Command {
    cmd.env("AZURE_CLIENT_ID", "test-client")
        .env("AZURE_CLIENT_SECRET", "test-secret")
        .env("AZURE_TENANT_ID", TENANT)
        .env("AZURE_AD_DOMAIN", domain)
}

fn pointed_at<'a>(cmd: &'a mut Command, server: &MockServer) -> &'a mut Command {
    cmd.env("AZURE_AUTHORITY_HOST", server.uri())
        .env("GRAPH_ENDPOINT", server.uri())
}

async fn run_async(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().expect("failed to run binary"))
        .await
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

async fn mock_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mock-access-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn test_no_configuration_lists_all_missing_vars() {
    let dir = TempDir::new().unwrap();
    let output = onboard(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.starts_with("Error loading configuration"));
    assert!(err.contains("AZURE_CLIENT_ID, AZURE_CLIENT_SECRET, AZURE_TENANT_ID"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_missing_secret_only() {
    let dir = TempDir::new().unwrap();
    let output = onboard(dir.path())
        .env("AZURE_CLIENT_ID", "test-client")
        .env("AZURE_TENANT_ID", TENANT)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("AZURE_CLIENT_SECRET"));
    assert!(!err.contains("AZURE_CLIENT_ID"));
    assert!(!err.contains("AZURE_TENANT_ID"));
}

#[test]
fn test_explicit_env_file_must_exist() {
    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    let output = cmd
        .args(["--env-file", "missing.env", "--dry-run"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("missing.env"));
}

#[test]
fn test_zero_timeout_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    let output = cmd
        .args(["--timeout-secs", "0", "--dry-run"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--timeout-secs"));
}

#[test]
fn test_timeout_from_environment_is_validated() {
    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");

    let output = cmd
        .env("GRAPH_REQUEST_TIMEOUT_SECS", "0")
        .arg("--dry-run")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    let output = cmd
        .env("GRAPH_REQUEST_TIMEOUT_SECS", "45")
        .arg("--dry-run")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
}

// =========================================================================
// Dry run
// =========================================================================

#[test]
fn test_dry_run_prints_redacted_payload() {
    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    let output = cmd.arg("--dry-run").output().unwrap();

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let payload: Value = serde_json::from_str(&stdout(&output)).unwrap();

    assert_eq!(payload["accountEnabled"], true);
    assert_eq!(payload["displayName"], "Go App User");
    assert_eq!(payload["mailNickname"], "goappuser");
    assert_eq!(payload["userPrincipalName"], "goappuser@contoso.com");
    assert_eq!(payload["passwordProfile"]["forceChangePasswordNextSignIn"], true);
    assert_eq!(payload["passwordProfile"]["password"], "[REDACTED]");
}

#[test]
fn test_dry_run_reads_default_env_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "AZURE_CLIENT_ID=file-client\n\
         AZURE_CLIENT_SECRET=file-secret\n\
         AZURE_TENANT_ID=file-tenant\n\
         AZURE_AD_DOMAIN=fabrikam.com\n",
    )
    .unwrap();

    let output = onboard(dir.path()).arg("--dry-run").output().unwrap();

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let payload: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(payload["userPrincipalName"], "goappuser@fabrikam.com");
}

#[test]
fn test_environment_overrides_env_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.env"),
        "AZURE_CLIENT_ID=file-client\n\
         AZURE_CLIENT_SECRET=file-secret\n\
         AZURE_TENANT_ID=file-tenant\n\
         AZURE_AD_DOMAIN=fabrikam.com\n",
    )
    .unwrap();

    let output = onboard(dir.path())
        .env("AZURE_AD_DOMAIN", "contoso.com")
        .args(["--env-file", "settings.env", "--dry-run"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let payload: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(payload["userPrincipalName"], "goappuser@contoso.com");
}

// =========================================================================
// Against a mock Graph server
// =========================================================================

#[tokio::test]
async fn test_creates_user_and_prints_summary() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "87d349ed-44d7-43e1-9a83-5f2406dee5bd",
            "displayName": "Go App User",
            "userPrincipalName": "goappuser@contoso.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    pointed_at(&mut cmd, &server);
    let output = run_async(cmd).await;

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output).trim_end(),
        "Successfully created user: Go App User \
         (ID: 87d349ed-44d7-43e1-9a83-5f2406dee5bd, UPN: goappuser@contoso.com)"
    );
}

#[tokio::test]
async fn test_unreachable_identity_endpoint_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    cmd.env("AZURE_AUTHORITY_HOST", "http://127.0.0.1:9")
        .env("GRAPH_ENDPOINT", server.uri());
    let output = run_async(cmd).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).starts_with("Error acquiring access token"));
    assert!(!stderr(&output).contains("test-secret"));
}

#[tokio::test]
async fn test_duplicate_user_exits_with_client_error_code() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "Request_BadRequest",
                "message": "Another object with the same value for property userPrincipalName already exists."
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = onboard(dir.path());
    with_credentials(&mut cmd, "contoso.com");
    pointed_at(&mut cmd, &server);
    let output = run_async(cmd).await;

    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.starts_with("Error creating user"));
    assert!(err.contains(
        "Another object with the same value for property userPrincipalName already exists."
    ));
    assert!(stdout(&output).is_empty());
}
