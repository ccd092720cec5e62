//! The onboarding run: configuration, credential, client, payload, create.
//!
//! Each stage either hands its output to the next or stops the run with a
//! [`StageError`] naming where it failed.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::adapter::GraphRequestAdapter;
use crate::auth_provider::AzureIdentityAuthenticationProvider;
use crate::client::GraphServiceClient;
use crate::config::{OnboardConfig, SettingsFile};
use crate::credential::{ClientSecretCredential, ClientSecretCredentialOptions};
use crate::models::{CreatedUser, UserDraft};
use crate::OnboardError;

/// Step of the onboarding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadConfig,
    BuildCredential,
    BuildAuthProvider,
    BuildRequestAdapter,
    AcquireToken,
    BuildPayload,
    CreateUser,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::LoadConfig => "Error loading configuration",
            Self::BuildCredential => "Error creating client secret credential",
            Self::BuildAuthProvider => "Error creating authentication provider",
            Self::BuildRequestAdapter => "Error creating request adapter",
            Self::AcquireToken => "Error acquiring access token",
            Self::BuildPayload => "Error building user payload",
            Self::CreateUser => "Error creating user",
        };
        f.write_str(message)
    }
}

/// An error tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{stage}: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: OnboardError,
}

impl StageError {
    #[must_use]
    pub fn new(stage: Stage, source: OnboardError) -> Self {
        Self { stage, source }
    }

    /// Process exit code, derived from the underlying error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

fn at(stage: Stage) -> impl FnOnce(OnboardError) -> StageError {
    move |source| StageError::new(stage, source)
}

/// Loads configuration from the environment layered over a settings file.
///
/// # Errors
///
/// Returns a [`Stage::LoadConfig`] error if the settings file or a required
/// variable is missing, or a value is invalid.
pub fn load_config(env_file: Option<&Path>) -> Result<OnboardConfig, StageError> {
    let settings = SettingsFile::load(env_file)
        .map_err(OnboardError::from)
        .map_err(at(Stage::LoadConfig))?;

    OnboardConfig::from_settings(&settings)
        .map_err(OnboardError::from)
        .map_err(at(Stage::LoadConfig))
}

/// Builds the user this run creates.
#[must_use]
pub fn build_user_draft(config: &OnboardConfig) -> UserDraft {
    UserDraft::onboarding_default(&config.domain)
}

/// Renders the user this run would create as pretty JSON, password redacted.
///
/// # Errors
///
/// Returns a [`Stage::BuildPayload`] error if the payload cannot be serialized.
pub fn render_user_draft(config: &OnboardConfig) -> Result<String, StageError> {
    build_user_draft(config)
        .to_redacted_json()
        .and_then(|value| serde_json::to_string_pretty(&value))
        .map_err(OnboardError::from)
        .map_err(at(Stage::BuildPayload))
}

/// Runs the onboarding stages after configuration has been loaded.
///
/// A token is acquired before the payload is built so that identity
/// failures stop the run early. The create request is sent exactly once.
///
/// # Errors
///
/// Returns the first failing stage together with its underlying error.
#[instrument(skip(config), fields(tenant_id = %config.tenant_id))]
pub async fn run(config: OnboardConfig) -> Result<CreatedUser, StageError> {
    let OnboardConfig {
        client_id,
        client_secret,
        tenant_id,
        domain,
        authority_host,
        graph_endpoint,
        request_timeout,
        ..
    } = config;

    let credential = ClientSecretCredential::new(
        tenant_id,
        client_id,
        client_secret,
        ClientSecretCredentialOptions::new(authority_host).with_timeout(request_timeout),
    )
    .map_err(at(Stage::BuildCredential))?;
    debug!(?credential, "Created client secret credential");

    let provider = AzureIdentityAuthenticationProvider::for_graph(Arc::new(credential), &graph_endpoint)
        .map_err(at(Stage::BuildAuthProvider))?;
    debug!(?provider, "Created authentication provider");
    let provider = Arc::new(provider);

    let adapter = GraphRequestAdapter::new(provider.clone(), &graph_endpoint, request_timeout)
        .map_err(at(Stage::BuildRequestAdapter))?;
    let client = GraphServiceClient::new(adapter);

    let users_url = client
        .adapter()
        .url_for("users")
        .map_err(at(Stage::BuildRequestAdapter))?;
    provider
        .token_for(&users_url)
        .await
        .map_err(at(Stage::AcquireToken))?;

    let draft = UserDraft::onboarding_default(&domain);
    info!(
        "Attempting to create user: {} (UPN: {})",
        draft.display_name(),
        draft.user_principal_name()
    );

    client
        .users()
        .post(draft)
        .await
        .map_err(at(Stage::CreateUser))
}
