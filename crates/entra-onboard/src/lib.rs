//! Microsoft Entra ID user onboarding.
//!
//! This crate creates a single directory user through the Microsoft Graph API,
//! authenticating as an application with the `OAuth2` client credentials grant.
//!
//! # Stages
//!
//! 1. Load `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`, `AZURE_TENANT_ID` and
//!    `AZURE_AD_DOMAIN` (optionally from a `.env` file)
//! 2. Build a [`ClientSecretCredential`]
//! 3. Wrap it in an [`AzureIdentityAuthenticationProvider`], a
//!    [`GraphRequestAdapter`] and a [`GraphServiceClient`]
//! 4. Build the [`UserDraft`]
//! 5. `POST /users` once
//!
//! # Example
//!
//! ```no_run
//! use entra_onboard::{pipeline, OnboardConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OnboardConfig::from_env()?;
//! let created = pipeline::run(config).await?;
//! println!("{}", created.summary());
//! # Ok(())
//! # }
//! ```

mod adapter;
mod auth_provider;
mod client;
mod cloud;
mod config;
mod credential;
mod error;
mod models;
pub mod pipeline;

// Re-exports
pub use adapter::{GraphRequestAdapter, ODataError, ODataErrorBody, GRAPH_API_VERSION};
pub use auth_provider::{AuthenticationProvider, AzureIdentityAuthenticationProvider};
pub use client::{GraphServiceClient, UsersRequestBuilder};
pub use cloud::CloudEnvironment;
pub use config::{
    parse_timeout, ConfigError, OnboardConfig, SettingsFile, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SETTINGS_FILE, ENV_AUTHORITY_HOST, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_CLOUD,
    ENV_DOMAIN, ENV_GRAPH_ENDPOINT, ENV_REQUEST_TIMEOUT, ENV_TENANT_ID,
};
pub use credential::{ClientSecretCredential, ClientSecretCredentialOptions, TokenCredential};
pub use error::{OnboardError, OnboardResult};
pub use models::{
    CreatedUser, PasswordProfile, UserDraft, DEFAULT_DISPLAY_NAME, DEFAULT_MAIL_NICKNAME, REDACTED,
};
pub use pipeline::{Stage, StageError};
