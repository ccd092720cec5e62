//! Error types for Entra ID onboarding.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using `OnboardError`.
pub type OnboardResult<T> = Result<T, OnboardError>;

/// Errors that can occur while provisioning a user.
#[derive(Debug, Error)]
pub enum OnboardError {
    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The client secret credential could not be built from its inputs.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Token acquisition failed or the authentication policy rejected a request.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Microsoft Graph returned a non-success response.
    #[error("Graph API error ({status}): {code} - {message}")]
    GraphApi {
        status: u16,
        code: String,
        message: String,
    },

    /// The request exceeded its deadline.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OnboardError {
    /// Process exit code for this error.
    ///
    /// - 1: configuration error
    /// - 2: credential or authentication error
    /// - 3: network error or timeout
    /// - 4: request rejected by the API
    /// - 5: API server error
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Credential(_) | Self::Auth(_) => 2,
            Self::Http(_) | Self::Timeout(_) => 3,
            Self::GraphApi { status, .. } if *status < 500 => 4,
            Self::GraphApi { .. } | Self::Json(_) => 5,
        }
    }

    /// Returns true if the directory reported a conflicting object (e.g. a
    /// duplicate mail nickname or principal name).
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::GraphApi { status, message, .. } => {
                *status == 409 || message.contains("already exists")
            }
            _ => false,
        }
    }
}
