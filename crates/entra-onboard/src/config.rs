//! Onboarding configuration loaded from environment variables.
//!
//! Required values fail fast: a missing client id, client secret or tenant id
//! aborts before any network call is made. The environment may be layered
//! over a dotenv-style settings file; values already present in the process
//! environment take precedence over the file.

use std::collections::HashMap;
use std::env::VarError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, warn};
use url::Url;

use crate::cloud::CloudEnvironment;

pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_DOMAIN: &str = "AZURE_AD_DOMAIN";
pub const ENV_CLOUD: &str = "AZURE_CLOUD";
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
pub const ENV_GRAPH_ENDPOINT: &str = "GRAPH_ENDPOINT";
pub const ENV_REQUEST_TIMEOUT: &str = "GRAPH_REQUEST_TIMEOUT_SECS";

/// Settings file read from the working directory when none is named explicitly.
pub const DEFAULT_SETTINGS_FILE: &str = ".env";

/// Default deadline for each outbound request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("failed to load settings file {path}: {message}")]
    EnvFile { path: String, message: String },
}

/// Key/value pairs read from a dotenv-style settings file.
#[derive(Debug, Clone, Default)]
pub struct SettingsFile {
    path: Option<PathBuf>,
    vars: HashMap<String, String>,
}

impl SettingsFile {
    /// Load settings from `explicit`, or from `.env` in the working directory.
    ///
    /// An explicitly named file must exist. The default `.env` is optional:
    /// when it is absent the ambient environment is used on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` if the file is missing (explicit path
    /// only), unreadable, or malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = Path::new(DEFAULT_SETTINGS_FILE);
                if path.is_file() {
                    Self::read(path)
                } else {
                    debug!("No {} file found, using process environment", DEFAULT_SETTINGS_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Read and parse a settings file without touching the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` if the file cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let env_file_error = |e: dotenvy::Error| ConfigError::EnvFile {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(env_file_error)? {
            let (key, value) = item.map_err(env_file_error)?;
            vars.insert(key, value);
        }

        debug!(path = %path.display(), count = vars.len(), "Loaded settings file");

        Ok(Self {
            path: Some(path.to_path_buf()),
            vars,
        })
    }

    /// Path the settings were read from, if any file was loaded.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a value defined in the file.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Variable reader that consults the process environment first and falls
    /// back to the file.
    pub fn reader(&self) -> impl Fn(&str) -> Result<String, VarError> + '_ {
        move |key: &str| {
            std::env::var(key).or_else(|err| match err {
                VarError::NotPresent => self.get(key).map(str::to_owned).ok_or(err),
                VarError::NotUnicode(_) => Err(err),
            })
        }
    }
}

/// Everything the onboarding pipeline needs to run.
#[derive(Debug)]
pub struct OnboardConfig {
    /// Application (client) id registered in the tenant.
    pub client_id: String,
    /// Client secret for the application registration.
    pub client_secret: SecretString,
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Verified domain used for the new user's principal name. May be empty.
    pub domain: String,
    /// National cloud the tenant lives in.
    pub cloud: CloudEnvironment,
    /// Identity provider base URL used for token requests.
    pub authority_host: Url,
    /// Microsoft Graph base URL (without API version).
    pub graph_endpoint: Url,
    /// Deadline applied to each outbound request.
    pub request_timeout: Duration,
}

impl OnboardConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or an optional
    /// one holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from the process environment layered over a
    /// settings file.
    ///
    /// # Errors
    ///
    /// See [`OnboardConfig::from_reader`].
    pub fn from_settings(settings: &SettingsFile) -> Result<Self, ConfigError> {
        Self::from_reader(settings.reader())
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` naming every absent required
    /// variable, or `ConfigError::InvalidValue` for a malformed optional one.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let non_empty = |key: &str| reader(key).ok().filter(|v| !v.trim().is_empty());

        let (client_id, client_secret, tenant_id) = match (
            non_empty(ENV_CLIENT_ID),
            non_empty(ENV_CLIENT_SECRET),
            non_empty(ENV_TENANT_ID),
        ) {
            (Some(client_id), Some(client_secret), Some(tenant_id)) => {
                (client_id, client_secret, tenant_id)
            }
            (client_id, client_secret, tenant_id) => {
                let missing: Vec<&str> = [
                    (ENV_CLIENT_ID, client_id.is_none()),
                    (ENV_CLIENT_SECRET, client_secret.is_none()),
                    (ENV_TENANT_ID, tenant_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(ConfigError::MissingVar(missing.join(", ")));
            }
        };

        // No presence check: an empty domain yields a principal name of "nickname@".
        let domain = reader(ENV_DOMAIN)
            .map(|d| d.trim().to_string())
            .unwrap_or_default();
        if domain.is_empty() {
            warn!("{} is not set; the user principal name will have no domain", ENV_DOMAIN);
        }

        let cloud = match non_empty(ENV_CLOUD) {
            Some(value) => value.parse::<CloudEnvironment>()?,
            None => CloudEnvironment::default(),
        };

        let authority_host = parse_endpoint(
            ENV_AUTHORITY_HOST,
            non_empty(ENV_AUTHORITY_HOST).as_deref(),
            cloud.login_endpoint(),
        )?;

        let graph_endpoint = parse_endpoint(
            ENV_GRAPH_ENDPOINT,
            non_empty(ENV_GRAPH_ENDPOINT).as_deref(),
            cloud.graph_endpoint(),
        )?;

        let request_timeout = match non_empty(ENV_REQUEST_TIMEOUT) {
            Some(value) => parse_timeout(ENV_REQUEST_TIMEOUT, &value)?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            client_id: client_id.trim().to_string(),
            client_secret: SecretString::from(client_secret),
            tenant_id: tenant_id.trim().to_string(),
            domain,
            cloud,
            authority_host,
            graph_endpoint,
            request_timeout,
        })
    }

    /// Override the per-request deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Parse a timeout expressed in whole seconds. Zero is rejected.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for non-numeric or zero values.
pub fn parse_timeout(var: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue(
            var.to_string(),
            "timeout must be at least 1 second".to_string(),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue(var.to_string(), e.to_string())),
    }
}

fn parse_endpoint(var: &str, value: Option<&str>, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or(default).trim();
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("'{raw}' is not an absolute http(s) URL"),
        ));
    }

    Ok(url)
}
