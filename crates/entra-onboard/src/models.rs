//! Directory user payloads.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// Display name given to the onboarding user.
pub const DEFAULT_DISPLAY_NAME: &str = "Go App User";

/// Mail nickname of the onboarding user. Must be unique within the tenant.
pub const DEFAULT_MAIL_NICKNAME: &str = "goappuser";

// Placeholder initial password. Not suitable for production: supply a generated
// secret instead. The user is forced to change it at first sign-in.
pub(crate) const PLACEHOLDER_PASSWORD: &str = "SecurePa$$word123!";

/// Marker written in place of the password in redacted output.
pub const REDACTED: &str = "[REDACTED]";

/// Initial password settings for a new user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
    /// Whether the user must change password on next sign-in.
    force_change_password_next_sign_in: bool,
    /// The password.
    #[serde(serialize_with = "serialize_secret")]
    password: SecretString,
}

impl PasswordProfile {
    /// Password profile that forces a change at first sign-in.
    #[must_use]
    pub fn force_change(password: SecretString) -> Self {
        Self {
            force_change_password_next_sign_in: true,
            password,
        }
    }

    #[must_use]
    pub fn force_change_password_next_sign_in(&self) -> bool {
        self.force_change_password_next_sign_in
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

/// A user to be created in the directory.
///
/// Immutable once built; the create request consumes it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    account_enabled: bool,
    display_name: String,
    mail_nickname: String,
    user_principal_name: String,
    password_profile: PasswordProfile,
}

impl UserDraft {
    /// Builds an enabled user whose principal name is `{mail_nickname}@{domain}`.
    ///
    /// The domain is not checked; an empty domain yields `"{mail_nickname}@"`.
    #[must_use]
    pub fn new(
        display_name: impl Into<String>,
        mail_nickname: impl Into<String>,
        domain: &str,
        password: SecretString,
    ) -> Self {
        let mail_nickname = mail_nickname.into();
        let user_principal_name = format!("{mail_nickname}@{domain}");

        Self {
            account_enabled: true,
            display_name: display_name.into(),
            mail_nickname,
            user_principal_name,
            password_profile: PasswordProfile::force_change(password),
        }
    }

    /// The onboarding user created by this tool.
    #[must_use]
    pub fn onboarding_default(domain: &str) -> Self {
        Self::new(
            DEFAULT_DISPLAY_NAME,
            DEFAULT_MAIL_NICKNAME,
            domain,
            SecretString::from(PLACEHOLDER_PASSWORD),
        )
    }

    #[must_use]
    pub fn account_enabled(&self) -> bool {
        self.account_enabled
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn mail_nickname(&self) -> &str {
        &self.mail_nickname
    }

    #[must_use]
    pub fn user_principal_name(&self) -> &str {
        &self.user_principal_name
    }

    #[must_use]
    pub fn password_profile(&self) -> &PasswordProfile {
        &self.password_profile
    }

    /// JSON payload with the password replaced by [`REDACTED`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_json(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(password) = value
            .get_mut("passwordProfile")
            .and_then(|profile| profile.get_mut("password"))
        {
            *password = serde_json::Value::String(REDACTED.to_string());
        }
        Ok(value)
    }
}

/// User resource returned by the directory after creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    /// Server-assigned object id.
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
}

impl CreatedUser {
    /// One-line summary printed after a successful run.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Successfully created user: {} (ID: {}, UPN: {})",
            self.display_name.as_deref().unwrap_or_default(),
            self.id,
            self.user_principal_name.as_deref().unwrap_or_default()
        )
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
