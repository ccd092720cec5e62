//! National cloud endpoints for Entra ID and Microsoft Graph.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Entra ID cloud environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloudEnvironment {
    /// Azure public (commercial) cloud.
    #[default]
    Public,
    /// Azure US Government (GCC-High / DoD).
    UsGovernment,
    /// Azure China, operated by 21Vianet.
    China,
    /// Azure Germany.
    Germany,
}

impl CloudEnvironment {
    /// Returns the identity provider (authority) base URL.
    #[must_use]
    pub fn login_endpoint(&self) -> &'static str {
        match self {
            Self::Public => "https://login.microsoftonline.com",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::China => "https://login.chinacloudapi.cn",
            Self::Germany => "https://login.microsoftonline.de",
        }
    }

    /// Returns the Microsoft Graph base URL.
    #[must_use]
    pub fn graph_endpoint(&self) -> &'static str {
        match self {
            Self::Public => "https://graph.microsoft.com",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
            Self::Germany => "https://graph.microsoft.de",
        }
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Public => "public",
            Self::UsGovernment => "usgov",
            Self::China => "china",
            Self::Germany => "germany",
        };
        f.write_str(name)
    }
}

impl FromStr for CloudEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "commercial" | "azurepubliccloud" => Ok(Self::Public),
            "usgov" | "usgovernment" | "azureusgovernment" => Ok(Self::UsGovernment),
            "china" | "azurechina" | "azurechinacloud" => Ok(Self::China),
            "germany" | "azuregermany" | "azuregermancloud" => Ok(Self::Germany),
            other => Err(ConfigError::InvalidValue(
                "AZURE_CLOUD".into(),
                format!("unknown cloud '{other}' (expected public, usgov, china or germany)"),
            )),
        }
    }
}
