//! Supervisor upstream identity provider discovery
//!
//! A Supervisor advertises an extra endpoint inside its standard OIDC
//! discovery document. That endpoint lists the upstream identity providers a
//! user can log in through and the client flows each one supports.
//!
//! ```json
//! {
//!   "issuer": "https://supervisor.example.com/issuer",
//!   "discovery.supervisor.pinniped.dev/v1alpha1": {
//!     "pinniped_identity_providers_endpoint": "https://supervisor.example.com/issuer/v1alpha1/pinniped_identity_providers"
//!   }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of the Supervisor extension inside the OIDC discovery document.
pub const SUPERVISOR_DISCOVERY_KEY: &str = "discovery.supervisor.pinniped.dev/v1alpha1";

/// Path of the standard OIDC discovery document below an issuer.
pub const OIDC_DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// The parts of an OIDC discovery document this client reads
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OidcDiscoveryResponse {
    #[serde(default)]
    pub issuer: String,

    #[serde(
        rename = "discovery.supervisor.pinniped.dev/v1alpha1",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub supervisor_discovery: Option<SupervisorDiscovery>,
}

impl OidcDiscoveryResponse {
    /// The advertised IDP listing endpoint, if any.
    ///
    /// An absent extension and an empty endpoint both mean the issuer does not
    /// support upstream IDP discovery.
    pub fn identity_providers_endpoint(&self) -> Option<&str> {
        self.supervisor_discovery
            .as_ref()
            .map(|d| d.pinniped_identity_providers_endpoint.as_str())
            .filter(|endpoint| !endpoint.is_empty())
    }
}

/// Value of the Supervisor discovery extension
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SupervisorDiscovery {
    #[serde(default)]
    pub pinniped_identity_providers_endpoint: String,
}

/// Body served by the IDP listing endpoint
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct IdpDiscoveryResponse {
    #[serde(default)]
    pub pinniped_identity_providers: Vec<UpstreamIdp>,
}

/// An upstream identity provider configured in the Supervisor
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct UpstreamIdp {
    pub name: String,

    #[serde(rename = "type")]
    pub idp_type: IdpType,

    /// Flows in the server's order of preference; empty from older servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<IdpFlow>,
}

/// Upstream identity provider types
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IdpType {
    Oidc,
    Ldap,
    ActiveDirectory,
}

impl IdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oidc => "oidc",
            Self::Ldap => "ldap",
            Self::ActiveDirectory => "activedirectory",
        }
    }
}

impl fmt::Display for IdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client flows for logging in through an upstream identity provider
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IdpFlow {
    CliPassword,
    BrowserAuthcode,
}

impl IdpFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CliPassword => "cli_password",
            Self::BrowserAuthcode => "browser_authcode",
        }
    }
}

impl fmt::Display for IdpFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
