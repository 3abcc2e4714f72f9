use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticator kinds served by the Concierge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthenticatorKind {
    Webhook,
    Jwt,
}

impl AuthenticatorKind {
    /// Every kind, in the order they are listed during autodiscovery.
    pub const ALL: [AuthenticatorKind; 2] = [AuthenticatorKind::Jwt, AuthenticatorKind::Webhook];

    /// Short name accepted on the command line and passed to the login plugin.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Jwt => "jwt",
        }
    }

    /// Kubernetes kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webhook => "WebhookAuthenticator",
            Self::Jwt => "JWTAuthenticator",
        }
    }

    /// Plural resource name
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Webhook => "webhookauthenticators",
            Self::Jwt => "jwtauthenticators",
        }
    }
}

impl fmt::Display for AuthenticatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticator type string that names no known kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(r#"invalid authenticator type {0:?}, supported values are "webhook" and "jwt""#)]
pub struct UnknownAuthenticatorType(pub String);

impl FromStr for AuthenticatorKind {
    type Err = UnknownAuthenticatorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webhook" => Ok(Self::Webhook),
            "jwt" => Ok(Self::Jwt),
            _ => Err(UnknownAuthenticatorType(s.to_string())),
        }
    }
}

/// A discovered authenticator of any kind
#[derive(Clone, Debug, PartialEq)]
pub enum Authenticator {
    Webhook(WebhookAuthenticator),
    Jwt(JwtAuthenticator),
}

impl Authenticator {
    pub fn kind(&self) -> AuthenticatorKind {
        match self {
            Self::Webhook(_) => AuthenticatorKind::Webhook,
            Self::Jwt(_) => AuthenticatorKind::Jwt,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Webhook(auth) => &auth.name,
            Self::Jwt(auth) => &auth.name,
        }
    }
}

/// WebhookAuthenticator
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct WebhookAuthenticator {
    pub name: String,
    #[serde(default)]
    pub spec: WebhookAuthenticatorSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAuthenticatorSpec {
    /// Webhook server endpoint URL
    #[serde(default)]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSpec>,
}

/// JWTAuthenticator
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct JwtAuthenticator {
    pub name: String,
    #[serde(default)]
    pub spec: JwtAuthenticatorSpec,
}

/// JWTAuthenticator spec
///
/// Example:
/// ```yaml
/// spec:
///   issuer: https://supervisor.example.com/issuer
///   audience: my-cluster-audience
///   tls:
///     certificateAuthorityData: LS0tLS1CRUdJTi...
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JwtAuthenticatorSpec {
    /// OIDC issuer URL whose tokens are accepted
    #[serde(default)]
    pub issuer: String,

    /// Audience the tokens must carry
    #[serde(default)]
    pub audience: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSpec>,
}

/// TLS settings for reaching an authenticator's backend
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    /// Base64-encoded PEM bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
}
