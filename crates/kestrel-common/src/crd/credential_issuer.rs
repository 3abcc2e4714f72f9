use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason reported by a strategy that is still being set up.
pub const PENDING_STRATEGY_REASON: &str = "Pending";

/// Wire name of the TokenCredentialRequest API frontend.
pub const TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE: &str = "TokenCredentialRequestAPI";

/// Wire name of the impersonation proxy frontend.
pub const IMPERSONATION_PROXY_FRONTEND_TYPE: &str = "ImpersonationProxy";

/// A CredentialIssuer as seen by a client: its name and reported status.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CredentialIssuer {
    /// Object name
    pub name: String,
    /// Server-reported status
    #[serde(default)]
    pub status: CredentialIssuerStatus,
}

impl CredentialIssuer {
    /// Whether any strategy is still converging.
    pub fn has_pending_strategy(&self) -> bool {
        self.status
            .strategies
            .iter()
            .any(|strategy| strategy.reason == PENDING_STRATEGY_REASON)
    }
}

/// CredentialIssuer status
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialIssuerStatus {
    /// Strategies in the order the Concierge reports them
    #[serde(default)]
    pub strategies: Vec<CredentialIssuerStrategy>,

    /// Legacy cluster connection info, superseded by per-strategy frontends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_config_info: Option<KubeConfigInfo>,
}

/// Legacy `status.kubeConfigInfo` block
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubeConfigInfo {
    pub server: String,
    /// Base64-encoded PEM bundle
    pub certificate_authority_data: String,
}

/// One mechanism by which the Concierge may be reached
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialIssuerStrategy {
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,

    pub status: StrategyStatus,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<StrategyFrontend>,
}

/// Strategy kinds known to this client
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum StrategyType {
    KubeClusterSigningCertificate,
    ImpersonationProxy,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KubeClusterSigningCertificate => write!(f, "KubeClusterSigningCertificate"),
            Self::ImpersonationProxy => write!(f, "ImpersonationProxy"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Strategy health
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum StrategyStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Error => write!(f, "Error"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// `status.strategies[].frontend` exactly as served.
///
/// The type is kept as a string so that frontends added by newer servers
/// still decode; [`StrategyFrontend::to_frontend`] yields the closed set this
/// client understands.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrategyFrontend {
    #[serde(rename = "type")]
    pub frontend_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_credential_request_info: Option<TokenCredentialRequestApiInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonation_proxy_info: Option<ImpersonationProxyInfo>,
}

impl StrategyFrontend {
    /// Convert to a known frontend.
    ///
    /// Returns `None` for unrecognised types and for known types whose info
    /// block is missing.
    pub fn to_frontend(&self) -> Option<Frontend> {
        match self.frontend_type.as_str() {
            TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE => self
                .token_credential_request_info
                .as_ref()
                .map(|info| Frontend::TokenCredentialRequestApi(info.clone())),
            IMPERSONATION_PROXY_FRONTEND_TYPE => self
                .impersonation_proxy_info
                .as_ref()
                .map(|info| Frontend::ImpersonationProxy(info.clone())),
            _ => None,
        }
    }
}

/// `frontend.tokenCredentialRequestInfo`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenCredentialRequestApiInfo {
    pub server: String,
    /// Base64-encoded PEM bundle
    pub certificate_authority_data: String,
}

/// `frontend.impersonationProxyInfo`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonationProxyInfo {
    pub endpoint: String,
    /// Base64-encoded PEM bundle
    pub certificate_authority_data: String,
}

/// How a client reaches the credential exchange endpoint
#[derive(Clone, Debug, PartialEq)]
pub enum Frontend {
    /// TokenCredentialRequest API served by the cluster's API server
    TokenCredentialRequestApi(TokenCredentialRequestApiInfo),
    /// Impersonating proxy in front of the API server
    ImpersonationProxy(ImpersonationProxyInfo),
}
