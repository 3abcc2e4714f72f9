//! Resolution request and resolved configuration
//!
//! A [`ResolutionRequest`] holds what the operator supplied. Absent fields are
//! eligible for autodiscovery; present ones always win. Discovery never edits
//! the request in place: each stage returns the values it settled on and the
//! orchestrator assembles a [`ResolvedConfig`] from them.

use std::fmt;
use std::str::FromStr;

use kestrel_common::crd::{
    Frontend, IMPERSONATION_PROXY_FRONTEND_TYPE, TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE,
};

use crate::ca::CaBundle;
use crate::descriptor::ClusterConfig;

/// Everything the operator supplied for one run
#[derive(Clone, Debug, Default)]
pub struct ResolutionRequest {
    pub static_token: Option<String>,
    pub static_token_env: Option<String>,
    /// `None` when the generated config bypasses the Concierge
    pub concierge: Option<ConciergeRequest>,
    pub oidc: OidcRequest,
    /// Passed through to the login command when explicitly given, even if empty
    pub credential_cache: Option<String>,
    pub install_hint: String,
}

impl ResolutionRequest {
    /// Whether the generated config runs `login static`.
    pub fn uses_static_token(&self) -> bool {
        self.static_token.is_some() || self.static_token_env.is_some()
    }
}

/// Concierge settings
#[derive(Clone, Debug, Default)]
pub struct ConciergeRequest {
    pub api_group_suffix: String,
    pub credential_issuer: Option<String>,
    pub authenticator_type: Option<String>,
    pub authenticator_name: Option<String>,
    pub skip_wait: bool,
    pub ca_bundle: Option<CaBundle>,
    pub endpoint: Option<String>,
    pub mode: ConciergeMode,
}

/// OIDC login settings
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OidcRequest {
    pub issuer: Option<String>,
    pub client_id: String,
    pub listen_port: Option<u16>,
    pub scopes: Vec<String>,
    pub skip_browser: bool,
    pub skip_listen: bool,
    pub session_cache: Option<String>,
    pub debug_session_cache: bool,
    pub ca_bundle: Option<CaBundle>,
    pub request_audience: Option<String>,
    pub upstream: UpstreamSelection,
}

/// Supervisor upstream identity provider to log in through
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpstreamSelection {
    pub name: Option<String>,
    pub idp_type: Option<String>,
    pub flow: Option<String>,
}

impl UpstreamSelection {
    /// All three values were pinned, so discovery has nothing to fill.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.idp_type.is_some() && self.flow.is_some()
    }
}

/// How the generated config reaches the Concierge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConciergeMode {
    /// Use whichever healthy frontend the CredentialIssuer lists first
    #[default]
    Auto,
    TokenCredentialRequestApi,
    ImpersonationProxy,
}

impl ConciergeMode {
    /// Whether `frontend` may serve this mode.
    pub fn matches(&self, frontend: &Frontend) -> bool {
        match (self, frontend) {
            (Self::Auto, _) => true,
            (Self::TokenCredentialRequestApi, Frontend::TokenCredentialRequestApi(_)) => true,
            (Self::ImpersonationProxy, Frontend::ImpersonationProxy(_)) => true,
            _ => false,
        }
    }

    /// The mode a discovered frontend operates in.
    pub fn of(frontend: &Frontend) -> Self {
        match frontend {
            Frontend::TokenCredentialRequestApi(_) => Self::TokenCredentialRequestApi,
            Frontend::ImpersonationProxy(_) => Self::ImpersonationProxy,
        }
    }
}

impl fmt::Display for ConciergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::TokenCredentialRequestApi => {
                f.write_str(TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE)
            }
            Self::ImpersonationProxy => f.write_str(IMPERSONATION_PROXY_FRONTEND_TYPE),
        }
    }
}

impl FromStr for ConciergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE) {
            Ok(Self::TokenCredentialRequestApi)
        } else if s.eq_ignore_ascii_case(IMPERSONATION_PROXY_FRONTEND_TYPE) {
            Ok(Self::ImpersonationProxy)
        } else {
            Err(format!(
                "invalid mode {:?}, valid modes are {} and {}",
                s, TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE, IMPERSONATION_PROXY_FRONTEND_TYPE
            ))
        }
    }
}

/// Concierge parameters after discovery
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConcierge {
    pub api_group_suffix: String,
    pub mode: ConciergeMode,
    pub authenticator_type: String,
    pub authenticator_name: String,
    pub endpoint: String,
    pub ca_bundle: CaBundle,
}

/// Fully merged parameters, consumed by the exec assembler and the validator
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    /// Cluster entry of the generated kubeconfig
    pub cluster: ClusterConfig,
    pub concierge: Option<ResolvedConcierge>,
    pub static_token: Option<String>,
    pub static_token_env: Option<String>,
    pub oidc: OidcRequest,
    pub credential_cache: Option<String>,
    pub install_hint: String,
}

/// Treat empty flag values the same as absent ones.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
