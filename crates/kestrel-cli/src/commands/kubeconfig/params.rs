//! Parameter resolution
//!
//! Explicit values always win. Anything left open is filled from the selected
//! frontend or authenticator and the discovered value is logged. Nothing here
//! mutates its inputs; callers receive the settled values.

use tracing::info;

use kestrel_common::crd::{Authenticator, AuthenticatorKind, Frontend};

use super::request::{ConciergeMode, ConciergeRequest, OidcRequest};
use crate::ca::CaBundle;
use crate::descriptor::ClusterConfig;
use crate::{Error, Result};

/// How to reach the Concierge
#[derive(Clone, Debug, PartialEq)]
pub struct ConciergeParams {
    pub mode: ConciergeMode,
    pub endpoint: String,
    pub ca_bundle: CaBundle,
}

/// Authenticator reference plus the OIDC settings it implies
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatorParams {
    pub authenticator_type: String,
    pub authenticator_name: String,
    pub oidc_issuer: Option<String>,
    pub request_audience: Option<String>,
    pub oidc_ca_bundle: Option<CaBundle>,
}

/// Resolve mode, endpoint and CA bundle from `frontend`.
///
/// `cluster` is the source kubeconfig cluster, used when a TokenCredentialRequest
/// frontend leaves its server or CA empty.
pub fn discover_concierge_params(
    request: &ConciergeRequest,
    frontend: &Frontend,
    cluster: &ClusterConfig,
) -> Result<ConciergeParams> {
    let mode = match request.mode {
        ConciergeMode::Auto => {
            let mode = ConciergeMode::of(frontend);
            match mode {
                ConciergeMode::ImpersonationProxy => {
                    info!("discovered Concierge operating in impersonation proxy mode")
                }
                _ => info!("discovered Concierge operating in TokenCredentialRequest API mode"),
            }
            mode
        }
        mode => mode,
    };

    let endpoint = match request.endpoint.as_deref().filter(|e| !e.is_empty()) {
        Some(endpoint) => endpoint.to_string(),
        None => {
            let endpoint = match frontend {
                Frontend::TokenCredentialRequestApi(info) if !info.server.is_empty() => {
                    info.server.clone()
                }
                Frontend::TokenCredentialRequestApi(_) => cluster.server.clone(),
                Frontend::ImpersonationProxy(info) => info.endpoint.clone(),
            };
            info!(endpoint = %endpoint, "discovered Concierge endpoint");
            endpoint
        }
    };

    let ca_bundle = match request.ca_bundle.as_ref().filter(|ca| !ca.is_empty()) {
        Some(ca_bundle) => ca_bundle.clone(),
        None => {
            let ca_bundle = match frontend {
                Frontend::TokenCredentialRequestApi(info)
                    if !info.certificate_authority_data.is_empty() =>
                {
                    decode_discovered_ca(&info.certificate_authority_data)?
                }
                Frontend::TokenCredentialRequestApi(_) => cluster.ca_bundle().map_err(|e| {
                    Error::malformed(
                        "discovering Concierge CA bundle",
                        format!("kubeconfig cluster has invalid certificate-authority-data: {}", e),
                    )
                })?,
                Frontend::ImpersonationProxy(info) => {
                    decode_discovered_ca(&info.certificate_authority_data)?
                }
            };
            info!(
                roots = ca_bundle.count(),
                "discovered Concierge certificate authority bundle"
            );
            ca_bundle
        }
    };

    Ok(ConciergeParams {
        mode,
        endpoint,
        ca_bundle,
    })
}

fn decode_discovered_ca(data: &str) -> Result<CaBundle> {
    CaBundle::from_base64(data).map_err(|e| {
        Error::malformed(
            "discovering Concierge CA bundle",
            format!("autodiscovered Concierge CA bundle is invalid: {}", e),
        )
    })
}

/// Resolve the authenticator reference and, for JWT authenticators, the OIDC
/// issuer, audience and CA bundle.
pub fn discover_authenticator_params(
    request: &ConciergeRequest,
    oidc: &OidcRequest,
    authenticator: &Authenticator,
) -> Result<AuthenticatorParams> {
    let kind = authenticator.kind();
    let explicit_type = request.authenticator_type.clone();
    let explicit_name = request.authenticator_name.clone();

    // A half-specified pair must agree with the discovered authenticator.
    if let Some(explicit) = explicit_type.as_deref() {
        if explicit.parse::<AuthenticatorKind>().ok() != Some(kind) {
            return Err(Error::input(format!(
                "discovered {} {:?} does not match --concierge-authenticator-type={}",
                kind.kind(),
                authenticator.name(),
                explicit
            )));
        }
    }
    if let Some(explicit) = explicit_name.as_deref() {
        if explicit != authenticator.name() {
            return Err(Error::input(format!(
                "discovered {} {:?} does not match --concierge-authenticator-name={}",
                kind.kind(),
                authenticator.name(),
                explicit
            )));
        }
    }

    if explicit_type.is_none() || explicit_name.is_none() {
        info!(kind = kind.kind(), name = authenticator.name(), "discovered authenticator");
    }

    let mut params = AuthenticatorParams {
        authenticator_type: explicit_type.unwrap_or_else(|| kind.as_str().to_string()),
        authenticator_name: explicit_name.unwrap_or_else(|| authenticator.name().to_string()),
        oidc_issuer: oidc.issuer.clone(),
        request_audience: oidc.request_audience.clone(),
        oidc_ca_bundle: oidc.ca_bundle.clone(),
    };

    let jwt = match authenticator {
        Authenticator::Jwt(jwt) => jwt,
        Authenticator::Webhook(_) => return Ok(params),
    };

    if params.oidc_issuer.is_none() && !jwt.spec.issuer.is_empty() {
        info!(issuer = %jwt.spec.issuer, "discovered OIDC issuer");
        params.oidc_issuer = Some(jwt.spec.issuer.clone());
    }

    if params.request_audience.is_none() && !jwt.spec.audience.is_empty() {
        info!(audience = %jwt.spec.audience, "discovered OIDC audience");
        params.request_audience = Some(jwt.spec.audience.clone());
    }

    let discovered_ca = jwt
        .spec
        .tls
        .as_ref()
        .and_then(|tls| tls.certificate_authority_data.as_deref())
        .filter(|data| !data.is_empty());
    if params.oidc_ca_bundle.is_none() {
        if let Some(data) = discovered_ca {
            let ca_bundle = CaBundle::from_base64(data).map_err(|e| {
                Error::malformed(
                    "discovering --oidc-ca-bundle",
                    format!(
                        "JWTAuthenticator {} has invalid spec.tls.certificateAuthorityData: {}",
                        jwt.name, e
                    ),
                )
            })?;
            info!(roots = ca_bundle.count(), "discovered OIDC CA bundle");
            params.oidc_ca_bundle = Some(ca_bundle);
        }
    }

    Ok(params)
}
