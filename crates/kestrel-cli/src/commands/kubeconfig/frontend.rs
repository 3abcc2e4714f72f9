//! Concierge frontend selection
//!
//! Strategies are walked in the order the Concierge reports them and the first
//! healthy one with a usable frontend wins. The order is never re-sorted.

use std::borrow::Cow;

use kestrel_common::crd::{
    CredentialIssuer, CredentialIssuerStatus, CredentialIssuerStrategy, Frontend,
    StrategyFrontend, StrategyStatus, StrategyType, TokenCredentialRequestApiInfo,
    TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE,
};

use super::issuer::log_strategies;
use super::request::ConciergeMode;
use crate::{Error, Result};

/// Pick the frontend the generated config should use for `mode`.
pub fn select_frontend(issuer: &CredentialIssuer, mode: ConciergeMode) -> Result<Frontend> {
    let found = issuer
        .status
        .strategies
        .iter()
        .filter(|strategy| strategy.status == StrategyStatus::Success)
        .filter_map(|strategy| effective_frontend(strategy, &issuer.status))
        .filter_map(|frontend| frontend.to_frontend())
        .find(|frontend| mode.matches(frontend));

    if let Some(frontend) = found {
        return Ok(frontend);
    }

    log_strategies(issuer);
    let candidates = issuer
        .status
        .strategies
        .iter()
        .map(|s| format!("{}/{}/{}", s.strategy_type, s.status, s.reason))
        .collect();
    let message = match mode {
        ConciergeMode::Auto => "could not autodiscover --concierge-mode".to_string(),
        mode => format!(
            "could not find successful Concierge strategy matching --concierge-mode={}",
            mode
        ),
    };
    Err(Error::ambiguous(message, candidates))
}

/// The strategy's frontend, backfilled from the legacy `kubeConfigInfo` block
/// for older Concierges that predate per-strategy frontends.
fn effective_frontend<'a>(
    strategy: &'a CredentialIssuerStrategy,
    status: &CredentialIssuerStatus,
) -> Option<Cow<'a, StrategyFrontend>> {
    match (&strategy.frontend, &status.kube_config_info) {
        (Some(frontend), _) => Some(Cow::Borrowed(frontend)),
        (None, Some(info)) if strategy.strategy_type == StrategyType::KubeClusterSigningCertificate => {
            Some(Cow::Owned(StrategyFrontend {
                frontend_type: TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE.to_string(),
                token_credential_request_info: Some(TokenCredentialRequestApiInfo {
                    server: info.server.clone(),
                    certificate_authority_data: info.certificate_authority_data.clone(),
                }),
                impersonation_proxy_info: None,
            }))
        }
        _ => None,
    }
}
