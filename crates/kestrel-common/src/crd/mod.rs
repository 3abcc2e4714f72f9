//! Concierge API types
//!
//! The Concierge publishes a cluster-scoped CredentialIssuer describing how
//! clients can exchange credentials, and one or more authenticators that
//! validate the credentials being exchanged. Only the fields a client needs to
//! build a kubeconfig are modelled.

mod authenticator;
mod credential_issuer;

pub use authenticator::{
    Authenticator, AuthenticatorKind, JwtAuthenticator, JwtAuthenticatorSpec, TlsSpec,
    UnknownAuthenticatorType, WebhookAuthenticator, WebhookAuthenticatorSpec,
};
pub use credential_issuer::{
    CredentialIssuer, CredentialIssuerStatus, CredentialIssuerStrategy, Frontend,
    ImpersonationProxyInfo, KubeConfigInfo, StrategyFrontend, StrategyStatus, StrategyType,
    TokenCredentialRequestApiInfo, IMPERSONATION_PROXY_FRONTEND_TYPE, PENDING_STRATEGY_REASON,
    TOKEN_CREDENTIAL_REQUEST_API_FRONTEND_TYPE,
};

/// Version served by every Concierge API group.
pub const CONCIERGE_API_VERSION: &str = "v1alpha1";

/// Kind of the credential issuer status object.
pub const CREDENTIAL_ISSUER_KIND: &str = "CredentialIssuer";

/// Plural resource name of the credential issuer status object.
pub const CREDENTIAL_ISSUER_PLURAL: &str = "credentialissuers";
