//! Concierge API access
//!
//! The Concierge API groups carry a configurable suffix, so objects are
//! fetched as dynamic objects against the suffixed group and decoded into the
//! typed views from `kestrel_common::crd`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use kube::Client;
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;

use kestrel_common::crd::{
    Authenticator, AuthenticatorKind, CredentialIssuer, JwtAuthenticator, WebhookAuthenticator,
    CONCIERGE_API_VERSION, CREDENTIAL_ISSUER_KIND, CREDENTIAL_ISSUER_PLURAL,
};
use kestrel_common::group_suffix;

use crate::{Error, Result};

/// Upper bound on a single cluster API call.
pub const KUBE_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Read access to the Concierge objects needed for autodiscovery
///
/// Lookups by name return `Ok(None)` when the object does not exist.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConciergeClient: Send + Sync {
    /// Get a CredentialIssuer by name
    async fn get_credential_issuer(&self, name: &str) -> Result<Option<CredentialIssuer>>;

    /// List every CredentialIssuer
    async fn list_credential_issuers(&self) -> Result<Vec<CredentialIssuer>>;

    /// Get an authenticator of `kind` by name
    async fn get_authenticator(
        &self,
        kind: AuthenticatorKind,
        name: &str,
    ) -> Result<Option<Authenticator>>;

    /// List every authenticator of `kind`
    async fn list_authenticators(&self, kind: AuthenticatorKind) -> Result<Vec<Authenticator>>;
}

/// [`ConciergeClient`] backed by the cluster API
pub struct KubeConciergeClient {
    client: Client,
    api_group_suffix: String,
}

impl KubeConciergeClient {
    pub fn new(client: Client, api_group_suffix: impl Into<String>) -> Self {
        Self {
            client,
            api_group_suffix: api_group_suffix.into(),
        }
    }

    fn credential_issuers(&self) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(
            &group_suffix::config_group(&self.api_group_suffix),
            CONCIERGE_API_VERSION,
            CREDENTIAL_ISSUER_KIND,
        );
        Api::all_with(
            self.client.clone(),
            &ApiResource::from_gvk_with_plural(&gvk, CREDENTIAL_ISSUER_PLURAL),
        )
    }

    fn authenticators(&self, kind: AuthenticatorKind) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(
            &group_suffix::authentication_group(&self.api_group_suffix),
            CONCIERGE_API_VERSION,
            kind.kind(),
        );
        Api::all_with(
            self.client.clone(),
            &ApiResource::from_gvk_with_plural(&gvk, kind.plural()),
        )
    }
}

#[async_trait]
impl ConciergeClient for KubeConciergeClient {
    async fn get_credential_issuer(&self, name: &str) -> Result<Option<CredentialIssuer>> {
        let step = format!("getting CredentialIssuer {:?}", name);
        let obj = with_timeout(&step, self.credential_issuers().get_opt(name)).await?;
        obj.map(|obj| decode_credential_issuer(&obj)).transpose()
    }

    async fn list_credential_issuers(&self) -> Result<Vec<CredentialIssuer>> {
        let step = "listing CredentialIssuer objects for autodiscovery";
        let list = with_timeout(step, self.credential_issuers().list(&ListParams::default())).await?;
        list.items.iter().map(decode_credential_issuer).collect()
    }

    async fn get_authenticator(
        &self,
        kind: AuthenticatorKind,
        name: &str,
    ) -> Result<Option<Authenticator>> {
        let step = format!("getting {} {:?}", kind.kind(), name);
        let obj = with_timeout(&step, self.authenticators(kind).get_opt(name)).await?;
        obj.map(|obj| decode_authenticator(kind, &obj)).transpose()
    }

    async fn list_authenticators(&self, kind: AuthenticatorKind) -> Result<Vec<Authenticator>> {
        let step = format!("listing {} objects for autodiscovery", kind.kind());
        let list = with_timeout(&step, self.authenticators(kind).list(&ListParams::default())).await?;
        list.items
            .iter()
            .map(|obj| decode_authenticator(kind, obj))
            .collect()
    }
}

async fn with_timeout<T, F>(step: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, kube::Error>>,
{
    match tokio::time::timeout(KUBE_CALL_TIMEOUT, fut).await {
        Ok(result) => result.map_err(|e| Error::kube(step, e)),
        Err(_) => Err(Error::DeadlineExceeded {
            step: step.to_string(),
        }),
    }
}

fn decode_credential_issuer(obj: &DynamicObject) -> Result<CredentialIssuer> {
    let name = obj.metadata.name.clone().unwrap_or_default();
    Ok(CredentialIssuer {
        status: decode_field(obj, "status", CREDENTIAL_ISSUER_KIND, &name)?,
        name,
    })
}

fn decode_authenticator(kind: AuthenticatorKind, obj: &DynamicObject) -> Result<Authenticator> {
    let name = obj.metadata.name.clone().unwrap_or_default();
    Ok(match kind {
        AuthenticatorKind::Webhook => Authenticator::Webhook(WebhookAuthenticator {
            spec: decode_field(obj, "spec", kind.kind(), &name)?,
            name,
        }),
        AuthenticatorKind::Jwt => Authenticator::Jwt(JwtAuthenticator {
            spec: decode_field(obj, "spec", kind.kind(), &name)?,
            name,
        }),
    })
}

/// Decode a top-level field of a dynamic object, defaulting when absent.
fn decode_field<T>(obj: &DynamicObject, field: &str, kind: &str, name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match obj.data.get(field) {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            Error::malformed(
                format!("decoding {} {:?}", kind, name),
                format!("invalid {}: {}", field, e),
            )
        }),
    }
}
