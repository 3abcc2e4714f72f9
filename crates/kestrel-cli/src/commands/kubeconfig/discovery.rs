//! Supervisor upstream identity provider discovery
//!
//! Two stages: the issuer's standard OIDC discovery document names the
//! Supervisor's IDP listing endpoint in an extension field, and that endpoint
//! lists the upstream identity providers. An issuer without the extension is
//! simply not a Supervisor and yields nothing.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use kestrel_common::idp_discovery::{
    IdpDiscoveryResponse, OidcDiscoveryResponse, UpstreamIdp, OIDC_DISCOVERY_PATH,
};

use super::request::{OidcRequest, UpstreamSelection};
use super::upstream::{select_upstream_idp, select_upstream_idp_flow};
use crate::ca::CaBundle;
use crate::deadline::Deadline;
use crate::{Error, Result};

/// Upper bound on each discovery request.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fill in the upstream IDP selection by asking the issuer.
///
/// Returns the request's selection unchanged when the issuer does not support
/// IDP discovery or lists no IDPs.
pub async fn discover_supervisor_upstream_idp(
    oidc: &OidcRequest,
    deadline: &Deadline,
) -> Result<UpstreamSelection> {
    let requested = oidc.upstream.clone();
    let Some(issuer) = oidc.issuer.as_deref() else {
        return Ok(requested);
    };

    let http = discovery_http_client(oidc.ca_bundle.as_ref())?;

    let Some(endpoint) = discover_idps_endpoint(&http, issuer, deadline).await? else {
        debug!(issuer, "issuer does not advertise upstream identity provider discovery");
        return Ok(requested);
    };

    let idps = discover_upstream_idps(&http, &endpoint, deadline).await?;
    if idps.is_empty() {
        info!(issuer, "Supervisor has no upstream identity providers");
        return Ok(requested);
    }

    let idp = select_upstream_idp(
        &idps,
        requested.name.as_deref(),
        requested.idp_type.as_deref(),
    )?;
    let flow = select_upstream_idp_flow(idp, requested.flow.as_deref())?;

    Ok(UpstreamSelection {
        name: Some(idp.name.clone()),
        idp_type: Some(idp.idp_type.to_string()),
        flow,
    })
}

/// HTTP client trusting `ca_bundle` only, or the built-in roots when unset.
pub fn discovery_http_client(ca_bundle: Option<&CaBundle>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(DISCOVERY_TIMEOUT);
    if let Some(ca_bundle) = ca_bundle {
        let certificates = ca_bundle.certificates();
        if certificates.is_empty() {
            return Err(Error::input(
                "unable to fetch OIDC discovery data from issuer: could not parse CA bundle",
            ));
        }
        builder = builder.tls_built_in_root_certs(false);
        for certificate in certificates {
            builder = builder.add_root_certificate(certificate);
        }
    }
    builder
        .build()
        .map_err(|e| Error::http("building OIDC discovery client", e))
}

/// Stage one: read the IDP listing endpoint from the issuer's discovery document.
pub async fn discover_idps_endpoint(
    http: &reqwest::Client,
    issuer: &str,
    deadline: &Deadline,
) -> Result<Option<String>> {
    let step = "fetching OIDC discovery data from issuer";
    let url = format!("{}{}", issuer.trim_end_matches('/'), OIDC_DISCOVERY_PATH);
    let document: OidcDiscoveryResponse =
        deadline.bound(step, get_json(http, &url, step)).await?;

    if document.issuer != issuer {
        return Err(Error::malformed(
            step,
            format!(
                "issuer did not match the issuer returned by provider, expected {:?} got {:?}",
                issuer, document.issuer
            ),
        ));
    }

    Ok(document.identity_providers_endpoint().map(str::to_string))
}

/// Stage two: list the upstream identity providers.
pub async fn discover_upstream_idps(
    http: &reqwest::Client,
    endpoint: &str,
    deadline: &Deadline,
) -> Result<Vec<UpstreamIdp>> {
    let step = "fetching IDP discovery data from issuer";
    let body: IdpDiscoveryResponse = deadline.bound(step, get_json(http, endpoint, step)).await?;
    Ok(body.pinniped_identity_providers)
}

async fn get_json<T: DeserializeOwned>(http: &reqwest::Client, url: &str, step: &str) -> Result<T> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::http(step, e))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::malformed(
            step,
            format!("unexpected http response status: {}", status),
        ));
    }

    let body = response.bytes().await.map_err(|e| Error::http(step, e))?;
    serde_json::from_slice(&body)
        .map_err(|e| Error::malformed(step, format!("could not parse response JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::sync::OnceCell;

    use super::*;
    use crate::ca::tests::test_ca_pem;
    use crate::commands::kubeconfig::fake_server::serve;

    /// Serve a discovery document and IDP listing. `extension` receives the
    /// server's base URL and returns the extension value; `idps` is the body of
    /// the listing endpoint.
    async fn supervisor(
        extension: impl Fn(&str) -> Value + Send + Sync + 'static,
        idps: (StatusCode, Value),
    ) -> String {
        let base = Arc::new(OnceCell::<String>::new());
        let extension = Arc::new(extension);

        let discovery_base = base.clone();
        let app = Router::new()
            .route(
                "/issuer/.well-known/openid-configuration",
                get(move || {
                    let base = discovery_base.clone();
                    let extension = extension.clone();
                    async move {
                        let base = base.get().cloned().unwrap_or_default();
                        Json(json!({
                            "issuer": format!("{}/issuer", base),
                            "authorization_endpoint": format!("{}/issuer/oauth2/authorize", base),
                            "discovery.supervisor.pinniped.dev/v1alpha1": extension(&base),
                        }))
                    }
                }),
            )
            .route(
                "/issuer/v1alpha1/pinniped_identity_providers",
                get(|State(body): State<(StatusCode, Value)>| async move {
                    (body.0, Json(body.1))
                }),
            )
            .with_state(idps);

        let url = serve(app).await;
        base.set(url.clone()).unwrap();
        format!("{}/issuer", url)
    }

    fn listing(base: &str) -> Value {
        json!({
            "pinniped_identity_providers_endpoint":
                format!("{}/issuer/v1alpha1/pinniped_identity_providers", base)
        })
    }

    fn request(issuer: &str) -> OidcRequest {
        OidcRequest {
            issuer: Some(issuer.to_string()),
            ..Default::default()
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn selects_the_only_upstream_idp() {
        let issuer = supervisor(
            listing,
            (
                StatusCode::OK,
                json!({"pinniped_identity_providers": [
                    {"name": "okta", "type": "oidc", "flows": ["browser_authcode", "cli_password"]}
                ]}),
            ),
        )
        .await;

        let selection = discover_supervisor_upstream_idp(&request(&issuer), &deadline())
            .await
            .unwrap();
        assert_eq!(
            selection,
            UpstreamSelection {
                name: Some("okta".to_string()),
                idp_type: Some("oidc".to_string()),
                flow: Some("browser_authcode".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn empty_extension_field_means_no_discovery() {
        let issuer = supervisor(
            |_| json!({"pinniped_identity_providers_endpoint": ""}),
            (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
        )
        .await;

        let mut oidc = request(&issuer);
        oidc.upstream.name = Some("pinned".to_string());
        let selection = discover_supervisor_upstream_idp(&oidc, &deadline())
            .await
            .unwrap();
        assert_eq!(selection, oidc.upstream);
    }

    #[tokio::test]
    async fn missing_extension_field_means_no_discovery() {
        let issuer = supervisor(|_| Value::Null, (StatusCode::OK, json!({}))).await;

        let selection = discover_supervisor_upstream_idp(&request(&issuer), &deadline())
            .await
            .unwrap();
        assert_eq!(selection, UpstreamSelection::default());
    }

    #[tokio::test]
    async fn empty_idp_list_is_not_an_error() {
        let issuer = supervisor(
            listing,
            (StatusCode::OK, json!({"pinniped_identity_providers": []})),
        )
        .await;

        let selection = discover_supervisor_upstream_idp(&request(&issuer), &deadline())
            .await
            .unwrap();
        assert_eq!(selection, UpstreamSelection::default());
    }

    #[tokio::test]
    async fn non_200_listing_is_malformed() {
        let issuer = supervisor(listing, (StatusCode::BAD_REQUEST, json!({}))).await;

        let err = discover_supervisor_upstream_idp(&request(&issuer), &deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert!(err
            .to_string()
            .contains("unexpected http response status: 400 Bad Request"));
    }

    #[tokio::test]
    async fn undecodable_listing_is_malformed() {
        let issuer = supervisor(
            listing,
            (StatusCode::OK, json!({"pinniped_identity_providers": "nope"})),
        )
        .await;

        let err = discover_supervisor_upstream_idp(&request(&issuer), &deadline())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("could not parse response JSON"));
    }

    #[tokio::test]
    async fn issuer_mismatch_is_rejected() {
        let issuer = supervisor(listing, (StatusCode::OK, json!({}))).await;
        let wrong = issuer.replace("/issuer", "/issuer/");

        let http = discovery_http_client(None).unwrap();
        let err = discover_idps_endpoint(&http, &wrong, &deadline())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("issuer did not match"));
    }

    #[tokio::test]
    async fn ambiguous_idps_list_candidates() {
        let issuer = supervisor(
            listing,
            (
                StatusCode::OK,
                json!({"pinniped_identity_providers": [
                    {"name": "okta", "type": "oidc"},
                    {"name": "corp-ldap", "type": "ldap"}
                ]}),
            ),
        )
        .await;

        let err = discover_supervisor_upstream_idp(&request(&issuer), &deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ambiguous { .. }));
        assert!(err.to_string().contains(r#""name":"corp-ldap""#));
    }

    #[test]
    fn unparseable_ca_bundle_is_rejected() {
        let err = discovery_http_client(Some(&CaBundle::new("garbage"))).unwrap_err();
        assert!(err.to_string().contains("could not parse CA bundle"));
    }

    #[test]
    fn ca_bundle_is_trusted() {
        assert!(discovery_http_client(Some(&CaBundle::new(test_ca_pem()))).is_ok());
    }
}
