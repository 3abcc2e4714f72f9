//! Concierge authenticator lookup

use tracing::info;

use kestrel_common::crd::{Authenticator, AuthenticatorKind};

use super::client::ConciergeClient;
use crate::deadline::Deadline;
use crate::{Error, Result};

/// Find the single authenticator the generated config should name.
///
/// When both type and name are given the object is fetched directly. Otherwise
/// every kind is listed and exactly one authenticator must exist.
pub async fn lookup_authenticator(
    client: &dyn ConciergeClient,
    authenticator_type: Option<&str>,
    authenticator_name: Option<&str>,
    deadline: &Deadline,
) -> Result<Authenticator> {
    if let (Some(authenticator_type), Some(name)) = (authenticator_type, authenticator_name) {
        let kind: AuthenticatorKind = authenticator_type
            .parse()
            .map_err(|e: kestrel_common::crd::UnknownAuthenticatorType| Error::input(e.to_string()))?;
        return deadline
            .bound(
                "getting Concierge authenticator",
                client.get_authenticator(kind, name),
            )
            .await?
            .ok_or_else(|| Error::not_found(kind.kind(), name));
    }

    let mut found = Vec::new();
    for kind in AuthenticatorKind::ALL {
        let authenticators = deadline
            .bound(
                "listing Concierge authenticators for autodiscovery",
                client.list_authenticators(kind),
            )
            .await?;
        found.extend(authenticators);
    }

    match found.len() {
        0 => Err(Error::ambiguous("no authenticators were found", vec![])),
        1 => Ok(found.remove(0)),
        _ => {
            for authenticator in &found {
                info!(
                    kind = authenticator.kind().kind(),
                    name = authenticator.name(),
                    "found authenticator"
                );
            }
            Err(Error::ambiguous(
                "multiple authenticators were found, so the --concierge-authenticator-type/--concierge-authenticator-name flags must be specified",
                found
                    .iter()
                    .map(|a| format!("{}/{}", a.kind(), a.name()))
                    .collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::commands::kubeconfig::client::MockConciergeClient;
    use kestrel_common::crd::{JwtAuthenticator, WebhookAuthenticator};

    fn jwt(name: &str) -> Authenticator {
        Authenticator::Jwt(JwtAuthenticator {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn webhook(name: &str) -> Authenticator {
        Authenticator::Webhook(WebhookAuthenticator {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn explicit_type_and_name_fetch_directly() {
        let mut client = MockConciergeClient::new();
        client
            .expect_get_authenticator()
            .withf(|kind, name| *kind == AuthenticatorKind::Webhook && name == "hook")
            .times(1)
            .returning(|_, _| Ok(Some(webhook("hook"))));

        let found = lookup_authenticator(&client, Some("WEBHOOK"), Some("hook"), &deadline())
            .await
            .unwrap();
        assert_eq!(found, webhook("hook"));
    }

    #[tokio::test]
    async fn explicit_authenticator_must_exist() {
        let mut client = MockConciergeClient::new();
        client
            .expect_get_authenticator()
            .returning(|_, _| Ok(None));

        let err = lookup_authenticator(&client, Some("jwt"), Some("missing"), &deadline())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), r#"JWTAuthenticator "missing" not found"#);
    }

    #[tokio::test]
    async fn unknown_type_is_an_input_error() {
        let client = MockConciergeClient::new();
        let err = lookup_authenticator(&client, Some("saml"), Some("x"), &deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
        assert_eq!(
            err.to_string(),
            r#"invalid authenticator type "saml", supported values are "webhook" and "jwt""#
        );
    }

    #[tokio::test]
    async fn single_authenticator_is_autodiscovered() {
        let mut client = MockConciergeClient::new();
        client
            .expect_list_authenticators()
            .withf(|kind| *kind == AuthenticatorKind::Jwt)
            .returning(|_| Ok(vec![jwt("jwt1")]));
        client
            .expect_list_authenticators()
            .withf(|kind| *kind == AuthenticatorKind::Webhook)
            .returning(|_| Ok(vec![]));

        let found = lookup_authenticator(&client, None, None, &deadline())
            .await
            .unwrap();
        assert_eq!(found, jwt("jwt1"));
    }

    #[tokio::test]
    async fn partial_input_still_autodiscovers() {
        let mut client = MockConciergeClient::new();
        client
            .expect_list_authenticators()
            .withf(|kind| *kind == AuthenticatorKind::Jwt)
            .returning(|_| Ok(vec![]));
        client
            .expect_list_authenticators()
            .withf(|kind| *kind == AuthenticatorKind::Webhook)
            .returning(|_| Ok(vec![webhook("hook")]));

        let found = lookup_authenticator(&client, None, Some("hook"), &deadline())
            .await
            .unwrap();
        assert_eq!(found.name(), "hook");
    }

    #[tokio::test]
    async fn no_authenticators_is_an_error() {
        let mut client = MockConciergeClient::new();
        client
            .expect_list_authenticators()
            .returning(|_| Ok(vec![]));

        let err = lookup_authenticator(&client, None, None, &deadline())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no authenticators were found");
    }

    #[tokio::test]
    async fn multiple_authenticators_across_kinds_are_ambiguous() {
        let mut client = MockConciergeClient::new();
        client
            .expect_list_authenticators()
            .withf(|kind| *kind == AuthenticatorKind::Jwt)
            .returning(|_| Ok(vec![jwt("jwt1")]));
        client
            .expect_list_authenticators()
            .withf(|kind| *kind == AuthenticatorKind::Webhook)
            .returning(|_| Ok(vec![webhook("hook")]));

        let err = lookup_authenticator(&client, None, None, &deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ambiguous { .. }));
        assert!(err
            .to_string()
            .ends_with("Found these candidates: jwt/jwt1, webhook/hook"));
    }
}
