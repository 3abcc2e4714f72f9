//! Exec credential plugin assembly
//!
//! The generated kubeconfig runs `kestrel login static` or `kestrel login oidc`
//! with one flag per resolved, non-default parameter.

use std::io;
use std::path::PathBuf;

use super::request::ResolvedConfig;
use crate::descriptor::{ExecConfig, EXEC_API_VERSION};
use crate::{Error, Result};

/// Build the exec plugin configuration for `resolved`.
///
/// `path_to_self` locates the running executable; the generated kubeconfig
/// invokes it directly.
pub fn new_exec_config(
    resolved: &ResolvedConfig,
    path_to_self: impl FnOnce() -> io::Result<PathBuf>,
) -> Result<ExecConfig> {
    let command = path_to_self().map_err(Error::SelfPath)?;

    let mut args = Vec::new();

    if let Some(concierge) = &resolved.concierge {
        args.push("--enable-concierge".to_string());
        args.push(format!(
            "--concierge-api-group-suffix={}",
            concierge.api_group_suffix
        ));
        args.push(format!(
            "--concierge-authenticator-name={}",
            concierge.authenticator_name
        ));
        args.push(format!(
            "--concierge-authenticator-type={}",
            concierge.authenticator_type
        ));
        args.push(format!("--concierge-endpoint={}", concierge.endpoint));
        args.push(format!(
            "--concierge-ca-bundle-data={}",
            concierge.ca_bundle.to_base64()
        ));
    }

    if let Some(path) = &resolved.credential_cache {
        args.push(format!("--credential-cache={}", path));
    }

    let subcommand = match (&resolved.static_token, &resolved.static_token_env) {
        (Some(_), Some(_)) => {
            return Err(Error::input(
                "only one of --static-token and --static-token-env can be specified",
            ));
        }
        (Some(token), None) => {
            args.push(format!("--token={}", token));
            "static"
        }
        (None, Some(env)) => {
            args.push(format!("--token-env={}", env));
            "static"
        }
        (None, None) => {
            push_oidc_args(resolved, &mut args)?;
            "oidc"
        }
    };

    args.splice(0..0, ["login".to_string(), subcommand.to_string()]);

    Ok(ExecConfig {
        api_version: EXEC_API_VERSION.to_string(),
        command: command.display().to_string(),
        args,
        env: Vec::new(),
        provide_cluster_info: true,
        install_hint: resolved.install_hint.clone(),
    })
}

fn push_oidc_args(resolved: &ResolvedConfig, args: &mut Vec<String>) -> Result<()> {
    let oidc = &resolved.oidc;
    let issuer = oidc
        .issuer
        .as_deref()
        .ok_or_else(|| Error::input("could not autodiscover --oidc-issuer and none was provided"))?;

    args.push(format!("--issuer={}", issuer));
    args.push(format!("--client-id={}", oidc.client_id));
    args.push(format!("--scopes={}", oidc.scopes.join(",")));

    if oidc.skip_browser {
        args.push("--skip-browser".to_string());
    }
    if oidc.skip_listen {
        args.push("--skip-listen".to_string());
    }
    if let Some(port) = oidc.listen_port.filter(|p| *p != 0) {
        args.push(format!("--listen-port={}", port));
    }
    if let Some(ca_bundle) = oidc.ca_bundle.as_ref().filter(|ca| !ca.is_empty()) {
        args.push(format!("--ca-bundle-data={}", ca_bundle.to_base64()));
    }
    if let Some(path) = &oidc.session_cache {
        args.push(format!("--session-cache={}", path));
    }
    if oidc.debug_session_cache {
        args.push("--debug-session-cache".to_string());
    }
    if let Some(audience) = &oidc.request_audience {
        args.push(format!("--request-audience={}", audience));
    }
    if let Some(name) = &oidc.upstream.name {
        args.push(format!("--upstream-identity-provider-name={}", name));
    }
    if let Some(idp_type) = &oidc.upstream.idp_type {
        args.push(format!("--upstream-identity-provider-type={}", idp_type));
    }
    if let Some(flow) = &oidc.upstream.flow {
        args.push(format!("--upstream-identity-provider-flow={}", flow));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::CaBundle;
    use crate::commands::kubeconfig::request::{
        ConciergeMode, OidcRequest, ResolvedConcierge, UpstreamSelection,
    };
    use crate::descriptor::ClusterConfig;

    fn self_path() -> io::Result<PathBuf> {
        Ok(PathBuf::from("/usr/local/bin/kestrel"))
    }

    fn resolved() -> ResolvedConfig {
        ResolvedConfig {
            cluster: ClusterConfig::default(),
            concierge: None,
            static_token: None,
            static_token_env: None,
            oidc: OidcRequest {
                issuer: Some("https://issuer.example.com".to_string()),
                client_id: "kestrel-cli".to_string(),
                scopes: vec!["openid".to_string(), "offline_access".to_string()],
                ..Default::default()
            },
            credential_cache: None,
            install_hint: "install kestrel".to_string(),
        }
    }

    fn concierge() -> ResolvedConcierge {
        ResolvedConcierge {
            api_group_suffix: "pinniped.dev".to_string(),
            mode: ConciergeMode::TokenCredentialRequestApi,
            authenticator_type: "jwt".to_string(),
            authenticator_name: "jwt1".to_string(),
            endpoint: "https://concierge".to_string(),
            ca_bundle: CaBundle::new("ca"),
        }
    }

    #[test]
    fn minimal_oidc_config() {
        let exec = new_exec_config(&resolved(), self_path).unwrap();

        assert_eq!(exec.api_version, EXEC_API_VERSION);
        assert_eq!(exec.command, "/usr/local/bin/kestrel");
        assert!(exec.provide_cluster_info);
        assert!(exec.env.is_empty());
        assert_eq!(exec.install_hint, "install kestrel");
        assert_eq!(
            exec.args,
            vec![
                "login",
                "oidc",
                "--issuer=https://issuer.example.com",
                "--client-id=kestrel-cli",
                "--scopes=openid,offline_access",
            ]
        );
    }

    #[test]
    fn full_oidc_config_with_concierge() {
        let mut resolved = resolved();
        resolved.concierge = Some(concierge());
        resolved.credential_cache = Some(String::new());
        resolved.oidc.skip_browser = true;
        resolved.oidc.skip_listen = true;
        resolved.oidc.listen_port = Some(1234);
        resolved.oidc.ca_bundle = Some(CaBundle::new("oidc-ca"));
        resolved.oidc.session_cache = Some("/tmp/sessions.yaml".to_string());
        resolved.oidc.debug_session_cache = true;
        resolved.oidc.request_audience = Some("aud1".to_string());
        resolved.oidc.upstream = UpstreamSelection {
            name: Some("okta".to_string()),
            idp_type: Some("oidc".to_string()),
            flow: Some("browser_authcode".to_string()),
        };

        let exec = new_exec_config(&resolved, self_path).unwrap();
        assert_eq!(
            exec.args,
            vec![
                "login",
                "oidc",
                "--enable-concierge",
                "--concierge-api-group-suffix=pinniped.dev",
                "--concierge-authenticator-name=jwt1",
                "--concierge-authenticator-type=jwt",
                "--concierge-endpoint=https://concierge",
                "--concierge-ca-bundle-data=Y2E=",
                "--credential-cache=",
                "--issuer=https://issuer.example.com",
                "--client-id=kestrel-cli",
                "--scopes=openid,offline_access",
                "--skip-browser",
                "--skip-listen",
                "--listen-port=1234",
                "--ca-bundle-data=b2lkYy1jYQ==",
                "--session-cache=/tmp/sessions.yaml",
                "--debug-session-cache",
                "--request-audience=aud1",
                "--upstream-identity-provider-name=okta",
                "--upstream-identity-provider-type=oidc",
                "--upstream-identity-provider-flow=browser_authcode",
            ]
        );
    }

    #[test]
    fn static_token_short_circuits_oidc() {
        let mut resolved = resolved();
        resolved.oidc.issuer = None;
        resolved.concierge = Some(concierge());
        resolved.static_token = Some("secret".to_string());

        let exec = new_exec_config(&resolved, self_path).unwrap();
        assert_eq!(exec.args[..2], ["login", "static"]);
        assert_eq!(exec.args.last().unwrap(), "--token=secret");
        assert!(!exec.args.iter().any(|a| a.starts_with("--issuer")));
    }

    #[test]
    fn static_token_env() {
        let mut resolved = resolved();
        resolved.static_token_env = Some("MY_TOKEN".to_string());
        resolved.credential_cache = Some("/tmp/creds".to_string());

        let exec = new_exec_config(&resolved, self_path).unwrap();
        assert_eq!(
            exec.args,
            vec![
                "login",
                "static",
                "--credential-cache=/tmp/creds",
                "--token-env=MY_TOKEN"
            ]
        );
    }

    #[test]
    fn both_static_flags_conflict() {
        let mut resolved = resolved();
        resolved.static_token = Some("secret".to_string());
        resolved.static_token_env = Some("MY_TOKEN".to_string());

        let err = new_exec_config(&resolved, self_path).unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
    }

    #[test]
    fn missing_issuer_is_fatal() {
        let mut resolved = resolved();
        resolved.oidc.issuer = None;

        let err = new_exec_config(&resolved, self_path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not autodiscover --oidc-issuer and none was provided"
        );
    }

    #[test]
    fn unresolvable_executable_is_fatal() {
        let err = new_exec_config(&resolved(), || {
            Err(io::Error::new(io::ErrorKind::NotFound, "no /proc"))
        })
        .unwrap_err();
        assert!(matches!(err, Error::SelfPath(_)));
    }
}
