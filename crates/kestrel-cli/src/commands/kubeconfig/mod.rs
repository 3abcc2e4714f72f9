//! `kestrel get kubeconfig` - generate a kubeconfig that logs in through the Concierge
//!
//! Starts from the operator's current kubeconfig context, autodiscovers every
//! Concierge and Supervisor parameter that was not given explicitly, and
//! prints a kubeconfig whose user runs `kestrel login` as an exec plugin.
//!
//! # Usage
//!
//! ```bash
//! # Autodiscover everything from the current context
//! kestrel get kubeconfig > cluster-kubeconfig
//!
//! # Pin the authenticator and skip the reachability check
//! kestrel get kubeconfig \
//!     --concierge-authenticator-type jwt \
//!     --concierge-authenticator-name my-jwt-authenticator \
//!     --skip-validation -o /tmp/kubeconfig
//!
//! # Static token instead of OIDC
//! kestrel get kubeconfig --static-token-env MY_TOKEN
//! ```

pub mod authenticator;
pub mod client;
pub mod discovery;
pub mod exec;
pub mod frontend;
pub mod issuer;
pub mod names;
pub mod params;
pub mod request;
pub mod upstream;
pub mod validate;

#[cfg(test)]
mod fake_server;

use std::io;
use std::path::PathBuf;

use clap::Args;
use kube::config::KubeConfigOptions;
use tracing::info;

use kestrel_common::group_suffix;

use self::authenticator::lookup_authenticator;
use self::client::{ConciergeClient, KubeConciergeClient};
use self::discovery::discover_supervisor_upstream_idp;
use self::exec::new_exec_config;
use self::frontend::select_frontend;
use self::issuer::wait_for_credential_issuer;
use self::names::load_source;
use self::params::{discover_authenticator_params, discover_concierge_params};
use self::request::{
    non_empty, ConciergeMode, ConciergeRequest, OidcRequest, ResolutionRequest,
    ResolvedConcierge, ResolvedConfig, UpstreamSelection,
};
use self::validate::validate_kubeconfig;
use super::{kube_client_from_kubeconfig, parse_duration};
use crate::ca::CaBundle;
use crate::deadline::Deadline;
use crate::descriptor::{ClusterConfig, Kubeconfig, KubeconfigNames};
use crate::{Error, Result};

/// Generate a kestrel-based kubeconfig for a cluster
#[derive(Args, Debug)]
pub struct KubeconfigArgs {
    /// Instead of doing an OIDC-based login, specify a static token
    #[arg(long)]
    pub static_token: Option<String>,

    /// Instead of doing an OIDC-based login, read a static token from the environment
    #[arg(long)]
    pub static_token_env: Option<String>,

    /// Generate a configuration which does not use the Concierge, but sends the credential to the cluster directly
    #[arg(long)]
    pub no_concierge: bool,

    /// Concierge CredentialIssuer object to use for autodiscovery (default: autodiscover)
    #[arg(long)]
    pub concierge_credential_issuer: Option<String>,

    /// Concierge authenticator type (e.g., 'webhook', 'jwt') (default: autodiscover)
    #[arg(long)]
    pub concierge_authenticator_type: Option<String>,

    /// Concierge authenticator name (default: autodiscover)
    #[arg(long)]
    pub concierge_authenticator_name: Option<String>,

    /// Concierge API group suffix
    #[arg(long, default_value = group_suffix::DEFAULT_API_GROUP_SUFFIX)]
    pub concierge_api_group_suffix: String,

    /// Skip waiting for any pending Concierge strategies to become ready
    #[arg(long)]
    pub concierge_skip_wait: bool,

    /// Path to TLS certificate authority bundle (PEM format, optional, can be repeated) to use when connecting to the Concierge
    #[arg(long)]
    pub concierge_ca_bundle: Vec<PathBuf>,

    /// API base for the Concierge endpoint
    #[arg(long)]
    pub concierge_endpoint: Option<String>,

    /// Concierge mode of operation (TokenCredentialRequestAPI or ImpersonationProxy)
    #[arg(long)]
    pub concierge_mode: Option<ConciergeMode>,

    /// OpenID Connect issuer URL (default: autodiscover)
    #[arg(long)]
    pub oidc_issuer: Option<String>,

    /// OpenID Connect client ID
    #[arg(long, default_value = "pinniped-cli")]
    pub oidc_client_id: String,

    /// TCP port for localhost listener (authorization code flow only)
    #[arg(long)]
    pub oidc_listen_port: Option<u16>,

    /// OpenID Connect scopes to request during login
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "offline_access,openid,pinniped:request-audience"
    )]
    pub oidc_scopes: Vec<String>,

    /// During OpenID Connect login, skip opening the browser (just print the URL)
    #[arg(long)]
    pub oidc_skip_browser: bool,

    /// During OpenID Connect login, skip starting a localhost callback listener
    #[arg(long, hide = true)]
    pub oidc_skip_listen: bool,

    /// Path to OpenID Connect session cache file
    #[arg(long)]
    pub oidc_session_cache: Option<String>,

    /// Path to TLS certificate authority bundle (PEM format, optional, can be repeated)
    #[arg(long)]
    pub oidc_ca_bundle: Vec<PathBuf>,

    /// Print debug logs related to the OpenID Connect session cache
    #[arg(long, hide = true)]
    pub oidc_debug_session_cache: bool,

    /// Request a token with an alternate audience using RFC8693 token exchange
    #[arg(long)]
    pub oidc_request_audience: Option<String>,

    /// The name of the upstream identity provider used during login with a Supervisor
    #[arg(long)]
    pub upstream_identity_provider_name: Option<String>,

    /// The type of the upstream identity provider used during login with a Supervisor (e.g. 'oidc', 'ldap', 'activedirectory')
    #[arg(long)]
    pub upstream_identity_provider_type: Option<String>,

    /// The type of client flow to use with the upstream identity provider (e.g. 'cli_password', 'browser_authcode')
    #[arg(long)]
    pub upstream_identity_provider_flow: Option<String>,

    /// Path to kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context name (default: current active context)
    #[arg(long)]
    pub kubeconfig_context: Option<String>,

    /// Skip final validation of the kubeconfig
    #[arg(long)]
    pub skip_validation: bool,

    /// Timeout for autodiscovery and validation (e.g. 10m, 90s, 1m30s)
    #[arg(long, default_value = "10m")]
    pub timeout: String,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Suffix to append to generated cluster, context, user kubeconfig entries
    #[arg(long, default_value = "-pinniped")]
    pub generated_name_suffix: String,

    /// Path to cluster-specific credentials cache
    #[arg(long)]
    pub credential_cache: Option<String>,

    /// Text shown to the user when the kestrel CLI is not installed
    #[arg(
        long,
        default_value = "The kestrel CLI does not appear to be installed. See the kestrel documentation for installation instructions."
    )]
    pub install_hint: String,
}

impl KubeconfigArgs {
    /// Convert parsed flags into a resolution request, reading CA bundle files.
    pub fn to_request(&self) -> Result<ResolutionRequest> {
        let concierge = if self.no_concierge {
            None
        } else {
            Some(ConciergeRequest {
                api_group_suffix: self.concierge_api_group_suffix.clone(),
                credential_issuer: non_empty(self.concierge_credential_issuer.clone()),
                authenticator_type: non_empty(self.concierge_authenticator_type.clone()),
                authenticator_name: non_empty(self.concierge_authenticator_name.clone()),
                skip_wait: self.concierge_skip_wait,
                ca_bundle: CaBundle::from_files(&self.concierge_ca_bundle)?,
                endpoint: non_empty(self.concierge_endpoint.clone()),
                mode: self.concierge_mode.unwrap_or_default(),
            })
        };

        Ok(ResolutionRequest {
            static_token: non_empty(self.static_token.clone()),
            static_token_env: non_empty(self.static_token_env.clone()),
            concierge,
            oidc: OidcRequest {
                issuer: non_empty(self.oidc_issuer.clone()),
                client_id: self.oidc_client_id.clone(),
                listen_port: self.oidc_listen_port.filter(|p| *p != 0),
                scopes: self.oidc_scopes.clone(),
                skip_browser: self.oidc_skip_browser,
                skip_listen: self.oidc_skip_listen,
                session_cache: non_empty(self.oidc_session_cache.clone()),
                debug_session_cache: self.oidc_debug_session_cache,
                ca_bundle: CaBundle::from_files(&self.oidc_ca_bundle)?,
                request_audience: non_empty(self.oidc_request_audience.clone()),
                upstream: UpstreamSelection {
                    name: non_empty(self.upstream_identity_provider_name.clone()),
                    idp_type: non_empty(self.upstream_identity_provider_type.clone()),
                    flow: non_empty(self.upstream_identity_provider_flow.clone()),
                },
            },
            credential_cache: self.credential_cache.clone(),
            install_hint: self.install_hint.clone(),
        })
    }
}

/// Run the kubeconfig command
pub async fn run(args: KubeconfigArgs) -> Result<()> {
    group_suffix::validate(&args.concierge_api_group_suffix)
        .map_err(|e| Error::input(format!("invalid API group suffix: {}", e)))?;

    let deadline = Deadline::after(parse_duration(&args.timeout)?);
    let canceller = deadline.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let request = args.to_request()?;
    let source = load_source(args.kubeconfig.as_deref(), args.kubeconfig_context.as_deref())?;
    let names = source.names.with_suffix(&args.generated_name_suffix);

    let resolved = match &request.concierge {
        Some(concierge) => {
            let options = KubeConfigOptions {
                context: Some(source.names.context.clone()),
                ..Default::default()
            };
            let client = kube_client_from_kubeconfig(source.raw.clone(), &options).await?;
            let client = KubeConciergeClient::new(client, concierge.api_group_suffix.clone());
            resolve(&request, &source.cluster, &client, &deadline).await?
        }
        None => resolve_without_concierge(&request, &source.cluster, &deadline).await?,
    };

    let kubeconfig = build_kubeconfig(&resolved, &names, std::env::current_exe)?;
    if !args.skip_validation {
        validate_kubeconfig(&kubeconfig, &deadline).await?;
    }

    write_output(&kubeconfig, args.output.as_deref())
}

/// Resolve every parameter of `request` against the cluster and issuer.
///
/// `cluster` is the source kubeconfig's cluster entry. When the Concierge is
/// enabled the resolved cluster points at the Concierge endpoint instead.
pub async fn resolve(
    request: &ResolutionRequest,
    cluster: &ClusterConfig,
    client: &dyn ConciergeClient,
    deadline: &Deadline,
) -> Result<ResolvedConfig> {
    let mut cluster = cluster.clone();
    let mut oidc = request.oidc.clone();

    let concierge = match &request.concierge {
        Some(concierge_request) => {
            let concierge =
                resolve_concierge(concierge_request, &cluster, &mut oidc, client, deadline).await?;
            cluster.server = concierge.endpoint.clone();
            cluster.set_ca_bundle(&concierge.ca_bundle);
            Some(concierge)
        }
        None => None,
    };

    finish(request, cluster, concierge, oidc, deadline).await
}

/// [`resolve`] for requests that bypass the Concierge and need no cluster API access.
pub async fn resolve_without_concierge(
    request: &ResolutionRequest,
    cluster: &ClusterConfig,
    deadline: &Deadline,
) -> Result<ResolvedConfig> {
    finish(request, cluster.clone(), None, request.oidc.clone(), deadline).await
}

async fn finish(
    request: &ResolutionRequest,
    cluster: ClusterConfig,
    concierge: Option<ResolvedConcierge>,
    mut oidc: OidcRequest,
    deadline: &Deadline,
) -> Result<ResolvedConfig> {
    oidc.upstream = resolve_upstream(&oidc, deadline).await?;

    Ok(ResolvedConfig {
        cluster,
        concierge,
        static_token: request.static_token.clone(),
        static_token_env: request.static_token_env.clone(),
        oidc,
        credential_cache: request.credential_cache.clone(),
        install_hint: request.install_hint.clone(),
    })
}

async fn resolve_concierge(
    request: &ConciergeRequest,
    cluster: &ClusterConfig,
    oidc: &mut OidcRequest,
    client: &dyn ConciergeClient,
    deadline: &Deadline,
) -> Result<ResolvedConcierge> {
    // Independent lookups; the issuer error is reported first when both fail.
    let (issuer, authenticator) = tokio::join!(
        wait_for_credential_issuer(
            client,
            request.credential_issuer.as_deref(),
            request.skip_wait,
            deadline,
        ),
        lookup_authenticator(
            client,
            request.authenticator_type.as_deref(),
            request.authenticator_name.as_deref(),
            deadline,
        ),
    );
    let issuer = issuer?;
    let authenticator = authenticator?;

    let frontend = select_frontend(&issuer, request.mode)?;
    let concierge_params = discover_concierge_params(request, &frontend, cluster)?;
    let authenticator_params = discover_authenticator_params(request, oidc, &authenticator)?;

    oidc.issuer = authenticator_params.oidc_issuer;
    oidc.request_audience = authenticator_params.request_audience;
    oidc.ca_bundle = authenticator_params.oidc_ca_bundle;

    Ok(ResolvedConcierge {
        api_group_suffix: request.api_group_suffix.clone(),
        mode: concierge_params.mode,
        authenticator_type: authenticator_params.authenticator_type,
        authenticator_name: authenticator_params.authenticator_name,
        endpoint: concierge_params.endpoint,
        ca_bundle: concierge_params.ca_bundle,
    })
}

/// Ask the Supervisor for upstream IDP details unless all three were pinned.
async fn resolve_upstream(oidc: &OidcRequest, deadline: &Deadline) -> Result<UpstreamSelection> {
    if oidc.issuer.is_none() || oidc.upstream.is_complete() {
        return Ok(oidc.upstream.clone());
    }
    discover_supervisor_upstream_idp(oidc, deadline).await
}

/// Assemble the generated kubeconfig from resolved parameters.
pub fn build_kubeconfig(
    resolved: &ResolvedConfig,
    names: &KubeconfigNames,
    path_to_self: impl FnOnce() -> io::Result<PathBuf>,
) -> Result<Kubeconfig> {
    let exec = new_exec_config(resolved, path_to_self)?;
    Ok(Kubeconfig::new_exec(resolved.cluster.clone(), exec, names))
}

fn write_output(kubeconfig: &Kubeconfig, output: Option<&str>) -> Result<()> {
    let yaml = kubeconfig.to_yaml()?;
    match output {
        Some(path) => {
            std::fs::write(path, &yaml).map_err(|e| {
                Error::input(format!("could not write kubeconfig to {}: {}", path, e))
            })?;
            info!(path, "kubeconfig written");
        }
        None => print!("{}", yaml),
    }
    Ok(())
}
