//! Reachability check for a generated kubeconfig
//!
//! Only transport-level reachability and gross server failure are tested.
//! Any status below 500, including 401 and 403, counts as reachable.

use std::time::{Duration, Instant};

use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{error, info};

use crate::deadline::{round_secs, Deadline};
use crate::descriptor::Kubeconfig;
use crate::{Error, Result};

/// Upper bound on each probe request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between probes after the first one fails.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(2);

const STEP: &str = "validating the generated kubeconfig";

/// Probe the cluster server of `kubeconfig` until it answers or the run ends.
pub async fn validate_kubeconfig(kubeconfig: &Kubeconfig, deadline: &Deadline) -> Result<()> {
    validate_kubeconfig_with_interval(kubeconfig, deadline, RETRY_INTERVAL).await
}

pub async fn validate_kubeconfig_with_interval(
    kubeconfig: &Kubeconfig,
    deadline: &Deadline,
    interval: Duration,
) -> Result<()> {
    let (server, client) = probe_target(kubeconfig)?;

    if deadline.bound(STEP, ping(&client, &server)).await.is_ok() {
        info!("validated connection to the cluster");
        return Ok(());
    }

    info!("could not immediately connect to the cluster but it may be initializing, will retry until timeout");
    let started = Instant::now();
    let mut ticker = interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;

    loop {
        tokio::select! {
            _ = deadline.done() => return Err(deadline.error(STEP)),
            _ = ticker.tick() => {
                attempts += 1;
                match deadline.bound(STEP, ping(&client, &server)).await {
                    Ok(()) => {
                        info!(attempts, "validated connection to the cluster");
                        return Ok(());
                    }
                    Err(e) if e.is_deadline() => return Err(e),
                    Err(e) => error!(
                        error = %e,
                        attempts,
                        elapsed = %round_secs(started.elapsed()),
                        remaining = %round_secs(deadline.remaining()),
                        "could not connect to cluster, retrying..."
                    ),
                }
            }
        }
    }
}

/// Server URL and an HTTP client trusting only the cluster's CA bundle.
fn probe_target(kubeconfig: &Kubeconfig) -> Result<(String, reqwest::Client)> {
    let [context] = kubeconfig.contexts.as_slice() else {
        return Err(invalid("expected exactly one context"));
    };
    let cluster = kubeconfig
        .cluster(&context.context.cluster)
        .ok_or_else(|| invalid("no cluster"))?;

    let certificates = cluster
        .ca_bundle()
        .map(|ca| ca.certificates())
        .unwrap_or_default();
    if certificates.is_empty() {
        return Err(invalid("no certificateAuthorityData"));
    }

    let mut builder = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .tls_built_in_root_certs(false);
    for certificate in certificates {
        builder = builder.add_root_certificate(certificate);
    }
    let client = builder
        .build()
        .map_err(|e| invalid(&format!("unusable certificateAuthorityData: {}", e)))?;

    Ok((cluster.server.clone(), client))
}

async fn ping(client: &reqwest::Client, server: &str) -> Result<()> {
    let response = client
        .get(server)
        .send()
        .await
        .map_err(|e| Error::http("probing the cluster", e))?;
    let status = response.status();
    if is_failure_status(status) {
        return Err(Error::malformed(
            "probing the cluster",
            format!("unexpected status code {}", status.as_u16()),
        ));
    }
    Ok(())
}

fn invalid(reason: &str) -> Error {
    Error::malformed(STEP, format!("invalid kubeconfig ({})", reason))
}

/// Any status from 500 up means the server is unhealthy; anything below
/// proves it is reachable.
fn is_failure_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() >= 500
}
