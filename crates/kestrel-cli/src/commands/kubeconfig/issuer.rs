//! CredentialIssuer lookup and readiness polling

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use kestrel_common::crd::{CredentialIssuer, CREDENTIAL_ISSUER_KIND};

use super::client::ConciergeClient;
use crate::deadline::{round_secs, Deadline};
use crate::{Error, Result};

/// Interval between CredentialIssuer re-fetches while strategies are pending.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Find the single authoritative CredentialIssuer.
///
/// A named issuer must exist. Without a name, exactly one must be present.
pub async fn lookup_credential_issuer(
    client: &dyn ConciergeClient,
    name: Option<&str>,
    deadline: &Deadline,
) -> Result<CredentialIssuer> {
    if let Some(name) = name {
        return deadline
            .bound("getting CredentialIssuer", client.get_credential_issuer(name))
            .await?
            .ok_or_else(|| Error::not_found(CREDENTIAL_ISSUER_KIND, name));
    }

    let mut issuers = deadline
        .bound(
            "listing CredentialIssuer objects for autodiscovery",
            client.list_credential_issuers(),
        )
        .await?;

    match issuers.len() {
        0 => Err(Error::ambiguous("no CredentialIssuers were found", vec![])),
        1 => {
            let issuer = issuers.remove(0);
            info!(name = %issuer.name, "discovered CredentialIssuer");
            Ok(issuer)
        }
        _ => Err(Error::ambiguous(
            "multiple CredentialIssuers were found, so the --concierge-credential-issuer flag must be specified",
            issuers.into_iter().map(|issuer| issuer.name).collect(),
        )),
    }
}

/// Look up the CredentialIssuer and, unless `skip_wait`, poll it until no
/// strategy is pending.
pub async fn wait_for_credential_issuer(
    client: &dyn ConciergeClient,
    name: Option<&str>,
    skip_wait: bool,
    deadline: &Deadline,
) -> Result<CredentialIssuer> {
    let mut issuer = lookup_credential_issuer(client, name, deadline).await?;
    if skip_wait {
        return Ok(issuer);
    }

    let mut ticker = interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 1u32;

    while issuer.has_pending_strategy() {
        log_strategies(&issuer);
        info!(
            attempts,
            remaining = %round_secs(deadline.remaining()),
            "waiting for CredentialIssuer pending strategies to finish"
        );

        tokio::select! {
            _ = deadline.done() => {
                return Err(deadline.error("waiting for CredentialIssuer pending strategies to finish"));
            }
            _ = ticker.tick() => {
                issuer = lookup_credential_issuer(client, name, deadline).await?;
                attempts += 1;
            }
        }
    }

    Ok(issuer)
}

/// Log every strategy the issuer reports.
pub fn log_strategies(issuer: &CredentialIssuer) {
    for strategy in &issuer.status.strategies {
        info!(
            strategy_type = %strategy.strategy_type,
            status = %strategy.status,
            reason = %strategy.reason,
            message = %strategy.message,
            "found CredentialIssuer strategy"
        );
    }
}
