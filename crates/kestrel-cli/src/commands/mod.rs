//! CLI commands

use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::{Error, Result};

pub mod get;
pub mod kubeconfig;

/// Build a kube [`Client`] from an already-loaded [`Kubeconfig`] with options.
pub async fn kube_client_from_kubeconfig(
    kubeconfig: Kubeconfig,
    options: &KubeConfigOptions,
) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, options).await?;
    Client::try_from(config).map_err(|e| Error::kube("creating Kubernetes client", e))
}

/// Parse a duration string like "10m", "90s", "1h30m" or a raw number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let invalid = || {
        Error::input(format!(
            "invalid duration '{}', expected e.g. 10m, 90s, 1h30m",
            s
        ))
    };
    let too_large = || Error::input(format!("duration '{}' is too large", s));

    if s.is_empty() {
        return Err(invalid());
    }
    let mut total: u64 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let unit = match rest.as_bytes()[digits] {
            b'h' => 3600,
            b'm' => 60,
            b's' => 1,
            _ => return Err(invalid()),
        };
        let n: u64 = rest[..digits].parse().map_err(|_| too_large())?;
        total = n
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(too_large)?;
        rest = &rest[digits + 1..];
    }
    Ok(Duration::from_secs(total))
}
