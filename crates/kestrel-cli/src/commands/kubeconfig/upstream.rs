//! Upstream identity provider and flow selection
//!
//! IDP selection requires a unique match. Flow selection falls back to the
//! first advertised flow when several are available and none was requested.

use tracing::info;

use kestrel_common::idp_discovery::UpstreamIdp;

use crate::{Error, Result};

/// Pick exactly one IDP by explicit name and/or type, or by uniqueness.
pub fn select_upstream_idp<'a>(
    idps: &'a [UpstreamIdp],
    name: Option<&str>,
    idp_type: Option<&str>,
) -> Result<&'a UpstreamIdp> {
    let candidates = || idps.iter().map(describe).collect::<Vec<_>>();

    match (name, idp_type) {
        (Some(name), Some(idp_type)) => idps
            .iter()
            .find(|idp| idp.name == name && idp.idp_type.as_str() == idp_type)
            .ok_or_else(|| {
                Error::ambiguous(
                    format!(
                        "no Supervisor upstream identity providers with name {:?} of type {:?} were found",
                        name, idp_type
                    ),
                    candidates(),
                )
            }),
        (None, Some(idp_type)) => {
            let matching: Vec<_> = idps
                .iter()
                .filter(|idp| idp.idp_type.as_str() == idp_type)
                .collect();
            match matching.as_slice() {
                [idp] => Ok(*idp),
                [] => Err(Error::ambiguous(
                    format!(
                        "no Supervisor upstream identity providers of type {:?} were found",
                        idp_type
                    ),
                    candidates(),
                )),
                _ => Err(Error::ambiguous(
                    format!(
                        "multiple Supervisor upstream identity providers of type {:?} were found, \
                         so the --upstream-identity-provider-name flag must be specified",
                        idp_type
                    ),
                    candidates(),
                )),
            }
        }
        (Some(name), None) => {
            let matching: Vec<_> = idps.iter().filter(|idp| idp.name == name).collect();
            match matching.as_slice() {
                [idp] => Ok(*idp),
                [] => Err(Error::ambiguous(
                    format!(
                        "no Supervisor upstream identity providers with name {:?} were found",
                        name
                    ),
                    candidates(),
                )),
                _ => Err(Error::ambiguous(
                    format!(
                        "multiple Supervisor upstream identity providers with name {:?} were found, \
                         so the --upstream-identity-provider-type flag must be specified",
                        name
                    ),
                    candidates(),
                )),
            }
        }
        (None, None) => match idps {
            [idp] => Ok(idp),
            _ => Err(Error::ambiguous(
                "multiple Supervisor upstream identity providers were found, so the \
                 --upstream-identity-provider-name/--upstream-identity-provider-type flags must be specified",
                candidates(),
            )),
        },
    }
}

/// Pick the client flow for `idp`.
///
/// Supervisors that predate flow advertisement list no flows; the requested
/// flow, if any, is then passed through unchecked.
pub fn select_upstream_idp_flow(idp: &UpstreamIdp, flow: Option<&str>) -> Result<Option<String>> {
    match (idp.flows.as_slice(), flow) {
        ([], flow) => Ok(flow.map(str::to_string)),
        (flows, Some(flow)) => flows
            .iter()
            .find(|f| f.as_str() == flow)
            .map(|f| Some(f.to_string()))
            .ok_or_else(|| {
                Error::ambiguous(
                    format!(
                        "no client flow {:?} for Supervisor upstream identity provider {:?} of type {:?} were found",
                        flow,
                        idp.name,
                        idp.idp_type.as_str()
                    ),
                    flows.iter().map(|f| f.to_string()).collect(),
                )
            }),
        ([only], None) => Ok(Some(only.to_string())),
        ([first, ..], None) => {
            info!(
                idp_name = %idp.name,
                idp_type = %idp.idp_type,
                flow = %first,
                "multiple client flows found, selecting first value as default"
            );
            Ok(Some(first.to_string()))
        }
    }
}

fn describe(idp: &UpstreamIdp) -> String {
    serde_json::to_string(idp).unwrap_or_else(|_| idp.name.clone())
}
