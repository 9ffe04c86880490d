//! Address extractor
//!
//! Derives the target addresses for an update from the request: explicit
//! `myip`/`myipv6` query parameters win; when neither is supplied the
//! observed connection address stands in for its own family. ddclient
//! variants send a single IPv4, a single IPv6, or a comma-separated
//! dual-stack list in `myip`, so all three forms are accepted.

use crate::error::{Error, Result};
use crate::request::TargetAddresses;
use std::net::IpAddr;

/// Resolve the target addresses from the explicit parameters and the
/// observed connection address.
///
/// `myip` and `myipv6` are the raw query parameter values, if present.
/// Returns an error when an explicit parameter is unparseable, assigns a
/// family twice, or no target can be determined at all.
pub fn resolve_targets(
    myip: Option<&str>,
    myipv6: Option<&str>,
    observed: Option<IpAddr>,
) -> Result<TargetAddresses> {
    let mut targets = TargetAddresses::default();

    if let Some(list) = myip {
        for part in list.split(',') {
            let addr: IpAddr = part.trim().parse().map_err(|_| {
                Error::invalid_request(format!("unparseable myip value: {part:?}"))
            })?;
            assign(&mut targets, addr)?;
        }
    }

    if let Some(raw) = myipv6 {
        let addr: IpAddr = raw
            .trim()
            .parse()
            .map_err(|_| Error::invalid_request(format!("unparseable myipv6 value: {raw:?}")))?;
        if !addr.is_ipv6() {
            return Err(Error::invalid_request("myipv6 must be an IPv6 address"));
        }
        assign(&mut targets, addr)?;
    }

    // No explicit address at all: fall back to the address the connection
    // was observed from, whichever family that is.
    if targets.is_empty() {
        if let Some(addr) = observed {
            assign(&mut targets, addr)?;
        }
    }

    if targets.is_empty() {
        return Err(Error::invalid_request(
            "no target address supplied or observable",
        ));
    }

    Ok(targets)
}

fn assign(targets: &mut TargetAddresses, addr: IpAddr) -> Result<()> {
    match addr {
        IpAddr::V4(v4) => {
            if targets.v4.replace(v4).is_some() {
                return Err(Error::invalid_request("multiple IPv4 target addresses"));
            }
        }
        IpAddr::V6(v6) => {
            if targets.v6.replace(v6).is_some() {
                return Err(Error::invalid_request("multiple IPv6 target addresses"));
            }
        }
    }
    Ok(())
}
