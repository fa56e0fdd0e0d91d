//! Recovering a client's public address from the proxy headers stored with an
//! event.

use crate::types::headers::{Headers, lookup};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const FORWARDED_FOR: &str = "x-forwarded-for";
const VIEWER_ADDRESS: &str = "cloudfront-viewer-address";

/// Routable on the public internet: not private, loopback, link-local,
/// unspecified, broadcast or multicast.
pub fn is_public(value: &str) -> bool {
    match value.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => is_public_v4(addr),
        Ok(IpAddr::V6(addr)) => is_public_v6(addr),
        Err(_) => false,
    }
}

fn is_public_v4(addr: Ipv4Addr) -> bool {
    !(addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || addr.is_multicast())
}

fn is_public_v6(addr: Ipv6Addr) -> bool {
    if let Some(mapped) = addr.to_ipv4_mapped() {
        return is_public_v4(mapped);
    }
    !(addr.is_loopback()
        || addr.is_unspecified()
        || addr.is_multicast()
        || addr.is_unique_local()
        || addr.is_unicast_link_local())
}

fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

/// Splits an `X-Forwarded-For` value into its hops, dropping empty entries.
pub fn forwarded_hops(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(strip_quotes)
        .filter(|hop| !hop.is_empty())
        .collect()
}

/// Host part of a `CloudFront-Viewer-Address` value (`host:port`,
/// `[v6]:port` or a bare address).
pub fn viewer_host(value: &str) -> &str {
    let value = strip_quotes(value);
    if let Some(rest) = value.strip_prefix('[') {
        let host = match rest.find(']') {
            Some(end) => &rest[..end],
            None => rest.trim_end_matches(']'),
        };
        return host.trim();
    }
    match value.rsplit_once(':') {
        // A single colon separates host and port; more means a bare IPv6.
        Some((host, _)) if !host.contains(':') => host.trim(),
        _ => value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// Hop two of `X-Forwarded-For` is the address we stored.
    XffSecondHopMatch,
    XffFirstPublic,
    CloudfrontViewerAddress,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::XffSecondHopMatch => "xff-second-hop-match",
            Self::XffFirstPublic => "xff-first-public",
            Self::CloudfrontViewerAddress => "cloudfront-viewer-address",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoCandidate {
    NoPublicAddress,
    BadHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Found { ip: String, reason: Reason },
    None(NoCandidate),
}

impl Candidate {
    pub fn ip(&self) -> Option<&str> {
        match self {
            Self::Found { ip, .. } => Some(ip),
            Self::None(_) => None,
        }
    }
}

/// Proposes a public address for an event currently attributed to `current_ip`.
///
/// A header blob that does not decode yields `NoCandidate::BadHeaders`; it is
/// never an error.
pub fn propose(headers: &Headers, current_ip: &str) -> Candidate {
    let Ok(entries) = headers.entries() else {
        return Candidate::None(NoCandidate::BadHeaders);
    };

    let forwarded = lookup(&entries, FORWARDED_FOR).unwrap_or_default();
    let hops = forwarded_hops(forwarded);
    if let Some(first_public) = hops.iter().find(|hop| is_public(hop)) {
        let reason = match hops.get(1) {
            Some(second) if !current_ip.is_empty() && *second == current_ip => {
                Reason::XffSecondHopMatch
            }
            _ => Reason::XffFirstPublic,
        };
        return Candidate::Found {
            ip: (*first_public).to_string(),
            reason,
        };
    }

    if let Some(viewer) = lookup(&entries, VIEWER_ADDRESS) {
        let host = viewer_host(viewer);
        if is_public(host) {
            return Candidate::Found {
                ip: host.to_string(),
                reason: Reason::CloudfrontViewerAddress,
            };
        }
    }

    Candidate::None(NoCandidate::NoPublicAddress)
}
