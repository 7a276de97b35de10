//! Client IP extraction from proxy headers.
//!
//! # Invariants
//! - Header names are matched case-insensitively.
//! - Candidate order: `CF-Connecting-IP`, `X-Forwarded-For` (left to right),
//!   `X-Real-IP`, then the socket peer address.
//! - The first public address wins; when none is public, the first
//!   parseable one is returned.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

const CANDIDATE_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Resolves the originating client address of a request.
pub fn client_ip<'a, I>(headers: I, remote_addr: Option<IpAddr>) -> Option<IpAddr>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let headers: Vec<(&str, &str)> = headers.into_iter().collect();
    let mut candidates = Vec::new();

    for wanted in CANDIDATE_HEADERS {
        for (name, value) in &headers {
            if !name.trim().eq_ignore_ascii_case(wanted) {
                continue;
            }
            candidates.extend(value.split(',').filter_map(parse_candidate));
        }
    }
    candidates.extend(remote_addr);

    candidates
        .iter()
        .copied()
        .find(is_public)
        .or_else(|| candidates.first().copied())
}

fn parse_candidate(raw: &str) -> Option<IpAddr> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
        return None;
    }
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(socket) = trimmed.parse::<SocketAddr>() {
        return Some(socket.ip());
    }
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<Ipv6Addr>().ok())
        .map(IpAddr::V6)
}

/// Whether an address is routable on the public internet.
pub fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(mapped) => is_public_v4(&mapped),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..128).contains(&b);
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || shared
        || a == 0
        || a >= 240)
}

fn is_public_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    let documentation = first == 0x2001 && ip.segments()[1] == 0x0db8;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast())
        && !unique_local
        && !link_local
        && !documentation
}
