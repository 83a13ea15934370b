//! Client IP resolution (`spec.md` §4.D).
//!
//! Single-value headers set by a specific edge/CDN product are checked
//! first, in the documented order (`Fly-Client-IP`, `CF-Connecting-IP`,
//! `Fastly-Client-IP`, `True-Client-IP`), before falling back to the
//! left-most entry of the general-purpose, comma-separated
//! `X-Forwarded-For`. All of these are attacker-controlled unless a
//! trusted proxy strips them first, which is why this always falls back
//! to the actual socket peer address rather than trusting an absent or
//! malformed header.

use crate::http::Request;
use std::net::SocketAddr;

const SINGLE_VALUE_HEADERS: &[&str] = &[
    "fly-client-ip",
    "cf-connecting-ip",
    "fastly-client-ip",
    "true-client-ip",
];

pub fn client_ip(req: &Request, peer: SocketAddr) -> String {
    for name in SINGLE_VALUE_HEADERS {
        if let Some(value) = req.header(name) {
            let candidate = value.trim();
            if !candidate.is_empty() {
                return strip_port(candidate).to_string();
            }
        }
    }

    if let Some(forwarded) = req.header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let candidate = first.trim();
            if !candidate.is_empty() {
                return strip_port(candidate).to_string();
            }
        }
    }

    peer.ip().to_string()
}

/// Strips an attached `:port` (or a bracketed IPv6 address's brackets and
/// trailing `:port`) from a forwarded-address candidate. A bare IPv6
/// address with no brackets is ambiguous with a trailing port and is left
/// untouched.
fn strip_port(candidate: &str) -> &str {
    if let Some(rest) = candidate.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
        return candidate;
    }

    if candidate.matches(':').count() == 1 {
        if let Some((host, _port)) = candidate.rsplit_once(':') {
            return host;
        }
    }

    candidate
}
