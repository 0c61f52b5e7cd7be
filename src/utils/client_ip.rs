//! Client address extraction for visitor identification.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Returns the address used as the visitor identity.
///
/// With `behind_proxy` the first `X-Forwarded-For` entry wins, then `X-Real-IP`;
/// otherwise (or when neither header is usable) the peer socket address is used.
/// Only enable `behind_proxy` when a trusted reverse proxy sets these headers.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> String {
    if behind_proxy {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }

    peer.ip().to_string()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let from_forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let from_real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    from_forwarded_for.or_else(from_real_ip).map(str::to_string)
}
