//! Client address resolution for audit entries.
//!
//! The resolved address is recorded on audit entries and keys quotas only
//! for anonymous callers; authenticated quotas follow the user id.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// The caller's IP address, if one can be determined.
///
/// Resolution order: first entry of `X-Forwarded-For`, then `X-Real-IP`,
/// then the socket peer address. Header values that do not parse as an IP
/// address are ignored. Never rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientIp(resolve_client_ip(&parts.headers, peer)))
    }
}

fn resolve_client_ip(headers: &HeaderMap, peer: Option<String>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(parse_ip);
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_ip);
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    peer
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}
