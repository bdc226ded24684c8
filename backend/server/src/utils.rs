use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Who a request counts against: the trusted proxy header, then the first
/// `X-Forwarded-For` hop, then the peer address.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    real_ip_header: &str,
) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(real_ip) = header(real_ip_header) {
        return real_ip.to_string();
    }

    if let Some(first) = header(FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return first.to_string();
    }

    peer.map(|address| address.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
