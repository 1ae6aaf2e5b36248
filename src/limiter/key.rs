//! Identity key derivation for rate limiting.
//!
//! Every request maps to exactly one identity key:
//!
//! - `token:<value>` when the request carries a non-empty token credential
//!   header (the token supersedes the client IP), or
//! - the resolved client IP address otherwise.
//!
//! IP resolution precedence: first entry of `X-Forwarded-For` (trimmed) →
//! `X-Real-IP` → the connection's peer address. Derivation is a pure function
//! of the request headers and connection metadata.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! The forwarding headers are client-provided. Deploy behind a reverse proxy
//! that overwrites (not appends to) them, and block direct access to this
//! service, or clients can rotate spoofed addresses to escape their quota.
//!
//! ## The "unknown" Fallback
//!
//! When no header matches and no peer address is available, all such requests
//! share the [`UNKNOWN_IP`] key and are collectively rate limited.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

use super::policy::KeyClass;

/// Reserved prefix marking token-based identity keys.
///
/// The prefix makes the classification derivable from the key's shape alone,
/// so the limiter never has to re-inspect the original request.
pub const TOKEN_KEY_PREFIX: &str = "token:";

/// Fallback key when no client IP can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Derive the rate limit identity key for a request.
///
/// A non-empty value in `token_header` wins over any IP resolution; the
/// returned key is then `token:<value>`. Otherwise the key is the bare client
/// IP string.
pub fn derive_key<B>(req: &Request<B>, token_header: &str) -> String {
    if let Some(value) = req.headers().get(token_header)
        && let Ok(token) = value.to_str()
        && !token.trim().is_empty()
    {
        return format!("{TOKEN_KEY_PREFIX}{}", token.trim());
    }

    client_ip(req)
}

/// Classify an identity key from its shape.
pub fn classify(key: &str) -> KeyClass {
    if key.starts_with(TOKEN_KEY_PREFIX) {
        KeyClass::Token
    } else {
        KeyClass::Ip
    }
}

/// Resolve the client IP for a request.
///
/// Checks in order (returns first match):
/// 1. `X-Forwarded-For` - first IP of the comma-separated list, trimmed
/// 2. `X-Real-IP`
/// 3. The connection's peer address, with the port dropped via the typed
///    [`SocketAddr`]
/// 4. [`UNKNOWN_IP`]
pub fn client_ip<B>(req: &Request<B>) -> String {
    // X-Forwarded-For may contain "client, proxy1, proxy2" - the client IP
    // is the first entry
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first_ip) = value.split(',').next()
        && !first_ip.trim().is_empty()
    {
        return first_ip.trim().to_string();
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
        && !value.trim().is_empty()
    {
        return value.trim().to_string();
    }

    // Peer address, available when the router is served with
    // `into_make_service_with_connect_info::<SocketAddr>()`
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    UNKNOWN_IP.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    const TOKEN_HEADER: &str = "token";

    fn request() -> axum::http::request::Builder {
        Request::builder()
    }

    #[test]
    fn test_token_header_supersedes_ip() {
        let req = request()
            .header("token", "abc123")
            .header("x-forwarded-for", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(derive_key(&req, TOKEN_HEADER), "token:abc123");
    }

    #[test]
    fn test_empty_token_falls_back_to_ip() {
        let req = request()
            .header("token", "   ")
            .header("x-forwarded-for", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(derive_key(&req, TOKEN_HEADER), "192.168.1.1");
    }

    #[test]
    fn test_xff_first_entry_trimmed() {
        let req = request()
            .header("x-forwarded-for", "  203.0.113.50 , 10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_xff_priority_over_real_ip() {
        let req = request()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "10.0.0.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = request()
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_peer_addr_strips_port() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([1, 2, 3, 4], 5678))));

        assert_eq!(client_ip(&req), "1.2.3.4");
    }

    #[test]
    fn test_no_ip_sources_is_unknown() {
        let req = request().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), UNKNOWN_IP);
    }

    #[test]
    fn test_classify_by_key_shape() {
        assert_eq!(classify("token:abc123"), KeyClass::Token);
        assert_eq!(classify("1.2.3.4"), KeyClass::Ip);
        assert_eq!(classify("2001:db8::1"), KeyClass::Ip);
        assert_eq!(classify(UNKNOWN_IP), KeyClass::Ip);
    }

    #[test]
    fn test_derive_key_ipv6_xff() {
        let req = request()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(derive_key(&req, TOKEN_HEADER), "2001:db8::1");
    }

    #[test]
    fn test_configurable_token_header_name() {
        let req = request()
            .header("x-api-token", "secret")
            .body(Body::empty())
            .unwrap();

        assert_eq!(derive_key(&req, "x-api-token"), "token:secret");
        // The default header name does not match
        assert_eq!(derive_key(&req, TOKEN_HEADER), UNKNOWN_IP);
    }
}
