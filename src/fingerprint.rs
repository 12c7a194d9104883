//! Pseudonymous reporter fingerprinting
//!
//! Derives a stable 8-character id from the caller's IP and a server-side
//! pepper so anonymous reports from the same source can be told apart
//! without ever storing the address.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Derive the pseudonymous reporter id for a client IP.
///
/// Last 8 hex characters of SHA-256 over a fixed-format string mixing the
/// IP with the pepper. The pepper keeps the digest from being reversed by
/// enumerating the IPv4 space offline.
pub fn reporter_id(ip: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("feedback{{user={ip},secret={pepper}}}").as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[digest.len() - 8..].to_string()
}

/// Deterministic identicon URL for a reporter id
pub fn avatar_url(seed: &str) -> String {
    format!(
        "https://api.dicebear.com/9.x/identicon/png?size=64&backgroundType=gradientLinear&backgroundColor=b6e3f4,c0aede,d1d4f9,ffd5dc,ffdfbf&seed={seed}"
    )
}

/// Extract the client IP from proxy headers.
///
/// `cf-connecting-ip` is set by the edge proxy; the first entry of
/// `x-forwarded-for` is the fallback. Returns `None` when neither is
/// present, in which case anonymous labeling is skipped entirely.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    header_value("cf-connecting-ip").or_else(|| header_value("x-forwarded-for"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_reporter_id_shape() {
        let id = reporter_id("203.0.113.7", "pepper");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_reporter_id_deterministic() {
        assert_eq!(
            reporter_id("203.0.113.7", "pepper"),
            reporter_id("203.0.113.7", "pepper")
        );
    }

    #[test]
    fn test_reporter_id_varies_with_inputs() {
        let base = reporter_id("203.0.113.7", "pepper");
        assert_ne!(base, reporter_id("203.0.113.8", "pepper"));
        assert_ne!(base, reporter_id("203.0.113.7", "other"));
    }

    #[test]
    fn test_avatar_url_embeds_seed() {
        let url = avatar_url("cafe1234");
        assert!(url.contains("seed=cafe1234"));
        assert!(url.starts_with("https://"));
    }

    #[test]
    fn test_client_ip_prefers_edge_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("198.51.100.1"));
    }

    #[test]
    fn test_client_ip_absent() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
