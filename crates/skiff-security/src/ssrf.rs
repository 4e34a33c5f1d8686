// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSRF guard for outbound fetches.
//!
//! Three layers, all applied by [`build_fetch_client`] plus
//! [`validate_fetch_url`]:
//! 1. Static URL checks: scheme, blocked hostnames, literal private IPs.
//! 2. A DNS resolver that drops private addresses before any connection.
//! 3. A redirect policy that re-validates every hop and bounds the chain.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use skiff_core::SkiffError;
use tracing::{error, info};
use url::{Host, Url};

/// Hostnames that are never fetched, including any subdomain.
pub const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "metadata",
    "metadata.google.internal",
    "metadata.google.com",
    "instance-data",
];

/// DNS resolver that filters out private and reserved addresses.
///
/// Addresses in the allowlist pass even when private.
pub struct SsrfSafeResolver {
    allowed_private_ips: Vec<IpAddr>,
}

impl SsrfSafeResolver {
    /// Create a resolver from textual IPs. Unparseable entries are ignored.
    pub fn new(allowed: Vec<String>) -> Self {
        Self::from_ips(
            allowed
                .iter()
                .filter_map(|s| s.parse::<IpAddr>().ok())
                .collect(),
        )
    }

    pub fn from_ips(allowed_private_ips: Vec<IpAddr>) -> Self {
        Self {
            allowed_private_ips,
        }
    }

    /// Whether `ip` is in a private, loopback, link-local, or otherwise reserved range.
    pub fn is_private(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => is_private_v4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => is_private_v4(&v4),
                None => is_private_v6(v6),
            },
        }
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    let [a, b, c, _] = v4.octets();
    v4.is_private()
        || v4.is_loopback()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        || v4.is_multicast()
        || v4.is_documentation()
        || a == 0 // 0.0.0.0/8
        || (a == 100 && (b & 0xc0) == 64) // 100.64.0.0/10 carrier-grade NAT
        || (a == 192 && b == 0 && c == 0) // 192.0.0.0/24
        || (a == 192 && b == 88 && c == 99) // 192.88.99.0/24 6to4 relay
        || (a == 198 && (b & 0xfe) == 18) // 198.18.0.0/15 benchmarking
        || a >= 240 // 240.0.0.0/4 reserved
}

fn is_private_v6(v6: &Ipv6Addr) -> bool {
    let s = v6.segments();
    v6.is_loopback()
        || v6.is_unspecified()
        || v6.is_multicast()
        || (s[0] & 0xfe00) == 0xfc00 // fc00::/7 unique local
        || (s[0] & 0xffc0) == 0xfe80 // fe80::/10 link-local
        || (s[0] == 0x2001 && s[1] == 0x0db8) // 2001:db8::/32 documentation
        || (s[0] == 0x2001 && s[1] == 0) // 2001::/32 Teredo
        || s[0] == 0x2002 // 2002::/16 6to4
        || (s[0] == 0x0064 && s[1] == 0xff9b && s[2..6] == [0, 0, 0, 0]) // 64:ff9b::/96
        || (s[0] == 0x0100 && s[1..4] == [0, 0, 0]) // 100::/64 discard
}

impl Resolve for SsrfSafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let allowed = self.allowed_private_ips.clone();
        let hostname = name.as_str().to_string();

        Box::pin(async move {
            let host = format!("{hostname}:0");
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&host)
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
                .collect();

            let filtered: Vec<SocketAddr> = addrs
                .into_iter()
                .filter(|addr| {
                    let ip = addr.ip();
                    if !SsrfSafeResolver::is_private(&ip) {
                        return true;
                    }
                    if allowed.contains(&ip) {
                        info!(ip = %ip, host = %hostname, "allowing configured private IP");
                        true
                    } else {
                        error!(ip = %ip, host = %hostname, "SSRF blocked: resolved to private IP");
                        false
                    }
                })
                .collect();

            if filtered.is_empty() {
                let err: Box<dyn std::error::Error + Send + Sync> =
                    format!("SSRF blocked: {hostname} resolves only to private IPs").into();
                return Err(err);
            }

            let addrs: Addrs = Box::new(filtered.into_iter());
            Ok(addrs)
        })
    }
}

/// Free-function form of [`SsrfSafeResolver::is_private`].
pub fn is_private_ip(ip: &IpAddr) -> bool {
    SsrfSafeResolver::is_private(ip)
}

/// Static checks on a URL before it is fetched.
///
/// Hostnames are only checked against [`BLOCKED_HOSTS`] here; their
/// resolved addresses are filtered by [`SsrfSafeResolver`].
pub fn validate_fetch_url(raw: &str, allowed_private_ips: &[IpAddr]) -> Result<Url, SkiffError> {
    let parsed =
        Url::parse(raw.trim()).map_err(|e| SkiffError::Security(format!("invalid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SkiffError::Security(
            "only http and https schemes are allowed".to_string(),
        ));
    }

    let ip = match parsed.host() {
        None => return Err(SkiffError::Security("URL has no host".to_string())),
        Some(Host::Domain(domain)) => {
            let lower = domain.to_ascii_lowercase();
            if BLOCKED_HOSTS
                .iter()
                .any(|b| lower == *b || lower.ends_with(&format!(".{b}")))
            {
                error!(host = %lower, "SSRF blocked: hostname is blocked");
                return Err(SkiffError::Security(format!("hostname is blocked: {lower}")));
            }
            None
        }
        Some(Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
    };

    if let Some(ip) = ip
        && SsrfSafeResolver::is_private(&ip)
        && !allowed_private_ips.contains(&ip)
    {
        error!(ip = %ip, url = %raw, "SSRF blocked: URL targets private IP");
        return Err(SkiffError::Security(format!(
            "SSRF blocked: URL targets private IP {ip}"
        )));
    }

    Ok(parsed)
}

/// Build the HTTP client used for fetching arbitrary URLs.
///
/// - Minimum TLS 1.2.
/// - SSRF-safe DNS resolution.
/// - Redirects are re-validated and limited to `max_redirects` hops.
pub fn build_fetch_client(
    allowed_private_ips: Vec<IpAddr>,
    timeout: Duration,
    max_redirects: usize,
) -> Result<reqwest::Client, SkiffError> {
    let resolver = SsrfSafeResolver::from_ips(allowed_private_ips.clone());
    let redirect_allow = allowed_private_ips;

    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            return attempt.error(format!("too many redirects (max {max_redirects})"));
        }
        match validate_fetch_url(attempt.url().as_str(), &redirect_allow) {
            Ok(_) => attempt.follow(),
            Err(e) => attempt.error(e.to_string()),
        }
    });

    reqwest::Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .dns_resolver(Arc::new(resolver))
        .redirect(policy)
        .timeout(timeout)
        .user_agent(concat!("skiff/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            error!("failed to build fetch client: {e}");
            SkiffError::Security(format!("failed to build fetch client: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_rfc1918() {
        for ip in ["10.0.0.1", "172.16.0.1", "172.31.255.255", "192.168.1.1"] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(is_private_ip(&ip), "{ip}");
        }
    }

    #[test]
    fn blocks_loopback_link_local_and_metadata() {
        for ip in ["127.0.0.1", "127.255.255.255", "169.254.1.1", "169.254.169.254"] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(is_private_ip(&ip), "{ip}");
        }
    }

    #[test]
    fn blocks_special_purpose_v4() {
        for ip in [
            "0.1.2.3",
            "100.64.0.1",
            "100.127.255.255",
            "192.0.0.8",
            "192.0.2.1",
            "198.18.0.1",
            "198.51.100.7",
            "203.0.113.9",
            "224.0.0.1",
            "240.0.0.1",
            "255.255.255.255",
        ] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(is_private_ip(&ip), "{ip}");
        }
    }

    #[test]
    fn blocks_special_v6() {
        for ip in ["::1", "::", "fc00::1", "fd00::1", "fe80::1", "ff02::1", "2001:db8::1"] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(is_private_ip(&ip), "{ip}");
        }
    }

    #[test]
    fn blocks_ipv4_mapped_v6() {
        let ip: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        assert!(is_private_ip(&ip));
    }

    #[test]
    fn allows_public_addresses() {
        for ip in ["8.8.8.8", "1.1.1.1", "104.18.0.1", "100.128.0.1", "2001:4860:4860::8888"] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(!is_private_ip(&ip), "{ip}");
        }
    }

    #[test]
    fn allowlist_parses_ip_strings() {
        let resolver = SsrfSafeResolver::new(vec![
            "10.0.0.1".to_string(),
            "192.168.1.100".to_string(),
            "invalid".to_string(),
        ]);
        assert_eq!(resolver.allowed_private_ips.len(), 2);
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = validate_fetch_url("ftp://example.com/file", &[]).unwrap_err();
        assert!(err.to_string().contains("only http and https"));
        assert!(validate_fetch_url("file:///etc/passwd", &[]).is_err());
    }

    #[test]
    fn rejects_blocked_hostnames() {
        assert!(validate_fetch_url("http://localhost:8080/", &[]).is_err());
        assert!(validate_fetch_url("http://metadata.google.internal/computeMetadata", &[]).is_err());
        assert!(validate_fetch_url("http://foo.localhost/", &[]).is_err());
    }

    #[test]
    fn rejects_literal_private_ips() {
        assert!(validate_fetch_url("http://10.0.0.1:8080/api", &[]).is_err());
        assert!(validate_fetch_url("http://[::1]/", &[]).is_err());
        assert!(validate_fetch_url("http://169.254.169.254/latest/meta-data", &[]).is_err());
    }

    #[test]
    fn allowlisted_private_ip_passes() {
        let allowed: Vec<IpAddr> = vec!["127.0.0.1".parse().unwrap()];
        assert!(validate_fetch_url("http://127.0.0.1:9999/x", &allowed).is_ok());
    }

    #[test]
    fn allows_public_urls() {
        let url = validate_fetch_url("https://docs.rs/tokio", &[]).unwrap();
        assert_eq!(url.host_str(), Some("docs.rs"));
        assert!(validate_fetch_url("https://1.1.1.1/", &[]).is_ok());
    }

    #[test]
    fn fetch_client_builds() {
        assert!(build_fetch_client(Vec::new(), Duration::from_secs(30), 5).is_ok());
    }
}
