//! Target guard run before a capture.
//!
//! Refuses non-web schemes and hosts that resolve to private, internal, or
//! reserved addresses, so the capture browser cannot be pointed at the
//! service's own network.

use std::net::IpAddr;

use shotit_core::Error;
use url::{Host, Url};

/// Error type for target validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("blocked scheme: {0}")]
    BlockedScheme(String),

    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

impl From<GuardError> for Error {
    fn from(err: GuardError) -> Self {
        Error::BlockedTarget(err.to_string())
    }
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// This covers:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges (10/8, 172.16/12, 192.168/16)
/// - Link-local addresses (169.254/16, fe80::/10)
/// - Carrier-grade NAT (100.64/10)
/// - Multicast and broadcast
/// - Unspecified addresses (0.0.0.0/8, ::)
/// - IPv6 unique local (fc00::/7)
/// - IPv4-mapped IPv6 addresses of any of the above
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || octets[0] == 0
                || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Validate that an IP address is not private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), GuardError> {
    if is_private_or_reserved(ip) { Err(GuardError::BlockedIp(ip)) } else { Ok(()) }
}

/// Validate a capture target.
///
/// IP literals are checked directly. Domain names are resolved and every
/// returned address must be public.
pub async fn check_target(target: &str) -> Result<(), GuardError> {
    let url = Url::parse(target).map_err(|e| GuardError::InvalidUrl(format!("{target}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GuardError::BlockedScheme(url.scheme().to_string()));
    }

    let port = url.port_or_known_default().unwrap_or(443);

    match url.host() {
        Some(Host::Ipv4(v4)) => validate_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => validate_ip(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let addrs: Vec<_> = tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| GuardError::DnsError(format!("{domain}: {e}")))?
                .collect();

            if addrs.is_empty() {
                return Err(GuardError::DnsError(format!("{domain}: no addresses")));
            }

            for addr in addrs {
                validate_ip(addr.ip())?;
            }
            Ok(())
        }
        None => Err(GuardError::InvalidUrl(format!("{target}: missing host"))),
    }
}
