//! SSRF (Server-Side Request Forgery) validation for remote image sources
//!
//! A `u=` URL is only fetched after:
//! - the scheme is http or https
//! - the host is on the allowlist, when one is configured
//! - neither the literal host nor any address it resolves to is private,
//!   loopback or link-local (unless private targets are explicitly allowed)

use std::net::{IpAddr, Ipv6Addr};

use tokio::net::lookup_host;
use url::{Host, Url};

/// Validate a remote source URL.
///
/// # Arguments
/// * `url` - parsed URL from the query string
/// * `allow_private_ips` - skip the private-address checks (tests, trusted networks)
/// * `allowlist` - allowed hostnames; subdomains of an entry are allowed too
///
/// # Returns
/// Ok(()) if the URL may be fetched, Err with a client-facing reason otherwise
pub async fn validate_url_for_ssrf(
    url: &Url,
    allow_private_ips: bool,
    allowlist: Option<&[String]>,
) -> Result<(), String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err("URL must start with http:// or https://".to_string());
    }

    let host = url.host().ok_or_else(|| "URL must have a host".to_string())?;
    let host_name = match &host {
        Host::Domain(domain) => domain.to_lowercase(),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    };

    if let Some(allowed_domains) = allowlist {
        let is_allowed = allowed_domains.iter().any(|allowed| {
            let allowed_lower = allowed.to_lowercase();
            host_name == allowed_lower || host_name.ends_with(&format!(".{}", allowed_lower))
        });

        if !is_allowed {
            return Err(format!(
                "URL hostname '{}' is not in the allowed list",
                host_name
            ));
        }
    }

    if allow_private_ips {
        return Ok(());
    }

    match host {
        Host::Ipv4(ip) if is_private_ip(&IpAddr::V4(ip)) => {
            return Err("Private/internal IP addresses are not allowed".to_string());
        }
        Host::Ipv6(ip) if is_private_ip(&IpAddr::V6(ip)) => {
            return Err("Private/internal IP addresses are not allowed".to_string());
        }
        Host::Domain(_)
            if host_name == "localhost"
                || host_name.ends_with(".localhost")
                || host_name.ends_with(".local")
                || host_name.ends_with(".internal")
                || host_name.ends_with(".corp") =>
        {
            return Err("Localhost and internal hostnames are not allowed".to_string());
        }
        _ => {}
    }

    // Check what the name actually points at, so a public name cannot alias an internal address
    let port = url.port_or_known_default().unwrap_or(80);
    match lookup_host((host_name.as_str(), port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_ip(&addr.ip()) {
                    return Err(format!(
                        "Hostname resolves to private/internal IP address: {}",
                        addr.ip()
                    ));
                }
            }
        }
        Err(e) => {
            // The fetch itself will fail and report the upstream as unavailable
            tracing::warn!(host = %host_name, error = %e, "Failed to resolve hostname for SSRF validation");
        }
    }

    Ok(())
}

/// Check if an IP address is private/internal
///
/// Returns true for:
/// - IPv4 private ranges: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
/// - IPv4 loopback 127.0.0.0/8, link-local 169.254.0.0/16, multicast 224.0.0.0/4, 0.0.0.0/8
/// - IPv6 loopback, unspecified, multicast, link-local fe80::/10, unique local fc00::/7
/// - IPv4-mapped IPv6 addresses of any of the above
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            octets[0] == 10
                || (octets[0] == 172 && (16..=31).contains(&octets[1]))
                || (octets[0] == 192 && octets[1] == 168)
                || octets[0] == 127
                || (octets[0] == 169 && octets[1] == 254)
                || (224..=239).contains(&octets[0])
                || octets[0] == 0
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

/// Check if IPv6 address is link-local (fe80::/10)
fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

/// Check if IPv6 address is unique local (fc00::/7)
fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
