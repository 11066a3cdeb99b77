//! Network fingerprint for scoping negative cache entries
//!
//! A domain that was unreachable on one network (say, off VPN) may be fine
//! on another, so failure markers are keyed by a hash of the local network
//! interfaces and the proxy-related environment.

use sha2::{Digest, Sha256};

/// Environment variables that change how modules are fetched
const NETWORK_ENV_VARS: &[&str] = &[
    "GOPROXY",
    "GOPRIVATE",
    "GONOPROXY",
    "GOINSECURE",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
];

/// Short hex digest of the current network configuration
pub fn network_fingerprint() -> String {
    let mut summary = interface_summary().unwrap_or_default();
    for var in NETWORK_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            summary.push_str(&format!("\n{}={}", var, value));
        }
    }
    digest(&summary)
}

fn digest(summary: &str) -> String {
    let hash = Sha256::digest(summary.as_bytes());
    hex::encode(&hash[..8])
}

/// One sorted line per interface address: name, loopback, address
fn interface_summary() -> std::io::Result<String> {
    let mut lines: Vec<String> = if_addrs::get_if_addrs()?
        .into_iter()
        .map(|iface| format!("{}|{}|{}", iface.name, iface.is_loopback(), iface.ip()))
        .collect();
    lines.sort();
    Ok(lines.join("\n"))
}
