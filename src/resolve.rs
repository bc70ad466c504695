//! Debuggee address resolution.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// Errors resolving the debuggee address.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The host name lookup itself failed.
    #[error("cannot resolve {host}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The lookup succeeded but returned no addresses.
    #[error("no addresses found for {0}")]
    NoAddress(String),
}

/// Resolve `address` (an IP literal or host name) and `port` to a socket
/// address.
///
/// Host names that resolve to several addresses yield the first IPv4 one,
/// or the first address of any family when there is none.
pub async fn resolve_target(address: &str, port: u16) -> Result<SocketAddr, ResolveError> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let candidates: Vec<SocketAddr> = tokio::net::lookup_host((address, port))
        .await
        .map_err(|source| ResolveError::Lookup {
            host: address.to_string(),
            source,
        })?
        .collect();

    let chosen = prefer_ipv4(&candidates).ok_or_else(|| ResolveError::NoAddress(address.into()))?;
    tracing::debug!("Resolved {} to {}", address, chosen);
    Ok(chosen)
}

fn prefer_ipv4(candidates: &[SocketAddr]) -> Option<SocketAddr> {
    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
}
