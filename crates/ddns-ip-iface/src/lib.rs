// # Interface Address Source
//
// This crate provides the internal-mode address source for the DDNS agent.
//
// ## Selection Rule
//
// Walk the host's interfaces in enumeration order and take the first IPv4
// address that is not a loopback address. IPv6 addresses are ignored.
// If nothing qualifies the host is considered offline and discovery fails
// with `Error::NoNetwork`.
//
// ## Platform Support
//
// Interface enumeration goes through the `netdev` crate, which covers
// Linux, macOS, Windows and the BSDs.

use ddns_core::config::DiscoveryMode;
use ddns_core::traits::AddressSource;
use ddns_core::{Error, Result};

use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// Address source that reads the host's own interfaces
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceAddressSource;

impl InterfaceAddressSource {
    /// Create a new interface address source
    pub fn new() -> Self {
        Self
    }

    /// Enumerate `(interface is loopback, address)` pairs for every IPv4
    /// address on every interface
    fn enumerate() -> Vec<(bool, Ipv4Addr)> {
        netdev::get_interfaces()
            .into_iter()
            .flat_map(|iface| {
                let loopback = iface.is_loopback();
                trace!("Interface {}: {} IPv4 address(es)", iface.name, iface.ipv4.len());
                iface
                    .ipv4
                    .iter()
                    .map(move |net| (loopback, net.addr()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Pick the first non-loopback IPv4 address
///
/// An address counts as loopback when its interface is flagged as loopback
/// or the address itself is in 127.0.0.0/8.
pub fn select_address<I>(candidates: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = (bool, Ipv4Addr)>,
{
    candidates
        .into_iter()
        .find(|(iface_loopback, ip)| !iface_loopback && !ip.is_loopback())
        .map(|(_, ip)| ip)
}

#[async_trait::async_trait]
impl AddressSource for InterfaceAddressSource {
    async fn discover(&self) -> Result<String> {
        // Enumeration is a blocking syscall sequence
        let candidates = tokio::task::spawn_blocking(Self::enumerate)
            .await
            .map_err(|e| Error::ip_source(format!("Interface enumeration failed: {}", e)))?;

        debug!("Found {} IPv4 address(es) on local interfaces", candidates.len());

        select_address(candidates)
            .map(|ip| ip.to_string())
            .ok_or_else(|| Error::no_network("not connected to any network"))
    }

    fn mode(&self) -> DiscoveryMode {
        DiscoveryMode::Internal
    }
}
