// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IP prefix types used as trie keys throughout the dataplane.

pub mod range_map;
pub mod with_ports;

pub use with_ports::{PortRange, PrefixWithOptionalPorts};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

/// Trait implemented by every prefix-shaped key so trie code can reason
/// about "how much of the keyspace does this cover" generically.
pub trait PrefixSize {
    /// Number of addresses covered by this prefix (saturating for /0 of an
    /// address family wider than `u128`... in practice this never
    /// saturates for IPv4/IPv6).
    fn size(&self) -> u128;
    fn length(&self) -> u8;
    fn is_root(&self) -> bool {
        self.length() == 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ipv4Prefix(Ipv4Net);

impl Ipv4Prefix {
    #[must_use]
    pub fn new(addr: Ipv4Addr, len: u8) -> Self {
        Self(Ipv4Net::new(addr, len).unwrap_or_else(|_| Ipv4Net::new(addr, 32).unwrap()))
    }
    #[must_use]
    pub fn root() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED, 0)
    }
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }
    #[must_use]
    pub fn as_net(&self) -> Ipv4Net {
        self.0
    }
}

impl PrefixSize for Ipv4Prefix {
    fn size(&self) -> u128 {
        1_u128 << (32 - u32::from(self.prefix_len()))
    }
    fn length(&self) -> u8 {
        self.prefix_len()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ipv6Prefix(Ipv6Net);

impl Ipv6Prefix {
    #[must_use]
    pub fn new(addr: Ipv6Addr, len: u8) -> Self {
        Self(Ipv6Net::new(addr, len).unwrap_or_else(|_| Ipv6Net::new(addr, 128).unwrap()))
    }
    #[must_use]
    pub fn root() -> Self {
        Self::new(Ipv6Addr::UNSPECIFIED, 0)
    }
    #[must_use]
    pub fn network(&self) -> Ipv6Addr {
        self.0.network()
    }
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }
    #[must_use]
    pub fn as_net(&self) -> Ipv6Net {
        self.0
    }
}

impl PrefixSize for Ipv6Prefix {
    fn size(&self) -> u128 {
        1_u128 << (128 - u32::from(self.prefix_len()))
    }
    fn length(&self) -> u8 {
        self.prefix_len()
    }
}

/// An address-family-tagged IP prefix: the key type for per-VRF route and
/// next-hop radix trees.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prefix {
    IPV4(Ipv4Prefix),
    IPV6(Ipv6Prefix),
}

impl Prefix {
    #[must_use]
    pub fn root_v4() -> Self {
        Prefix::IPV4(Ipv4Prefix::root())
    }
    #[must_use]
    pub fn root_v6() -> Self {
        Prefix::IPV6(Ipv6Prefix::root())
    }
    #[must_use]
    pub fn is_root(&self) -> bool {
        PrefixSize::is_root(self)
    }
    #[must_use]
    pub fn as_address(&self) -> IpAddr {
        match self {
            Prefix::IPV4(p) => IpAddr::V4(p.network()),
            Prefix::IPV6(p) => IpAddr::V6(p.network()),
        }
    }
    #[must_use]
    pub fn length(&self) -> u8 {
        PrefixSize::length(self)
    }
    #[must_use]
    pub fn is_ipv4(&self) -> bool {
        matches!(self, Prefix::IPV4(_))
    }
    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        matches!(self, Prefix::IPV6(_))
    }
}

impl PrefixSize for Prefix {
    fn size(&self) -> u128 {
        match self {
            Prefix::IPV4(p) => p.size(),
            Prefix::IPV6(p) => p.size(),
        }
    }
    fn length(&self) -> u8 {
        match self {
            Prefix::IPV4(p) => p.prefix_len(),
            Prefix::IPV6(p) => p.prefix_len(),
        }
    }
}

impl From<Ipv4Prefix> for Prefix {
    fn from(p: Ipv4Prefix) -> Self {
        Prefix::IPV4(p)
    }
}
impl From<Ipv6Prefix> for Prefix {
    fn from(p: Ipv6Prefix) -> Self {
        Prefix::IPV6(p)
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prefix::IPV4(p) => write!(f, "{}/{}", p.network(), p.prefix_len()),
            Prefix::IPV6(p) => write!(f, "{}/{}", p.network(), p.prefix_len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_prefixes_are_root() {
        assert!(Prefix::root_v4().is_root());
        assert!(Prefix::root_v6().is_root());
    }

    #[test]
    fn size_doubles_per_bit_shorter() {
        let p24 = Ipv4Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 24);
        let p23 = Ipv4Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 23);
        assert_eq!(p23.size(), p24.size() * 2);
    }
}
