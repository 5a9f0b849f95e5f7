// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Longest-prefix-match tries built on top of the `prefix-trie` crate.

pub mod ip_port_prefix_trie;

pub use ip_port_prefix_trie::{IpPortPrefixTrie, ValueWithAssociatedRanges};

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use prefix_trie::PrefixMap;

use crate::prefix::{Ipv4Prefix, Ipv6Prefix, Prefix};

/// A prefix type that can be rooted (the default route) and constructed
/// from a single host address (for LPM lookups of one address).
pub trait RootedPrefix: prefix_trie::Prefix + Copy + Ord {
    type Addr: Copy;
    fn root() -> Self;
    fn host(addr: Self::Addr) -> Self;
}

impl RootedPrefix for Ipv4Net {
    type Addr = Ipv4Addr;
    fn root() -> Self {
        Ipv4Net::new(Ipv4Addr::UNSPECIFIED, 0).expect("0.0.0.0/0 is always valid")
    }
    fn host(addr: Ipv4Addr) -> Self {
        Ipv4Net::new(addr, 32).expect("/32 is always valid")
    }
}

impl RootedPrefix for Ipv6Net {
    type Addr = Ipv6Addr;
    fn root() -> Self {
        Ipv6Net::new(Ipv6Addr::UNSPECIFIED, 0).expect("::/0 is always valid")
    }
    fn host(addr: Ipv6Addr) -> Self {
        Ipv6Net::new(addr, 128).expect("/128 is always valid")
    }
}

/// A per-address-family radix tree of prefix to value, used for the per-VRF
/// route and next-hop tables. "With default" refers to the caller's
/// convention of always inserting a 0/0 entry up front: [`Self::lookup_wd`]
/// assumes a match always exists and panics otherwise, since that is an
/// invariant violation rather than a legitimate "no route" outcome.
#[derive(Debug, Clone)]
pub struct PrefixMapTrieWithDefault<P, V>
where
    P: RootedPrefix,
{
    map: PrefixMap<P, V>,
}

impl<P, V> PrefixMapTrieWithDefault<P, V>
where
    P: RootedPrefix,
{
    /// `capacity` is a sizing hint only (mirrors the NPU table-size
    /// tuning hints in the switch configuration); the underlying trie
    /// grows on demand regardless.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        tracing::debug!(capacity, "creating LPM trie");
        Self { map: PrefixMap::new() }
    }

    pub fn insert(&mut self, prefix: P, value: V) -> Option<V> {
        self.map.insert(prefix, value)
    }

    pub fn remove(&mut self, prefix: &P) -> Option<V> {
        self.map.remove(prefix)
    }

    #[must_use]
    pub fn get(&self, prefix: &P) -> Option<&V> {
        self.map.get(prefix)
    }

    pub fn get_mut(&mut self, prefix: &P) -> Option<&mut V> {
        self.map.get_mut(prefix)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &V)> {
        self.map.iter().map(|(p, v)| (*p, v))
    }

    /// Longest-prefix match for a single host address, assuming a default
    /// (0/0 or ::/0) entry is always present.
    ///
    /// # Panics
    ///
    /// Panics if no matching entry is found, which can only happen if the
    /// caller removed the default route (a VRF invariant violation).
    #[must_use]
    pub fn lookup_wd(&self, addr: P::Addr) -> (P, &V) {
        let key = P::host(addr);
        let (prefix, value) = self
            .map
            .get_lpm(&key)
            .expect("default route missing from VRF route table");
        (*prefix, value)
    }
}

impl<P, V> Default for PrefixMapTrieWithDefault<P, V>
where
    P: RootedPrefix,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

/// Alias kept for call sites that don't care about the "always has a
/// default entry" contract and just want a plain LPM trie.
pub type TrieMap<P, V> = PrefixMapTrieWithDefault<P, V>;

/// A combined IPv4/IPv6 trie keyed by the tagged-union [`Prefix`] type,
/// used where a single table must hold both address families (e.g. the
/// ACL-range and port-range tries).
#[derive(Debug, Clone)]
pub struct IpPrefixTrie<V> {
    v4: PrefixMap<Ipv4Net, V>,
    v6: PrefixMap<Ipv6Net, V>,
}

impl<V> IpPrefixTrie<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            v4: PrefixMap::new(),
            v6: PrefixMap::new(),
        }
    }

    pub fn insert(&mut self, prefix: Prefix, value: V) {
        match prefix {
            Prefix::IPV4(p) => {
                self.v4.insert(p.as_net(), value);
            }
            Prefix::IPV6(p) => {
                self.v6.insert(p.as_net(), value);
            }
        }
    }

    pub fn get_mut(&mut self, prefix: Prefix) -> Option<&mut V> {
        match prefix {
            Prefix::IPV4(p) => self.v4.get_mut(&p.as_net()),
            Prefix::IPV6(p) => self.v6.get_mut(&p.as_net()),
        }
    }

    #[must_use]
    pub fn lookup(&self, addr: std::net::IpAddr) -> Option<(Prefix, &V)> {
        match addr {
            std::net::IpAddr::V4(a) => {
                let key = Ipv4Net::host(a);
                self.v4
                    .get_lpm(&key)
                    .map(|(p, v)| (Prefix::IPV4(Ipv4Prefix::new(p.network(), p.prefix_len())), v))
            }
            std::net::IpAddr::V6(a) => {
                let key = Ipv6Net::host(a);
                self.v6
                    .get_lpm(&key)
                    .map(|(p, v)| (Prefix::IPV6(Ipv6Prefix::new(p.network(), p.prefix_len())), v))
            }
        }
    }

    /// All entries whose prefix covers `addr`, longest match first.
    pub fn matching_entries(&self, addr: std::net::IpAddr) -> Vec<(Prefix, &V)> {
        match addr {
            std::net::IpAddr::V4(a) => self
                .v4
                .iter()
                .filter(|(p, _)| p.contains(&a))
                .map(|(p, v)| (Prefix::IPV4(Ipv4Prefix::new(p.network(), p.prefix_len())), v))
                .collect(),
            std::net::IpAddr::V6(a) => self
                .v6
                .iter()
                .filter(|(p, _)| p.contains(&a))
                .map(|(p, v)| (Prefix::IPV6(Ipv6Prefix::new(p.network(), p.prefix_len())), v))
                .collect(),
        }
    }
}

impl<V> Default for IpPrefixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_wd_falls_back_to_default() {
        let mut trie: PrefixMapTrieWithDefault<Ipv4Net, &str> = PrefixMapTrieWithDefault::with_capacity(4);
        trie.insert(Ipv4Net::root(), "drop");
        trie.insert(
            Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 0), 24).unwrap(),
            "connected",
        );
        let (prefix, v) = trie.lookup_wd(Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(prefix.prefix_len(), 24);
        assert_eq!(*v, "connected");

        let (prefix, v) = trie.lookup_wd(Ipv4Addr::new(8, 8, 8, 8));
        assert_eq!(prefix.prefix_len(), 0);
        assert_eq!(*v, "drop");
    }
}
