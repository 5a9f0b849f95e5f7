// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`IpPortPrefixTrie`] is an [`IpPrefixTrie`] variant with support for port ranges.
//!
//! The struct provides a way to look up a tuple (IP address, port) in a trie of IP prefixes with
//! associated (optional) port ranges.

use crate::prefix::Prefix;
use crate::trie::IpPrefixTrie;
use std::fmt::Debug;
use std::net::IpAddr;

/// Trait for trie values to associate with IP prefixes. This values contain a port range. How the
/// port range is implemented does not matter, but it must implement the methods in this trait, for
/// the lookup to work correctly.
pub trait ValueWithAssociatedRanges {
    // Return true if the port range in the value covers all existing port values.
    // This is typically the case if the port range is optional and empty, in which case the IP
    // prefix is assumed to apply to all ports.
    fn covers_all_ports(&self) -> bool;
    // Return true if the port range in the value covers the given port.
    fn covers_port(&self, port: u16) -> bool;
}

/// An [`IpPrefixTrie`] variant with support for port ranges, for disjoint combinations of IP
/// prefixes and port ranges.
///
/// The struct provides a way to look up a tuple (IP address, port) in a trie of IP prefixes with
/// associated (optional) port ranges.
///
/// Internally, it is a LPM trie with IP prefixes as keys. Each key is associated with a value that
/// contains a port range. The lookup is more complex than a simple LPM lookup: we need to find the
/// prefix, but also the port range associated to an (IP address, port) tuple. All prefixes with
/// their associated port range are disjoint, but we can have colliding or identical prefixes, with
/// disjoint port ranges. So the lookup works this way:
///
/// - Iterate over all IP prefixes matching the given IP address
/// - For each matching prefix, check if the port range associated with it covers the given port
/// - Return the first match we find: as the combinations (IP prefix, port range) are disjoint,
///   there can be no more than one match.
#[derive(Debug, Clone)]
pub struct IpPortPrefixTrie<V>(IpPrefixTrie<V>)
where
    V: Debug + Clone + ValueWithAssociatedRanges;

impl<V> IpPortPrefixTrie<V>
where
    V: Debug + Clone + ValueWithAssociatedRanges,
{
    /// Create a new empty [`IpPortPrefixTrie`].
    #[must_use]
    pub fn new() -> Self {
        Self(IpPrefixTrie::new())
    }

    /// Create a new [`IpPortPrefixTrie`] with a single prefix and value.
    #[must_use]
    pub fn from(prefix: Prefix, value: V) -> Self {
        let mut trie = Self::new();
        trie.0.insert(prefix, value);
        trie
    }

    /// Insert a prefix and value into the trie.
    pub fn insert(&mut self, prefix: Prefix, value: V) {
        self.0.insert(prefix, value);
    }

    /// Get a mutable reference to the value associated with a prefix.
    pub fn get_mut(&mut self, prefix: Prefix) -> Option<&mut V> {
        self.0.get_mut(prefix)
    }

    /// Look up an IP address and optional port in the trie.
    ///
    /// Returns the longest matching prefix and its associated value, if any.
    ///
    /// See the documentation of [`IpPortPrefixTrie`] for details on the lookup logic.
    pub fn lookup(&self, addr: &IpAddr, port_opt: Option<u16>) -> Option<(Prefix, &V)> {
        // If the longest matching prefix has no associated port range, we assume it matches any
        // port, so the lookup is successful
        if let Some((prefix, value)) = self.0.lookup(*addr)
            && value.covers_all_ports()
        {
            return Some((prefix, value));
        }

        // Else, we need to check all matching IP prefixes (not necessarily the longest), and their
        // port ranges. We expect the trie to contain only one matching IP prefix matching the
        // address and associated to a port range matching the port, so we return the first we find.
        let port = port_opt?;
        let matching_entries = self.0.matching_entries(*addr);
        for (prefix, value) in matching_entries {
            if value.covers_port(port) {
                return Some((prefix, value));
            }
        }
        None
    }
}

impl<V> Default for IpPortPrefixTrie<V>
where
    V: Debug + Clone + ValueWithAssociatedRanges,
{
    fn default() -> Self {
        Self::new()
    }
}
