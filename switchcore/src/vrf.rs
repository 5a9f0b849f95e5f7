// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VRF store (C3): virtual routers and their per-VRF next-hop/route radix
//! trees (spec §3, §4.3).

use std::collections::BTreeMap;

use ipnet::{Ipv4Net, Ipv6Net};
use lpm::trie::PrefixMapTrieWithDefault;
use net::eth::mac::Mac;
use ordermap::OrderSet;

use crate::attribute::{AttrDescriptor, AttributeValue, Op, PacketAction};
use crate::error::{Result, StatusError};
use crate::handle::Handle;
use crate::nexthop::NhKey;
use crate::npu::HwId;
use crate::route::Route;

/// A VRF's per-AF route tree. Kept as two separate
/// [`PrefixMapTrieWithDefault`] instances (one per address family) rather
/// than a single tree keyed by the tagged [`lpm::prefix::Prefix`] union,
/// since the underlying `prefix-trie` crate's LPM primitive is per-AF; the
/// tagged-union view spec §3 describes is reconstructed at the call site
/// that needs it (route create/remove/get).
#[derive(Debug, Default)]
pub struct RouteTree {
    pub v4: PrefixMapTrieWithDefault<Ipv4Net, Route>,
    pub v6: PrefixMapTrieWithDefault<Ipv6Net, Route>,
}

impl RouteTree {
    #[must_use]
    pub fn is_empty_modulo_defaults(&self) -> bool {
        self.v4.len() <= 1 && self.v6.len() <= 1
    }
}

#[derive(Debug)]
pub struct VirtualRouter {
    pub handle: Handle,
    pub hw_id: HwId,
    pub src_mac: Mac,
    pub v4_admin_state: bool,
    pub v6_admin_state: bool,
    pub ip_options_action: PacketAction,
    pub ttl_violation_action: PacketAction,
    /// Keyed by `(nh_type, rif, ip, tunnel_type)`; walked in key order by
    /// the dependency engine (spec §4.10 "walk ... from (Encap, A)
    /// forward").
    pub nh_tree: BTreeMap<NhKey, Handle>,
    pub route_tree: RouteTree,
    pub rif_list: OrderSet<Handle>,
}

impl VirtualRouter {
    #[must_use]
    pub fn new(handle: Handle, hw_id: HwId, src_mac: Mac) -> Self {
        Self {
            handle,
            hw_id,
            src_mac,
            v4_admin_state: true,
            v6_admin_state: true,
            ip_options_action: PacketAction::Forward,
            ttl_violation_action: PacketAction::Trap,
            nh_tree: BTreeMap::new(),
            route_tree: RouteTree::default(),
            rif_list: OrderSet::new(),
        }
    }

    #[must_use]
    pub fn num_rif(&self) -> usize {
        self.rif_list.len()
    }

    /// Lifecycle precondition from spec §3: `num_rif=0`, `nh_tree` empty,
    /// `route_tree` empty modulo the two per-AF defaults (I6).
    #[must_use]
    pub fn can_destroy(&self) -> bool {
        self.rif_list.is_empty() && self.nh_tree.is_empty() && self.route_tree.is_empty_modulo_defaults()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VrfAttr {
    SrcMac,
    V4AdminState,
    V6AdminState,
    IpOptionsAction,
    TtlViolationAction,
}

pub const VRF_ATTRS: &[AttrDescriptor<VrfAttr>] = &[
    AttrDescriptor { id: VrfAttr::SrcMac, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: VrfAttr::V4AdminState, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: VrfAttr::V6AdminState, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: VrfAttr::IpOptionsAction, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: VrfAttr::TtlViolationAction, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
];

pub(crate) fn parse_vrf_create(attrs: &[(VrfAttr, AttributeValue)], switch_mac: Mac) -> Result<(Mac, PacketAction, PacketAction)> {
    crate::attribute::validate(Op::Create, attrs, VRF_ATTRS)?;
    let mut src_mac = switch_mac;
    let mut ip_options_action = PacketAction::Forward;
    let mut ttl_violation_action = PacketAction::Trap;
    for (id, value) in attrs {
        match id {
            VrfAttr::SrcMac => {
                if let Some(m) = value.as_mac() {
                    src_mac = m;
                }
            }
            VrfAttr::IpOptionsAction => {
                if let Some(v) = value.as_u8() {
                    ip_options_action = crate::nexthop::decode_packet_action(v)?;
                }
            }
            VrfAttr::TtlViolationAction => {
                if let Some(v) = value.as_u8() {
                    ttl_violation_action = crate::nexthop::decode_packet_action(v)?;
                }
            }
            VrfAttr::V4AdminState | VrfAttr::V6AdminState => {
                // Parsed in the apply step below; admin states default true.
            }
        }
    }
    Ok((src_mac, ip_options_action, ttl_violation_action))
}

/// Applies a single settable VRF attribute in place. Returns the attribute
/// id for the NPU attr-set replay; a no-op set (new value equals old) is
/// signalled by returning `Ok(None)` so callers can honor P10's
/// short-circuit without an NPU round-trip.
pub(crate) fn apply_vrf_attr(vrf: &mut VirtualRouter, id: VrfAttr, value: &AttributeValue) -> Result<Option<VrfAttr>> {
    match id {
        VrfAttr::SrcMac => {
            let mac = value.as_mac().ok_or(StatusError::InvalidAttrValue(0))?;
            if mac == vrf.src_mac {
                return Ok(None);
            }
            vrf.src_mac = mac;
        }
        VrfAttr::V4AdminState => {
            let v = value.as_bool().ok_or(StatusError::InvalidAttrValue(0))?;
            if v == vrf.v4_admin_state {
                return Ok(None);
            }
            vrf.v4_admin_state = v;
        }
        VrfAttr::V6AdminState => {
            let v = value.as_bool().ok_or(StatusError::InvalidAttrValue(0))?;
            if v == vrf.v6_admin_state {
                return Ok(None);
            }
            vrf.v6_admin_state = v;
        }
        VrfAttr::IpOptionsAction => {
            let v = value.as_u8().ok_or(StatusError::InvalidAttrValue(0))?;
            let action = crate::nexthop::decode_packet_action(v)?;
            if action == vrf.ip_options_action {
                return Ok(None);
            }
            vrf.ip_options_action = action;
        }
        VrfAttr::TtlViolationAction => {
            let v = value.as_u8().ok_or(StatusError::InvalidAttrValue(0))?;
            let action = crate::nexthop::decode_packet_action(v)?;
            if action == vrf.ttl_violation_action {
                return Ok(None);
            }
            vrf.ttl_violation_action = action;
        }
    }
    Ok(Some(id))
}
