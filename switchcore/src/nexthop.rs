// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Next hops (C5): IP next hops, tunnel-encap next hops, and the neighbor
//! "logical view" sharing the same storage (spec §3, §4.5).
//!
//! A [`NextHop`] is addressed by two different things depending on the
//! caller: the north-bound oid ([`Handle`]) once created, and the
//! `(nh_type, rif, ip, tunnel_type)` key used to find-or-reuse an existing
//! node when a neighbor and a forwarding next hop coincide at the same
//! key (the owner-bitmask pattern from the Design Notes).

use std::net::IpAddr;

use net::eth::mac::Mac;
use net::vlan::Vid;
use ordermap::{OrderMap, OrderSet};

use crate::attribute::{AttrDescriptor, AttributeValue, Op, PacketAction};
use crate::error::{Result, StatusError};
use crate::handle::{Handle, ObjectType};
use crate::npu::{HwId, NpuDriver, PortId};
use crate::tunnel::TunnelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum NhType {
    Ip,
    Encap,
}

bitflags::bitflags! {
    /// A [`NextHop`] is a sum over the roles it plays; the node is freed
    /// only when this set becomes empty (spec §3 "owner bitmask").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NhOwner: u8 {
        const NEIGHBOR  = 0b0000_0001;
        const NEXT_HOP  = 0b0000_0010;
    }
}

/// Key that makes a [`NextHop`] unique within a VRF's `nh_tree`: the
/// field order matters because it is also the `nh_tree` sort order, and
/// the dependency engine walks it grouped by `ip` (spec §4.10 "walk the
/// underlay nh_tree from (Encap, A) forward").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NhKey {
    pub ip: IpAddr,
    pub nh_type: NhType,
    pub rif: Handle,
    pub tunnel_type: Option<TunnelType>,
}

impl NhKey {
    #[must_use]
    pub fn ip_only(ip: IpAddr, rif: Handle) -> Self {
        Self {
            ip,
            nh_type: NhType::Ip,
            rif,
            tunnel_type: None,
        }
    }

    #[must_use]
    pub fn encap(ip: IpAddr, rif: Handle, tunnel_type: TunnelType) -> Self {
        Self {
            ip,
            nh_type: NhType::Encap,
            rif,
            tunnel_type: Some(tunnel_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextHopAttr {
    Type,
    RouterInterfaceId,
    Ip,
    TunnelId,
    PacketAction,
    Metadata,
    NoHostRoute,
}

pub const NEXT_HOP_ATTRS: &[AttrDescriptor<NextHopAttr>] = &[
    AttrDescriptor { id: NextHopAttr::Type, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: NextHopAttr::RouterInterfaceId, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: NextHopAttr::Ip, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: NextHopAttr::TunnelId, mandatory_on_create: false, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: NextHopAttr::PacketAction, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: NextHopAttr::Metadata, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: NextHopAttr::NoHostRoute, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborAttr {
    Mac,
    PacketAction,
    Metadata,
    NoHostRoute,
}

pub const NEIGHBOR_ATTRS: &[AttrDescriptor<NeighborAttr>] = &[
    AttrDescriptor { id: NeighborAttr::Mac, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: NeighborAttr::PacketAction, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: NeighborAttr::Metadata, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: NeighborAttr::NoHostRoute, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
];

#[derive(Debug, Clone)]
pub struct NextHop {
    pub handle: Handle,
    /// Set once the `NEXT_HOP` owner bit is set (I1); `None` for a pure
    /// neighbor that has no forwarding-object hardware presence of its own
    /// beyond the neighbor programming itself.
    pub hw_id: Option<HwId>,
    pub key: NhKey,
    /// Cached from the RIF at create time.
    pub vrf: Handle,
    pub rif: Handle,
    pub mac: Option<Mac>,
    pub port_id: Option<PortId>,
    pub vlan: Option<Vid>,
    pub packet_action: PacketAction,
    pub metadata: u32,
    pub no_host_route: bool,
    pub owner: NhOwner,
    pub ref_count: u32,
    pub tunnel_id: Option<Handle>,

    // --- dependency-engine state (meaningful only for encap next hops) ---
    pub neighbor: Option<Handle>,
    /// Underlay LPM resolution, as the matched prefix rather than a route
    /// handle: a [`crate::route::Route`] has no handle of its own, it is
    /// addressed by `(vrf, prefix)`, and the underlay vrf is always the
    /// tunnel's, so the prefix alone is enough to find it back.
    pub lpm_route: Option<lpm::prefix::Prefix>,
    /// Set only when `lpm_route` resolved through a route whose forwarding
    /// object is an NHG, so detach can unlink from every current member.
    pub underlay_nhg: Option<Handle>,
    /// Every overlay route `(vrf, prefix)` that forwards via this encap
    /// next hop (I4's converse: walked to mark dirty routes when the
    /// resolution underneath this node changes).
    pub dep_route_list: OrderSet<(Handle, lpm::prefix::Prefix)>,

    // --- reverse links for objects this node is itself an underlay for ---
    /// Encap next hops resolved through this node, whether as a plain
    /// underlay neighbor, an underlay route, or a member of an NHG some
    /// underlay route forwards via.
    pub dep_encap_nh_list: OrderSet<Handle>,
    /// Groups this NH is a member of, mirrored symmetrically in each
    /// group's own member list (I3). Multiset via explicit weight.
    pub groups: OrderMap<Handle, u32>,

    /// Supplement (SPEC_FULL §2): set when a VLAN-RIF neighbor's port
    /// could not be resolved via FDB lookup at create time; cleared, and
    /// the port re-derived, the next time an FDB learn touches this MAC.
    pub pending_fdb_resolution: bool,
}

impl NextHop {
    #[must_use]
    pub fn is_encap(&self) -> bool {
        self.key.nh_type == NhType::Encap
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.neighbor.is_some() || self.lpm_route.is_some()
    }
}

pub(crate) fn parse_next_hop_attrs(attrs: &[(NextHopAttr, AttributeValue)]) -> Result<(NhType, Handle, IpAddr, Option<Handle>, PacketAction, u32, bool)> {
    crate::attribute::validate(Op::Create, attrs, NEXT_HOP_ATTRS)?;
    let mut nh_type = None;
    let mut rif = None;
    let mut ip = None;
    let mut tunnel_id = None;
    let mut packet_action = PacketAction::Forward;
    let mut metadata = 0;
    let mut no_host_route = false;
    for (id, value) in attrs {
        match id {
            NextHopAttr::Type => {
                nh_type = Some(match value.as_u8() {
                    Some(0) => NhType::Ip,
                    Some(1) => NhType::Encap,
                    _ => return Err(StatusError::InvalidAttrValue(0)),
                });
            }
            NextHopAttr::RouterInterfaceId => {
                rif = value.as_object_id();
            }
            NextHopAttr::Ip => {
                ip = value.as_ipv4().map(IpAddr::V4).or_else(|| value.as_ipv6().map(IpAddr::V6));
            }
            NextHopAttr::TunnelId => {
                tunnel_id = value.as_object_id();
            }
            NextHopAttr::PacketAction => {
                if let Some(v) = value.as_u8() {
                    packet_action = decode_packet_action(v)?;
                }
            }
            NextHopAttr::Metadata => metadata = value.as_u32().unwrap_or(0),
            NextHopAttr::NoHostRoute => no_host_route = value.as_bool().unwrap_or(false),
        }
    }
    let nh_type = nh_type.ok_or(StatusError::MandatoryAttributeMissing)?;
    let rif = rif.ok_or(StatusError::MandatoryAttributeMissing)?;
    let ip = ip.ok_or(StatusError::MandatoryAttributeMissing)?;
    if nh_type == NhType::Encap && tunnel_id.is_none() {
        // P11: Encap without a tunnel_id fails before any hardware side effect.
        return Err(StatusError::MandatoryAttributeMissing);
    }
    Ok((nh_type, rif, ip, tunnel_id, packet_action, metadata, no_host_route))
}

pub(crate) fn decode_packet_action(v: u8) -> Result<PacketAction> {
    Ok(match v {
        0 => PacketAction::Forward,
        1 => PacketAction::Drop,
        2 => PacketAction::Copy,
        3 => PacketAction::CopyCancel,
        4 => PacketAction::Trap,
        5 => PacketAction::Log,
        6 => PacketAction::Deny,
        7 => PacketAction::TransitTrap,
        _ => return Err(StatusError::InvalidAttrValue(0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nh_key_orders_by_ip_first() {
        let rif_a = Handle::new(ObjectType::RouterInterface, 1);
        let rif_b = Handle::new(ObjectType::RouterInterface, 2);
        let ip_a: IpAddr = "10.0.0.1".parse().unwrap();
        let ip_b: IpAddr = "10.0.0.2".parse().unwrap();
        let k1 = NhKey::ip_only(ip_a, rif_b);
        let k2 = NhKey::ip_only(ip_b, rif_a);
        assert!(k1 < k2, "lower ip must sort first even with a higher rif handle");
    }

    #[test]
    fn encap_without_tunnel_id_is_rejected() {
        let rif = Handle::new(ObjectType::RouterInterface, 3);
        let attrs = vec![
            (NextHopAttr::Type, AttributeValue::U8(1)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(rif)),
            (NextHopAttr::Ip, AttributeValue::Ipv4("10.0.0.2".parse().unwrap())),
        ];
        assert_eq!(parse_next_hop_attrs(&attrs).unwrap_err(), StatusError::MandatoryAttributeMissing);
    }
}
