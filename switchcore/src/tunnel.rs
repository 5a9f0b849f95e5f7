// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tunnel and tunnel-map store (C9): tunnel objects, termination entries,
//! and bridge-VNI maps (spec §3, §4.9).

use std::net::IpAddr;

use net::vlan::Vid;
use net::vxlan::Vni;
use ordermap::OrderSet;

use crate::attribute::AttrDescriptor;
use crate::handle::Handle;
use crate::npu::HwId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum TunnelType {
    IpInIp,
    IpInIpGre,
    VxLan,
    Mpls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TtlMode {
    Uniform,
    Pipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DscpMode {
    Uniform,
    Pipe,
}

#[derive(Debug, Clone)]
pub struct Tunnel {
    pub handle: Handle,
    pub hw_id: HwId,
    pub tunnel_type: TunnelType,
    pub underlay_rif: Handle,
    pub underlay_vrf: Handle,
    pub overlay_rif: Handle,
    pub overlay_vrf: Handle,
    pub src_ip: IpAddr,
    pub encap_ttl_mode: TtlMode,
    pub decap_ttl_mode: TtlMode,
    pub encap_dscp_mode: DscpMode,
    pub decap_dscp_mode: DscpMode,
    pub encap_dscp_value: u8,
    pub decap_dscp_value: u8,
    pub encap_mappers: Vec<Handle>,
    pub decap_mappers: Vec<Handle>,
    /// Next hops (always of type Encap) that egress through this tunnel.
    pub encap_nh_list: OrderSet<Handle>,
    pub term_entry_list: OrderSet<Handle>,
}

impl Tunnel {
    /// Invariant I8: a tunnel can't be removed while anything still hangs
    /// off it.
    #[must_use]
    pub fn can_remove(&self) -> bool {
        self.encap_nh_list.is_empty() && self.term_entry_list.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TunnelTerminationEntry {
    pub handle: Handle,
    pub hw_id: HwId,
    pub vrf: Handle,
    pub term_type: TunnelType,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub action_tunnel_id: Handle,
    pub tunnel: Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TunnelMapType {
    BridgeToVni,
    VniToBridge,
}

#[derive(Debug, Clone)]
pub struct TunnelMap {
    pub handle: Handle,
    pub hw_id: HwId,
    pub map_type: TunnelMapType,
    pub entries: OrderSet<Handle>,
}

#[derive(Debug, Clone)]
pub struct TunnelMapEntry {
    pub handle: Handle,
    pub hw_id: HwId,
    pub map: Handle,
    /// The bridge domain side of the mapping; bridge identity and its
    /// member/port tables live in the (out-of-scope) VLAN/bridge module,
    /// so this core only ever treats it as an opaque key.
    pub bridge: Vid,
    pub vni: Vni,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelAttr {
    Type,
    UnderlayRif,
    OverlayRif,
    SrcIp,
    EncapTtlMode,
    DecapTtlMode,
    EncapDscpMode,
    DecapDscpMode,
}

pub const TUNNEL_ATTRS: &[AttrDescriptor<TunnelAttr>] = &[
    AttrDescriptor { id: TunnelAttr::Type, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelAttr::UnderlayRif, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelAttr::OverlayRif, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelAttr::SrcIp, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelAttr::EncapTtlMode, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: TunnelAttr::DecapTtlMode, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: TunnelAttr::EncapDscpMode, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: TunnelAttr::DecapDscpMode, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelTermAttr {
    VrfId,
    Type,
    SrcIp,
    DstIp,
    ActionTunnelId,
}

pub const TUNNEL_TERM_ATTRS: &[AttrDescriptor<TunnelTermAttr>] = &[
    AttrDescriptor { id: TunnelTermAttr::VrfId, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelTermAttr::Type, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelTermAttr::SrcIp, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelTermAttr::DstIp, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelTermAttr::ActionTunnelId, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelMapAttr {
    Type,
}

pub const TUNNEL_MAP_ATTRS: &[AttrDescriptor<TunnelMapAttr>] =
    &[AttrDescriptor { id: TunnelMapAttr::Type, mandatory_on_create: true, create_only: true, settable: false, gettable: true }];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelMapEntryAttr {
    TunnelMap,
    Bridge,
    Vni,
}

pub const TUNNEL_MAP_ENTRY_ATTRS: &[AttrDescriptor<TunnelMapEntryAttr>] = &[
    AttrDescriptor { id: TunnelMapEntryAttr::TunnelMap, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: TunnelMapEntryAttr::Bridge, mandatory_on_create: true, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: TunnelMapEntryAttr::Vni, mandatory_on_create: true, create_only: false, settable: true, gettable: true },
];
