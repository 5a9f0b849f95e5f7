// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RIF store (C4): router interfaces bound to a VRF and either a port, a
//! LAG, or a VLAN (spec §3, §4.4).

use net::eth::mac::Mac;
use net::vlan::Vid;

use crate::attribute::{AttrDescriptor, AttributeValue, Op, PacketAction};
use crate::error::{Result, StatusError};
use crate::handle::Handle;
use crate::npu::{HwId, PortId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum RifType {
    Port,
    Vlan,
    /// Supplement (SPEC_FULL §2, from `sai_l3_router_interface.c`):
    /// attachment-less, VRF-scoped loopback addressing.
    Loopback,
}

/// What a RIF is bound to, mutually exclusive per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Port(PortId),
    /// A LAG is still referenced by a port-table id at this layer; the
    /// RIF-LAG callback distinguishes it from a plain port by registering
    /// into the LAG module's membership-change callback list (spec §4.4).
    Lag(PortId),
    Vlan(Vid),
    None,
}

/// The key RIF uniqueness is checked against (spec §3: "unique modulo
/// (type, attachment, MAC)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RifKey {
    pub rif_type: RifType,
    pub attachment: Attachment,
    pub mac: Mac,
}

#[derive(Debug, Clone)]
pub struct RouterInterface {
    pub handle: Handle,
    pub hw_id: HwId,
    pub vrf: Handle,
    pub rif_type: RifType,
    pub attachment: Attachment,
    pub mac: Mac,
    pub v4_admin_state: bool,
    pub v6_admin_state: bool,
    pub mtu: u16,
    pub ip_options_action: PacketAction,
    /// Incremented by every NH that references this RIF (I2); remove is
    /// refused while this is nonzero.
    pub ref_count: u32,
}

impl RouterInterface {
    #[must_use]
    pub fn key(&self) -> RifKey {
        RifKey {
            rif_type: self.rif_type,
            attachment: self.attachment,
            mac: self.mac,
        }
    }
}

pub const DEFAULT_MTU: u16 = 1514;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RifAttr {
    VrfId,
    Type,
    PortId,
    VlanId,
    Mac,
    V4AdminState,
    V6AdminState,
    Mtu,
    IpOptionsAction,
}

pub const RIF_ATTRS: &[AttrDescriptor<RifAttr>] = &[
    AttrDescriptor { id: RifAttr::VrfId, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: RifAttr::Type, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: RifAttr::PortId, mandatory_on_create: false, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: RifAttr::VlanId, mandatory_on_create: false, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: RifAttr::Mac, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: RifAttr::V4AdminState, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: RifAttr::V6AdminState, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: RifAttr::Mtu, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: RifAttr::IpOptionsAction, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
];

pub struct ParsedRifCreate {
    pub vrf: Handle,
    pub rif_type: RifType,
    pub attachment: Attachment,
    pub mac: Option<Mac>,
    pub v4_admin_state: Option<bool>,
    pub v6_admin_state: Option<bool>,
    pub mtu: Option<u16>,
    pub ip_options_action: Option<PacketAction>,
}

pub(crate) fn parse_rif_create(attrs: &[(RifAttr, AttributeValue)]) -> Result<ParsedRifCreate> {
    crate::attribute::validate(Op::Create, attrs, RIF_ATTRS)?;
    let mut vrf = None;
    let mut rif_type = None;
    let mut port_id = None;
    let mut vlan_id = None;
    let mut mac = None;
    let mut v4 = None;
    let mut v6 = None;
    let mut mtu = None;
    let mut ip_options_action = None;
    for (id, value) in attrs {
        match id {
            RifAttr::VrfId => vrf = value.as_object_id(),
            RifAttr::Type => {
                rif_type = Some(match value.as_u8() {
                    Some(0) => RifType::Port,
                    Some(1) => RifType::Vlan,
                    Some(2) => RifType::Loopback,
                    _ => return Err(StatusError::InvalidAttrValue(0)),
                });
            }
            RifAttr::PortId => port_id = value.as_u32().map(PortId),
            RifAttr::VlanId => {
                vlan_id = value.as_u16().and_then(|v| net::vlan::Vid::new(v).ok());
            }
            RifAttr::Mac => mac = value.as_mac(),
            RifAttr::V4AdminState => v4 = value.as_bool(),
            RifAttr::V6AdminState => v6 = value.as_bool(),
            RifAttr::Mtu => mtu = value.as_u16(),
            RifAttr::IpOptionsAction => {
                if let Some(v) = value.as_u8() {
                    ip_options_action = Some(crate::nexthop::decode_packet_action(v)?);
                }
            }
        }
    }
    let vrf = vrf.ok_or(StatusError::MandatoryAttributeMissing)?;
    let rif_type = rif_type.ok_or(StatusError::MandatoryAttributeMissing)?;

    // PORT_ID / VLAN_ID are mutually exclusive (spec §4.4).
    let attachment = match rif_type {
        RifType::Port => {
            if vlan_id.is_some() {
                return Err(StatusError::InvalidParameter);
            }
            Attachment::Port(port_id.ok_or(StatusError::MandatoryAttributeMissing)?)
        }
        RifType::Vlan => {
            if port_id.is_some() {
                return Err(StatusError::InvalidParameter);
            }
            Attachment::Vlan(vlan_id.ok_or(StatusError::MandatoryAttributeMissing)?)
        }
        RifType::Loopback => {
            if port_id.is_some() || vlan_id.is_some() {
                return Err(StatusError::InvalidParameter);
            }
            Attachment::None
        }
    };

    Ok(ParsedRifCreate {
        vrf,
        rif_type,
        attachment,
        mac,
        v4_admin_state: v4,
        v6_admin_state: v6,
        mtu,
        ip_options_action,
    })
}
