// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Route table (C7): per-VRF radix tree of prefix to forwarding object
//! (spec §3, §4.7).
//!
//! A [`Route`] never owns a standalone NPU hw id the way a next hop or
//! group does — it is addressed at the south bound by `(vrf_hw, prefix)`,
//! which is also what makes the dependency engine's "idempotent replay"
//! contract (spec §4.10) possible: `route_create` can be called again for
//! the same key with no distinguishable side effect.

use lpm::prefix::Prefix;
use ordermap::OrderSet;

use crate::attribute::{AttrDescriptor, AttributeValue, Op, PacketAction};
use crate::error::{Result, StatusError};
use crate::handle::{Handle, ObjectType};
use crate::npu::HwId;

/// What a route forwards via, north-bound oid form. `None` is the
/// explicit drop/trap discriminator spec §3 calls out for Route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingObject {
    NextHop(Handle),
    NextHopGroup(Handle),
    None,
}

/// The south-bound counterpart of [`ForwardingObject`]: hw ids instead of
/// oids, since that's what a driver actually programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteForwardHw {
    NextHop(HwId),
    Group(HwId),
    Drop,
    Trap,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub vrf: Handle,
    pub prefix: Prefix,
    pub packet_action: PacketAction,
    pub trap_priority: u8,
    pub metadata: u32,
    pub forward: ForwardingObject,
    /// Whether this is one of the two per-VRF default routes inserted at
    /// VRF-create time (I7): these are never unlinked from the route
    /// tree, only reverted to `ForwardingObject::None` on "remove".
    pub is_default: bool,
    /// Every tunnel-encap next hop whose resolved LPM is this route (I4).
    pub dep_encap_nh_list: OrderSet<Handle>,
}

impl Route {
    #[must_use]
    pub fn new_default(vrf: Handle, prefix: Prefix) -> Self {
        Self {
            vrf,
            prefix,
            packet_action: PacketAction::Drop,
            trap_priority: 0,
            metadata: 0,
            forward: ForwardingObject::None,
            is_default: true,
            dep_encap_nh_list: OrderSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAttr {
    VrfId,
    Prefix,
    PacketAction,
    TrapPriority,
    Metadata,
    ForwardingObjectId,
}

pub const ROUTE_ATTRS: &[AttrDescriptor<RouteAttr>] = &[
    AttrDescriptor { id: RouteAttr::VrfId, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: RouteAttr::Prefix, mandatory_on_create: true, create_only: true, settable: false, gettable: true },
    AttrDescriptor { id: RouteAttr::PacketAction, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    // Open Question (spec §9): trap-priority set exists in the original
    // but returns NotImplemented; kept in the descriptor table (gettable,
    // not settable) so validate() still accepts it on create/get.
    AttrDescriptor { id: RouteAttr::TrapPriority, mandatory_on_create: false, create_only: false, settable: false, gettable: true },
    AttrDescriptor { id: RouteAttr::Metadata, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
    AttrDescriptor { id: RouteAttr::ForwardingObjectId, mandatory_on_create: false, create_only: false, settable: true, gettable: true },
];

pub struct ParsedRouteCreate {
    pub vrf: Handle,
    pub prefix: Prefix,
    pub packet_action: PacketAction,
    pub metadata: u32,
    pub forward: ForwardingObject,
}

pub(crate) fn parse_route_create(attrs: &[(RouteAttr, AttributeValue)]) -> Result<ParsedRouteCreate> {
    crate::attribute::validate(Op::Create, attrs, ROUTE_ATTRS)?;
    let mut vrf = None;
    let mut prefix = None;
    let mut packet_action = PacketAction::Forward;
    let mut metadata = 0;
    let mut forward = ForwardingObject::None;
    for (id, value) in attrs {
        match id {
            RouteAttr::VrfId => vrf = value.as_object_id(),
            RouteAttr::Prefix => prefix = value.as_ip_prefix(),
            RouteAttr::PacketAction => {
                if let Some(v) = value.as_u8() {
                    packet_action = crate::nexthop::decode_packet_action(v)?;
                }
            }
            RouteAttr::TrapPriority => {}
            RouteAttr::Metadata => metadata = value.as_u32().unwrap_or(0),
            RouteAttr::ForwardingObjectId => {
                if let Some(h) = value.as_object_id() {
                    forward = match h.object_type() {
                        ObjectType::NextHop => ForwardingObject::NextHop(h),
                        ObjectType::NextHopGroup => ForwardingObject::NextHopGroup(h),
                        _ => return Err(StatusError::InvalidObjectType),
                    };
                }
            }
        }
    }
    let vrf = vrf.ok_or(StatusError::MandatoryAttributeMissing)?;
    let prefix = prefix.ok_or(StatusError::MandatoryAttributeMissing)?;
    Ok(ParsedRouteCreate { vrf, prefix, packet_action, metadata, forward })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_route_has_no_forwarding_object() {
        let vrf = Handle::new(ObjectType::VirtualRouter, 0);
        let r = Route::new_default(vrf, Prefix::root_v4());
        assert_eq!(r.forward, ForwardingObject::None);
        assert!(r.is_default);
    }
}
