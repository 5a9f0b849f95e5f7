// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Neighbor logical view over [`crate::nexthop::NextHop`] storage (spec
//! §3, §4.5): IP→MAC resolution, additionally indexed by `(VLAN, MAC)` so
//! FDB events can find and reprogram neighbors when a MAC's egress port
//! changes (C8).

use net::eth::mac::Mac;
use net::vlan::Vid;

use crate::attribute::{AttributeValue, Op, PacketAction};
use crate::error::{Result, StatusError};
use crate::nexthop::{NeighborAttr, NEIGHBOR_ATTRS};

/// Key into the global `neighbor_mac_tree`. Only meaningful for neighbors
/// attached to a VLAN RIF — port RIFs resolve `port_id` directly from the
/// RIF's attachment and are never inserted into this index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeighborMacKey {
    pub vlan: Vid,
    pub mac: Mac,
}

pub struct ParsedNeighborCreate {
    pub mac: Option<Mac>,
    pub packet_action: PacketAction,
    pub metadata: u32,
    pub no_host_route: bool,
}

/// Mandatory MAC when packet-action is Forward or Log (spec §4.5).
pub(crate) fn parse_neighbor_create(attrs: &[(NeighborAttr, AttributeValue)]) -> Result<ParsedNeighborCreate> {
    crate::attribute::validate(Op::Create, attrs, NEIGHBOR_ATTRS)?;
    let mut mac = None;
    let mut packet_action = PacketAction::Forward;
    let mut metadata = 0;
    let mut no_host_route = false;
    for (id, value) in attrs {
        match id {
            NeighborAttr::Mac => mac = value.as_mac(),
            NeighborAttr::PacketAction => {
                if let Some(v) = value.as_u8() {
                    packet_action = crate::nexthop::decode_packet_action(v)?;
                }
            }
            NeighborAttr::Metadata => metadata = value.as_u32().unwrap_or(0),
            NeighborAttr::NoHostRoute => no_host_route = value.as_bool().unwrap_or(false),
        }
    }
    if matches!(packet_action, PacketAction::Forward | PacketAction::Log) && mac.is_none() {
        return Err(StatusError::MandatoryAttributeMissing);
    }
    Ok(ParsedNeighborCreate { mac, packet_action, metadata, no_host_route })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_action_requires_mac() {
        let attrs = vec![(NeighborAttr::PacketAction, AttributeValue::U8(0))];
        assert_eq!(parse_neighbor_create(&attrs).unwrap_err(), StatusError::MandatoryAttributeMissing);
    }

    #[test]
    fn drop_action_does_not_require_mac() {
        let attrs = vec![(NeighborAttr::PacketAction, AttributeValue::U8(1))];
        assert!(parse_neighbor_create(&attrs).is_ok());
    }
}
