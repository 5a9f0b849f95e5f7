// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! End-to-end scenarios S1-S6 from the spec's worked-example list, driven
//! against the in-memory mock NPU driver the way `mgmt/tests/reconcile.rs`
//! drives the teacher's own reconciliation loop against a mock backend.
//!
//! Everything here goes through the public [`Switch`] surface only: the
//! FIB lock is crate-private, so these tests observe outcomes the way a
//! real north-bound caller would, through get-attribute calls and the mock
//! driver's call log, never by reaching into `SwitchState`.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use dataplane_switchcore::attribute::AttributeValue;
use dataplane_switchcore::config::SwitchConfig;
use dataplane_switchcore::handle::Handle;
use dataplane_switchcore::nexthop::{NeighborAttr, NextHopAttr};
use dataplane_switchcore::nhg::NhgAttr;
use dataplane_switchcore::npu::mock::MockNpu;
use dataplane_switchcore::npu::PortId;
use dataplane_switchcore::rif::{RifAttr, RifType};
use dataplane_switchcore::route::RouteAttr;
use dataplane_switchcore::tunnel::{TunnelAttr, TunnelType};
use dataplane_switchcore::vrf::VrfAttr;
use dataplane_switchcore::{NpuDriver, StatusError, Switch};
use lpm::prefix::{Ipv4Prefix, Prefix};
use net::eth::mac::Mac;
use net::vlan::Vid;

fn new_switch() -> (Arc<Switch>, Arc<MockNpu>) {
    let npu = Arc::new(MockNpu::new());
    let driver: Arc<dyn NpuDriver> = npu.clone();
    let switch = Switch::new(SwitchConfig::default(), driver, Mac::ZERO);
    (switch, npu)
}

fn mac(n: u8) -> Mac {
    Mac::from([0x02, 0, 0, 0, 0, n])
}

fn port_rif(switch: &Switch, vrf: Handle, port: u32) -> Handle {
    switch
        .rif_create(&[
            (RifAttr::VrfId, AttributeValue::ObjectId(vrf)),
            (RifAttr::Type, AttributeValue::U8(RifType::Port as u8)),
            (RifAttr::PortId, AttributeValue::U32(port)),
        ])
        .unwrap()
}

/// Poll a condition until it holds or a short timeout elapses; the
/// dependency-route worker runs on its own thread, so assertions about its
/// effects can't be made synchronously with the call that woke it.
fn wait_until(mut pred: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pred()
}

/// S1: a neighbor-backed route resolves to the neighbor and its RIF's port.
#[test]
fn s1_neighbor_backed_route_resolves_to_neighbor_and_port() {
    let (switch, _npu) = new_switch();
    let vr = switch.vrf_create(&[]).unwrap();
    let rif = port_rif(&switch, vr, 3);
    let neighbor = switch
        .neighbor_create(rif, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), &[(NeighborAttr::Mac, AttributeValue::Mac(mac(2)))])
        .unwrap();

    switch
        .route_create(&[
            (RouteAttr::VrfId, AttributeValue::ObjectId(vr)),
            (RouteAttr::Prefix, AttributeValue::IpPrefix(Prefix::IPV4(Ipv4Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 24)))),
            (RouteAttr::ForwardingObjectId, AttributeValue::ObjectId(neighbor)),
        ])
        .unwrap();

    let attrs = switch.route_get_attribute(vr, Prefix::IPV4(Ipv4Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 24)), &[RouteAttr::ForwardingObjectId]).unwrap();
    assert_eq!(attrs[0], AttributeValue::ObjectId(neighbor));
    assert_eq!(switch.next_hop_resolved_port(neighbor).unwrap(), Some(PortId(3)));
}

/// S2: a neighbor MAC change reprograms the neighbor exactly once (P4).
#[test]
fn s2_neighbor_mac_change_reprograms_exactly_once() {
    let (switch, npu) = new_switch();
    let vr = switch.vrf_create(&[]).unwrap();
    let rif = port_rif(&switch, vr, 3);
    let neighbor = switch
        .neighbor_create(rif, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), &[(NeighborAttr::Mac, AttributeValue::Mac(mac(2)))])
        .unwrap();

    let before = npu.call_count("neighbor_attr_set");
    switch.neighbor_set_attribute(neighbor, NeighborAttr::Mac, &AttributeValue::Mac(mac(3))).unwrap();
    assert_eq!(npu.call_count("neighbor_attr_set"), before + 1, "exactly one attr-set for the MAC change");

    let attrs = switch.neighbor_get_attribute(neighbor, &[NeighborAttr::Mac]).unwrap();
    assert_eq!(attrs[0], AttributeValue::Mac(mac(3)));

    // P10: setting the same MAC again is a no-op, no further NPU call.
    let before = npu.call_count("neighbor_attr_set");
    switch.neighbor_set_attribute(neighbor, NeighborAttr::Mac, &AttributeValue::Mac(mac(3))).unwrap();
    assert_eq!(npu.call_count("neighbor_attr_set"), before, "unchanged MAC must short-circuit before any NPU call");
}

/// S3: removing a next hop still referenced by a group forwarding a route
/// is refused with `ObjectInUse`.
#[test]
fn s3_remove_nh_referenced_by_group_is_refused() {
    let (switch, _npu) = new_switch();
    let vr = switch.vrf_create(&[]).unwrap();
    let rif_a = port_rif(&switch, vr, 10);
    let rif_b = port_rif(&switch, vr, 11);
    let nh_a = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(0)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(rif_a)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(10, 0, 0, 2))),
        ])
        .unwrap();
    let nh_b = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(0)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(rif_b)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(10, 0, 0, 3))),
        ])
        .unwrap();
    let group = switch.nhg_create(&[(NhgAttr::NextHopMemberList, AttributeValue::ObjectList(vec![nh_a, nh_b]))]).unwrap();

    switch
        .route_create(&[
            (RouteAttr::VrfId, AttributeValue::ObjectId(vr)),
            (RouteAttr::Prefix, AttributeValue::IpPrefix(Prefix::root_v4())),
            (RouteAttr::ForwardingObjectId, AttributeValue::ObjectId(group)),
        ])
        .unwrap();

    assert_eq!(switch.next_hop_remove(nh_a).unwrap_err(), StatusError::ObjectInUse);
}

/// S4: before any underlay neighbor exists, an encap next hop resolves
/// through the guaranteed default route (I7), not a neighbor.
#[test]
fn s4_encap_nh_resolves_via_default_route_before_any_neighbor() {
    let (switch, _npu) = new_switch();
    let underlay_vrf = switch.vrf_create(&[]).unwrap();
    let overlay_vrf = switch.vrf_create(&[]).unwrap();
    let underlay_rif = port_rif(&switch, underlay_vrf, 1);
    let overlay_rif = port_rif(&switch, overlay_vrf, 2);
    let tunnel = switch
        .tunnel_create(&[
            (TunnelAttr::Type, AttributeValue::U8(TunnelType::IpInIp as u8)),
            (TunnelAttr::UnderlayRif, AttributeValue::ObjectId(underlay_rif)),
            (TunnelAttr::OverlayRif, AttributeValue::ObjectId(overlay_rif)),
            (TunnelAttr::SrcIp, AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 0, 1))),
        ])
        .unwrap();

    let encap = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(1)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 0, 2))),
            (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
        ])
        .unwrap();

    assert_eq!(switch.next_hop_resolved_via_neighbor(encap).unwrap(), Some(false), "must fall back to the default route, not a neighbor");
}

/// S5: creating the underlay neighbor re-resolves the encap next hop onto
/// it, and the dep-route worker eventually (re)programs the dependent
/// overlay route.
#[test]
fn s5_underlay_neighbor_create_repoints_encap_and_schedules_replay() {
    let (switch, npu) = new_switch();
    let underlay_vrf = switch.vrf_create(&[]).unwrap();
    let overlay_vrf = switch.vrf_create(&[]).unwrap();
    let underlay_rif = port_rif(&switch, underlay_vrf, 1);
    let overlay_rif = port_rif(&switch, overlay_vrf, 2);
    let tunnel = switch
        .tunnel_create(&[
            (TunnelAttr::Type, AttributeValue::U8(TunnelType::IpInIp as u8)),
            (TunnelAttr::UnderlayRif, AttributeValue::ObjectId(underlay_rif)),
            (TunnelAttr::OverlayRif, AttributeValue::ObjectId(overlay_rif)),
            (TunnelAttr::SrcIp, AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 0, 1))),
        ])
        .unwrap();
    let encap = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(1)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 0, 2))),
            (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
        ])
        .unwrap();

    switch
        .route_create(&[
            (RouteAttr::VrfId, AttributeValue::ObjectId(overlay_vrf)),
            (RouteAttr::Prefix, AttributeValue::IpPrefix(Prefix::IPV4(Ipv4Prefix::new(Ipv4Addr::new(172, 16, 0, 0), 24)))),
            (RouteAttr::ForwardingObjectId, AttributeValue::ObjectId(encap)),
        ])
        .unwrap();

    let routes_before = npu.call_count("route_create");

    switch
        .neighbor_create(underlay_rif, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2)), &[(NeighborAttr::Mac, AttributeValue::Mac(mac(7)))])
        .unwrap();

    assert_eq!(switch.next_hop_resolved_via_neighbor(encap).unwrap(), Some(true));

    // The overlay route that depends on `encap` must be replayed by the
    // dep-route worker once it wakes and drains the dirty set.
    assert!(
        wait_until(|| npu.call_count("route_create") > routes_before),
        "overlay route must be (re)programmed via the dep-route walker"
    );
}

/// S6: an FDB learn for a previously-unresolved VLAN neighbor moves its
/// port exactly once.
#[test]
fn s6_fdb_learn_moves_vlan_neighbor_port_once() {
    let (switch, npu) = new_switch();
    let vr = switch.vrf_create(&[]).unwrap();
    let vlan = Vid::new(10).unwrap();
    let rif = switch
        .rif_create(&[
            (RifAttr::VrfId, AttributeValue::ObjectId(vr)),
            (RifAttr::Type, AttributeValue::U8(RifType::Vlan as u8)),
            (RifAttr::VlanId, AttributeValue::U16(vlan.as_u16())),
        ])
        .unwrap();
    let neighbor_mac = mac(2);
    let neighbor = switch
        .neighbor_create(rif, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), &[(NeighborAttr::Mac, AttributeValue::Mac(neighbor_mac))])
        .unwrap();
    assert_eq!(switch.next_hop_resolved_port(neighbor).unwrap(), None, "no FDB entry yet: port unresolved");

    let before = npu.call_count("neighbor_attr_set");
    switch.fdb_event(&[dataplane_switchcore::fdb::FdbEvent {
        kind: dataplane_switchcore::fdb::FdbEventKind::Learned,
        entry: dataplane_switchcore::fdb::FdbEntry { vlan, mac: neighbor_mac, port: PortId(7) },
    }]);

    assert_eq!(npu.call_count("neighbor_attr_set"), before + 1, "exactly one port-flag attr-set for the learn");
    assert_eq!(switch.next_hop_resolved_port(neighbor).unwrap(), Some(PortId(7)));
}

/// P13: an FDB event for a MAC the core never learned about is a silent
/// no-op — no NPU calls at all.
#[test]
fn p13_fdb_event_for_unknown_mac_is_noop() {
    let (switch, npu) = new_switch();
    let before = npu.calls.lock().unwrap().len();
    switch.fdb_event(&[dataplane_switchcore::fdb::FdbEvent {
        kind: dataplane_switchcore::fdb::FdbEventKind::Learned,
        entry: dataplane_switchcore::fdb::FdbEntry { vlan: Vid::new(20).unwrap(), mac: mac(0xee), port: PortId(1) },
    }]);
    assert_eq!(npu.calls.lock().unwrap().len(), before, "unknown MAC must not produce any NPU call");
}

/// P12: the (max_ecmp_paths+1)-th member is refused and the group is left
/// unchanged.
#[test]
fn p12_nhg_member_cap_is_enforced() {
    let (switch, _npu) = new_switch();
    let vr = switch.vrf_create(&[]).unwrap();
    switch.set_max_ecmp_paths(1);
    let rif_a = port_rif(&switch, vr, 10);
    let rif_b = port_rif(&switch, vr, 11);
    let nh_a = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(0)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(rif_a)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(10, 0, 0, 2))),
        ])
        .unwrap();
    let nh_b = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(0)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(rif_b)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(10, 0, 0, 3))),
        ])
        .unwrap();
    let group = switch.nhg_create(&[(NhgAttr::NextHopMemberList, AttributeValue::ObjectList(vec![nh_a]))]).unwrap();

    let err = switch.nhg_add_members(group, &[nh_b]).unwrap_err();
    assert_eq!(err, StatusError::InsufficientResources);

    let members = switch.nhg_get_attribute(group, &[NhgAttr::NextHopMemberList]).unwrap();
    assert_eq!(members[0], AttributeValue::ObjectList(vec![nh_a]), "group membership must be unchanged after a refused add");
}

/// I6/I8: a VRF that still owns a RIF can't be removed, and a tunnel with
/// an attached encap next hop can't be removed either.
#[test]
fn i6_i8_busy_objects_refuse_removal() {
    let (switch, _npu) = new_switch();
    let vr = switch.vrf_create(&[]).unwrap();
    let _rif = port_rif(&switch, vr, 1);
    assert_eq!(switch.vrf_remove(vr).unwrap_err(), StatusError::ObjectInUse);

    let underlay_vrf = switch.vrf_create(&[]).unwrap();
    let overlay_vrf = switch.vrf_create(&[]).unwrap();
    let underlay_rif = port_rif(&switch, underlay_vrf, 2);
    let overlay_rif = port_rif(&switch, overlay_vrf, 3);
    let tunnel = switch
        .tunnel_create(&[
            (TunnelAttr::Type, AttributeValue::U8(TunnelType::IpInIp as u8)),
            (TunnelAttr::UnderlayRif, AttributeValue::ObjectId(underlay_rif)),
            (TunnelAttr::OverlayRif, AttributeValue::ObjectId(overlay_rif)),
            (TunnelAttr::SrcIp, AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 0, 1))),
        ])
        .unwrap();
    let _encap = switch
        .next_hop_create(&[
            (NextHopAttr::Type, AttributeValue::U8(1)),
            (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
            (NextHopAttr::Ip, AttributeValue::Ipv4(Ipv4Addr::new(192, 168, 0, 2))),
            (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
        ])
        .unwrap();
    assert_eq!(switch.tunnel_remove(tunnel).unwrap_err(), StatusError::ObjectInUse);
}

/// P10 on a VRF attribute: setting the same source MAC again is a no-op,
/// no NPU attr-set call.
#[test]
fn p10_vrf_set_attribute_noop_short_circuits() {
    let (switch, npu) = new_switch();
    let vr = switch.vrf_create(&[(VrfAttr::SrcMac, AttributeValue::Mac(mac(1)))]).unwrap();
    let before = npu.call_count("vrf_attr_set");
    switch.vrf_set_attribute(vr, VrfAttr::SrcMac, &AttributeValue::Mac(mac(1))).unwrap();
    assert_eq!(npu.call_count("vrf_attr_set"), before, "unchanged attribute must short-circuit before any NPU call");

    switch.vrf_set_attribute(vr, VrfAttr::SrcMac, &AttributeValue::Mac(mac(9))).unwrap();
    assert_eq!(npu.call_count("vrf_attr_set"), before + 1);
    let attrs = switch.vrf_get_attribute(vr, &[VrfAttr::SrcMac]).unwrap();
    assert_eq!(attrs[0], AttributeValue::Mac(mac(9)));
}
