// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The dependency engine (C10, spec §4.10): keeps every tunnel-encap next
//! hop's resolution against the underlay in sync as the underlay churns,
//! and the background worker that replays the overlay routes any of that
//! churn touched.
//!
//! A tunnel-encap next hop resolves in one of two ways against its
//! tunnel's underlay VRF: an exact neighbor at the tunnel's destination
//! IP, or failing that, an LPM route (possibly forwarding via an NHG, in
//! which case every member of that group is also linked). Every underlay
//! event that could change that resolution — neighbor create/remove/
//! attr-set, route create/remove/attr-set, NHG membership churn — re-runs
//! [`resolve_encap_nh`] for the affected encap next hops and marks their
//! dependent overlay routes dirty; the worker spawned by
//! [`spawn_worker`] wakes on the switch's waker and replays the dirty set
//! into the NPU driver under the same FIB lock every other call takes.

use std::net::IpAddr;
use std::sync::Arc;

use lpm::prefix::Prefix;

use crate::error::Result;
use crate::handle::Handle;
use crate::nexthop::{NhType, NhOwner};
use crate::npu::{HwId, NpuDriver};
use crate::route::{ForwardingObject, RouteForwardHw};
use crate::switch::{Switch, SwitchState};

/// Why [`route_affected_encap_nh_update`] was called.
pub enum RouteChange {
    Create,
    /// The dep_encap_nh_list the removed route carried, snapshotted before
    /// it left the tree (a removed route can no longer be looked up).
    Remove(Vec<Handle>),
}

/// Resolve (or re-resolve) one tunnel-encap next hop against its tunnel's
/// underlay VRF (spec §4.10 steps 1-3): an exact underlay neighbor first,
/// then an LPM route, linking the encap into whichever it lands on so
/// future underlay changes can find it again.
pub fn resolve_encap_nh(state: &mut SwitchState, npu: &dyn NpuDriver, encap: Handle) -> Result<()> {
    let (underlay_vrf, dest_ip) = {
        let nh = state.next_hops.get(&encap).ok_or(crate::error::StatusError::InvalidObjectId)?;
        let tunnel_id = nh.tunnel_id.ok_or(crate::error::StatusError::InvalidObjectId)?;
        let tunnel = state.tunnels.get(&tunnel_id).ok_or(crate::error::StatusError::InvalidObjectId)?;
        (tunnel.underlay_vrf, nh.key.ip)
    };

    detach_from_underlay(state, encap, underlay_vrf);

    if let Some(neighbor) = find_underlay_neighbor(state, underlay_vrf, dest_ip) {
        neighbor_resolve(state, npu, encap, neighbor);
        return Ok(());
    }

    let Some(prefix) = best_route_prefix(state, underlay_vrf, dest_ip) else {
        // Unreachable in practice: every VRF carries both per-AF defaults
        // from creation onward (I7). Mirrored here as the spec's explicit
        // failure path rather than a panic, since this runs deep inside a
        // call chain that must be able to propagate an error.
        return Err(crate::error::StatusError::Failure);
    };
    route_resolve(state, npu, encap, underlay_vrf, prefix);
    Ok(())
}

/// Underlay neighbor create/remove at `ip` within `vrf`: every encap next
/// hop keyed at that same `(vrf, ip)` may now resolve differently.
pub fn on_neighbor_created(state: &mut SwitchState, npu: &dyn NpuDriver, vrf: Handle, ip: IpAddr) {
    for encap in encap_nhs_at_ip(state, vrf, ip) {
        resolve_encap_nh(state, npu, encap).ok();
    }
}

pub fn on_neighbor_removed(state: &mut SwitchState, npu: &dyn NpuDriver, vrf: Handle, ip: IpAddr) {
    for encap in encap_nhs_at_ip(state, vrf, ip) {
        resolve_encap_nh(state, npu, encap).ok();
    }
}

/// Replay a neighbor's MAC/port change into every encap next hop currently
/// resolved through it (spec §4.10's neighbor attr-set case): the
/// resolution itself doesn't change, only the hardware state the encap
/// next hops need re-pushed.
pub fn on_neighbor_attr_changed(state: &SwitchState, npu: &dyn NpuDriver, neighbor: Handle, port_changed: bool) {
    let Some(n) = state.next_hops.get(&neighbor) else { return };
    let Some(neighbor_hw) = n.hw_id else { return };
    for &encap in &n.dep_encap_nh_list {
        if let Some(encap_hw) = state.next_hops.get(&encap).and_then(|e| e.hw_id) {
            npu.encap_nh_neighbor_attr_set(encap_hw, neighbor_hw, port_changed).ok();
        }
    }
}

/// FDB-driven port move for an already-resolved neighbor (spec §4.8): same
/// replay as an attribute change, the port is always considered changed.
pub fn replay_dep_encap_nhs(state: &mut SwitchState, npu: &dyn NpuDriver, neighbor: Handle) {
    on_neighbor_attr_changed(state, npu, neighbor, true);
}

/// An NHG gained a member: every encap next hop currently resolved through
/// this group (via an underlay route forwarding to it) gets a symmetric
/// link to the new member, so a later change on that member alone (e.g. a
/// neighbor attr-set) still reaches the encap.
pub fn on_nhg_member_added(state: &mut SwitchState, _npu: &dyn NpuDriver, group: Handle, member: Handle) {
    let Some(encaps) = state.nhgs.get(&group).map(|g| g.dep_encap_nh_list.iter().copied().collect::<Vec<_>>()) else {
        return;
    };
    if let Some(nh) = state.next_hops.get_mut(&member) {
        for encap in encaps {
            nh.dep_encap_nh_list.insert(encap);
        }
    }
}

pub fn on_nhg_member_removed(state: &mut SwitchState, _npu: &dyn NpuDriver, group: Handle, member: Handle) {
    let Some(encaps) = state.nhgs.get(&group).map(|g| g.dep_encap_nh_list.iter().copied().collect::<Vec<_>>()) else {
        return;
    };
    if let Some(nh) = state.next_hops.get_mut(&member) {
        for encap in encaps {
            nh.dep_encap_nh_list.shift_remove(&encap);
        }
    }
}

/// Underlay route create/remove at `(vrf, prefix)` (spec §4.10's route
/// case): a create can make a more-specific match available to encap next
/// hops previously resolved against a less-specific route; a remove
/// forces every encap next hop that was resolved against it to re-resolve.
pub fn route_affected_encap_nh_update(state: &mut SwitchState, npu: &dyn NpuDriver, vrf: Handle, prefix: Prefix, change: RouteChange) {
    let affected = match change {
        RouteChange::Create => less_specific_dep_encap_nhs_inside(state, vrf, prefix),
        RouteChange::Remove(list) => list,
    };
    for encap in affected {
        resolve_encap_nh(state, npu, encap).ok();
    }
}

/// An existing route's forwarding object changed (spec §4.10's route
/// attr-set case): every encap next hop resolved through this route is
/// symmetrically relinked to the new forwarding object and replayed.
pub fn route_attr_set_affected_encap_nh_update(
    state: &mut SwitchState,
    npu: &dyn NpuDriver,
    vrf: Handle,
    prefix: Prefix,
    old_forward: ForwardingObject,
    new_forward: ForwardingObject,
) {
    if old_forward == new_forward {
        return;
    }
    let encaps: Vec<Handle> = route_dep_encap_nh_list(state, vrf, prefix);
    let new_hw = forwarding_object_hw(state, new_forward);
    for encap in encaps {
        unlink_from_forwarding_object(state, encap, old_forward);
        link_to_forwarding_object(state, encap, new_forward);
        if let Some(nh) = state.next_hops.get_mut(&encap) {
            nh.underlay_nhg = match new_forward {
                ForwardingObject::NextHopGroup(g) => Some(g),
                _ => None,
            };
        }
        if let Some(encap_hw) = state.next_hops.get(&encap).and_then(|n| n.hw_id) {
            npu.encap_nh_route_resolve(encap_hw, new_hw).ok();
        }
        mark_dep_routes_dirty(state, encap);
    }
}

/// Link an overlay route to the encap next hop it forwards via, so the
/// route is marked dirty (and replayed) whenever that encap's resolution
/// changes underneath it (spec §4.10, the route-create/attr-set
/// bookkeeping half of [`crate::route::Route::dep_encap_nh_list`]'s
/// mirror on [`crate::nexthop::NextHop::dep_route_list`]).
pub fn link_route_to_forwarding_encap(state: &mut SwitchState, vrf: Handle, prefix: Prefix, fwd: ForwardingObject) {
    if let ForwardingObject::NextHop(h) = fwd {
        if let Some(nh) = state.next_hops.get_mut(&h) {
            if nh.is_encap() {
                nh.dep_route_list.insert((vrf, prefix));
            }
        }
    }
}

pub fn unlink_route_from_forwarding_encap(state: &mut SwitchState, vrf: Handle, prefix: Prefix, fwd: ForwardingObject) {
    if let ForwardingObject::NextHop(h) = fwd {
        if let Some(nh) = state.next_hops.get_mut(&h) {
            nh.dep_route_list.shift_remove(&(vrf, prefix));
        }
    }
}

/// Spawn the long-lived dependency-route replay thread (spec §4.10's
/// "dep-route walker"): blocks on the switch's waker, and on every wake
/// takes the FIB lock and replays every `(vrf, prefix)` marked dirty since
/// the last pass into the NPU driver. Duplicate wakes collapse by
/// construction ([`mio::Waker`] coalesces), so this drains whatever
/// accumulated rather than running once per signal.
pub fn spawn_worker(switch: Arc<Switch>, mut poll: mio::Poll) {
    std::thread::Builder::new()
        .name("dep-route-walker".to_owned())
        .spawn(move || {
            let mut events = mio::Events::with_capacity(4);
            loop {
                if let Err(e) = poll.poll(&mut events, None) {
                    if e.kind() == std::io::ErrorKind::Interrupted {
                        continue;
                    }
                    tracing::error!(error = %e, "dependency-engine poll failed");
                    continue;
                }
                let mut state = switch.state.lock();
                replay_dirty_routes(&mut state, &*switch.npu);
            }
        })
        .expect("failed to spawn dependency-engine worker thread");
}

fn replay_dirty_routes(state: &mut SwitchState, npu: &dyn NpuDriver) {
    let dirty = std::mem::take(&mut state.dirty_routes);
    let count = dirty.len();
    for (vrf, prefix) in dirty {
        let Some(vrf_hw) = state.vrfs.get(&vrf).map(|v| v.hw_id) else {
            continue;
        };
        let forward = match prefix {
            Prefix::IPV4(p) => state.vrfs.get(&vrf).and_then(|v| v.route_tree.v4.get(&p.as_net())).map(|r| r.forward),
            Prefix::IPV6(p) => state.vrfs.get(&vrf).and_then(|v| v.route_tree.v6.get(&p.as_net())).map(|r| r.forward),
        };
        let Some(forward) = forward else {
            continue;
        };
        let hw = forwarding_object_hw(state, forward);
        if let Err(e) = npu.route_create(vrf_hw, prefix, route_forward_hw(forward, hw)) {
            tracing::warn!(?vrf, %prefix, error = %e, "dep-route replay failed");
        }
    }
    if count > 0 {
        tracing::trace!(count, "dep-route walker replayed dirty routes");
    }
}

fn route_forward_hw(fwd: ForwardingObject, hw: HwId) -> RouteForwardHw {
    match fwd {
        ForwardingObject::NextHop(_) => RouteForwardHw::NextHop(hw),
        ForwardingObject::NextHopGroup(_) => RouteForwardHw::Group(hw),
        ForwardingObject::None => RouteForwardHw::Drop,
    }
}

fn forwarding_object_hw(state: &SwitchState, fwd: ForwardingObject) -> HwId {
    match fwd {
        ForwardingObject::NextHop(h) => state.next_hops.get(&h).and_then(|n| n.hw_id).unwrap_or(0),
        ForwardingObject::NextHopGroup(h) => state.nhgs.get(&h).map(|g| g.hw_id).unwrap_or(0),
        ForwardingObject::None => 0,
    }
}

fn find_underlay_neighbor(state: &SwitchState, vrf: Handle, ip: IpAddr) -> Option<Handle> {
    let v = state.vrfs.get(&vrf)?;
    v.nh_tree
        .iter()
        .filter(|(k, _)| k.ip == ip && k.nh_type == NhType::Ip)
        .find_map(|(_, &h)| {
            let nh = state.next_hops.get(&h)?;
            nh.owner.contains(NhOwner::NEIGHBOR).then_some(h)
        })
}

fn encap_nhs_at_ip(state: &SwitchState, vrf: Handle, ip: IpAddr) -> Vec<Handle> {
    let Some(v) = state.vrfs.get(&vrf) else { return Vec::new() };
    v.nh_tree
        .iter()
        .filter(|(k, _)| k.ip == ip && k.nh_type == NhType::Encap)
        .map(|(_, &h)| h)
        .collect()
}

fn best_route_prefix(state: &SwitchState, vrf: Handle, ip: IpAddr) -> Option<Prefix> {
    let v = state.vrfs.get(&vrf)?;
    Some(match ip {
        IpAddr::V4(a) => {
            let (net, _) = v.route_tree.v4.lookup_wd(a);
            Prefix::IPV4(lpm::prefix::Ipv4Prefix::new(net.network(), net.prefix_len()))
        }
        IpAddr::V6(a) => {
            let (net, _) = v.route_tree.v6.lookup_wd(a);
            Prefix::IPV6(lpm::prefix::Ipv6Prefix::new(net.network(), net.prefix_len()))
        }
    })
}

fn route_dep_encap_nh_list(state: &SwitchState, vrf: Handle, prefix: Prefix) -> Vec<Handle> {
    let Some(v) = state.vrfs.get(&vrf) else { return Vec::new() };
    match prefix {
        Prefix::IPV4(p) => v.route_tree.v4.get(&p.as_net()).map(|r| r.dep_encap_nh_list.iter().copied().collect()).unwrap_or_default(),
        Prefix::IPV6(p) => v.route_tree.v6.get(&p.as_net()).map(|r| r.dep_encap_nh_list.iter().copied().collect()).unwrap_or_default(),
    }
}

/// Every encap next hop linked to a route strictly less specific than
/// `prefix`, whose own destination IP now falls inside `prefix` (spec
/// §4.10's route-create case: a newly inserted prefix can only steal
/// encap next hops away from a less-specific match that already covered
/// their IP).
fn less_specific_dep_encap_nhs_inside(state: &SwitchState, vrf: Handle, prefix: Prefix) -> Vec<Handle> {
    let Some(v) = state.vrfs.get(&vrf) else { return Vec::new() };
    let mut out = Vec::new();
    match prefix {
        Prefix::IPV4(p) => {
            let net = p.as_net();
            for (candidate, route) in v.route_tree.v4.iter() {
                if candidate.prefix_len() < net.prefix_len() && candidate.contains(&net) {
                    for &encap in &route.dep_encap_nh_list {
                        if let Some(IpAddr::V4(ip)) = state.next_hops.get(&encap).map(|n| n.key.ip) {
                            if net.contains(&ip) {
                                out.push(encap);
                            }
                        }
                    }
                }
            }
        }
        Prefix::IPV6(p) => {
            let net = p.as_net();
            for (candidate, route) in v.route_tree.v6.iter() {
                if candidate.prefix_len() < net.prefix_len() && candidate.contains(&net) {
                    for &encap in &route.dep_encap_nh_list {
                        if let Some(IpAddr::V6(ip)) = state.next_hops.get(&encap).map(|n| n.key.ip) {
                            if net.contains(&ip) {
                                out.push(encap);
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

/// Clear whatever this encap next hop was previously resolved against
/// (neighbor, route, or NHG membership), unlinking every reverse pointer
/// those objects held on it.
fn detach_from_underlay(state: &mut SwitchState, encap: Handle, vrf: Handle) {
    let Some((old_neighbor, old_route, old_nhg)) = state.next_hops.get_mut(&encap).map(|nh| (nh.neighbor.take(), nh.lpm_route.take(), nh.underlay_nhg.take())) else {
        return;
    };

    if let Some(neighbor) = old_neighbor {
        if let Some(n) = state.next_hops.get_mut(&neighbor) {
            n.dep_encap_nh_list.shift_remove(&encap);
        }
    }
    if let Some(prefix) = old_route {
        if let Some(v) = state.vrfs.get_mut(&vrf) {
            match prefix {
                Prefix::IPV4(p) => {
                    if let Some(r) = v.route_tree.v4.get_mut(&p.as_net()) {
                        r.dep_encap_nh_list.shift_remove(&encap);
                    }
                }
                Prefix::IPV6(p) => {
                    if let Some(r) = v.route_tree.v6.get_mut(&p.as_net()) {
                        r.dep_encap_nh_list.shift_remove(&encap);
                    }
                }
            }
        }
    }
    if let Some(group) = old_nhg {
        unlink_from_forwarding_object(state, encap, ForwardingObject::NextHopGroup(group));
    }
}

fn neighbor_resolve(state: &mut SwitchState, npu: &dyn NpuDriver, encap: Handle, neighbor: Handle) {
    let encap_hw = state.next_hops.get(&encap).and_then(|n| n.hw_id);
    let neighbor_hw = state.next_hops.get(&neighbor).and_then(|n| n.hw_id);
    if let (Some(encap_hw), Some(neighbor_hw)) = (encap_hw, neighbor_hw) {
        npu.encap_nh_neighbor_resolve(encap_hw, neighbor_hw).ok();
    }

    if let Some(nh) = state.next_hops.get_mut(&encap) {
        nh.neighbor = Some(neighbor);
    }
    if let Some(n) = state.next_hops.get_mut(&neighbor) {
        n.dep_encap_nh_list.insert(encap);
    }
    mark_dep_routes_dirty(state, encap);
}

fn route_resolve(state: &mut SwitchState, npu: &dyn NpuDriver, encap: Handle, vrf: Handle, prefix: Prefix) {
    let forward = match prefix {
        Prefix::IPV4(p) => state.vrfs.get(&vrf).and_then(|v| v.route_tree.v4.get(&p.as_net())).map(|r| r.forward),
        Prefix::IPV6(p) => state.vrfs.get(&vrf).and_then(|v| v.route_tree.v6.get(&p.as_net())).map(|r| r.forward),
    };
    let Some(forward) = forward else { return };

    let hw = forwarding_object_hw(state, forward);
    if let Some(encap_hw) = state.next_hops.get(&encap).and_then(|n| n.hw_id) {
        npu.encap_nh_route_resolve(encap_hw, hw).ok();
    }

    match prefix {
        Prefix::IPV4(p) => {
            if let Some(r) = state.vrfs.get_mut(&vrf).and_then(|v| v.route_tree.v4.get_mut(&p.as_net())) {
                r.dep_encap_nh_list.insert(encap);
            }
        }
        Prefix::IPV6(p) => {
            if let Some(r) = state.vrfs.get_mut(&vrf).and_then(|v| v.route_tree.v6.get_mut(&p.as_net())) {
                r.dep_encap_nh_list.insert(encap);
            }
        }
    }

    link_to_forwarding_object(state, encap, forward);
    if let Some(nh) = state.next_hops.get_mut(&encap) {
        nh.lpm_route = Some(prefix);
        nh.underlay_nhg = match forward {
            ForwardingObject::NextHopGroup(g) => Some(g),
            _ => None,
        };
    }
    mark_dep_routes_dirty(state, encap);
}

fn link_to_forwarding_object(state: &mut SwitchState, encap: Handle, fwd: ForwardingObject) {
    match fwd {
        ForwardingObject::NextHop(h) => {
            if let Some(nh) = state.next_hops.get_mut(&h) {
                nh.dep_encap_nh_list.insert(encap);
            }
        }
        ForwardingObject::NextHopGroup(g) => {
            if let Some(grp) = state.nhgs.get_mut(&g) {
                grp.dep_encap_nh_list.insert(encap);
            }
            let members: Vec<Handle> = state.nhgs.get(&g).map(|grp| grp.members.keys().copied().collect()).unwrap_or_default();
            for m in members {
                if let Some(nh) = state.next_hops.get_mut(&m) {
                    nh.dep_encap_nh_list.insert(encap);
                }
            }
        }
        ForwardingObject::None => {}
    }
}

fn unlink_from_forwarding_object(state: &mut SwitchState, encap: Handle, fwd: ForwardingObject) {
    match fwd {
        ForwardingObject::NextHop(h) => {
            if let Some(nh) = state.next_hops.get_mut(&h) {
                nh.dep_encap_nh_list.shift_remove(&encap);
            }
        }
        ForwardingObject::NextHopGroup(g) => {
            if let Some(grp) = state.nhgs.get_mut(&g) {
                grp.dep_encap_nh_list.shift_remove(&encap);
            }
            let members: Vec<Handle> = state.nhgs.get(&g).map(|grp| grp.members.keys().copied().collect()).unwrap_or_default();
            for m in members {
                if let Some(nh) = state.next_hops.get_mut(&m) {
                    nh.dep_encap_nh_list.shift_remove(&encap);
                }
            }
        }
        ForwardingObject::None => {}
    }
}

fn mark_dep_routes_dirty(state: &mut SwitchState, encap: Handle) {
    let routes: Vec<(Handle, Prefix)> = state.next_hops.get(&encap).map(|n| n.dep_route_list.iter().copied().collect()).unwrap_or_default();
    for (vrf, prefix) in routes {
        state.mark_route_dirty(vrf, prefix);
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use net::eth::mac::Mac;

    use crate::attribute::AttributeValue;
    use crate::config::SwitchConfig;
    use crate::handle::Handle;
    use crate::neighbor::NeighborAttr;
    use crate::nexthop::NextHopAttr;
    use crate::npu::mock::MockNpu;
    use crate::rif::{RifAttr, RifType};
    use crate::route::RouteAttr;
    use crate::switch::Switch;
    use crate::tunnel::{TunnelAttr, TunnelType};

    fn new_switch() -> Arc<Switch> {
        Switch::new(SwitchConfig::default(), Arc::new(MockNpu::new()), Mac::ZERO)
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    /// Build two VRFs (overlay/underlay) with a port RIF in each, wired by
    /// an IP-in-IP tunnel, mirroring the walkthrough in spec §4.10.
    fn setup_tunnel(switch: &Switch) -> (Handle, Handle, Handle, Handle) {
        let underlay_vrf = switch.vrf_create(&[]).unwrap();
        let overlay_vrf = switch.vrf_create(&[]).unwrap();
        let underlay_rif = switch
            .rif_create(&[
                (RifAttr::VrfId, AttributeValue::ObjectId(underlay_vrf)),
                (RifAttr::Type, AttributeValue::U8(RifType::Port as u8)),
                (RifAttr::PortId, AttributeValue::U32(1)),
            ])
            .unwrap();
        let overlay_rif = switch
            .rif_create(&[
                (RifAttr::VrfId, AttributeValue::ObjectId(overlay_vrf)),
                (RifAttr::Type, AttributeValue::U8(RifType::Port as u8)),
                (RifAttr::PortId, AttributeValue::U32(2)),
            ])
            .unwrap();
        let tunnel = switch
            .tunnel_create(&[
                (TunnelAttr::Type, AttributeValue::U8(TunnelType::IpInIp as u8)),
                (TunnelAttr::UnderlayRif, AttributeValue::ObjectId(underlay_rif)),
                (TunnelAttr::OverlayRif, AttributeValue::ObjectId(overlay_rif)),
                (TunnelAttr::SrcIp, AttributeValue::Ipv4("10.0.0.1".parse().unwrap())),
            ])
            .unwrap();
        (underlay_vrf, overlay_vrf, underlay_rif, tunnel)
    }

    #[test]
    fn encap_nh_resolves_through_default_route_before_any_neighbor_exists() {
        let switch = new_switch();
        let (_underlay_vrf, _overlay_vrf, underlay_rif, tunnel) = setup_tunnel(&switch);
        let encap = switch
            .next_hop_create(&[
                (NextHopAttr::Type, AttributeValue::U8(1)),
                (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
                (NextHopAttr::Ip, AttributeValue::Ipv4("192.168.0.2".parse().unwrap())),
                (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
            ])
            .unwrap();
        let state = switch.state.lock();
        let nh = &state.next_hops[&encap];
        assert!(nh.neighbor.is_none());
        assert_eq!(nh.lpm_route, Some(lpm::prefix::Prefix::root_v4()));
    }

    #[test]
    fn neighbor_create_repoints_encap_nh_away_from_default_route() {
        let switch = new_switch();
        let (_underlay_vrf, _overlay_vrf, underlay_rif, tunnel) = setup_tunnel(&switch);
        let encap = switch
            .next_hop_create(&[
                (NextHopAttr::Type, AttributeValue::U8(1)),
                (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
                (NextHopAttr::Ip, AttributeValue::Ipv4("192.168.0.2".parse().unwrap())),
                (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
            ])
            .unwrap();

        let neighbor = switch
            .neighbor_create(
                underlay_rif,
                ip("192.168.0.2"),
                &[(NeighborAttr::Mac, AttributeValue::Mac(Mac::ZERO))],
            )
            .unwrap();

        let state = switch.state.lock();
        let nh = &state.next_hops[&encap];
        assert_eq!(nh.neighbor, Some(neighbor));
        assert!(nh.lpm_route.is_none(), "resolving to a neighbor clears the LPM fallback");
        assert!(state.next_hops[&neighbor].dep_encap_nh_list.contains(&encap));
    }

    #[test]
    fn neighbor_remove_falls_back_to_lpm_route() {
        let switch = new_switch();
        let (_underlay_vrf, _overlay_vrf, underlay_rif, tunnel) = setup_tunnel(&switch);
        let encap = switch
            .next_hop_create(&[
                (NextHopAttr::Type, AttributeValue::U8(1)),
                (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
                (NextHopAttr::Ip, AttributeValue::Ipv4("192.168.0.2".parse().unwrap())),
                (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
            ])
            .unwrap();
        let neighbor = switch
            .neighbor_create(
                underlay_rif,
                ip("192.168.0.2"),
                &[(NeighborAttr::Mac, AttributeValue::Mac(Mac::ZERO))],
            )
            .unwrap();
        switch.neighbor_remove(neighbor).unwrap();

        let state = switch.state.lock();
        let nh = &state.next_hops[&encap];
        assert!(nh.neighbor.is_none());
        assert_eq!(nh.lpm_route, Some(lpm::prefix::Prefix::root_v4()));
    }

    #[test]
    fn route_create_marks_dependent_overlay_route_dirty() {
        let switch = new_switch();
        let (underlay_vrf, overlay_vrf, underlay_rif, tunnel) = setup_tunnel(&switch);
        let encap = switch
            .next_hop_create(&[
                (NextHopAttr::Type, AttributeValue::U8(1)),
                (NextHopAttr::RouterInterfaceId, AttributeValue::ObjectId(underlay_rif)),
                (NextHopAttr::Ip, AttributeValue::Ipv4("192.168.0.2".parse().unwrap())),
                (NextHopAttr::TunnelId, AttributeValue::ObjectId(tunnel)),
            ])
            .unwrap();

        // Overlay route forwarding via the encap next hop.
        switch
            .route_create(&[
                (RouteAttr::VrfId, AttributeValue::ObjectId(overlay_vrf)),
                (RouteAttr::Prefix, AttributeValue::IpPrefix(lpm::prefix::Prefix::IPV4(lpm::prefix::Ipv4Prefix::new(Ipv4Addr::new(172, 16, 0, 0), 24)))),
                (RouteAttr::ForwardingObjectId, AttributeValue::ObjectId(encap)),
            ])
            .unwrap();

        {
            let state = switch.state.lock();
            assert!(state.next_hops[&encap].dep_route_list.contains(&(overlay_vrf, lpm::prefix::Prefix::IPV4(lpm::prefix::Ipv4Prefix::new(Ipv4Addr::new(172, 16, 0, 0), 24)))));
        }

        // A more specific underlay route appears: the encap's resolution
        // should move to it and mark the overlay route dirty again.
        switch
            .route_create(&[
                (RouteAttr::VrfId, AttributeValue::ObjectId(underlay_vrf)),
                (RouteAttr::Prefix, AttributeValue::IpPrefix(lpm::prefix::Prefix::IPV4(lpm::prefix::Ipv4Prefix::new(Ipv4Addr::new(192, 168, 0, 0), 24)))),
            ])
            .unwrap();

        let state = switch.state.lock();
        assert_eq!(state.next_hops[&encap].lpm_route.map(|p| p.length()), Some(24));
        assert!(!state.dirty_routes.is_empty(), "dependent overlay route should have been marked dirty");
    }
}
