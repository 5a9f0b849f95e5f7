// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The switch abstraction: one process-wide object graph behind the FIB
//! lock (spec §5), and the public create/remove/set/get surface for every
//! object family (spec §6's north-bound method tables, one per family).
//!
//! Every public method here follows the same shape: validate attributes
//! (C2) → look up / mutate the in-memory store (C3-C9) → call the NPU
//! driver → on failure, undo whatever in-memory state was already changed
//! before returning (spec §7's do/break idiom), so a failed call never
//! leaves the object graph half-updated.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;
use net::eth::mac::Mac;
use ordermap::OrderSet;

use crate::attribute::{AttributeValue, PacketAction};
use crate::config::SwitchConfig;
use crate::error::{Result, StatusError};
use crate::fdb::{FdbEntry, FdbEvent, FdbEventKind};
use crate::handle::{Handle, IdAllocator, ObjectType};
use crate::lag::{LagMemberEvent, LagMemberOp};
use crate::neighbor::{parse_neighbor_create, NeighborMacKey};
use crate::nexthop::{
    parse_next_hop_attrs, NeighborAttr, NextHop, NextHopAttr, NhKey, NhOwner, NhType, NEIGHBOR_ATTRS, NEXT_HOP_ATTRS,
};
use crate::nhg::{parse_nhg_create, NextHopGroup};
use crate::npu::{ForwardMode, NpuDriver, PortId};
use crate::rif::{parse_rif_create, Attachment, RifKey, RifType, RouterInterface, DEFAULT_MTU};
use crate::route::{parse_route_create, ForwardingObject, Route, RouteForwardHw};
use crate::tunnel::{Tunnel, TunnelMap, TunnelMapEntry, TunnelMapType, TunnelTerminationEntry};
use crate::vrf::{apply_vrf_attr, parse_vrf_create, RouteTree, VirtualRouter, VrfAttr};

tracectl::trace_target!("switchcore", tracectl::LevelFilter::INFO, &["l3", "fib"]);

/// Everything the FIB lock protects (spec §5: "the VRF tree, RIF tree,
/// NHG tree, `neighbor_mac_tree`, tunnel tree, ... the id bitmaps, and the
/// global switch-info configuration").
pub struct SwitchState {
    pub config: SwitchConfig,
    pub vrfs: HashMap<Handle, VirtualRouter, RandomState>,
    pub rifs: HashMap<Handle, RouterInterface, RandomState>,
    pub rif_index: HashMap<RifKey, Handle, RandomState>,
    pub next_hops: HashMap<Handle, NextHop, RandomState>,
    pub nhgs: HashMap<Handle, NextHopGroup, RandomState>,
    pub tunnels: HashMap<Handle, Tunnel, RandomState>,
    pub tunnel_terms: HashMap<Handle, TunnelTerminationEntry, RandomState>,
    pub tunnel_maps: HashMap<Handle, TunnelMap, RandomState>,
    pub tunnel_map_entries: HashMap<Handle, TunnelMapEntry, RandomState>,
    pub neighbor_mac_tree: HashMap<NeighborMacKey, OrderSet<Handle>, RandomState>,
    /// Dirty-set replacement for the source's radix "radical" walk (Design
    /// Notes): every `(vrf, prefix)` pair the dependency engine touched
    /// since the worker's last pass.
    pub dirty_routes: OrderSet<(Handle, lpm::prefix::Prefix)>,
    pub switch_mac: Mac,
    pub tunnel_alloc: IdAllocator,
    pub tunnel_term_alloc: IdAllocator,
    pub tunnel_map_alloc: IdAllocator,
    pub tunnel_map_entry_alloc: IdAllocator,
}

impl SwitchState {
    fn new(config: SwitchConfig, switch_mac: Mac) -> Self {
        Self {
            tunnel_alloc: IdAllocator::new(ObjectType::Tunnel, config.tunnel_capacity),
            tunnel_term_alloc: IdAllocator::new(ObjectType::TunnelTermEntry, config.tunnel_term_capacity),
            tunnel_map_alloc: IdAllocator::new(ObjectType::TunnelMap, config.tunnel_map_capacity),
            tunnel_map_entry_alloc: IdAllocator::new(ObjectType::TunnelMapEntry, config.tunnel_map_capacity.saturating_mul(8)),
            config,
            vrfs: HashMap::with_hasher(RandomState::new()),
            rifs: HashMap::with_hasher(RandomState::new()),
            rif_index: HashMap::with_hasher(RandomState::new()),
            next_hops: HashMap::with_hasher(RandomState::new()),
            nhgs: HashMap::with_hasher(RandomState::new()),
            tunnels: HashMap::with_hasher(RandomState::new()),
            tunnel_terms: HashMap::with_hasher(RandomState::new()),
            tunnel_maps: HashMap::with_hasher(RandomState::new()),
            tunnel_map_entries: HashMap::with_hasher(RandomState::new()),
            neighbor_mac_tree: HashMap::with_hasher(RandomState::new()),
            dirty_routes: OrderSet::new(),
            switch_mac,
        }
    }

    pub fn vrf_mut(&mut self, handle: Handle) -> Result<&mut VirtualRouter> {
        self.vrfs.get_mut(&handle).ok_or(StatusError::InvalidObjectId)
    }

    pub fn vrf(&self, handle: Handle) -> Result<&VirtualRouter> {
        self.vrfs.get(&handle).ok_or(StatusError::InvalidObjectId)
    }

    pub fn rif(&self, handle: Handle) -> Result<&RouterInterface> {
        self.rifs.get(&handle).ok_or(StatusError::InvalidObjectId)
    }

    pub fn mark_route_dirty(&mut self, vrf: Handle, prefix: lpm::prefix::Prefix) {
        self.dirty_routes.insert((vrf, prefix));
    }
}

/// The switch abstraction layer. Construct with [`Switch::new`], which
/// spawns the dependency-engine worker thread bound to the same
/// [`concurrency::ReentrantLock`] every public method below takes.
pub struct Switch {
    pub(crate) state: concurrency::ReentrantLock<SwitchState>,
    pub(crate) npu: Arc<dyn NpuDriver>,
    pub(crate) waker: mio::Waker,
}

impl Switch {
    #[must_use]
    pub fn new(config: SwitchConfig, npu: Arc<dyn NpuDriver>, switch_mac: Mac) -> Arc<Self> {
        let poll = mio::Poll::new().expect("failed to create dependency-engine poller");
        let waker = mio::Waker::new(poll.registry(), mio::Token(0)).expect("failed to create dependency-engine waker");
        let switch = Arc::new(Self {
            state: concurrency::ReentrantLock::new(SwitchState::new(config, switch_mac)),
            npu,
            waker,
        });
        crate::depengine::spawn_worker(Arc::clone(&switch), poll);
        switch
    }

    /// Signal the dependency-route worker (spec §4.10's "signal
    /// dep-route walker"). Writing while holding the FIB lock and having
    /// the worker reacquire it on wake is what makes the "replay always
    /// observes the triggering call's effects" ordering guarantee hold
    /// (spec §5).
    pub(crate) fn signal_dep_engine(&self) {
        if let Err(e) = self.waker.wake() {
            tracing::trace!(error = %e, "dependency-engine wake dropped (duplicate or EAGAIN)");
        }
    }

    // ---------------------------------------------------------------
    // VRF (C3)
    // ---------------------------------------------------------------

    pub fn vrf_create(&self, attrs: &[(VrfAttr, AttributeValue)]) -> Result<Handle> {
        let mut state = self.state.lock();
        let switch_mac = state.switch_mac;
        let (src_mac, ip_options_action, ttl_violation_action) = parse_vrf_create(attrs, switch_mac)?;
        let hw_id = self.npu.vrf_create()?;
        let handle = Handle::new(ObjectType::VirtualRouter, hw_id);
        let mut vrf = VirtualRouter::new(handle, hw_id, src_mac);
        vrf.ip_options_action = ip_options_action;
        vrf.ttl_violation_action = ttl_violation_action;
        vrf.route_tree.v4.insert(ipnet::Ipv4Net::new(std::net::Ipv4Addr::UNSPECIFIED, 0).unwrap(), Route::new_default(handle, lpm::prefix::Prefix::root_v4()));
        vrf.route_tree.v6.insert(ipnet::Ipv6Net::new(std::net::Ipv6Addr::UNSPECIFIED, 0).unwrap(), Route::new_default(handle, lpm::prefix::Prefix::root_v6()));
        state.vrfs.insert(handle, vrf);
        tracing::debug!(?handle, "created VRF");
        Ok(handle)
    }

    pub fn vrf_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let vrf = state.vrf(handle)?;
        if !vrf.can_destroy() {
            tracing::debug!(?handle, "VRF remove refused: still in use");
            return Err(StatusError::ObjectInUse);
        }
        let hw_id = vrf.hw_id;
        self.npu.vrf_remove(hw_id)?;
        state.vrfs.remove(&handle);
        tracing::debug!(?handle, "removed VRF");
        Ok(())
    }

    pub fn vrf_set_attribute(&self, handle: Handle, id: VrfAttr, value: &AttributeValue) -> Result<()> {
        let mut state = self.state.lock();
        crate::attribute::validate(crate::attribute::Op::Set, std::slice::from_ref(&(id, value.clone())), crate::vrf::VRF_ATTRS)?;
        let hw_id = state.vrf(handle)?.hw_id;
        let vrf = state.vrf_mut(handle)?;
        let Some(changed) = apply_vrf_attr(vrf, id, value)? else {
            return Ok(()); // P10: no-op set short-circuits before any NPU call.
        };
        self.npu.vrf_attr_set(hw_id, changed as u32 as u32)?;
        Ok(())
    }

    pub fn vrf_get_attribute(&self, handle: Handle, ids: &[VrfAttr]) -> Result<Vec<AttributeValue>> {
        crate::attribute::validate_get(ids, crate::vrf::VRF_ATTRS)?;
        let state = self.state.lock();
        let vrf = state.vrf(handle)?;
        Ok(ids
            .iter()
            .map(|id| match id {
                VrfAttr::SrcMac => AttributeValue::Mac(vrf.src_mac),
                VrfAttr::V4AdminState => AttributeValue::Bool(vrf.v4_admin_state),
                VrfAttr::V6AdminState => AttributeValue::Bool(vrf.v6_admin_state),
                VrfAttr::IpOptionsAction => AttributeValue::U8(vrf.ip_options_action as u8),
                VrfAttr::TtlViolationAction => AttributeValue::U8(vrf.ttl_violation_action as u8),
            })
            .collect())
    }

    /// `max_ecmp_paths_set` (spec §4.3): a switch-scope attribute that
    /// updates every downstream group's cap. Stored on [`SwitchConfig`]
    /// rather than per-VRF since it is switch-global, not VRF-scoped.
    pub fn set_max_ecmp_paths(&self, max: u32) {
        let mut state = self.state.lock();
        state.config.max_ecmp_paths = max;
    }

    // ---------------------------------------------------------------
    // RIF (C4)
    // ---------------------------------------------------------------

    pub fn rif_create(&self, attrs: &[(crate::rif::RifAttr, AttributeValue)]) -> Result<Handle> {
        let mut state = self.state.lock();
        let parsed = parse_rif_create(attrs)?;
        let vrf = state.vrf(parsed.vrf)?;
        let mac = parsed.mac.unwrap_or(vrf.src_mac);
        let v4 = parsed.v4_admin_state.unwrap_or(vrf.v4_admin_state);
        let v6 = parsed.v6_admin_state.unwrap_or(vrf.v6_admin_state);
        let ip_options_action = parsed.ip_options_action.unwrap_or(vrf.ip_options_action);

        let key = RifKey { rif_type: parsed.rif_type, attachment: parsed.attachment, mac };
        if state.rif_index.contains_key(&key) {
            return Err(StatusError::ItemAlreadyExists);
        }

        let hw_id = self.npu.rif_create()?;
        let handle = Handle::new(ObjectType::RouterInterface, hw_id);
        let rif = RouterInterface {
            handle,
            hw_id,
            vrf: parsed.vrf,
            rif_type: parsed.rif_type,
            attachment: parsed.attachment,
            mac,
            v4_admin_state: v4,
            v6_admin_state: v6,
            mtu: parsed.mtu.unwrap_or(DEFAULT_MTU),
            ip_options_action,
            ref_count: 0,
        };

        if let Err(e) = self.set_attachment_routing(parsed.attachment, true) {
            self.npu.rif_remove(hw_id).ok();
            return Err(e);
        }

        state.rif_index.insert(key, handle);
        state.rifs.insert(handle, rif);
        state.vrf_mut(parsed.vrf)?.rif_list.insert(handle);
        tracing::debug!(?handle, vrf = ?parsed.vrf, "created RIF");
        Ok(handle)
    }

    pub fn rif_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let rif = state.rif(handle)?.clone();
        if rif.ref_count != 0 {
            return Err(StatusError::ObjectInUse);
        }
        self.npu.rif_remove(rif.hw_id)?;
        self.set_attachment_routing(rif.attachment, false)?;
        state.rifs.remove(&handle);
        state.rif_index.remove(&rif.key());
        if let Some(vrf) = state.vrfs.get_mut(&rif.vrf) {
            vrf.rif_list.shift_remove(&handle);
        }
        tracing::debug!(?handle, "removed RIF");
        Ok(())
    }

    pub fn rif_get_attribute(&self, handle: Handle, ids: &[crate::rif::RifAttr]) -> Result<Vec<AttributeValue>> {
        use crate::rif::RifAttr;
        crate::attribute::validate_get(ids, crate::rif::RIF_ATTRS)?;
        let state = self.state.lock();
        let rif = state.rif(handle)?;
        Ok(ids
            .iter()
            .map(|id| match id {
                RifAttr::VrfId => AttributeValue::ObjectId(rif.vrf),
                RifAttr::Type => AttributeValue::U8(rif.rif_type as u8),
                RifAttr::PortId => match rif.attachment {
                    Attachment::Port(p) | Attachment::Lag(p) => AttributeValue::U32(p.0),
                    _ => AttributeValue::U32(0),
                },
                RifAttr::VlanId => match rif.attachment {
                    Attachment::Vlan(v) => AttributeValue::U16(v.as_u16()),
                    _ => AttributeValue::U16(0),
                },
                RifAttr::Mac => AttributeValue::Mac(rif.mac),
                RifAttr::V4AdminState => AttributeValue::Bool(rif.v4_admin_state),
                RifAttr::V6AdminState => AttributeValue::Bool(rif.v6_admin_state),
                RifAttr::Mtu => AttributeValue::U16(rif.mtu),
                RifAttr::IpOptionsAction => AttributeValue::U8(rif.ip_options_action as u8),
            })
            .collect())
    }

    /// Drives every underlying physical port into/out of routing
    /// forward-mode (spec §4.4); for a LAG attachment this only covers
    /// the ports known at create/destroy time — membership churn after
    /// that is handled by [`Switch::lag_member_event`].
    fn set_attachment_routing(&self, attachment: Attachment, routing: bool) -> Result<()> {
        let mode = if routing { ForwardMode::Routing } else { ForwardMode::Unknown };
        match attachment {
            Attachment::Port(p) | Attachment::Lag(p) => self.npu.port_set_forward_mode(p, mode),
            Attachment::Vlan(_) | Attachment::None => Ok(()),
        }
    }

    /// LAG membership callback (C11, spec §4.4/§4.11): extend or shrink a
    /// LAG-attached RIF's port set and move the affected ports into/out
    /// of routing mode. Rollback is per-port: on a mid-way failure every
    /// port already switched this call is reverted before returning.
    pub fn lag_member_event(&self, event: &LagMemberEvent) -> Result<()> {
        let state = self.state.lock();
        let rif = state.rif(event.rif)?;
        if !matches!(rif.attachment, Attachment::Lag(_)) {
            return Err(StatusError::InvalidParameter);
        }
        let target_mode = match event.op {
            LagMemberOp::Add => ForwardMode::Routing,
            LagMemberOp::Remove => ForwardMode::Unknown,
        };
        let mut done = Vec::with_capacity(event.ports.len());
        for &port in &event.ports {
            match self.npu.port_set_forward_mode(port, target_mode) {
                Ok(()) => done.push(port),
                Err(e) => {
                    let revert_mode = match event.op {
                        LagMemberOp::Add => ForwardMode::Unknown,
                        LagMemberOp::Remove => ForwardMode::Routing,
                    };
                    for p in done {
                        self.npu.port_set_forward_mode(p, revert_mode).ok();
                    }
                    return Err(e);
                }
            }
        }
        tracing::debug!(lag = ?event.lag_id, rif = ?event.rif, op = ?event.op, "applied LAG membership change to RIF");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Next hop (C5) — IP and tunnel-encap
    // ---------------------------------------------------------------

    pub fn next_hop_create(&self, attrs: &[(NextHopAttr, AttributeValue)]) -> Result<Handle> {
        let mut state = self.state.lock();
        let (nh_type, rif_handle, ip, tunnel_id, packet_action, metadata, no_host_route) = parse_next_hop_attrs(attrs)?;
        let rif = state.rif(rif_handle)?.clone();
        let tunnel_type = match (nh_type, tunnel_id) {
            (NhType::Encap, Some(t)) => Some(state.tunnels.get(&t).ok_or(StatusError::InvalidObjectId)?.tunnel_type),
            (NhType::Encap, None) => return Err(StatusError::MandatoryAttributeMissing),
            (NhType::Ip, _) => None,
        };
        let key = match tunnel_type {
            Some(tt) => NhKey::encap(ip, rif_handle, tt),
            None => NhKey::ip_only(ip, rif_handle),
        };

        let existing = state.vrf(rif.vrf)?.nh_tree.get(&key).copied();
        let handle = if let Some(h) = existing {
            let nh = state.next_hops.get_mut(&h).expect("nh_tree entry without backing NextHop");
            if nh.owner.contains(NhOwner::NEXT_HOP) {
                return Err(StatusError::ItemAlreadyExists);
            }
            nh.owner.insert(NhOwner::NEXT_HOP);
            nh.packet_action = packet_action;
            nh.metadata = metadata;
            nh.no_host_route = no_host_route;
            nh.tunnel_id = tunnel_id;
            if nh.hw_id.is_none() {
                nh.hw_id = Some(self.npu.next_hop_create()?);
            }
            h
        } else {
            let hw_id = self.npu.next_hop_create()?;
            let handle = Handle::new(ObjectType::NextHop, hw_id);
            let nh = NextHop {
                handle,
                hw_id: Some(hw_id),
                key,
                vrf: rif.vrf,
                rif: rif_handle,
                mac: None,
                port_id: match rif.attachment {
                    Attachment::Port(p) | Attachment::Lag(p) => Some(p),
                    _ => None,
                },
                vlan: match rif.attachment {
                    Attachment::Vlan(v) => Some(v),
                    _ => None,
                },
                packet_action,
                metadata,
                no_host_route,
                owner: NhOwner::NEXT_HOP,
                ref_count: 0,
                tunnel_id,
                neighbor: None,
                lpm_route: None,
                underlay_nhg: None,
                dep_route_list: OrderSet::new(),
                dep_encap_nh_list: OrderSet::new(),
                groups: ordermap::OrderMap::new(),
                pending_fdb_resolution: false,
            };
            state.next_hops.insert(handle, nh);
            state.vrf_mut(rif.vrf)?.nh_tree.insert(key, handle);
            state.rifs.get_mut(&rif_handle).expect("rif disappeared mid-create").ref_count += 1;
            handle
        };

        if nh_type == NhType::Encap {
            if let Some(t) = tunnel_id {
                state.tunnels.get_mut(&t).expect("tunnel disappeared mid-create").encap_nh_list.insert(handle);
            }
            crate::depengine::resolve_encap_nh(&mut state, &*self.npu, handle)?;
            self.signal_dep_engine();
        }
        tracing::debug!(?handle, ?ip, "created next hop");
        Ok(handle)
    }

    pub fn next_hop_get_attribute(&self, handle: Handle, ids: &[NextHopAttr]) -> Result<Vec<AttributeValue>> {
        crate::attribute::validate_get(ids, NEXT_HOP_ATTRS)?;
        let state = self.state.lock();
        let nh = state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        Ok(ids
            .iter()
            .map(|id| match id {
                NextHopAttr::Type => AttributeValue::U8(nh.key.nh_type as u8),
                NextHopAttr::RouterInterfaceId => AttributeValue::ObjectId(nh.rif),
                NextHopAttr::Ip => match nh.key.ip {
                    std::net::IpAddr::V4(v4) => AttributeValue::Ipv4(v4),
                    std::net::IpAddr::V6(v6) => AttributeValue::Ipv6(v6),
                },
                NextHopAttr::TunnelId => nh.tunnel_id.map_or(AttributeValue::U32(0), AttributeValue::ObjectId),
                NextHopAttr::PacketAction => AttributeValue::U8(nh.packet_action as u8),
                NextHopAttr::Metadata => AttributeValue::U32(nh.metadata),
                NextHopAttr::NoHostRoute => AttributeValue::Bool(nh.no_host_route),
            })
            .collect())
    }

    /// The resolved port a next hop currently forwards through, whether it
    /// got there via its RIF's own attachment or an FDB-learned VLAN-RIF
    /// neighbor lookup (spec §4.5). `None` means unresolved (spec's
    /// `pending_fdb_resolution` case).
    pub fn next_hop_resolved_port(&self, handle: Handle) -> Result<Option<PortId>> {
        let state = self.state.lock();
        Ok(state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?.port_id)
    }

    /// Whether a tunnel-encap next hop has resolved through a neighbor
    /// (`Some(true)`) or is still falling back to the underlay's LPM route
    /// (`Some(false)`); `None` if the handle names a plain IP next hop.
    pub fn next_hop_resolved_via_neighbor(&self, handle: Handle) -> Result<Option<bool>> {
        let state = self.state.lock();
        let nh = state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        if nh.key.nh_type != NhType::Encap {
            return Ok(None);
        }
        Ok(Some(nh.neighbor.is_some()))
    }

    pub fn next_hop_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let nh = state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        if !nh.groups.is_empty() || nh.ref_count > 0 {
            return Err(StatusError::ObjectInUse);
        }
        let hw_id = nh.hw_id.ok_or(StatusError::InvalidObjectId)?;
        let rif_handle = nh.rif;
        let vrf_handle = nh.vrf;
        let tunnel_id = nh.tunnel_id;
        let key = nh.key;
        self.npu.next_hop_remove(hw_id)?;

        let nh = state.next_hops.get_mut(&handle).expect("checked above");
        nh.owner.remove(NhOwner::NEXT_HOP);
        nh.hw_id = None;
        let still_alive = !nh.owner.is_empty();

        if let Some(t) = tunnel_id {
            if let Some(tunnel) = state.tunnels.get_mut(&t) {
                tunnel.encap_nh_list.shift_remove(&handle);
            }
        }

        if !still_alive {
            state.next_hops.remove(&handle);
            if let Some(vrf) = state.vrfs.get_mut(&vrf_handle) {
                vrf.nh_tree.remove(&key);
            }
            if let Some(rif) = state.rifs.get_mut(&rif_handle) {
                rif.ref_count = rif.ref_count.saturating_sub(1);
            }
        }
        tracing::debug!(?handle, "removed next hop");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Neighbor (C5's logical view, C8)
    // ---------------------------------------------------------------

    pub fn neighbor_create(&self, rif_handle: Handle, ip: std::net::IpAddr, attrs: &[(NeighborAttr, AttributeValue)]) -> Result<Handle> {
        let mut state = self.state.lock();
        let parsed = parse_neighbor_create(attrs)?;
        let rif = state.rif(rif_handle)?.clone();
        let key = NhKey::ip_only(ip, rif_handle);

        let (port_id, pending_fdb_resolution, vlan) = match rif.attachment {
            Attachment::Port(p) | Attachment::Lag(p) => (Some(p), false, None),
            Attachment::Vlan(v) => match parsed.mac.and_then(|mac| {
                state
                    .neighbor_mac_tree
                    .get(&NeighborMacKey { vlan: v, mac })
                    .and_then(|set| set.iter().find_map(|h| state.next_hops.get(h)).and_then(|n| n.port_id))
            }) {
                Some(p) => (Some(p), false, Some(v)),
                None => (None, true, Some(v)),
            },
            Attachment::None => (None, false, None),
        };

        let existing = state.vrf(rif.vrf)?.nh_tree.get(&key).copied();
        let handle = if let Some(h) = existing {
            let nh = state.next_hops.get_mut(&h).expect("nh_tree entry without backing NextHop");
            if nh.owner.contains(NhOwner::NEIGHBOR) {
                return Err(StatusError::ItemAlreadyExists);
            }
            nh.owner.insert(NhOwner::NEIGHBOR);
            nh.mac = parsed.mac;
            nh.packet_action = parsed.packet_action;
            nh.metadata = parsed.metadata;
            nh.no_host_route = parsed.no_host_route;
            nh.port_id = port_id.or(nh.port_id);
            nh.pending_fdb_resolution = pending_fdb_resolution;
            if nh.hw_id.is_none() {
                nh.hw_id = Some(self.npu.next_hop_create()?);
            }
            h
        } else {
            let hw_id = self.npu.next_hop_create()?;
            let handle = Handle::new(ObjectType::NextHop, hw_id);
            let nh = NextHop {
                handle,
                hw_id: Some(hw_id),
                key,
                vrf: rif.vrf,
                rif: rif_handle,
                mac: parsed.mac,
                port_id,
                vlan,
                packet_action: parsed.packet_action,
                metadata: parsed.metadata,
                no_host_route: parsed.no_host_route,
                owner: NhOwner::NEIGHBOR,
                ref_count: 0,
                tunnel_id: None,
                neighbor: None,
                lpm_route: None,
                underlay_nhg: None,
                dep_route_list: OrderSet::new(),
                dep_encap_nh_list: OrderSet::new(),
                groups: ordermap::OrderMap::new(),
                pending_fdb_resolution,
            };
            state.next_hops.insert(handle, nh);
            state.vrf_mut(rif.vrf)?.nh_tree.insert(key, handle);
            state.rifs.get_mut(&rif_handle).expect("rif disappeared mid-create").ref_count += 1;
            handle
        };

        self.npu.neighbor_create(state.next_hops[&handle].hw_id.expect("just set"))?;

        if let (Some(vlan), Some(mac)) = (vlan, parsed.mac) {
            state.neighbor_mac_tree.entry(NeighborMacKey { vlan, mac }).or_default().insert(handle);
            self.npu.fdb_register_callback(vlan, mac)?;
        }

        crate::depengine::on_neighbor_created(&mut state, &*self.npu, rif.vrf, ip);
        self.signal_dep_engine();
        tracing::debug!(?handle, rif = ?rif_handle, ?ip, "created neighbor");
        Ok(handle)
    }

    pub fn neighbor_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let nh = state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?.clone();
        if !nh.owner.contains(NhOwner::NEIGHBOR) {
            return Err(StatusError::InvalidObjectId);
        }
        let hw_id = nh.hw_id.ok_or(StatusError::InvalidObjectId)?;
        self.npu.neighbor_remove(hw_id)?;

        if let (Some(vlan), Some(mac)) = (nh.vlan, nh.mac) {
            let mac_key = NeighborMacKey { vlan, mac };
            if let Some(set) = state.neighbor_mac_tree.get_mut(&mac_key) {
                set.shift_remove(&handle);
                if set.is_empty() {
                    state.neighbor_mac_tree.remove(&mac_key);
                    self.npu.fdb_unregister_callback(vlan, mac)?;
                }
            }
        }

        let ip = nh.key.ip;
        let neighbor_vrf = nh.vrf;
        let still_owner_next_hop = {
            let nh = state.next_hops.get_mut(&handle).expect("checked above");
            nh.owner.remove(NhOwner::NEIGHBOR);
            nh.owner.contains(NhOwner::NEXT_HOP)
        };
        if !still_owner_next_hop {
            let vrf = nh.vrf;
            let rif = nh.rif;
            let key = nh.key;
            state.next_hops.remove(&handle);
            if let Some(vrf) = state.vrfs.get_mut(&vrf) {
                vrf.nh_tree.remove(&key);
            }
            if let Some(rif) = state.rifs.get_mut(&rif) {
                rif.ref_count = rif.ref_count.saturating_sub(1);
            }
        }

        crate::depengine::on_neighbor_removed(&mut state, &*self.npu, neighbor_vrf, ip);
        self.signal_dep_engine();
        tracing::debug!(?handle, "removed neighbor");
        Ok(())
    }

    pub fn neighbor_set_attribute(&self, handle: Handle, id: NeighborAttr, value: &AttributeValue) -> Result<()> {
        let mut state = self.state.lock();
        crate::attribute::validate(crate::attribute::Op::Set, std::slice::from_ref(&(id, value.clone())), NEIGHBOR_ATTRS)?;
        let nh = state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?.clone();
        if !nh.owner.contains(NhOwner::NEIGHBOR) {
            return Err(StatusError::InvalidObjectId);
        }

        let old_mac = nh.mac;
        let old_action = nh.packet_action;
        let mut new_mac = old_mac;
        let mut new_action = old_action;
        match id {
            NeighborAttr::Mac => new_mac = value.as_mac(),
            NeighborAttr::PacketAction => {
                if let Some(v) = value.as_u8() {
                    new_action = crate::nexthop::decode_packet_action(v)?;
                }
            }
            NeighborAttr::Metadata => {
                let metadata = value.as_u32().unwrap_or(0);
                if metadata == nh.metadata {
                    return Ok(()); // P10
                }
                state.next_hops.get_mut(&handle).unwrap().metadata = metadata;
                return Ok(());
            }
            NeighborAttr::NoHostRoute => {
                let v = value.as_bool().unwrap_or(false);
                if v == nh.no_host_route {
                    return Ok(());
                }
                state.next_hops.get_mut(&handle).unwrap().no_host_route = v;
                return Ok(());
            }
        }
        if new_mac == old_mac && new_action == old_action {
            return Ok(()); // P10
        }

        // Recompute port_id if the MAC changed or the action transitioned
        // into Forward (spec §4.5's "MAC or packet-action-to-Forward
        // transition changes the effective port_id").
        let rif = state.rif(nh.rif)?.clone();
        let new_port = match rif.attachment {
            Attachment::Port(p) | Attachment::Lag(p) => Some(p),
            Attachment::Vlan(v) => new_mac.and_then(|mac| {
                state
                    .neighbor_mac_tree
                    .get(&NeighborMacKey { vlan: v, mac })
                    .and_then(|set| set.iter().next())
                    .and_then(|h| state.next_hops.get(h))
                    .and_then(|n| n.port_id)
            }),
            Attachment::None => None,
        };
        let port_changed = new_port != nh.port_id;

        let hw_id = nh.hw_id.ok_or(StatusError::InvalidObjectId)?;
        self.npu.neighbor_attr_set(hw_id, port_changed)?;

        let old_mac_key = old_mac.and_then(|m| nh.vlan.map(|v| NeighborMacKey { vlan: v, mac: m }));
        let new_mac_key = new_mac.and_then(|m| nh.vlan.map(|v| NeighborMacKey { vlan: v, mac: m }));

        let entry = state.next_hops.get_mut(&handle).expect("checked above");
        entry.mac = new_mac;
        entry.packet_action = new_action;
        if port_changed {
            entry.port_id = new_port;
        }

        if old_mac_key != new_mac_key {
            if let Some(k) = old_mac_key {
                if let Some(set) = state.neighbor_mac_tree.get_mut(&k) {
                    set.shift_remove(&handle);
                    if set.is_empty() {
                        state.neighbor_mac_tree.remove(&k);
                    }
                }
            }
            if let Some(k) = new_mac_key {
                state.neighbor_mac_tree.entry(k).or_default().insert(handle);
            }
        }

        crate::depengine::on_neighbor_attr_changed(&state, &*self.npu, handle, port_changed);
        tracing::debug!(?handle, "set neighbor attribute");
        Ok(())
    }

    pub fn neighbor_get_attribute(&self, handle: Handle, ids: &[NeighborAttr]) -> Result<Vec<AttributeValue>> {
        crate::attribute::validate_get(ids, NEIGHBOR_ATTRS)?;
        let state = self.state.lock();
        let nh = state.next_hops.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        if !nh.owner.contains(NhOwner::NEIGHBOR) {
            return Err(StatusError::InvalidObjectId);
        }
        Ok(ids
            .iter()
            .map(|id| match id {
                NeighborAttr::Mac => AttributeValue::Mac(nh.mac.unwrap_or(Mac::ZERO)),
                NeighborAttr::PacketAction => AttributeValue::U8(nh.packet_action as u8),
                NeighborAttr::Metadata => AttributeValue::U32(nh.metadata),
                NeighborAttr::NoHostRoute => AttributeValue::Bool(nh.no_host_route),
            })
            .collect())
    }

    // ---------------------------------------------------------------
    // Next-hop group (C6)
    // ---------------------------------------------------------------

    pub fn nhg_create(&self, attrs: &[(crate::nhg::NhgAttr, AttributeValue)]) -> Result<Handle> {
        let mut state = self.state.lock();
        let members = parse_nhg_create(attrs)?;
        let max = state.config.max_ecmp_paths;
        let hw_id = self.npu.nhg_create()?;
        let handle = Handle::new(ObjectType::NextHopGroup, hw_id);
        let mut group = NextHopGroup::new(handle, hw_id);
        for member in members {
            if let Err(e) = self.nhg_add_member_locked(&mut state, handle, &mut group, member, max) {
                // Rollback every member already added this call.
                for (m, _) in group.members.clone() {
                    self.npu.nhg_member_remove(hw_id, state.next_hops[&m].hw_id.unwrap_or(0)).ok();
                }
                self.npu.nhg_remove(hw_id).ok();
                return Err(e);
            }
        }
        state.nhgs.insert(handle, group);
        tracing::debug!(?handle, "created next-hop group");
        Ok(handle)
    }

    fn nhg_add_member_locked(&self, state: &mut SwitchState, group_handle: Handle, group: &mut NextHopGroup, member: Handle, max: u32) -> Result<()> {
        let already_weight = group.members.get(&member).copied().unwrap_or(0);
        if already_weight == 0 && group.nh_count() >= max {
            return Err(StatusError::InsufficientResources);
        }
        let member_hw = state.next_hops.get(&member).ok_or(StatusError::InvalidObjectId)?.hw_id.ok_or(StatusError::InvalidObjectId)?;
        if already_weight == 0 {
            self.npu.nhg_member_add(group.hw_id, member_hw, 1)?;
        }
        *group.members.entry(member).or_insert(0) += 1;
        let nh = state.next_hops.get_mut(&member).expect("checked above");
        *nh.groups.entry(group_handle).or_insert(0) += 1;
        Ok(())
    }

    pub fn nhg_add_members(&self, handle: Handle, members: &[Handle]) -> Result<()> {
        let mut state = self.state.lock();
        let max = state.config.max_ecmp_paths;
        for &member in members {
            let mut group = state.nhgs.get(&handle).ok_or(StatusError::InvalidObjectId)?.clone_shallow();
            self.nhg_add_member_locked(&mut state, handle, &mut group, member, max)?;
            *state.nhgs.get_mut(&handle).unwrap() = group;
            crate::depengine::on_nhg_member_added(&mut state, &*self.npu, handle, member);
        }
        Ok(())
    }

    pub fn nhg_remove_members(&self, handle: Handle, members: &[Handle]) -> Result<()> {
        let mut state = self.state.lock();
        for &member in members {
            let group = state.nhgs.get_mut(&handle).ok_or(StatusError::InvalidObjectId)?;
            let Some(weight) = group.members.get_mut(&member) else {
                continue;
            };
            *weight -= 1;
            let became_zero = *weight == 0;
            if became_zero {
                group.members.shift_remove(&member);
                let member_hw = state.next_hops.get(&member).and_then(|n| n.hw_id);
                if let Some(member_hw) = member_hw {
                    self.npu.nhg_member_remove(state.nhgs[&handle].hw_id, member_hw)?;
                }
            }
            if let Some(nh) = state.next_hops.get_mut(&member) {
                if let Some(w) = nh.groups.get_mut(&handle) {
                    *w -= 1;
                    if *w == 0 {
                        nh.groups.shift_remove(&handle);
                    }
                }
            }
            if became_zero {
                crate::depengine::on_nhg_member_removed(&mut state, &*self.npu, handle, member);
            }
        }
        Ok(())
    }

    pub fn nhg_get_attribute(&self, handle: Handle, ids: &[crate::nhg::NhgAttr]) -> Result<Vec<AttributeValue>> {
        use crate::nhg::NhgAttr;
        crate::attribute::validate_get(ids, crate::nhg::NHG_ATTRS)?;
        let state = self.state.lock();
        let group = state.nhgs.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        Ok(ids
            .iter()
            .map(|id| match id {
                NhgAttr::Type => AttributeValue::U8(group.group_type as u8),
                NhgAttr::NextHopMemberList => AttributeValue::ObjectList(group.members.keys().copied().collect()),
            })
            .collect())
    }

    pub fn nhg_remove(&self, handle: Handle) -> Result<()> {
        let state = self.state.lock();
        let group = state.nhgs.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        if group.ref_count > 0 {
            return Err(StatusError::ObjectInUse);
        }
        let members: Vec<Handle> = group.members.keys().copied().collect();
        drop(state);
        self.nhg_remove_members(handle, &members)?;
        let mut state = self.state.lock();
        let group = state.nhgs.remove(&handle).expect("checked above");
        self.npu.nhg_remove(group.hw_id)?;
        tracing::debug!(?handle, "removed next-hop group");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Route (C7)
    // ---------------------------------------------------------------

    pub fn route_create(&self, attrs: &[(crate::route::RouteAttr, AttributeValue)]) -> Result<()> {
        let mut state = self.state.lock();
        let parsed = parse_route_create(attrs)?;
        let vrf_hw = state.vrf(parsed.vrf)?.hw_id;
        let fwd_hw = self.forwarding_hw(&state, parsed.forward)?;

        self.npu.route_create(vrf_hw, parsed.prefix, fwd_hw)?;

        let vrf = state.vrf_mut(parsed.vrf)?;
        let is_default = parsed.prefix.is_root();
        let existed = match parsed.prefix {
            lpm::prefix::Prefix::IPV4(p) => vrf.route_tree.v4.get(&p.as_net()).is_some(),
            lpm::prefix::Prefix::IPV6(p) => vrf.route_tree.v6.get(&p.as_net()).is_some(),
        };
        let route = Route {
            vrf: parsed.vrf,
            prefix: parsed.prefix,
            packet_action: parsed.packet_action,
            trap_priority: 0,
            metadata: parsed.metadata,
            forward: parsed.forward,
            is_default: is_default && existed,
            dep_encap_nh_list: OrderSet::new(),
        };
        match parsed.prefix {
            lpm::prefix::Prefix::IPV4(p) => {
                vrf.route_tree.v4.insert(p.as_net(), route);
            }
            lpm::prefix::Prefix::IPV6(p) => {
                vrf.route_tree.v6.insert(p.as_net(), route);
            }
        }
        self.bump_forwarding_refcount(&mut state, parsed.forward, 1);
        crate::depengine::link_route_to_forwarding_encap(&mut state, parsed.vrf, parsed.prefix, parsed.forward);
        crate::depengine::route_affected_encap_nh_update(&mut state, &*self.npu, parsed.vrf, parsed.prefix, crate::depengine::RouteChange::Create);
        self.signal_dep_engine();
        tracing::debug!(vrf = ?parsed.vrf, prefix = %parsed.prefix, "created route");
        Ok(())
    }

    fn forwarding_hw(&self, state: &SwitchState, fwd: ForwardingObject) -> Result<RouteForwardHw> {
        Ok(match fwd {
            ForwardingObject::NextHop(h) => RouteForwardHw::NextHop(state.next_hops.get(&h).ok_or(StatusError::InvalidObjectId)?.hw_id.ok_or(StatusError::InvalidObjectId)?),
            ForwardingObject::NextHopGroup(h) => RouteForwardHw::Group(state.nhgs.get(&h).ok_or(StatusError::InvalidObjectId)?.hw_id),
            ForwardingObject::None => RouteForwardHw::Drop,
        })
    }

    fn bump_forwarding_refcount(&self, state: &mut SwitchState, fwd: ForwardingObject, delta: i32) {
        match fwd {
            ForwardingObject::NextHop(h) => {
                if let Some(nh) = state.next_hops.get_mut(&h) {
                    nh.ref_count = (nh.ref_count as i32 + delta).max(0) as u32;
                }
            }
            ForwardingObject::NextHopGroup(h) => {
                if let Some(g) = state.nhgs.get_mut(&h) {
                    g.ref_count = (g.ref_count as i32 + delta).max(0) as u32;
                }
            }
            ForwardingObject::None => {}
        }
    }

    pub fn route_remove(&self, vrf_handle: Handle, prefix: lpm::prefix::Prefix) -> Result<()> {
        let mut state = self.state.lock();
        let vrf_hw = state.vrf(vrf_handle)?.hw_id;
        self.npu.route_remove(vrf_hw, prefix)?;
        let vrf = state.vrf_mut(vrf_handle)?;
        let (old_forward, affected) = match prefix {
            lpm::prefix::Prefix::IPV4(p) => {
                let route = vrf.route_tree.v4.get_mut(&p.as_net()).ok_or(StatusError::ItemNotFound)?;
                let old = route.forward;
                if route.is_default {
                    route.forward = ForwardingObject::None;
                    route.packet_action = PacketAction::Drop;
                    (old, Vec::new())
                } else {
                    let affected: Vec<Handle> = route.dep_encap_nh_list.iter().copied().collect();
                    vrf.route_tree.v4.remove(&p.as_net());
                    (old, affected)
                }
            }
            lpm::prefix::Prefix::IPV6(p) => {
                let route = vrf.route_tree.v6.get_mut(&p.as_net()).ok_or(StatusError::ItemNotFound)?;
                let old = route.forward;
                if route.is_default {
                    route.forward = ForwardingObject::None;
                    route.packet_action = PacketAction::Drop;
                    (old, Vec::new())
                } else {
                    let affected: Vec<Handle> = route.dep_encap_nh_list.iter().copied().collect();
                    vrf.route_tree.v6.remove(&p.as_net());
                    (old, affected)
                }
            }
        };
        self.bump_forwarding_refcount(&mut state, old_forward, -1);
        crate::depengine::unlink_route_from_forwarding_encap(&mut state, vrf_handle, prefix, old_forward);
        crate::depengine::route_affected_encap_nh_update(&mut state, &*self.npu, vrf_handle, prefix, crate::depengine::RouteChange::Remove(affected));
        self.signal_dep_engine();
        tracing::debug!(vrf = ?vrf_handle, %prefix, "removed route");
        Ok(())
    }

    pub fn route_get_attribute(&self, vrf_handle: Handle, prefix: lpm::prefix::Prefix, ids: &[crate::route::RouteAttr]) -> Result<Vec<AttributeValue>> {
        use crate::route::RouteAttr;
        crate::attribute::validate_get(ids, crate::route::ROUTE_ATTRS)?;
        let state = self.state.lock();
        let vrf = state.vrf(vrf_handle)?;
        let route = match prefix {
            lpm::prefix::Prefix::IPV4(p) => vrf.route_tree.v4.get(&p.as_net()),
            lpm::prefix::Prefix::IPV6(p) => vrf.route_tree.v6.get(&p.as_net()),
        }
        .ok_or(StatusError::ItemNotFound)?;
        Ok(ids
            .iter()
            .map(|id| match id {
                RouteAttr::VrfId => AttributeValue::ObjectId(vrf_handle),
                RouteAttr::Prefix => AttributeValue::IpPrefix(route.prefix),
                RouteAttr::PacketAction => AttributeValue::U8(route.packet_action as u8),
                RouteAttr::TrapPriority => AttributeValue::U8(route.trap_priority),
                RouteAttr::Metadata => AttributeValue::U32(route.metadata),
                RouteAttr::ForwardingObjectId => match route.forward {
                    ForwardingObject::NextHop(h) | ForwardingObject::NextHopGroup(h) => AttributeValue::ObjectId(h),
                    ForwardingObject::None => AttributeValue::U32(0),
                },
            })
            .collect())
    }

    pub fn route_set_attribute(&self, vrf_handle: Handle, prefix: lpm::prefix::Prefix, id: crate::route::RouteAttr, value: &AttributeValue) -> Result<()> {
        use crate::route::RouteAttr;
        let mut state = self.state.lock();
        crate::attribute::validate(crate::attribute::Op::Set, std::slice::from_ref(&(id, value.clone())), crate::route::ROUTE_ATTRS)?;
        if id == RouteAttr::TrapPriority {
            return Err(StatusError::NotImplemented); // Open Question (spec §9): left unimplemented.
        }
        let vrf_hw = state.vrf(vrf_handle)?.hw_id;
        let vrf = state.vrf(vrf_handle)?;
        let route = match prefix {
            lpm::prefix::Prefix::IPV4(p) => vrf.route_tree.v4.get(&p.as_net()),
            lpm::prefix::Prefix::IPV6(p) => vrf.route_tree.v6.get(&p.as_net()),
        }
        .ok_or(StatusError::ItemNotFound)?;
        let old_forward = route.forward;

        // Compute the candidate new value and validate it resolves to a
        // real hw id *before* writing anything into the live route: a
        // rejected `forwarding_hw` must leave the in-memory route
        // untouched.
        let mut new_forward = old_forward;
        let mut new_packet_action = None;
        let mut new_metadata = None;
        let mut changed = false;
        match id {
            RouteAttr::PacketAction => {
                if let Some(v) = value.as_u8() {
                    let action = crate::nexthop::decode_packet_action(v)?;
                    if action != route.packet_action {
                        new_packet_action = Some(action);
                        changed = true;
                    }
                }
            }
            RouteAttr::Metadata => {
                let m = value.as_u32().unwrap_or(0);
                if m != route.metadata {
                    new_metadata = Some(m);
                    changed = true;
                }
            }
            RouteAttr::ForwardingObjectId => {
                let fwd = match value.as_object_id() {
                    Some(h) => match h.object_type() {
                        ObjectType::NextHop => ForwardingObject::NextHop(h),
                        ObjectType::NextHopGroup => ForwardingObject::NextHopGroup(h),
                        _ => return Err(StatusError::InvalidObjectType),
                    },
                    None => ForwardingObject::None,
                };
                if fwd != old_forward {
                    new_forward = fwd;
                    changed = true;
                }
            }
            _ => {}
        }
        if !changed {
            return Ok(()); // P10
        }
        self.forwarding_hw(&state, new_forward)?;

        let vrf = state.vrf_mut(vrf_handle)?;
        let route = match prefix {
            lpm::prefix::Prefix::IPV4(p) => vrf.route_tree.v4.get_mut(&p.as_net()),
            lpm::prefix::Prefix::IPV6(p) => vrf.route_tree.v6.get_mut(&p.as_net()),
        }
        .ok_or(StatusError::ItemNotFound)?;
        if let Some(action) = new_packet_action {
            route.packet_action = action;
        }
        if let Some(m) = new_metadata {
            route.metadata = m;
        }
        if new_forward != old_forward {
            route.forward = new_forward;
        }

        self.npu.route_attr_set(vrf_hw, prefix, id as u32)?;
        if new_forward != old_forward {
            self.bump_forwarding_refcount(&mut state, old_forward, -1);
            self.bump_forwarding_refcount(&mut state, new_forward, 1);
            crate::depengine::unlink_route_from_forwarding_encap(&mut state, vrf_handle, prefix, old_forward);
            crate::depengine::link_route_to_forwarding_encap(&mut state, vrf_handle, prefix, new_forward);
        }
        crate::depengine::route_attr_set_affected_encap_nh_update(&mut state, &*self.npu, vrf_handle, prefix, old_forward, new_forward);
        self.signal_dep_engine();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Tunnel & tunnel-map store (C9)
    // ---------------------------------------------------------------

    pub fn tunnel_create(&self, attrs: &[(crate::tunnel::TunnelAttr, AttributeValue)]) -> Result<Handle> {
        use crate::tunnel::{TunnelAttr, TUNNEL_ATTRS};
        let mut state = self.state.lock();
        crate::attribute::validate(crate::attribute::Op::Create, attrs, TUNNEL_ATTRS)?;
        let mut tunnel_type = None;
        let mut underlay_rif = None;
        let mut overlay_rif = None;
        let mut src_ip = None;
        let mut encap_ttl_mode = crate::tunnel::TtlMode::Pipe;
        let mut decap_ttl_mode = crate::tunnel::TtlMode::Pipe;
        let mut encap_dscp_mode = crate::tunnel::DscpMode::Uniform;
        let mut decap_dscp_mode = crate::tunnel::DscpMode::Uniform;
        for (id, value) in attrs {
            match id {
                TunnelAttr::Type => {
                    tunnel_type = Some(match value.as_u8() {
                        Some(0) => crate::tunnel::TunnelType::IpInIp,
                        Some(1) => crate::tunnel::TunnelType::IpInIpGre,
                        Some(2) => crate::tunnel::TunnelType::VxLan,
                        Some(3) => crate::tunnel::TunnelType::Mpls,
                        _ => return Err(StatusError::InvalidAttrValue(0)),
                    });
                }
                TunnelAttr::UnderlayRif => underlay_rif = value.as_object_id(),
                TunnelAttr::OverlayRif => overlay_rif = value.as_object_id(),
                TunnelAttr::SrcIp => src_ip = value.as_ipv4().map(std::net::IpAddr::V4).or_else(|| value.as_ipv6().map(std::net::IpAddr::V6)),
                TunnelAttr::EncapTtlMode => encap_ttl_mode = if value.as_bool().unwrap_or(false) { crate::tunnel::TtlMode::Uniform } else { crate::tunnel::TtlMode::Pipe },
                TunnelAttr::DecapTtlMode => decap_ttl_mode = if value.as_bool().unwrap_or(false) { crate::tunnel::TtlMode::Uniform } else { crate::tunnel::TtlMode::Pipe },
                TunnelAttr::EncapDscpMode => encap_dscp_mode = if value.as_bool().unwrap_or(false) { crate::tunnel::DscpMode::Pipe } else { crate::tunnel::DscpMode::Uniform },
                TunnelAttr::DecapDscpMode => decap_dscp_mode = if value.as_bool().unwrap_or(false) { crate::tunnel::DscpMode::Pipe } else { crate::tunnel::DscpMode::Uniform },
            }
        }
        let tunnel_type = tunnel_type.ok_or(StatusError::MandatoryAttributeMissing)?;
        let underlay_rif = underlay_rif.ok_or(StatusError::MandatoryAttributeMissing)?;
        let overlay_rif = overlay_rif.ok_or(StatusError::MandatoryAttributeMissing)?;
        let src_ip = src_ip.ok_or(StatusError::MandatoryAttributeMissing)?;
        let underlay_vrf = state.rif(underlay_rif)?.vrf;
        let overlay_vrf = state.rif(overlay_rif)?.vrf;

        let handle = state.tunnel_alloc.allocate()?;
        let hw_id = match self.npu.tunnel_obj_create() {
            Ok(h) => h,
            Err(e) => {
                state.tunnel_alloc.release(handle);
                return Err(e);
            }
        };
        state.tunnels.insert(
            handle,
            Tunnel {
                handle,
                hw_id,
                tunnel_type,
                underlay_rif,
                underlay_vrf,
                overlay_rif,
                overlay_vrf,
                src_ip,
                encap_ttl_mode,
                decap_ttl_mode,
                encap_dscp_mode,
                decap_dscp_mode,
                encap_dscp_value: 0,
                decap_dscp_value: 0,
                encap_mappers: Vec::new(),
                decap_mappers: Vec::new(),
                encap_nh_list: OrderSet::new(),
                term_entry_list: OrderSet::new(),
            },
        );
        tracing::debug!(?handle, "created tunnel");
        Ok(handle)
    }

    pub fn tunnel_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let tunnel = state.tunnels.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        if !tunnel.can_remove() {
            return Err(StatusError::ObjectInUse); // I8
        }
        let hw_id = tunnel.hw_id;
        self.npu.tunnel_obj_remove(hw_id)?;
        state.tunnels.remove(&handle);
        state.tunnel_alloc.release(handle);
        tracing::debug!(?handle, "removed tunnel");
        Ok(())
    }

    pub fn tunnel_term_create(&self, attrs: &[(crate::tunnel::TunnelTermAttr, AttributeValue)]) -> Result<Handle> {
        use crate::tunnel::{TunnelTermAttr, TUNNEL_TERM_ATTRS};
        let mut state = self.state.lock();
        crate::attribute::validate(crate::attribute::Op::Create, attrs, TUNNEL_TERM_ATTRS)?;
        let mut vrf = None;
        let mut term_type = None;
        let mut src_ip = None;
        let mut dst_ip = None;
        let mut action_tunnel_id = None;
        for (id, value) in attrs {
            match id {
                TunnelTermAttr::VrfId => vrf = value.as_object_id(),
                TunnelTermAttr::Type => {
                    term_type = Some(match value.as_u8() {
                        Some(0) => crate::tunnel::TunnelType::IpInIp,
                        Some(1) => crate::tunnel::TunnelType::IpInIpGre,
                        Some(2) => crate::tunnel::TunnelType::VxLan,
                        Some(3) => crate::tunnel::TunnelType::Mpls,
                        _ => return Err(StatusError::InvalidAttrValue(0)),
                    });
                }
                TunnelTermAttr::SrcIp => src_ip = value.as_ipv4().map(std::net::IpAddr::V4).or_else(|| value.as_ipv6().map(std::net::IpAddr::V6)),
                TunnelTermAttr::DstIp => dst_ip = value.as_ipv4().map(std::net::IpAddr::V4).or_else(|| value.as_ipv6().map(std::net::IpAddr::V6)),
                TunnelTermAttr::ActionTunnelId => action_tunnel_id = value.as_object_id(),
            }
        }
        let vrf = vrf.ok_or(StatusError::MandatoryAttributeMissing)?;
        let term_type = term_type.ok_or(StatusError::MandatoryAttributeMissing)?;
        let src_ip = src_ip.ok_or(StatusError::MandatoryAttributeMissing)?;
        let dst_ip = dst_ip.ok_or(StatusError::MandatoryAttributeMissing)?;
        let action_tunnel_id = action_tunnel_id.ok_or(StatusError::MandatoryAttributeMissing)?;
        if !state.tunnels.contains_key(&action_tunnel_id) {
            return Err(StatusError::InvalidObjectId);
        }

        let handle = state.tunnel_term_alloc.allocate()?;
        let hw_id = match self.npu.tunnel_term_entry_create() {
            Ok(h) => h,
            Err(e) => {
                state.tunnel_term_alloc.release(handle);
                return Err(e);
            }
        };
        state.tunnel_terms.insert(
            handle,
            TunnelTerminationEntry { handle, hw_id, vrf, term_type, src_ip, dst_ip, action_tunnel_id, tunnel: action_tunnel_id },
        );
        state.tunnels.get_mut(&action_tunnel_id).expect("checked above").term_entry_list.insert(handle);
        tracing::debug!(?handle, "created tunnel termination entry");
        Ok(handle)
    }

    pub fn tunnel_term_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.tunnel_terms.get(&handle).ok_or(StatusError::InvalidObjectId)?.clone();
        self.npu.tunnel_term_entry_remove(entry.hw_id)?;
        state.tunnel_terms.remove(&handle);
        if let Some(t) = state.tunnels.get_mut(&entry.tunnel) {
            t.term_entry_list.shift_remove(&handle);
        }
        state.tunnel_term_alloc.release(handle);
        tracing::debug!(?handle, "removed tunnel termination entry");
        Ok(())
    }

    pub fn tunnel_map_create(&self, map_type: TunnelMapType) -> Result<Handle> {
        let mut state = self.state.lock();
        let handle = state.tunnel_map_alloc.allocate()?;
        let hw_id = match self.npu.tunnel_map_entry_create() {
            Ok(h) => h,
            Err(e) => {
                state.tunnel_map_alloc.release(handle);
                return Err(e);
            }
        };
        state.tunnel_maps.insert(handle, TunnelMap { handle, hw_id, map_type, entries: OrderSet::new() });
        Ok(handle)
    }

    pub fn tunnel_map_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let map = state.tunnel_maps.get(&handle).ok_or(StatusError::InvalidObjectId)?;
        if !map.entries.is_empty() {
            return Err(StatusError::ObjectInUse);
        }
        state.tunnel_maps.remove(&handle);
        state.tunnel_map_alloc.release(handle);
        Ok(())
    }

    pub fn tunnel_map_entry_create(&self, map_handle: Handle, bridge: net::vlan::Vid, vni: net::vxlan::Vni) -> Result<Handle> {
        let mut state = self.state.lock();
        state.tunnel_maps.get(&map_handle).ok_or(StatusError::InvalidObjectId)?;
        let handle = state.tunnel_map_entry_alloc.allocate()?;
        let hw_id = match self.npu.tunnel_map_entry_create() {
            Ok(h) => h,
            Err(e) => {
                state.tunnel_map_entry_alloc.release(handle);
                return Err(e);
            }
        };
        state.tunnel_map_entries.insert(handle, TunnelMapEntry { handle, hw_id, map: map_handle, bridge, vni });
        state.tunnel_maps.get_mut(&map_handle).expect("checked above").entries.insert(handle);
        Ok(handle)
    }

    /// Rejects a change that would orphan an existing bridge-port binding
    /// (spec §4.9's `ObjectInUse` rule).
    pub fn tunnel_map_entry_set_bridge(&self, handle: Handle, bridge: net::vlan::Vid) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.tunnel_map_entries.get(&handle).ok_or(StatusError::InvalidObjectId)?.clone();
        if entry.bridge != bridge && self.npu.bridge_port_depends_on(handle) {
            return Err(StatusError::ObjectInUse);
        }
        self.npu.tunnel_map_entry_set(entry.hw_id)?;
        state.tunnel_map_entries.get_mut(&handle).expect("checked above").bridge = bridge;
        Ok(())
    }

    pub fn tunnel_map_entry_remove(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.tunnel_map_entries.get(&handle).ok_or(StatusError::InvalidObjectId)?.clone();
        if self.npu.bridge_port_depends_on(handle) {
            return Err(StatusError::ObjectInUse);
        }
        self.npu.tunnel_map_entry_remove(entry.hw_id)?;
        state.tunnel_map_entries.remove(&handle);
        if let Some(map) = state.tunnel_maps.get_mut(&entry.map) {
            map.entries.shift_remove(&handle);
        }
        state.tunnel_map_entry_alloc.release(handle);
        Ok(())
    }

    // ---------------------------------------------------------------
    // FDB adapter (C8, C11)
    // ---------------------------------------------------------------

    pub fn fdb_event(&self, events: &[FdbEvent]) {
        let mut state = self.state.lock();
        for event in events {
            self.apply_fdb_event(&mut state, event);
        }
        self.signal_dep_engine();
    }

    fn apply_fdb_event(&self, state: &mut SwitchState, event: &FdbEvent) {
        let FdbEntry { vlan, mac, port } = event.entry;
        let key = NeighborMacKey { vlan, mac };
        let Some(neighbors) = state.neighbor_mac_tree.get(&key).cloned() else {
            tracing::trace!(?vlan, ?mac, "FDB event for unknown neighbor MAC: no-op"); // P13
            return;
        };
        match event.kind {
            FdbEventKind::Learned | FdbEventKind::Moved => {
                // spec §4.8: a learn that violates port-state or VLAN/STP
                // preconditions is flushed rather than turned into a
                // neighbor port-move (P13's sibling rule for known MACs).
                let rejection = if !self.npu.port_is_up(port) {
                    Some(crate::fdb::LearnRejection::PortDown)
                } else if !self.npu.is_vlan_member(vlan, port) {
                    Some(crate::fdb::LearnRejection::NotVlanMember)
                } else if !self.npu.stp_forwarding(vlan, port) {
                    Some(crate::fdb::LearnRejection::StpBlocked)
                } else {
                    None
                };
                if let Some(reason) = rejection {
                    tracing::debug!(?vlan, ?mac, ?port, ?reason, "FDB learn rejected, flushing entry");
                    self.npu.fdb_flush(Some(vlan), Some(port)).ok();
                    return;
                }
                for handle in &neighbors {
                    if let Some(nh) = state.next_hops.get_mut(handle) {
                        if nh.port_id != Some(port) {
                            nh.port_id = Some(port);
                            nh.pending_fdb_resolution = false;
                            if let Some(hw) = nh.hw_id {
                                self.npu.neighbor_attr_set(hw, true).ok();
                            }
                            crate::depengine::replay_dep_encap_nhs(state, &*self.npu, *handle);
                        }
                    }
                }
            }
            FdbEventKind::Aged | FdbEventKind::Flushed => {
                self.npu.fdb_flush(Some(vlan), Some(port)).ok();
            }
        }
    }
}

impl Clone for NextHopGroup {
    fn clone(&self) -> Self {
        self.clone_shallow()
    }
}

impl NextHopGroup {
    fn clone_shallow(&self) -> Self {
        Self {
            handle: self.handle,
            hw_id: self.hw_id,
            group_type: self.group_type,
            members: self.members.clone(),
            ref_count: self.ref_count,
            dep_encap_nh_list: self.dep_encap_nh_list.clone(),
        }
    }
}

impl Clone for RouterInterface {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            hw_id: self.hw_id,
            vrf: self.vrf,
            rif_type: self.rif_type,
            attachment: self.attachment,
            mac: self.mac,
            v4_admin_state: self.v4_admin_state,
            v6_admin_state: self.v6_admin_state,
            mtu: self.mtu,
            ip_options_action: self.ip_options_action,
            ref_count: self.ref_count,
        }
    }
}

impl Clone for TunnelTerminationEntry {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            hw_id: self.hw_id,
            vrf: self.vrf,
            term_type: self.term_type,
            src_ip: self.src_ip,
            dst_ip: self.dst_ip,
            action_tunnel_id: self.action_tunnel_id,
            tunnel: self.tunnel,
        }
    }
}

impl Clone for TunnelMapEntry {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            hw_id: self.hw_id,
            map: self.map,
            bridge: self.bridge,
            vni: self.vni,
        }
    }
}
