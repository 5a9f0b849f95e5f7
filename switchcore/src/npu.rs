// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! South-bound NPU driver surface.
//!
//! Concrete NPU drivers are out of scope (spec §1): this module only
//! defines the function-table contract the core requires from one —
//! create/remove/attribute-set per entity, the dependency-engine hooks
//! (`encap_nh_*_resolve`), the FDB hooks, and the handful of queries the
//! core makes of the FDB/STP/VLAN/ACL modules it treats as external
//! collaborators (§1's "the core only consumes ..." notes).

use lpm::prefix::Prefix;
use net::eth::mac::Mac;
use net::vlan::Vid;

use crate::error::Result;
use crate::route::RouteForwardHw;

/// A physical port id, opaque to the core beyond its use as a forward-mode
/// and FDB-lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

/// Forwarding mode a physical port is switched into/out of when a RIF is
/// created/destroyed over it (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    Unknown,
    Routing,
}

/// One NPU-assigned hardware id. Distinct namespace from [`crate::handle::Handle`]:
/// a handle is the north-bound oid, a `HwId` is what gets replayed to the
/// driver on every attribute-set and on dependency-engine re-resolution.
pub type HwId = u64;

/// The south-bound NPU driver surface the core drives every object family
/// through. A production implementation wraps whatever SDK the target NPU
/// exposes; this crate only depends on the contract.
pub trait NpuDriver: Send + Sync {
    // --- router (VRF) ---
    fn vrf_create(&self) -> Result<HwId>;
    fn vrf_remove(&self, hw_id: HwId) -> Result<()>;
    fn vrf_attr_set(&self, hw_id: HwId, attr_id: u32) -> Result<()>;

    // --- router interface ---
    fn rif_create(&self) -> Result<HwId>;
    fn rif_remove(&self, hw_id: HwId) -> Result<()>;
    fn rif_attr_set(&self, hw_id: HwId, attr_id: u32) -> Result<()>;
    fn port_set_forward_mode(&self, port: PortId, mode: ForwardMode) -> Result<()>;

    // --- next hop (including tunnel-encap next hops) ---
    fn next_hop_create(&self) -> Result<HwId>;
    fn next_hop_remove(&self, hw_id: HwId) -> Result<()>;
    /// Dependency-engine hook: bind an encap next hop to a resolved underlay route.
    fn encap_nh_route_resolve(&self, encap_hw: HwId, route_hw: HwId) -> Result<()>;
    /// Dependency-engine hook: bind an encap next hop to a resolved underlay neighbor.
    fn encap_nh_neighbor_resolve(&self, encap_hw: HwId, neighbor_hw: HwId) -> Result<()>;
    /// Dependency-engine hook: replay a neighbor MAC/port change into every
    /// encap next hop currently resolved through it.
    fn encap_nh_neighbor_attr_set(&self, encap_hw: HwId, neighbor_hw: HwId, port_changed: bool) -> Result<()>;

    // --- next-hop group ---
    fn nhg_create(&self) -> Result<HwId>;
    fn nhg_remove(&self, hw_id: HwId) -> Result<()>;
    fn nhg_member_add(&self, group_hw: HwId, member_hw: HwId, weight: u32) -> Result<()>;
    fn nhg_member_remove(&self, group_hw: HwId, member_hw: HwId) -> Result<()>;

    // --- route (prefix-keyed, no standalone hw id) ---
    /// Also the dependency engine's replay hook (spec §4.10): the
    /// dep-route worker calls this again for a route whose resolution
    /// changed underneath it, with the same `(vrf_hw, prefix)` key, so
    /// the call must be idempotent.
    fn route_create(&self, vrf_hw: HwId, prefix: Prefix, fwd: RouteForwardHw) -> Result<()>;
    fn route_remove(&self, vrf_hw: HwId, prefix: Prefix) -> Result<()>;
    fn route_attr_set(&self, vrf_hw: HwId, prefix: Prefix, attr_id: u32) -> Result<()>;

    // --- neighbor (shares the next-hop hw-id namespace) ---
    fn neighbor_create(&self, hw_id: HwId) -> Result<()>;
    fn neighbor_remove(&self, hw_id: HwId) -> Result<()>;
    fn neighbor_attr_set(&self, hw_id: HwId, port_changed: bool) -> Result<()>;

    // --- FDB ---
    fn fdb_flush(&self, vlan: Option<Vid>, port: Option<PortId>) -> Result<()>;
    fn fdb_register_callback(&self, vlan: Vid, mac: Mac) -> Result<()>;
    fn fdb_unregister_callback(&self, vlan: Vid, mac: Mac) -> Result<()>;
    fn fdb_write_entry_to_hardware(&self, vlan: Vid, mac: Mac, port: PortId) -> Result<()>;

    // --- tunnel ---
    fn tunnel_obj_create(&self) -> Result<HwId>;
    fn tunnel_obj_remove(&self, hw_id: HwId) -> Result<()>;
    fn tunnel_term_entry_create(&self) -> Result<HwId>;
    fn tunnel_term_entry_remove(&self, hw_id: HwId) -> Result<()>;
    fn tunnel_map_entry_create(&self) -> Result<HwId>;
    fn tunnel_map_entry_set(&self, hw_id: HwId) -> Result<()>;
    fn tunnel_map_entry_remove(&self, hw_id: HwId) -> Result<()>;

    // --- external collaborators consumed read-only (§1) ---
    /// Whether `port` is a member of `vlan` — the VLAN member table,
    /// queried but not owned here.
    fn is_vlan_member(&self, _vlan: Vid, _port: PortId) -> bool {
        true
    }
    /// Whether `port`'s STP instance for `vlan` is in a forwarding state.
    fn stp_forwarding(&self, _vlan: Vid, _port: PortId) -> bool {
        true
    }
    /// Link state of a physical port; the FDB adapter's "not a valid
    /// learn" fallback (spec §4.8) flushes instead of creating a neighbor
    /// when the port reporting the MAC is down.
    fn port_is_up(&self, _port: PortId) -> bool {
        true
    }
    /// ACL attribute-range validation for next-hop/route/neighbor metadata.
    fn acl_range_contains(&self, _range_id: u32, _value: u32) -> bool {
        true
    }
    /// Whether some bridge-port still forwards through this tunnel-map
    /// entry's bridge binding (the bridge-port table is an external
    /// collaborator per spec §1); used to enforce the tunnel-map
    /// `ObjectInUse` rule from §4.9.
    fn bridge_port_depends_on(&self, _map_entry: crate::handle::Handle) -> bool {
        false
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod mock {
    //! An in-memory NPU stand-in for tests: every create mints a
    //! monotonically increasing hardware id and every other call is a
    //! recorded no-op. Good enough to exercise the core's own state
    //! machine without a real driver.

    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    use super::{ForwardMode, HwId, NpuDriver, PortId};
    use crate::error::Result;
    use crate::handle::Handle;
    use net::eth::mac::Mac;
    use net::vlan::Vid;

    #[derive(Debug, Default)]
    pub struct MockNpu {
        next_hw: AtomicU64,
        /// Every call recorded as its method name, for assertions on
        /// "programmed exactly once" style test expectations.
        pub calls: Mutex<Vec<String>>,
        bridge_dependency: AtomicBool,
    }

    impl MockNpu {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn next(&self) -> HwId {
            self.next_hw.fetch_add(1, Ordering::Relaxed) + 1
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        #[must_use]
        pub fn call_count(&self, prefix: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    impl NpuDriver for MockNpu {
        fn vrf_create(&self) -> Result<HwId> {
            self.record("vrf_create");
            Ok(self.next())
        }
        fn vrf_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("vrf_remove");
            Ok(())
        }
        fn vrf_attr_set(&self, _hw_id: HwId, _attr_id: u32) -> Result<()> {
            self.record("vrf_attr_set");
            Ok(())
        }
        fn rif_create(&self) -> Result<HwId> {
            self.record("rif_create");
            Ok(self.next())
        }
        fn rif_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("rif_remove");
            Ok(())
        }
        fn rif_attr_set(&self, _hw_id: HwId, _attr_id: u32) -> Result<()> {
            self.record("rif_attr_set");
            Ok(())
        }
        fn port_set_forward_mode(&self, _port: PortId, _mode: ForwardMode) -> Result<()> {
            self.record("port_set_forward_mode");
            Ok(())
        }
        fn next_hop_create(&self) -> Result<HwId> {
            self.record("next_hop_create");
            Ok(self.next())
        }
        fn next_hop_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("next_hop_remove");
            Ok(())
        }
        fn encap_nh_route_resolve(&self, _encap_hw: HwId, _route_hw: HwId) -> Result<()> {
            self.record("encap_nh_route_resolve");
            Ok(())
        }
        fn encap_nh_neighbor_resolve(&self, _encap_hw: HwId, _neighbor_hw: HwId) -> Result<()> {
            self.record("encap_nh_neighbor_resolve");
            Ok(())
        }
        fn encap_nh_neighbor_attr_set(&self, _encap_hw: HwId, _neighbor_hw: HwId, _port_changed: bool) -> Result<()> {
            self.record("encap_nh_neighbor_attr_set");
            Ok(())
        }
        fn nhg_create(&self) -> Result<HwId> {
            self.record("nhg_create");
            Ok(self.next())
        }
        fn nhg_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("nhg_remove");
            Ok(())
        }
        fn nhg_member_add(&self, _group_hw: HwId, _member_hw: HwId, _weight: u32) -> Result<()> {
            self.record("nhg_member_add");
            Ok(())
        }
        fn nhg_member_remove(&self, _group_hw: HwId, _member_hw: HwId) -> Result<()> {
            self.record("nhg_member_remove");
            Ok(())
        }
        fn route_create(&self, _vrf_hw: HwId, _prefix: lpm::prefix::Prefix, _fwd: crate::route::RouteForwardHw) -> Result<()> {
            self.record("route_create");
            Ok(())
        }
        fn route_remove(&self, _vrf_hw: HwId, _prefix: lpm::prefix::Prefix) -> Result<()> {
            self.record("route_remove");
            Ok(())
        }
        fn route_attr_set(&self, _vrf_hw: HwId, _prefix: lpm::prefix::Prefix, _attr_id: u32) -> Result<()> {
            self.record("route_attr_set");
            Ok(())
        }
        fn neighbor_create(&self, _hw_id: HwId) -> Result<()> {
            self.record("neighbor_create");
            Ok(())
        }
        fn neighbor_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("neighbor_remove");
            Ok(())
        }
        fn neighbor_attr_set(&self, _hw_id: HwId, _port_changed: bool) -> Result<()> {
            self.record("neighbor_attr_set");
            Ok(())
        }
        fn fdb_flush(&self, _vlan: Option<Vid>, _port: Option<PortId>) -> Result<()> {
            self.record("fdb_flush");
            Ok(())
        }
        fn fdb_register_callback(&self, _vlan: Vid, _mac: Mac) -> Result<()> {
            self.record("fdb_register_callback");
            Ok(())
        }
        fn fdb_unregister_callback(&self, _vlan: Vid, _mac: Mac) -> Result<()> {
            self.record("fdb_unregister_callback");
            Ok(())
        }
        fn fdb_write_entry_to_hardware(&self, _vlan: Vid, _mac: Mac, _port: PortId) -> Result<()> {
            self.record("fdb_write_entry_to_hardware");
            Ok(())
        }
        fn tunnel_obj_create(&self) -> Result<HwId> {
            self.record("tunnel_obj_create");
            Ok(self.next())
        }
        fn tunnel_obj_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("tunnel_obj_remove");
            Ok(())
        }
        fn tunnel_term_entry_create(&self) -> Result<HwId> {
            self.record("tunnel_term_entry_create");
            Ok(self.next())
        }
        fn tunnel_term_entry_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("tunnel_term_entry_remove");
            Ok(())
        }
        fn tunnel_map_entry_create(&self) -> Result<HwId> {
            self.record("tunnel_map_entry_create");
            Ok(self.next())
        }
        fn tunnel_map_entry_set(&self, _hw_id: HwId) -> Result<()> {
            self.record("tunnel_map_entry_set");
            Ok(())
        }
        fn tunnel_map_entry_remove(&self, _hw_id: HwId) -> Result<()> {
            self.record("tunnel_map_entry_remove");
            Ok(())
        }
        fn bridge_port_depends_on(&self, _map_entry: Handle) -> bool {
            self.bridge_dependency.load(Ordering::Relaxed)
        }
    }

    impl MockNpu {
        /// Test hook standing in for a bridge-port binding; tests set this
        /// to simulate `ObjectInUse` on a tunnel-map-entry change.
        pub fn set_bridge_dependency(&self, depends: bool) {
            self.bridge_dependency.store(depends, Ordering::Relaxed);
        }
    }
}
