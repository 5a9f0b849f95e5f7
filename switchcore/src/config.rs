// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Process-wide configuration consumed by the core.
//!
//! Only the keys spec §6 names are modeled here; reading them out of a KV
//! source (a config file, environment, etc.) is the enclosing binary's job,
//! not the core's — this struct is the typed destination of that load.

/// Default handle-allocator capacities from spec §3.
pub const DEFAULT_TUNNEL_CAPACITY: u64 = 64;
pub const DEFAULT_TUNNEL_TERM_CAPACITY: u64 = 64;
pub const DEFAULT_TUNNEL_MAP_CAPACITY: u64 = 256;
pub const DEFAULT_HASH_CAPACITY: u64 = 256;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    // NPU sizing hints.
    pub fdb_table_size: u32,
    pub l3_route_table_size: u32,
    pub l3_neighbor_table_size: u32,

    // ECMP/LAG caps.
    pub num_lag_members: u32,
    pub num_lags: u32,
    pub num_ecmp_members: u32,
    pub num_ecmp_groups: u32,

    // Queue inventory.
    pub num_unicast_queues: u32,
    pub num_multicast_queues: u32,
    pub num_queues: u32,
    pub num_cpu_queues: u32,

    /// Path for NPU-specific init, otherwise a default.
    pub init_config_file: String,

    /// The per-group member cap (`max_ecmp_paths`), exposed as a
    /// VRF-global, switch-scope attribute per spec §4.3. Settable after
    /// construction via [`crate::switch::Switch::set_max_ecmp_paths`].
    pub max_ecmp_paths: u32,

    // Handle-allocator capacities.
    pub tunnel_capacity: u64,
    pub tunnel_term_capacity: u64,
    pub tunnel_map_capacity: u64,
    pub hash_capacity: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            fdb_table_size: 16384,
            l3_route_table_size: 8192,
            l3_neighbor_table_size: 4096,
            num_lag_members: 32,
            num_lags: 128,
            num_ecmp_members: 4096,
            num_ecmp_groups: 1024,
            num_unicast_queues: 8,
            num_multicast_queues: 8,
            num_queues: 16,
            num_cpu_queues: 8,
            init_config_file: "/etc/hedgehog/switchcore.yaml".to_owned(),
            max_ecmp_paths: 64,
            tunnel_capacity: DEFAULT_TUNNEL_CAPACITY,
            tunnel_term_capacity: DEFAULT_TUNNEL_TERM_CAPACITY,
            tunnel_map_capacity: DEFAULT_TUNNEL_MAP_CAPACITY,
            hash_capacity: DEFAULT_HASH_CAPACITY,
        }
    }
}
