// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Static registry of declared tracing targets, populated at link time by
//! the [`crate::trace_target`] macro.

use tracing_subscriber::filter::LevelFilter;

/// Metadata for one registered tracing target.
#[derive(Debug, Clone, Copy)]
pub struct TraceTarget {
    pub name: &'static str,
    pub default_level: LevelFilter,
    pub tags: &'static [&'static str],
}

#[linkme::distributed_slice]
pub static TRACE_TARGETS: [TraceTarget] = [..];

/// Declare and register a named tracing target for this module.
///
/// This does not change how `tracing`'s own filtering works (targets are
/// still module paths); it registers metadata so [`crate::get_trace_ctl`]
/// can enumerate and reconfigure subsystems by name at runtime.
#[macro_export]
macro_rules! trace_target {
    ($name:expr, $default:expr, $tags:expr) => {
        #[linkme::distributed_slice($crate::targets::TRACE_TARGETS)]
        static __TRACE_TARGET: $crate::targets::TraceTarget = $crate::targets::TraceTarget {
            name: $name,
            default_level: $default,
            tags: $tags,
        };
    };
}
