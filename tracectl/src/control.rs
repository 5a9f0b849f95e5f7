// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control over the levels of registered tracing targets.

use std::sync::OnceLock;

use arc_swap::ArcSwap;
use ordermap::OrderMap;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::reload;
use tracing_subscriber::{EnvFilter, Registry};

use crate::targets::TRACE_TARGETS;

/// Default level applied to a target that registers without specifying
/// one explicitly is `INFO`; kept as a named constant so the default is
/// documented in one place.
pub const DEFAULT_DEFAULT_LOGLEVEL: LevelFilter = LevelFilter::INFO;

#[derive(Debug, Error)]
pub enum TraceCtlError {
    #[error("unknown tracing target: {0}")]
    UnknownTarget(String),
    #[error("failed to reload tracing filter: {0}")]
    Reload(String),
}

type ReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Process-wide handle for inspecting and adjusting the levels of every
/// tracing target registered via [`crate::trace_target`].
pub struct TracingControl {
    levels: ArcSwap<OrderMap<String, LevelFilter>>,
    reload: OnceLock<ReloadHandle>,
}

impl TracingControl {
    fn new() -> Self {
        let mut levels = OrderMap::new();
        for target in TRACE_TARGETS.iter() {
            levels.insert(target.name.to_string(), target.default_level);
        }
        Self {
            levels: ArcSwap::from_pointee(levels),
            reload: OnceLock::new(),
        }
    }

    /// Attach the `tracing_subscriber` reload handle so level changes take
    /// effect immediately. Bootstrap/subscriber construction is owned by
    /// the enclosing binary, not this crate; this is how it hands the
    /// handle back to us.
    pub fn attach_reload_handle(&self, handle: ReloadHandle) {
        let _ = self.reload.set(handle);
    }

    #[must_use]
    pub fn targets(&self) -> Vec<(String, LevelFilter)> {
        self.levels
            .load()
            .iter()
            .map(|(name, level)| (name.clone(), *level))
            .collect()
    }

    #[must_use]
    pub fn get_level(&self, name: &str) -> Option<LevelFilter> {
        self.levels.load().get(name).copied()
    }

    /// Set the level for a single registered target and, if a reload
    /// handle has been attached, push a recombined `EnvFilter` into the
    /// live subscriber.
    pub fn set_level(&self, name: &str, level: LevelFilter) -> Result<(), TraceCtlError> {
        if !self.levels.load().contains_key(name) {
            return Err(TraceCtlError::UnknownTarget(name.to_string()));
        }
        self.levels.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(name.to_string(), level);
            next
        });
        self.push_filter()
    }

    fn push_filter(&self) -> Result<(), TraceCtlError> {
        let Some(handle) = self.reload.get() else {
            return Ok(());
        };
        let directives = self
            .levels
            .load()
            .iter()
            .map(|(name, level)| format!("{name}={level}"))
            .collect::<Vec<_>>()
            .join(",");
        let filter = EnvFilter::try_new(directives)
            .map_err(|e| TraceCtlError::Reload(e.to_string()))?;
        handle
            .reload(filter)
            .map_err(|e| TraceCtlError::Reload(e.to_string()))
    }
}

static TRACE_CTL: OnceLock<TracingControl> = OnceLock::new();

/// The process-wide [`TracingControl`] singleton. Lazily built from the
/// statically-registered [`TRACE_TARGETS`] on first access.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACE_CTL.get_or_init(TracingControl::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_target_is_an_error() {
        let ctl = get_trace_ctl();
        assert!(matches!(
            ctl.set_level("definitely-not-a-real-target", LevelFilter::DEBUG),
            Err(TraceCtlError::UnknownTarget(_))
        ));
    }
}
