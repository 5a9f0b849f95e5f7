// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Human-readable dump of registered tracing targets, for CLI/admin
//! surfaces that want to show an operator what can be adjusted.

use std::fmt;

use crate::control::TracingControl;

pub struct TraceTargetsDisplay<'a>(pub &'a TracingControl);

impl fmt::Display for TraceTargetsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24} {}", "target", "level")?;
        for (name, level) in self.0.targets() {
            writeln!(f, "{name:<24} {level}")?;
        }
        Ok(())
    }
}
