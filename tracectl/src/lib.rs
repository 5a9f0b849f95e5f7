// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![doc = include_str!("../README.md")]

pub mod control;
pub mod display;
pub mod targets;

// re-exports
pub use control::DEFAULT_DEFAULT_LOGLEVEL;
pub use control::get_trace_ctl;
pub use control::{TraceCtlError, TracingControl};
pub use targets::TraceTarget;
pub use tracing_subscriber::filter::LevelFilter;
