// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Concurrency primitives shared across the dataplane crates.
//!
//! The dataplane has exactly one place that needs a recursive lock: the
//! switch-wide FIB lock (see `dataplane_switchcore::lock`). Everything else
//! in this crate is kept deliberately small; prefer `std`/`parking_lot`
//! types directly over adding new wrappers here.

pub mod recursive;

pub use recursive::{ReentrantGuard, ReentrantLock};
