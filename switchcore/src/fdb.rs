// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Neighbor↔FDB adapter (C8, C11): the FDB event batch the core consumes
//! to keep neighbor egress ports in step with MAC learning (spec §4.8).
//!
//! The FDB subsystem itself is an out-of-scope collaborator with its own
//! module lock, always acquired by the caller before the FIB lock (spec
//! §5). This module only defines the event shape and the predicate the
//! core evaluates against it; [`crate::switch::Switch::fdb_event`] is
//! where the batch is actually walked under the FIB lock.

use net::eth::mac::Mac;
use net::vlan::Vid;

use crate::npu::PortId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdbEventKind {
    Learned,
    Aged,
    Moved,
    Flushed,
}

#[derive(Debug, Clone)]
pub struct FdbEntry {
    pub vlan: Vid,
    pub mac: Mac,
    pub port: PortId,
}

#[derive(Debug, Clone)]
pub struct FdbEvent {
    pub kind: FdbEventKind,
    pub entry: FdbEntry,
}

/// Why a learn was refused, driving the "flush instead of create"
/// fallback spec §4.8 requires instead of silently ignoring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnRejection {
    PortDown,
    NotVlanMember,
    StpBlocked,
}
