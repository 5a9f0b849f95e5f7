// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The status taxonomy shared by the north-bound and south-bound surfaces.
//!
//! Every public entry point returns `Result<T, StatusError>`. On error, the
//! per-component do/break idiom undoes any in-memory side effect the
//! operation had already made before the error reaches the caller, so a
//! failed call never leaves the object graph in a half-updated state.

/// Index of the attribute a per-attribute error applies to, carried
/// alongside the base error the way the north-bound contract reports
/// `BASE_ERROR + attribute_index`.
pub type AttrIndex = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("invalid attribute at index {0}")]
    InvalidAttribute(AttrIndex),
    #[error("invalid attribute value at index {0}")]
    InvalidAttrValue(AttrIndex),
    #[error("unknown attribute at index {0}")]
    UnknownAttribute(AttrIndex),
    #[error("duplicate attribute at index {0}")]
    DuplicateAttribute(AttrIndex),
    #[error("mandatory attribute missing")]
    MandatoryAttributeMissing,
    #[error("invalid object type")]
    InvalidObjectType,
    #[error("invalid object id")]
    InvalidObjectId,
    #[error("item not found")]
    ItemNotFound,
    #[error("item already exists")]
    ItemAlreadyExists,
    #[error("object in use")]
    ObjectInUse,
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("no memory")]
    NoMemory,
    #[error("table full")]
    TableFull,
    #[error("operation failed")]
    Failure,
    #[error("not implemented")]
    NotImplemented,
    #[error("not supported")]
    NotSupported,
}

pub type Result<T> = std::result::Result<T, StatusError>;
