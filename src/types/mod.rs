#![forbid(unsafe_code)]

//! Identifiers and infrastructure errors shared by the catalog and query layers.

use std::fmt;

use serde::{Deserialize, Serialize};

mod qname;
mod refs;

pub use qname::QName;
pub use refs::{ObjectRef, StoreRef};

/// Internal surrogate key of a stored object.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Internal identifier of a persisted qualified name (types, aspects, properties).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QNameId(pub u64);

/// Infrastructure failures raised by catalog collaborators.
///
/// Logical compile errors (unknown property, ambiguous selector, ...) live in
/// [`crate::query::errors::CompileError`]; this enum covers everything that is
/// not a deterministic function of the query text.
#[derive(thiserror::Error, Debug)]
pub enum QuarryError {
    /// Underlying I/O failure.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Backing catalog could not answer a lookup.
    #[error("catalog unavailable: {0}")]
    Catalog(String),
    /// Invalid argument with a static description.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Invalid argument with a formatted description.
    #[error("invalid argument: {0}")]
    InvalidOwned(String),
    /// Requested entry does not exist.
    #[error("not found")]
    NotFound,
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, QuarryError>;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QNameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u64 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl From<u64> for QNameId {
    fn from(value: u64) -> Self {
        QNameId(value)
    }
}

impl From<QNameId> for u64 {
    fn from(value: QNameId) -> Self {
        value.0
    }
}
