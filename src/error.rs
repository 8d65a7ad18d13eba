//! Error categories surfaced to callers of the simulation setup surface.
//!
//! Per the error-handling design, only configuration and topology problems
//! are ever returned to a caller: every message-level outcome (hop-limit
//! expiry, collisions, duplicate rejection, phase aborts) is recovered
//! locally and reported through [`crate::statistics::Statistics`] instead.

use thiserror::Error;

use crate::node::NodeId;

/// Errors surfaced at [`crate::Simulator::setup`].
#[derive(Debug, Error)]
pub enum Error {
    /// The requested configuration cannot produce a runnable phase.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
    /// The supplied topology violates an invariant the engine relies on.
    #[error("invalid topology: {0}")]
    TopologyInvalid(String),
}

impl Error {
    pub(crate) fn asymmetric_edge(a: NodeId, b: NodeId) -> Self {
        Error::TopologyInvalid(format!(
            "edge ({a}, {b}) is not symmetric: {b} does not list {a} as a neighbor"
        ))
    }

    pub(crate) fn out_of_range(id: NodeId, node_count: usize) -> Self {
        Error::TopologyInvalid(format!(
            "node id {id} is out of range for a topology of {node_count} nodes"
        ))
    }

    pub(crate) fn self_loop(id: NodeId) -> Self {
        Error::TopologyInvalid(format!("node {id} lists itself as its own neighbor"))
    }
}

/// Result alias used throughout the crate's setup-time fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
