//! The undirected mesh adjacency the rest of the crate routes over.
//!
//! Topology generation (node placement, radius-based edge formation) is an
//! external collaborator out of scope for this crate; a [`Topology`] is
//! simply handed a finished, symmetric adjacency and validates it once at
//! construction, mirroring `check_adjacency_consistency` in the teacher
//! interconnection-network simulator this crate is descended from.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::node::NodeId;

/// A fixed, symmetric neighbor relation over `[0, node_count)`.
///
/// Immutable after construction: no phase ever mutates a `Topology`.
#[derive(Clone, Debug)]
pub struct Topology {
    node_count: usize,
    neighbors: Vec<BTreeSet<NodeId>>,
}

impl Topology {
    /// Build a topology from an explicit adjacency list, one entry per node.
    ///
    /// Validates that every id is in range, that no node neighbors itself,
    /// and that the relation is symmetric (`b ∈ neighbors(a) ⇒ a ∈ neighbors(b)`).
    pub fn new(adjacency: Vec<BTreeSet<NodeId>>) -> Result<Self> {
        let node_count = adjacency.len();
        for (id, neighbors) in adjacency.iter().enumerate() {
            for &n in neighbors {
                if n >= node_count {
                    return Err(Error::out_of_range(n, node_count));
                }
                if n == id {
                    return Err(Error::self_loop(id));
                }
                if !adjacency[n].contains(&id) {
                    return Err(Error::asymmetric_edge(id, n));
                }
            }
        }
        Ok(Topology {
            node_count,
            neighbors: adjacency,
        })
    }

    /// Number of nodes `N`; valid ids are `[0, node_count)`.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Neighbor set of a node. Panics if `id` is out of range, matching the
    /// precondition that callers only ever ask about ids drawn from this
    /// topology.
    pub fn neighbors(&self, id: NodeId) -> &BTreeSet<NodeId> {
        &self.neighbors[id]
    }

    /// Whether `a` and `b` are directly connected.
    pub fn are_neighbors(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors[a].contains(&b)
    }

    /// Iterator over all valid node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.node_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[NodeId]) -> BTreeSet<NodeId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn line_of_four_is_valid() {
        let topo = Topology::new(vec![set(&[1]), set(&[0, 2]), set(&[1, 3]), set(&[2])]).unwrap();
        assert_eq!(topo.node_count(), 4);
        assert!(topo.are_neighbors(1, 2));
        assert!(!topo.are_neighbors(0, 2));
    }

    #[test]
    fn asymmetric_edge_is_rejected() {
        let err = Topology::new(vec![set(&[1]), set(&[])]).unwrap_err();
        assert!(matches!(err, Error::TopologyInvalid(_)));
    }

    #[test]
    fn out_of_range_neighbor_is_rejected() {
        let err = Topology::new(vec![set(&[5])]).unwrap_err();
        assert!(matches!(err, Error::TopologyInvalid(_)));
    }

    #[test]
    fn self_loop_is_rejected() {
        let err = Topology::new(vec![set(&[0])]).unwrap_err();
        assert!(matches!(err, Error::TopologyInvalid(_)));
    }
}
