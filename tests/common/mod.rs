//! Topology builders shared by the integration tests.

use std::collections::BTreeSet;

use meshflood_sim::Topology;

fn edges(node_count: usize, pairs: &[(usize, usize)]) -> Topology {
    let mut adjacency = vec![BTreeSet::new(); node_count];
    for &(a, b) in pairs {
        adjacency[a].insert(b);
        adjacency[b].insert(a);
    }
    Topology::new(adjacency).expect("test topology must be valid")
}

/// A line of `node_count` nodes: `0 - 1 - 2 - ... - (node_count-1)`.
pub fn line(node_count: usize) -> Topology {
    let pairs: Vec<(usize, usize)> = (0..node_count - 1).map(|i| (i, i + 1)).collect();
    edges(node_count, &pairs)
}

/// A star with center `0` and `leaf_count` leaves `1..=leaf_count`.
pub fn star(leaf_count: usize) -> Topology {
    let pairs: Vec<(usize, usize)> = (1..=leaf_count).map(|leaf| (0, leaf)).collect();
    edges(leaf_count + 1, &pairs)
}

/// A fully-connected triangle `{0, 1, 2}`.
pub fn triangle() -> Topology {
    edges(3, &[(0, 1), (1, 2), (0, 2)])
}
