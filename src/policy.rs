//! The two forwarding policies this crate compares.

/// Forwarding policy selector (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Forward to all neighbors except the immediate predecessor.
    Flood,
    /// Flood unless both endpoints share a direct-child subtree of this
    /// node's knowledge tree, in which case suppress. Degenerates to
    /// `Flood` wherever the tree has not observed one of the endpoints
    /// yet (§4.3).
    TreeAware,
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Flood => write!(f, "flood"),
            Policy::TreeAware => write!(f, "tree-aware"),
        }
    }
}
