/*!
meshflood-sim
=====

A discrete-event simulator of flooding in a wireless mesh network, comparing
unconditional flooding against a *tree-aware* variant that suppresses
forwarding once a node's learned topology proves it is off-path.

# Usage

This crate is `meshflood-sim`. Add it to your `Cargo.toml`:

```toml
[dependencies]
meshflood-sim = "0.1"
```

Hand it a [`Topology`] (an external collaborator builds the adjacency; this
crate never generates node placement) plus a [`LearningConfig`] and
[`ComparisonConfig`], and drive it through [`Simulator`]:

```no_run
use std::collections::BTreeSet;
use meshflood_sim::{Simulator, Topology, LearningConfig, ComparisonConfig, Policy};

let topology = Topology::new(vec![
    BTreeSet::from([1]),
    BTreeSet::from([0, 2]),
    BTreeSet::from([1, 3]),
    BTreeSet::from([2]),
]).unwrap();

let mut sim = Simulator::setup(
    &topology,
    LearningConfig::new(4, 1),
    ComparisonConfig::new(20, 200, 2),
).unwrap();

let learning = sim.run_learning().unwrap();
let flood = sim.run_comparison(Policy::Flood).unwrap();
println!("network efficiency under flood: {:.1}%", flood.statistics.network_efficiency());
let _ = learning;
```

# Two-phase simulation

A *learning phase* floods a deterministic set of messages across the whole
topology so every node accumulates a knowledge tree (§4.4 of the design:
observed paths indexed by destination). A *comparison phase* then replays
one random workload under each policy in turn, reusing the knowledge trees
the learning phase built and never resetting them between policy runs — see
[`PhaseRunner`] and [`Comparator`].

# Logging

This crate instruments itself with the [`log`] facade only; it never
installs a logger. Binaries embedding this crate should call
`env_logger::init()` (or an equivalent) before driving a [`Simulator`].
*/

#![deny(unsafe_code)]

pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod message;
pub mod node;
pub mod phase;
pub mod policy;
pub mod snapshot;
pub mod statistics;
pub mod topology;

pub use comparator::{Comparator, ComparisonResult};
pub use config::{ComparisonConfig, LearningConfig};
pub use error::{Error, Result};
pub use phase::PhaseRunner;
pub use policy::Policy;
pub use statistics::{ComparisonStats, LearningStats};
pub use topology::Topology;

/// What [`Simulator::reset_phase`] should drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetScope {
    /// Per-node flags, outboxes, inboxes, and duplicate-suppression sets;
    /// knowledge trees survive.
    Volatile,
    /// Everything, including every node's knowledge tree.
    All,
}

/// The top-level control surface (§6): set up once from a topology and the
/// two phase configurations, then drive the learning and comparison
/// phases.
pub struct Simulator {
    node_count: usize,
    runner: PhaseRunner,
    learning_cfg: LearningConfig,
    comparison_cfg: ComparisonConfig,
}

impl Simulator {
    /// Validate both configurations against `topology` and build the
    /// underlying frame engine. Returns `Err` without starting any phase if
    /// either configuration is invalid (§7).
    pub fn setup(topology: &Topology, learning_cfg: LearningConfig, comparison_cfg: ComparisonConfig) -> Result<Self> {
        learning_cfg.validate()?;
        comparison_cfg.validate()?;
        if topology.node_count() < 2 {
            return Err(Error::ConfigurationInvalid(
                "topology must have at least 2 nodes (a message needs a distinct source and target)".into(),
            ));
        }
        Ok(Simulator {
            node_count: topology.node_count(),
            runner: PhaseRunner::new(topology),
            learning_cfg,
            comparison_cfg,
        })
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Run the learning phase once, under `Policy::Flood`.
    pub fn run_learning(&mut self) -> Result<LearningStats> {
        self.runner.run_learning(&self.learning_cfg)
    }

    /// Run the comparison phase's configured workload under a single
    /// policy. Calling this twice (once per policy) replays the identical
    /// message schedule both times (§4.5).
    pub fn run_comparison(&mut self, policy: Policy) -> Result<ComparisonStats> {
        self.runner.run_comparison(&self.comparison_cfg, self.node_count, policy)
    }

    /// Run the comparison workload under both policies and aggregate
    /// per-category winners.
    pub fn compare(&mut self) -> Result<ComparisonResult> {
        Comparator::compare(&mut self.runner, &self.comparison_cfg, self.node_count)
    }

    /// Reset phase state per `scope` (§6 `reset_phase`).
    pub fn reset_phase(&mut self, scope: ResetScope) {
        match scope {
            ResetScope::Volatile => self.runner.reset_volatile(),
            ResetScope::All => self.runner.reset_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn setup_rejects_a_single_node_topology() {
        let topology = Topology::new(vec![BTreeSet::new()]).unwrap();
        let err = Simulator::setup(&topology, LearningConfig::new(1, 1), ComparisonConfig::new(1, 10, 1)).unwrap_err();
        assert!(matches!(err, Error::ConfigurationInvalid(_)));
    }

    #[test]
    fn setup_succeeds_and_learning_completes_on_a_two_node_topology() {
        let topology = Topology::new(vec![BTreeSet::from([1]), BTreeSet::from([0])]).unwrap();
        let mut sim = Simulator::setup(&topology, LearningConfig::new(2, 1), ComparisonConfig::new(1, 10, 1)).unwrap();
        let learning = sim.run_learning().unwrap();
        assert!(learning.statistics.frame_count() > 0);
    }
}
