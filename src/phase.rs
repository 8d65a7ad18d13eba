//! `PhaseRunner`: drives the learning phase and the comparison phase over a
//! shared `FrameEngine`, owning each phase's message set and statistics
//! (§4.5).

use std::collections::HashMap;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ComparisonConfig, LearningConfig};
use crate::engine::FrameEngine;
use crate::error::Result;
use crate::message::{Message, MessageId, MessageRef};
use crate::node::NodeId;
use crate::policy::Policy;
use crate::statistics::{ComparisonStats, LearningStats, RouteDiscovery, Statistics};
use crate::topology::Topology;

/// A message's generating parameters, independent of any particular run —
/// the "schedule" the comparison phase replays identically under both
/// policies (§4.5, §9 "snapshotting and restoring message schedules").
#[derive(Clone, Copy, Debug)]
struct MessageSpec {
    id: MessageId,
    source: NodeId,
    target: NodeId,
    hop_limit: u32,
    start_frame: u64,
}

fn instantiate(specs: &[MessageSpec]) -> Vec<MessageRef> {
    specs.iter().map(|s| Message::new(s.id, s.source, s.target, s.hop_limit, s.start_frame)).collect()
}

/// Picks a uniformly random node id distinct from `exclude`. Callers must
/// ensure `node_count >= 2`, or no distinct candidate exists and this spins
/// forever; `LearningConfig`/`run_comparison` reject `node_count < 2` before
/// either schedule generator reaches here.
fn distinct_endpoints(rng: &mut StdRng, node_count: usize, exclude: Option<usize>) -> usize {
    debug_assert!(node_count >= 2, "distinct_endpoints requires at least 2 nodes");
    loop {
        let candidate = rng.gen_range(0..node_count);
        if Some(candidate) != exclude {
            return candidate;
        }
    }
}

/// Deterministic learning-pair generation (§4.5): one message per node,
/// `source = node index`, a random distinct `target`, scheduled every
/// `inter_message_delta` frames starting at frame 1.
fn generate_learning_schedule(cfg: &LearningConfig) -> Vec<MessageSpec> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    (0..cfg.node_count)
        .map(|source| {
            let target = distinct_endpoints(&mut rng, cfg.node_count, Some(source));
            MessageSpec {
                id: source as MessageId,
                source,
                target,
                hop_limit: cfg.learning_hop_limit,
                start_frame: 1 + source as u64 * cfg.inter_message_delta,
            }
        })
        .collect()
}

/// Uniformly random comparison workload (§4.5): distinct endpoints, random
/// start frame leaving room for the message's hop limit plus margin to
/// play out before `total_frames`.
fn generate_comparison_schedule(cfg: &ComparisonConfig, node_count: usize) -> Vec<MessageSpec> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let hop_limit = cfg.hop_limit(node_count);
    let max_start = cfg.total_frames.saturating_sub(hop_limit as u64 + 4).max(1);
    (0..cfg.message_count)
        .map(|i| {
            let source = distinct_endpoints(&mut rng, node_count, None);
            let target = distinct_endpoints(&mut rng, node_count, Some(source));
            let start_frame = rng.gen_range(1..=max_start);
            MessageSpec { id: i as MessageId, source, target, hop_limit, start_frame }
        })
        .collect()
}

/// Drives frames for one phase and owns the resulting statistics; the
/// underlying `FrameEngine` (and therefore every node's knowledge tree)
/// survives across phases and across policy switches within a phase.
pub struct PhaseRunner {
    engine: FrameEngine,
    comparison_schedule: Option<Vec<MessageSpec>>,
}

impl PhaseRunner {
    pub fn new(topology: &Topology) -> Self {
        PhaseRunner { engine: FrameEngine::new(topology), comparison_schedule: None }
    }

    pub fn engine(&self) -> &FrameEngine {
        &self.engine
    }

    /// Drop volatile per-node state, keeping knowledge trees, and rewind the
    /// clock. Mirrors the control surface's `reset_phase` with `which != all`.
    pub fn reset_volatile(&mut self) {
        self.engine.reset_volatile();
    }

    /// Also drops every node's knowledge tree and forgets the cached
    /// comparison schedule. Mirrors `reset_phase(all)`.
    pub fn reset_all(&mut self) {
        self.engine.reset_all();
        self.comparison_schedule = None;
    }

    /// Run the learning phase: always `Policy::Flood`, deterministic
    /// message schedule, terminates once every message completes (bounded
    /// by construction: hop-limit expiry and stall detection both
    /// guarantee completion within `learning_hop_limit` frames of a
    /// message's `start_frame`).
    pub fn run_learning(&mut self, cfg: &LearningConfig) -> Result<LearningStats> {
        cfg.validate()?;
        let specs = generate_learning_schedule(cfg);
        let messages = instantiate(&specs);
        let mut stats = Statistics::new();
        for s in &specs {
            stats.register_message(s.id, s.source, s.target, s.hop_limit, s.start_frame);
        }

        info!("learning phase starting: {} nodes, {} messages", cfg.node_count, messages.len());
        let backstop = specs.iter().map(|s| s.start_frame).max().unwrap_or(1) + cfg.learning_hop_limit as u64 + 2;
        loop {
            let report = self.engine.tick(&messages, Policy::Flood);
            stats.record_frame(report.as_observation(), &messages);
            if messages.iter().all(|m| m.borrow().is_completed()) {
                break;
            }
            if self.engine.current_frame() > backstop {
                log::warn!("learning phase exceeded its backstop frame {backstop}; stopping early");
                break;
            }
        }
        info!("learning phase terminated at frame {}", self.engine.current_frame());

        let route_discovery = self.route_discovery();
        Ok(LearningStats { statistics: stats, route_discovery })
    }

    /// Run the comparison phase under `policy`. The first call generates
    /// and caches the message schedule from `cfg`; subsequent calls (for
    /// the other policy) replay the identical cached schedule, regardless
    /// of `cfg`, per §4.5's "same message set ... under both policies".
    pub fn run_comparison(&mut self, cfg: &ComparisonConfig, node_count: usize, policy: Policy) -> Result<ComparisonStats> {
        cfg.validate()?;
        if node_count < 2 {
            return Err(crate::error::Error::ConfigurationInvalid(
                "node_count must be at least 2 (a message needs a distinct source and target)".into(),
            ));
        }
        if self.comparison_schedule.is_none() {
            self.comparison_schedule = Some(generate_comparison_schedule(cfg, node_count));
        }
        let specs = self.comparison_schedule.clone().expect("just populated");
        let messages = instantiate(&specs);
        let mut stats = Statistics::new();
        for s in &specs {
            stats.register_message(s.id, s.source, s.target, s.hop_limit, s.start_frame);
        }

        self.engine.reset_volatile();
        info!("comparison phase starting under {policy}: {} messages, total_frames={}", messages.len(), cfg.total_frames);
        loop {
            let report = self.engine.tick(&messages, policy);
            stats.record_frame(report.as_observation(), &messages);
            if messages.iter().all(|m| m.borrow().is_completed()) {
                break;
            }
            if self.engine.current_frame() > cfg.total_frames {
                break;
            }
        }
        info!("comparison phase under {policy} terminated at frame {}", self.engine.current_frame());

        Ok(ComparisonStats { policy, statistics: stats })
    }

    /// Per-destination learning progress (§ supplemented features): how
    /// many distinct nodes learned a route to each destination, and the
    /// earliest frame any of them did.
    fn route_discovery(&self) -> HashMap<NodeId, RouteDiscovery> {
        let mut map: HashMap<NodeId, RouteDiscovery> = HashMap::new();
        for node in self.engine.nodes() {
            for &destination in node.known_destinations() {
                let earliest = node.knowledge_of(destination).iter().map(|e| e.learned_frame).min().expect("non-empty by construction");
                let entry = map.entry(destination).or_insert(RouteDiscovery { learners: 0, earliest_frame: earliest });
                entry.learners += 1;
                entry.earliest_frame = entry.earliest_frame.min(earliest);
            }
        }
        map
    }
}
