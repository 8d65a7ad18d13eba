//! The seven universal invariants from §8.

mod common;

use meshflood_sim::engine::FrameEngine;
use meshflood_sim::message::{Message, MessageRef, MessageStatus};
use meshflood_sim::policy::Policy;
use meshflood_sim::snapshot::FrameSnapshot;
use meshflood_sim::Topology;

fn run_trace(topo: &Topology, messages: &[MessageRef], policy: Policy, ticks: usize) -> Vec<String> {
    let mut engine = FrameEngine::new(topo);
    let mut out = Vec::new();
    for _ in 0..ticks {
        let report = engine.tick(messages, policy);
        let snapshot = FrameSnapshot::capture(&report, engine.nodes(), messages);
        out.push(serde_json::to_string(&snapshot).unwrap());
    }
    out
}

#[test]
fn invariant_1_seen_message_ids_is_monotonic_across_ticks() {
    let topo = common::line(4);
    let mut engine = FrameEngine::new(&topo);
    let m = Message::new(0, 0, 3, 4, 1);
    let messages = vec![m];

    let mut last = 0;
    for _ in 0..5 {
        engine.tick(&messages, Policy::Flood);
        let current = engine.node(1).seen_message_count();
        assert!(current >= last, "seen_message_ids must never shrink");
        last = current;
    }
}

#[test]
fn invariant_2_collision_victims_have_empty_inbox_and_are_flagged() {
    let topo = common::star(2);
    let mut engine = FrameEngine::new(&topo);
    let a = Message::new(0, 1, 2, 4, 1);
    let b = Message::new(1, 2, 1, 4, 1);
    let messages = vec![a, b];

    engine.tick(&messages, Policy::Flood);
    engine.tick(&messages, Policy::Flood); // both leaves transmit into the center

    assert!(engine.node(0).flags.collision);
    assert!(engine.node(0).frame_inbox.is_empty());
}

#[test]
fn invariant_3_targets_never_forward() {
    let topo = common::line(4);
    let mut engine = FrameEngine::new(&topo);
    let m = Message::new(0, 0, 3, 4, 1);
    let messages = vec![m.clone()];

    for _ in 0..4 {
        engine.tick(&messages, Policy::Flood);
    }
    assert!(m.borrow().target_received());
    assert!(engine.node(3).pending_outbox.is_empty(), "the target must never queue a forward");

    engine.tick(&messages, Policy::Flood);
    assert!(engine.node(2).frame_inbox.is_empty(), "the target must not appear as a sender in the next tick");
}

#[test]
fn invariant_4_every_path_begins_at_source_and_respects_hop_limit() {
    let topo = common::triangle();
    let mut engine = FrameEngine::new(&topo);
    let m = Message::new(0, 0, 2, 4, 1);
    let messages = vec![m.clone()];

    for _ in 0..4 {
        engine.tick(&messages, Policy::Flood);
    }

    let mb = m.borrow();
    for path in mb.paths() {
        assert_eq!(path[0], mb.source);
        assert!(path.len() as u32 - 1 <= mb.hop_limit);
        for pair in path.windows(2) {
            assert!(topo.are_neighbors(pair[0], pair[1]), "consecutive path elements must be neighbors");
        }
    }
}

#[test]
fn invariant_5_status_is_assigned_once_and_matches_target_received() {
    let topo = common::line(6);
    let mut engine = FrameEngine::new(&topo);
    let m = Message::new(0, 0, 5, 3, 1);
    let messages = vec![m.clone()];

    for _ in 0..6 {
        engine.tick(&messages, Policy::Flood);
    }

    assert!(m.borrow().is_completed());
    assert_eq!(m.borrow().status(), Some(MessageStatus::Failed));
    assert!(!m.borrow().target_received());

    // A redundant completion attempt must not change the outcome.
    let changed = m.borrow_mut().complete();
    assert!(!changed);
    assert_eq!(m.borrow().status(), Some(MessageStatus::Failed));
}

#[test]
fn invariant_6_tree_aware_suppresses_when_both_endpoints_share_a_subtree() {
    use std::collections::BTreeSet;
    let mut adjacency = vec![BTreeSet::new(); 10];
    for &(a, b) in &[(5usize, 3usize), (3, 7), (7, 9)] {
        adjacency[a].insert(b);
        adjacency[b].insert(a);
    }
    let topo = Topology::new(adjacency).unwrap();
    let mut engine = FrameEngine::new(&topo);
    engine.nodes_mut()[7].record_knowledge(&[5, 3, 7], 10);

    let receivers = engine.node(7).routing_decision(Policy::TreeAware, 5, 3, &[3, 7]);
    assert!(receivers.is_empty());
}

#[test]
fn invariant_7_fixed_seed_topology_and_policy_reproduce_byte_identical_snapshots() {
    let topo = common::line(4);
    let messages_a = vec![Message::new(0, 0, 3, 4, 1)];
    let messages_b = vec![Message::new(0, 0, 3, 4, 1)];

    let trace_a = run_trace(&topo, &messages_a, Policy::Flood, 5);
    let trace_b = run_trace(&topo, &messages_b, Policy::Flood, 5);

    assert_eq!(trace_a, trace_b);
}
