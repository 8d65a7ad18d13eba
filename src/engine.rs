//! `FrameEngine`: the single owner of `Message` mutation and the component
//! that runs one tick's totally-ordered steps (§4.1).

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::{debug, trace, warn};

use crate::message::{MessageId, MessageRef, MessageStatus};
use crate::node::{Node, NodeId, OutboxEntry};
use crate::policy::Policy;
use crate::statistics::FrameObservation;
use crate::topology::Topology;

/// An attempted transmission, before collision filtering.
#[derive(Clone, Debug)]
struct TransmissionRecord {
    sender: NodeId,
    receiver: NodeId,
    message: MessageRef,
    path: Vec<NodeId>,
}

/// What a single tick produced, in a shape `Statistics` and any renderer can
/// consume without reaching back into engine internals.
pub struct TickReport {
    pub frame: u64,
    pub transmissions_attempted: Vec<(NodeId, NodeId, MessageId)>,
    pub collided_receivers: Vec<NodeId>,
    pub transmissions_accepted: Vec<(NodeId, NodeId, MessageId)>,
    pub completed: Vec<(MessageId, MessageStatus)>,
    pub completed_ids: Vec<MessageId>,
    pub active_message_count: usize,
}

impl TickReport {
    /// Borrow this report as a [`FrameObservation`] for `Statistics::record_frame`.
    pub fn as_observation(&self) -> FrameObservation<'_> {
        FrameObservation {
            frame: self.frame,
            transmissions_attempted: &self.transmissions_attempted,
            collided_receivers: &self.collided_receivers,
            transmissions_accepted: &self.transmissions_accepted,
            completed: &self.completed_ids,
            active_message_count: self.active_message_count,
        }
    }
}

/// Owns every node's mutable state and advances the simulated clock one
/// tick at a time, in the strict (a)-(j) ordering of §4.1.
pub struct FrameEngine {
    nodes: Vec<Node>,
    current_frame: u64,
}

impl FrameEngine {
    pub fn new(topology: &Topology) -> Self {
        let nodes = topology
            .node_ids()
            .map(|id| Node::new(id, topology.neighbors(id).clone()))
            .collect();
        FrameEngine { nodes, current_frame: 1 }
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access to every node, for tests that need to seed knowledge
    /// trees directly rather than replaying a whole learning phase.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Reset every node's volatile state (flags, outbox, inbox, dedup sets)
    /// and rewind the clock, preserving knowledge trees. Used between
    /// policy runs within the comparison phase (§6 `reset_phase`).
    pub fn reset_volatile(&mut self) {
        for node in &mut self.nodes {
            node.reset_volatile();
        }
        self.current_frame = 1;
    }

    /// Also clears every node's knowledge tree.
    pub fn reset_all(&mut self) {
        for node in &mut self.nodes {
            node.reset_knowledge();
        }
        self.reset_volatile();
    }

    /// Run one tick for the given active message set under `policy`,
    /// executing steps (a)-(j) in order.
    pub fn tick(&mut self, messages: &[MessageRef], policy: Policy) -> TickReport {
        let frame = self.current_frame;

        self.reset_frame_flags();
        self.refresh_designations(messages);
        self.admit(messages, frame);
        let completed = self.expiry_sweep(messages);

        let emitted = self.collect_transmissions(policy);
        let transmissions_attempted: Vec<(NodeId, NodeId, MessageId)> =
            emitted.iter().map(|r| (r.sender, r.receiver, r.message.borrow().id)).collect();

        let (surviving, collided_receivers) = Self::detect_collisions(emitted);
        for &r in &collided_receivers {
            self.nodes[r].flags.collision = true;
        }

        let accepted = self.deliver(surviving);
        let transmissions_accepted: Vec<(NodeId, NodeId, MessageId)> =
            accepted.iter().map(|r| (r.sender, r.receiver, r.message.borrow().id)).collect();

        self.process_reception(accepted, frame);
        self.finalize_completions(&completed, messages);

        let active_message_count = messages.iter().filter(|m| m.borrow().is_active()).count();

        self.debug_verify_designations(messages);

        self.current_frame += 1;

        let completed_ids = completed.iter().map(|(id, _)| *id).collect();
        TickReport {
            frame,
            transmissions_attempted,
            collided_receivers,
            transmissions_accepted,
            completed,
            completed_ids,
            active_message_count,
        }
    }

    /// (a) Reset per-frame flags and inboxes.
    fn reset_frame_flags(&mut self) {
        for node in &mut self.nodes {
            node.reset_frame();
        }
    }

    /// (b) Designation refresh: mark source/target on nodes for every
    /// already-active message. Freshly admitted messages (step c) are
    /// picked up on the *next* tick's refresh, matching the reference
    /// ordering.
    fn refresh_designations(&mut self, messages: &[MessageRef]) {
        for m in messages {
            let mb = m.borrow();
            if mb.is_active() {
                self.nodes[mb.source].flags.source = true;
                self.nodes[mb.target].flags.target = true;
            }
        }
    }

    /// (c) Admission: activate every waiting message whose `start_frame`
    /// equals this tick, seed its source's outbox, and flag its endpoints
    /// (step (b) only covers messages already active before this tick).
    fn admit(&mut self, messages: &[MessageRef], frame: u64) {
        for m in messages {
            let mut mb = m.borrow_mut();
            if mb.is_waiting() && mb.start_frame == frame {
                mb.activate();
                let (source, target, hop_limit, id) = (mb.source, mb.target, mb.hop_limit, mb.id);
                drop(mb);
                trace!("frame {frame}: message {id} admitted at node {source}");
                self.nodes[source].pending_outbox.push(OutboxEntry {
                    message: m.clone(),
                    path: vec![source],
                    hop_budget_remaining: hop_limit as i64,
                });
                self.nodes[source].mark_seen_without_sender(id);
                // refresh_designations (step b) only flags already-active messages, so a
                // message's own admission tick would otherwise leave its endpoints
                // unflagged until the next tick's refresh.
                self.nodes[source].flags.source = true;
                self.nodes[target].flags.target = true;
            }
        }
    }

    /// (d) Expiry sweep: drop zero-or-negative-budget outbox entries
    /// (completing their messages), then complete any active message with
    /// no outbox entry anywhere (stalled). This is the sole place a message
    /// completes with `hop_limit_exceeded` — the copy that exhausts the
    /// budget is still observed (and its arrival recorded) by step (h) of
    /// the tick that produced it; completion is the *next* tick's business
    /// (§8 scenario S5).
    fn expiry_sweep(&mut self, messages: &[MessageRef]) -> Vec<(MessageId, MessageStatus)> {
        let mut completed = Vec::new();
        for node in &mut self.nodes {
            node.pending_outbox.retain(|entry| {
                if entry.hop_budget_remaining <= 0 {
                    let id = entry.message.borrow().id;
                    if entry.message.borrow_mut().complete() {
                        warn!("message {id} expired: hop limit exhausted");
                        completed.push((id, entry.message.borrow().status().unwrap()));
                    }
                    false
                } else {
                    true
                }
            });
        }
        let referenced: HashSet<MessageId> = self
            .nodes
            .iter()
            .flat_map(|n| n.pending_outbox.iter())
            .map(|e| e.message.borrow().id)
            .collect();
        for m in messages {
            let mut mb = m.borrow_mut();
            if mb.is_active() && !referenced.contains(&mb.id) {
                let id = mb.id;
                if mb.complete() {
                    warn!("message {id} expired: stalled with no outbox entry");
                    completed.push((id, mb.status().unwrap()));
                }
            }
        }
        completed
    }

    /// (e) Transmission collection: run the routing decision for every
    /// live outbox entry, emit records, then clear outboxes (consumed
    /// exactly once per frame).
    fn collect_transmissions(&mut self, policy: Policy) -> Vec<TransmissionRecord> {
        let mut emitted = Vec::new();
        for node in &mut self.nodes {
            if node.pending_outbox.is_empty() {
                continue;
            }
            let entries = std::mem::take(&mut node.pending_outbox);
            let mut sent = false;
            for entry in &entries {
                let (source, target, budget_ok) = {
                    let mb = entry.message.borrow();
                    (mb.source, mb.target, mb.is_active() && !mb.is_completed() && entry.hop_budget_remaining > 0)
                };
                if !budget_ok {
                    continue;
                }
                let receivers = node.routing_decision(policy, source, target, &entry.path);
                for r in receivers {
                    emitted.push(TransmissionRecord {
                        sender: node.id,
                        receiver: r,
                        message: entry.message.clone(),
                        path: entry.path.clone(),
                    });
                    sent = true;
                }
            }
            if sent {
                node.flags.sending = true;
            }
        }
        emitted
    }

    /// (f) Collision detection: any receiver with >= 2 records this tick
    /// loses all of them.
    fn detect_collisions(emitted: Vec<TransmissionRecord>) -> (Vec<TransmissionRecord>, Vec<NodeId>) {
        // Count per-receiver, then filter the *original* emission order, so
        // the surviving order stays a deterministic function of node/neighbor
        // iteration order rather than of hash-map bucket order (§8 invariant 7).
        let counts: HashMap<NodeId, usize> = emitted.iter().map(|r| r.receiver).counts();
        let collided_set: HashSet<NodeId> = counts.into_iter().filter(|&(_, c)| c >= 2).map(|(r, _)| r).collect();
        let mut collided: Vec<NodeId> = collided_set.iter().copied().collect();
        collided.sort_unstable();
        if !collided.is_empty() {
            trace!("collision at receivers {collided:?}");
        }
        let surviving = emitted.into_iter().filter(|r| !collided_set.contains(&r.receiver)).collect();
        (surviving, collided)
    }

    /// (g) Delivery: offer every surviving record to its receiver; accepted
    /// copies join `frame_inbox`.
    fn deliver(&mut self, surviving: Vec<TransmissionRecord>) -> Vec<TransmissionRecord> {
        let mut accepted = Vec::new();
        for rec in surviving {
            let message_id = rec.message.borrow().id;
            let was_accepted = self.nodes[rec.receiver].try_accept(message_id, rec.sender);
            if was_accepted {
                self.nodes[rec.receiver].frame_inbox.push(crate::node::InboxEntry {
                    message: rec.message.clone(),
                    sender: rec.sender,
                    sender_path: rec.path.clone(),
                });
                self.nodes[rec.receiver].flags.receiving = true;
                accepted.push(rec);
            }
        }
        accepted
    }

    /// (h) Reception processing: extend paths, update knowledge, and
    /// either mark target-received or queue the next hop. Never completes a
    /// message itself — see [`FrameEngine::expiry_sweep`].
    fn process_reception(&mut self, accepted: Vec<TransmissionRecord>, frame: u64) {
        let mut receivers: Vec<NodeId> = accepted.iter().map(|r| r.receiver).collect();
        receivers.sort_unstable();
        receivers.dedup();
        for receiver in receivers {
            let inbox = std::mem::take(&mut self.nodes[receiver].frame_inbox);
            for entry in inbox {
                let mut new_path = entry.sender_path.clone();
                new_path.push(receiver);
                entry.message.borrow_mut().record_path(new_path.clone());

                let (target, hop_limit, id) = {
                    let mb = entry.message.borrow();
                    (mb.target, mb.hop_limit, mb.id)
                };
                self.nodes[receiver].record_knowledge(&new_path, frame);

                let hops_used = (new_path.len() - 1) as u32;
                if receiver == target {
                    entry.message.borrow_mut().mark_target_received();
                    debug!("frame {frame}: message {id} reached target {receiver}");
                } else {
                    // A zero-or-negative budget is queued like any other copy;
                    // the *next* tick's expiry sweep (step d) is what actually
                    // completes it (§8 scenario S5: the advance that exhausts
                    // the budget is still observed this tick, completion is
                    // the following tick's business).
                    let budget = hop_limit as i64 - hops_used as i64;
                    self.nodes[receiver].pending_outbox.push(OutboxEntry {
                        message: entry.message.clone(),
                        path: new_path,
                        hop_budget_remaining: budget,
                    });
                }
            }
        }
    }

    /// (i) Completion finalization: purge stray outbox entries for
    /// newly-completed messages and recompute endpoint source/target flags.
    fn finalize_completions(&mut self, completed: &[(MessageId, MessageStatus)], messages: &[MessageRef]) {
        if completed.is_empty() {
            return;
        }
        let completed_ids: HashSet<MessageId> = completed.iter().map(|(id, _)| *id).collect();
        for node in &mut self.nodes {
            node.pending_outbox.retain(|e| !completed_ids.contains(&e.message.borrow().id));
        }

        let mut affected = HashSet::new();
        for m in messages {
            let mb = m.borrow();
            if completed_ids.contains(&mb.id) {
                affected.insert(mb.source);
                affected.insert(mb.target);
            }
        }
        for node_id in affected {
            let still_source = messages.iter().any(|m| {
                let mb = m.borrow();
                mb.is_active() && mb.source == node_id
            });
            let still_target = messages.iter().any(|m| {
                let mb = m.borrow();
                mb.is_active() && mb.target == node_id
            });
            self.nodes[node_id].flags.source = still_source;
            self.nodes[node_id].flags.target = still_target;
        }
    }

    /// Dev-only consistency check: the set of nodes flagged source/target
    /// must match exactly the endpoints of currently active, non-completed
    /// messages.
    fn debug_verify_designations(&self, messages: &[MessageRef]) {
        #[cfg(debug_assertions)]
        {
            let mut expected_source = HashSet::new();
            let mut expected_target = HashSet::new();
            for m in messages {
                let mb = m.borrow();
                if mb.is_active() {
                    expected_source.insert(mb.source);
                    expected_target.insert(mb.target);
                }
            }
            for node in &self.nodes {
                debug_assert_eq!(
                    node.flags.source,
                    expected_source.contains(&node.id),
                    "node {} source flag out of sync with active messages",
                    node.id
                );
                debug_assert_eq!(
                    node.flags.target,
                    expected_target.contains(&node.id),
                    "node {} target flag out of sync with active messages",
                    node.id
                );
            }
        }
    }
}
