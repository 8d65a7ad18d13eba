//! Per-frame counters, per-message records, and the derived efficiency
//! ratios (§4.6). `Statistics` only ever observes data the frame engine
//! already produced; it never reaches back into `Node` or `Message` state
//! beyond what it is handed.

use std::collections::{BTreeMap, HashMap};

use crate::message::{MessageId, MessageRef, MessageStatus};
use crate::node::NodeId;
use crate::policy::Policy;

/// Everything a single tick produced, in the shape `Statistics` needs to
/// tally it. The frame engine builds one of these per tick; nothing else
/// constructs it.
pub struct FrameObservation<'a> {
    pub frame: u64,
    /// All attempted transmission records this tick, before collision
    /// filtering: `(sender, receiver, message_id)`.
    pub transmissions_attempted: &'a [(NodeId, NodeId, MessageId)],
    /// Receivers that collided this tick.
    pub collided_receivers: &'a [NodeId],
    /// Records that survived collision filtering and were accepted by their
    /// receiver: `(sender, receiver, message_id)`.
    pub transmissions_accepted: &'a [(NodeId, NodeId, MessageId)],
    /// Messages that transitioned to `Completed` during this tick.
    pub completed: &'a [MessageId],
    /// Count of active (non-completed) messages during this tick.
    pub active_message_count: usize,
}

/// A message's endpoints, lifecycle outcome, and the paths discovered for
/// it, plus the transmission/reception counts attributed to it.
#[derive(Clone, Debug)]
pub struct MessageRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub hop_limit: u32,
    pub start_frame: u64,
    pub success: bool,
    pub final_path: Option<Vec<NodeId>>,
    pub paths: Vec<Vec<NodeId>>,
    pub transmissions_attributed: usize,
    pub receptions_attributed: usize,
    pub completion_frame: Option<u64>,
}

impl MessageRecord {
    fn seed(source: NodeId, target: NodeId, hop_limit: u32, start_frame: u64) -> Self {
        MessageRecord {
            source,
            target,
            hop_limit,
            start_frame,
            success: false,
            final_path: None,
            paths: Vec::new(),
            transmissions_attributed: 0,
            receptions_attributed: 0,
            completion_frame: None,
        }
    }

    /// Frames elapsed between admission and completion; `None` until the
    /// message completes.
    pub fn frames_to_completion(&self) -> Option<u64> {
        self.completion_frame.map(|c| c - self.start_frame)
    }
}

/// Per-frame counters and the per-message ledger accumulated over a phase
/// run.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    collisions: Vec<usize>,
    transmissions_attempted: Vec<usize>,
    transmissions_accepted: Vec<usize>,
    active_messages: Vec<usize>,
    messages: BTreeMap<MessageId, MessageRecord>,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Record one message's admission so its record exists even if the
    /// phase ends before it completes.
    pub fn register_message(&mut self, id: MessageId, source: NodeId, target: NodeId, hop_limit: u32, start_frame: u64) {
        self.messages.entry(id).or_insert_with(|| MessageRecord::seed(source, target, hop_limit, start_frame));
    }

    /// Ingest one tick's observation. `messages` is consulted only for the
    /// ids named in `obs.completed`, to snapshot their final path set.
    pub fn record_frame(&mut self, obs: FrameObservation<'_>, messages: &[MessageRef]) {
        self.collisions.push(obs.collided_receivers.len());
        self.transmissions_attempted.push(obs.transmissions_attempted.len());
        self.transmissions_accepted.push(obs.transmissions_accepted.len());
        self.active_messages.push(obs.active_message_count);

        for &(_, _, mid) in obs.transmissions_attempted {
            if let Some(record) = self.messages.get_mut(&mid) {
                record.transmissions_attributed += 1;
            }
        }
        for &(_, _, mid) in obs.transmissions_accepted {
            if let Some(record) = self.messages.get_mut(&mid) {
                record.receptions_attributed += 1;
            }
        }
        for &mid in obs.completed {
            let Some(m) = messages.iter().find(|m| m.borrow().id == mid) else { continue };
            let mb = m.borrow();
            if let Some(record) = self.messages.get_mut(&mid) {
                record.success = mb.status() == Some(MessageStatus::Success);
                record.final_path = mb.final_path().map(|p| p.to_vec());
                record.paths = mb.paths().to_vec();
                record.completion_frame = Some(obs.frame);
            }
        }
    }

    pub fn frame_count(&self) -> usize {
        self.collisions.len()
    }

    pub fn collisions(&self) -> &[usize] {
        &self.collisions
    }

    pub fn transmissions_attempted(&self) -> &[usize] {
        &self.transmissions_attempted
    }

    pub fn transmissions_accepted(&self) -> &[usize] {
        &self.transmissions_accepted
    }

    pub fn active_messages(&self) -> &[usize] {
        &self.active_messages
    }

    pub fn total_collisions(&self) -> usize {
        self.collisions.iter().sum()
    }

    pub fn total_transmissions_attempted(&self) -> usize {
        self.transmissions_attempted.iter().sum()
    }

    pub fn total_transmissions_accepted(&self) -> usize {
        self.transmissions_accepted.iter().sum()
    }

    pub fn message_record(&self, id: MessageId) -> Option<&MessageRecord> {
        self.messages.get(&id)
    }

    pub fn message_records(&self) -> impl Iterator<Item = (&MessageId, &MessageRecord)> {
        self.messages.iter()
    }

    /// `accepted / attempted × 100`; `0.0` if nothing was ever attempted.
    pub fn network_efficiency(&self) -> f64 {
        let attempted = self.total_transmissions_attempted();
        if attempted == 0 {
            return 0.0;
        }
        self.total_transmissions_accepted() as f64 / attempted as f64 * 100.0
    }

    /// `successful_messages / attempted × 100`; `0.0` if nothing was ever
    /// attempted.
    pub fn resource_efficiency(&self) -> f64 {
        let attempted = self.total_transmissions_attempted();
        if attempted == 0 {
            return 0.0;
        }
        let successful = self.messages.values().filter(|r| r.success).count();
        successful as f64 / attempted as f64 * 100.0
    }

    /// `mean(|final_path| - 1)` over successful messages; `0.0` if none
    /// succeeded.
    pub fn average_path_length(&self) -> f64 {
        let lengths: Vec<usize> = self
            .messages
            .values()
            .filter(|r| r.success)
            .filter_map(|r| r.final_path.as_ref())
            .map(|p| p.len().saturating_sub(1))
            .collect();
        if lengths.is_empty() {
            return 0.0;
        }
        lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    }
}

/// What a destination node learned during the learning phase: how many
/// distinct nodes discovered a route to it, and the earliest frame any of
/// them did.
#[derive(Clone, Copy, Debug)]
pub struct RouteDiscovery {
    pub learners: usize,
    pub earliest_frame: u64,
}

/// Statistics plus learning-phase-specific route-discovery progress,
/// mirroring the reference implementation's per-destination learning
/// progress report.
#[derive(Clone, Debug)]
pub struct LearningStats {
    pub statistics: Statistics,
    pub route_discovery: HashMap<NodeId, RouteDiscovery>,
}

/// Statistics tagged with the policy it was produced under, so a
/// [`crate::comparator::Comparator`] result can be rendered without the
/// caller re-threading which run produced which numbers.
#[derive(Clone, Debug)]
pub struct ComparisonStats {
    pub policy: Policy,
    pub statistics: Statistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn efficiency_ratios_are_zero_with_no_attempts() {
        let stats = Statistics::new();
        assert_eq!(stats.network_efficiency(), 0.0);
        assert_eq!(stats.resource_efficiency(), 0.0);
        assert_eq!(stats.average_path_length(), 0.0);
    }

    #[test]
    fn record_frame_tallies_attribution_and_completion() {
        let m = crate::message::Message::new(0, 0, 2, 4, 1);
        m.borrow_mut().activate();
        m.borrow_mut().record_path(vec![0, 1, 2]);
        m.borrow_mut().mark_target_received();
        m.borrow_mut().complete();

        let mut stats = Statistics::new();
        stats.register_message(0, 0, 2, 4, 1);
        let transmissions = vec![(0usize, 1usize, 0u64), (1, 2, 0)];
        let accepted = transmissions.clone();
        let completed = vec![0u64];
        stats.record_frame(
            FrameObservation {
                frame: 3,
                transmissions_attempted: &transmissions,
                collided_receivers: &[],
                transmissions_accepted: &accepted,
                completed: &completed,
                active_message_count: 1,
            },
            &[m],
        );

        let record = stats.message_record(0).unwrap();
        assert_eq!(record.transmissions_attributed, 2);
        assert_eq!(record.receptions_attributed, 2);
        assert!(record.success);
        assert_eq!(record.final_path, Some(vec![0, 1, 2]));
        assert_eq!(record.frames_to_completion(), Some(2));
        assert_eq!(stats.network_efficiency(), 100.0);
        assert_eq!(stats.average_path_length(), 2.0);
    }

    #[test]
    fn collision_counts_are_recorded_per_frame() {
        let mut stats = Statistics::new();
        stats.record_frame(
            FrameObservation {
                frame: 1,
                transmissions_attempted: &[(0, 1, 0)],
                collided_receivers: &[1],
                transmissions_accepted: &[],
                completed: &[],
                active_message_count: 1,
            },
            &[],
        );
        assert_eq!(stats.collisions(), &[1]);
        assert_eq!(stats.total_collisions(), 1);
    }
}
