//! The serializable per-tick emitted data described in §6 ("Emitted data"),
//! for the external visualizer and for the byte-identical-snapshot
//! determinism test (§8 invariant 7).
//!
//! Grounded on `petersallai-moonblokz-radio-simulator`'s
//! `control/command.rs` pattern of small `serde`-derived structs mirroring
//! the wire shape a frontend consumes, rather than serializing engine
//! internals directly.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::TickReport;
use crate::message::{MessageId, MessageRef, MessageState, MessageStatus};
use crate::node::{Node, NodeId, StatusFlags};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct NodeStatusSnapshot {
    pub source: bool,
    pub target: bool,
    pub sending: bool,
    pub receiving: bool,
    pub collision: bool,
}

impl From<StatusFlags> for NodeStatusSnapshot {
    fn from(flags: StatusFlags) -> Self {
        NodeStatusSnapshot {
            source: flags.source,
            target: flags.target,
            sending: flags.sending,
            receiving: flags.receiving,
            collision: flags.collision,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct TransmissionSnapshot {
    pub sender: NodeId,
    pub receiver: NodeId,
    pub message_id: MessageId,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStateLabel {
    Waiting,
    Active,
    Completed,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatusLabel {
    Success,
    Failed,
}

impl From<MessageStatus> for MessageStatusLabel {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Success => MessageStatusLabel::Success,
            MessageStatus::Failed => MessageStatusLabel::Failed,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageSnapshot {
    pub id: MessageId,
    pub state: MessageStateLabel,
    pub status: Option<MessageStatusLabel>,
    pub paths: Vec<Vec<NodeId>>,
}

impl MessageSnapshot {
    fn capture(m: &MessageRef) -> Self {
        let mb = m.borrow();
        let state = match mb.state() {
            MessageState::Waiting => MessageStateLabel::Waiting,
            MessageState::Active => MessageStateLabel::Active,
            MessageState::Completed(_) => MessageStateLabel::Completed,
        };
        MessageSnapshot {
            id: mb.id,
            state,
            status: mb.status().map(MessageStatusLabel::from),
            paths: mb.paths().to_vec(),
        }
    }
}

/// One tick's complete externally-visible state: exactly the shape §6
/// specifies.
#[derive(Clone, Debug, Serialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub transmissions: Vec<TransmissionSnapshot>,
    pub collisions: Vec<NodeId>,
    pub node_status: BTreeMap<NodeId, NodeStatusSnapshot>,
    pub messages: Vec<MessageSnapshot>,
}

impl FrameSnapshot {
    /// Build a snapshot from a tick's [`TickReport`] and the node/message
    /// state it left behind. `transmissions` uses the attempted list (the
    /// same records `collisions` flags as discarded), matching §6's two
    /// separate lists.
    pub fn capture(report: &TickReport, nodes: &[Node], messages: &[MessageRef]) -> Self {
        let transmissions = report
            .transmissions_attempted
            .iter()
            .map(|&(sender, receiver, message_id)| TransmissionSnapshot { sender, receiver, message_id })
            .collect();
        let node_status = nodes.iter().map(|n| (n.id, NodeStatusSnapshot::from(n.flags))).collect();
        let messages = messages.iter().map(MessageSnapshot::capture).collect();
        FrameSnapshot {
            tick: report.frame,
            transmissions,
            collisions: report.collided_receivers.clone(),
            node_status,
            messages,
        }
    }
}
