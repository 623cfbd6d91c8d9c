// Packet events - one immutable record per state transition

use crate::ledger::{AccountId, Amount, PacketId};
use serde::{Deserialize, Serialize};

/// A state transition emitted by the ledger
///
/// Every successful mutation (and the observability-only duplicate claim)
/// produces exactly one of these, in the same atomic unit as the mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketEvent {
    /// A packet was created and funded
    PacketCreated {
        packet_id: PacketId,
        owner: AccountId,
        message: String,
        total_amount: Amount,
        total_count: u32,
        is_even: bool,
    },
    /// A claimant received a share
    PacketClaimed {
        packet_id: PacketId,
        claimer: AccountId,
        amount: Amount,
    },
    /// A repeat claim attempt; no state changed
    AlreadyClaimed {
        packet_id: PacketId,
        claimer: AccountId,
    },
    /// The owner reclaimed the undistributed remainder
    FundsWithdrawn {
        packet_id: PacketId,
        owner: AccountId,
        amount: Amount,
    },
    /// The final slot was claimed and the balance reached zero
    PacketEmpty { packet_id: PacketId },
}

impl PacketEvent {
    /// The packet this event belongs to
    pub fn packet_id(&self) -> PacketId {
        match self {
            PacketEvent::PacketCreated { packet_id, .. }
            | PacketEvent::PacketClaimed { packet_id, .. }
            | PacketEvent::AlreadyClaimed { packet_id, .. }
            | PacketEvent::FundsWithdrawn { packet_id, .. }
            | PacketEvent::PacketEmpty { packet_id } => *packet_id,
        }
    }

    /// Short name for logs and display
    pub fn kind(&self) -> &'static str {
        match self {
            PacketEvent::PacketCreated { .. } => "PacketCreated",
            PacketEvent::PacketClaimed { .. } => "PacketClaimed",
            PacketEvent::AlreadyClaimed { .. } => "AlreadyClaimed",
            PacketEvent::FundsWithdrawn { .. } => "FundsWithdrawn",
            PacketEvent::PacketEmpty { .. } => "PacketEmpty",
        }
    }
}

/// An event plus its position in the append-only log
///
/// `sequence` is the log index consumers key on for idempotent,
/// at-least-once materialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    sequence: u64,
    timestamp: u64,
    event: PacketEvent,
}

impl EventEnvelope {
    /// Wrap an event at a log position
    pub fn new(sequence: u64, timestamp: u64, event: PacketEvent) -> Self {
        Self {
            sequence,
            timestamp,
            event,
        }
    }

    /// Position in the log (unique, dense, starting at 0)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the transition was applied (Unix seconds)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The transition itself
    pub fn event(&self) -> &PacketEvent {
        &self.event
    }

    /// The packet this envelope belongs to
    pub fn packet_id(&self) -> PacketId {
        self.event.packet_id()
    }
}
