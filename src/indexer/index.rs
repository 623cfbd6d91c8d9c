// PacketIndex - read-optimized materialization of the event log

use crate::events::{EventEnvelope, EventLog, PacketEvent};
use crate::ledger::{AccountId, Amount, PacketId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::warn;

/// Page size for history listings
pub const PAGE_SIZE: usize = 100;

/// A claim as seen by the read model, keyed by its log sequence
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedClaim {
    pub sequence: u64,
    pub packet_id: PacketId,
    pub claimer: AccountId,
    pub amount: Amount,
    pub timestamp: u64,
}

/// A denormalized packet with its claim list embedded
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedPacket {
    pub packet_id: PacketId,
    pub owner: AccountId,
    pub message: String,
    pub total_amount: Amount,
    pub balance: Amount,
    pub total_count: u32,
    pub claimed_count: u32,
    pub is_even: bool,
    pub creation_time: u64,
    pub withdrawn: bool,
    pub withdrawn_amount: Amount,
    pub empty: bool,
    pub duplicate_attempts: u32,
    pub claims: Vec<IndexedClaim>,
}

/// Read model over the ledger's event stream
///
/// Applies envelopes idempotently keyed by sequence, so at-least-once
/// delivery (including full replays) converges to the same state. The
/// index is eventually consistent with the ledger and never consulted
/// for validation.
#[derive(Debug, Default)]
pub struct PacketIndex {
    packets: HashMap<PacketId, IndexedPacket>,
    claims: BTreeMap<u64, IndexedClaim>,
    applied: HashSet<u64>,
}

impl PacketIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one envelope; returns false if it was already applied
    pub fn apply(&mut self, envelope: &EventEnvelope) -> bool {
        if !self.applied.insert(envelope.sequence()) {
            return false;
        }

        match envelope.event() {
            PacketEvent::PacketCreated {
                packet_id,
                owner,
                message,
                total_amount,
                total_count,
                is_even,
            } => {
                self.packets.insert(
                    *packet_id,
                    IndexedPacket {
                        packet_id: *packet_id,
                        owner: owner.clone(),
                        message: message.clone(),
                        total_amount: *total_amount,
                        balance: *total_amount,
                        total_count: *total_count,
                        claimed_count: 0,
                        is_even: *is_even,
                        creation_time: envelope.timestamp(),
                        withdrawn: false,
                        withdrawn_amount: 0,
                        empty: false,
                        duplicate_attempts: 0,
                        claims: Vec::new(),
                    },
                );
            }
            PacketEvent::PacketClaimed {
                packet_id,
                claimer,
                amount,
            } => {
                let claim = IndexedClaim {
                    sequence: envelope.sequence(),
                    packet_id: *packet_id,
                    claimer: claimer.clone(),
                    amount: *amount,
                    timestamp: envelope.timestamp(),
                };
                self.claims.insert(envelope.sequence(), claim.clone());
                if let Some(packet) = self.packets.get_mut(packet_id) {
                    packet.balance = packet.balance.saturating_sub(*amount);
                    packet.claimed_count += 1;
                    packet.claims.push(claim);
                } else {
                    warn!(packet_id = packet_id.value(), "claim for unknown packet");
                }
            }
            PacketEvent::AlreadyClaimed { packet_id, .. } => {
                if let Some(packet) = self.packets.get_mut(packet_id) {
                    packet.duplicate_attempts += 1;
                }
            }
            PacketEvent::FundsWithdrawn {
                packet_id, amount, ..
            } => {
                if let Some(packet) = self.packets.get_mut(packet_id) {
                    packet.balance = 0;
                    packet.withdrawn = true;
                    packet.withdrawn_amount = *amount;
                }
            }
            PacketEvent::PacketEmpty { packet_id } => {
                if let Some(packet) = self.packets.get_mut(packet_id) {
                    packet.empty = true;
                }
            }
        }
        true
    }

    /// Apply every envelope in a batch, skipping duplicates
    pub fn apply_all<'a>(&mut self, envelopes: impl IntoIterator<Item = &'a EventEnvelope>) -> usize {
        envelopes
            .into_iter()
            .filter(|envelope| self.apply(envelope))
            .count()
    }

    /// Get a materialized packet
    pub fn get(&self, packet_id: PacketId) -> Option<&IndexedPacket> {
        self.packets.get(&packet_id)
    }

    /// Get a standalone claim record by its log sequence
    pub fn claim(&self, sequence: u64) -> Option<&IndexedClaim> {
        self.claims.get(&sequence)
    }

    /// Number of materialized packets
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Packets ordered by creation time descending, paginated
    pub fn recent(&self, page: usize) -> Vec<&IndexedPacket> {
        let mut all: Vec<&IndexedPacket> = self.packets.values().collect();
        all.sort_by(|a, b| {
            b.creation_time
                .cmp(&a.creation_time)
                .then(b.packet_id.cmp(&a.packet_id))
        });
        all.into_iter()
            .skip(page * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect()
    }
}

/// Drain a live subscription into a shared index
///
/// Tolerates arbitrary consumer delay: a lagged receiver falls back to
/// catch-up reads against the retained log, and because `apply` is
/// idempotent the overlap between the two paths is harmless.
pub async fn feed(
    index: Arc<Mutex<PacketIndex>>,
    log: Arc<EventLog>,
    mut rx: broadcast::Receiver<EventEnvelope>,
) {
    let mut next_seq: u64 = 0;
    loop {
        match rx.recv().await {
            Ok(envelope) => {
                next_seq = envelope.sequence() + 1;
                index.lock().unwrap().apply(&envelope);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "index feed lagged, replaying from log");
                let missed = log.since(next_seq);
                let mut index = index.lock().unwrap();
                for envelope in &missed {
                    next_seq = envelope.sequence() + 1;
                    index.apply(envelope);
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                let remaining = log.since(next_seq);
                let mut index = index.lock().unwrap();
                for envelope in &remaining {
                    index.apply(envelope);
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(sequence: u64, id: u64, at: u64) -> EventEnvelope {
        EventEnvelope::new(
            sequence,
            at,
            PacketEvent::PacketCreated {
                packet_id: PacketId::new(id),
                owner: AccountId::from("alice"),
                message: "hi".to_string(),
                total_amount: 300,
                total_count: 3,
                is_even: true,
            },
        )
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut index = PacketIndex::new();
        let envelope = created(0, 1, 100);

        assert!(index.apply(&envelope));
        assert!(!index.apply(&envelope));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_claims_materialize_into_packet_and_standalone() {
        let mut index = PacketIndex::new();
        index.apply(&created(0, 1, 100));
        index.apply(&EventEnvelope::new(
            1,
            101,
            PacketEvent::PacketClaimed {
                packet_id: PacketId::new(1),
                claimer: AccountId::from("bob"),
                amount: 100,
            },
        ));

        let packet = index.get(PacketId::new(1)).unwrap();
        assert_eq!(packet.balance, 200);
        assert_eq!(packet.claimed_count, 1);
        assert_eq!(packet.claims.len(), 1);
        assert_eq!(index.claim(1).unwrap().claimer, AccountId::from("bob"));
    }

    #[test]
    fn test_replay_converges() {
        let events = vec![
            created(0, 1, 100),
            EventEnvelope::new(
                1,
                101,
                PacketEvent::PacketClaimed {
                    packet_id: PacketId::new(1),
                    claimer: AccountId::from("bob"),
                    amount: 100,
                },
            ),
        ];

        let mut index = PacketIndex::new();
        index.apply_all(&events);
        let replayed = index.apply_all(&events);

        assert_eq!(replayed, 0);
        assert_eq!(index.get(PacketId::new(1)).unwrap().balance, 200);
    }

    #[test]
    fn test_recent_orders_by_creation_time_descending() {
        let mut index = PacketIndex::new();
        index.apply(&created(0, 1, 100));
        index.apply(&created(1, 2, 300));
        index.apply(&created(2, 3, 200));

        let page = index.recent(0);
        let ids: Vec<u64> = page.iter().map(|p| p.packet_id.value()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(index.recent(1).is_empty());
    }
}
