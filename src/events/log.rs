// EventLog - append-only ordered log with async fan-out

use crate::events::event::{EventEnvelope, PacketEvent};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel behind each log
///
/// A consumer that falls further behind than this sees a lag error and
/// catches up from the retained log via `since`.
const CHANNEL_CAPACITY: usize = 1_024;

/// Append-only, ordered log of packet events
///
/// The log is the outbox between the ledger and its consumers: every
/// entry is retained for catch-up reads, and live subscribers receive
/// each envelope over a broadcast channel. Delivery to subscribers is
/// at-least-once; consumers deduplicate by sequence.
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<Vec<EventEnvelope>>,
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Append an event, assigning it the next sequence number
    ///
    /// Callers hold the owning packet's lock across this call, so per-packet
    /// log order always matches mutation order.
    pub fn append(&self, event: PacketEvent, timestamp: u64) -> EventEnvelope {
        let mut entries = self.entries.lock().unwrap();
        let envelope = EventEnvelope::new(entries.len() as u64, timestamp, event);
        entries.push(envelope.clone());
        // Send fails only when no subscriber exists; the log itself is
        // the durable record.
        let _ = self.tx.send(envelope.clone());
        envelope
    }

    /// Subscribe to live events
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Number of entries in the log
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the entire log
    pub fn entries(&self) -> Vec<EventEnvelope> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries at or after the given sequence (catch-up reads)
    pub fn since(&self, sequence: u64) -> Vec<EventEnvelope> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .skip(sequence as usize)
            .cloned()
            .collect()
    }

    /// Replace the log contents (restoring persisted state)
    ///
    /// Entries must already be dense and sequence-ordered, as produced by
    /// `entries`.
    pub fn restore(&self, entries: Vec<EventEnvelope>) {
        debug_assert!(entries
            .iter()
            .enumerate()
            .all(|(i, e)| e.sequence() == i as u64));
        *self.entries.lock().unwrap() = entries;
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
