// PacketLedger - authoritative store of packet and claim records
// Validates and atomically applies every mutation; one lock per packet

use crate::events::{EventLog, PacketEvent};
use crate::ledger::allocator::SplitAllocator;
use crate::ledger::clock::{Clock, SystemClock};
use crate::ledger::config::LedgerConfig;
use crate::ledger::packet::{AccountId, Amount, Claim, PacketId, PacketRecord, PacketSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Errors that can occur during ledger operations
///
/// Every variant is terminal for its call: a failed call commits no
/// partial state, and nothing is retried internally.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("count must be between 1 and {max}, got {count}")]
    InvalidCount { count: u32, max: u32 },

    #[error("deposit must be greater than zero")]
    InvalidDeposit,

    #[error("share too small: deposit {deposit} over {count} slots falls below min share {min_share}")]
    ShareTooSmall {
        deposit: Amount,
        count: u32,
        min_share: Amount,
    },

    #[error("message too long: {len} chars, max {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("packet {0} not found")]
    PacketNotFound(PacketId),

    #[error("packet {0} is fully claimed")]
    PacketFullyClaimed(PacketId),

    #[error("packet {0} was withdrawn by its owner")]
    PacketWithdrawn(PacketId),

    #[error("caller is not the owner of packet {0}")]
    NotOwner(PacketId),

    #[error("nothing to withdraw from packet {0}")]
    NothingToWithdraw(PacketId),

    #[error("lock window not elapsed for packet {packet_id}: {remaining}s remaining")]
    LockWindowNotElapsed { packet_id: PacketId, remaining: u64 },

    #[error("packet {0} funds were already withdrawn")]
    AlreadyWithdrawn(PacketId),
}

/// Result of a claim attempt
///
/// A duplicate claim is a distinguished non-fatal outcome, not an error:
/// it emits `AlreadyClaimed` for observability and changes nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claimant received this share
    Claimed(Amount),
    /// The claimant had already claimed from this packet
    AlreadyClaimed,
}

/// Serializable ledger state for persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    next_id: u64,
    packets: Vec<PacketRecord>,
}

impl LedgerState {
    /// Highest packet id assigned so far
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// The packet records in the state
    pub fn packets(&self) -> &[PacketRecord] {
        &self.packets
    }
}

/// The packet ledger
///
/// Contention is scoped per packet: the outer map lock is held only to
/// look up or insert an entry, and every check-and-update runs under that
/// single packet's mutex. Operations on distinct packets proceed in
/// parallel.
pub struct PacketLedger {
    config: LedgerConfig,
    allocator: SplitAllocator,
    clock: Arc<dyn Clock>,
    packets: RwLock<HashMap<PacketId, Arc<Mutex<PacketRecord>>>>,
    /// Id sequence: bumped exactly once per successful create, never reused
    next_id: AtomicU64,
    /// Root entropy; every claim forks a child RNG from it for its draw
    rng: Mutex<StdRng>,
    events: Arc<EventLog>,
}

impl PacketLedger {
    /// Create a ledger with the system clock and OS-entropy randomness
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            allocator: SplitAllocator::new(config.min_share),
            clock: Arc::new(SystemClock),
            packets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            rng: Mutex::new(StdRng::from_entropy()),
            events: Arc::new(EventLog::new()),
        }
    }

    /// Replace the clock (tests inject a `ManualClock` here)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the split randomness for reproducible draws
    ///
    /// Seeded draws are predictable to anyone who knows the seed; use only
    /// for tests and audit replay, never where claimants could observe it.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Get the ledger configuration
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get the event log
    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Subscribe to live events
    pub fn subscribe(&self) -> broadcast::Receiver<crate::events::EventEnvelope> {
        self.events.subscribe()
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Create a packet, locking `deposit` for up to `count` claimants
    pub fn create(
        &self,
        owner: AccountId,
        message: impl Into<String>,
        count: u32,
        is_even: bool,
        deposit: Amount,
    ) -> Result<PacketId, LedgerError> {
        let message = message.into();

        // All validation happens before the id sequence is touched.
        if count == 0 || count > self.config.max_count {
            return Err(LedgerError::InvalidCount {
                count,
                max: self.config.max_count,
            });
        }
        if deposit == 0 {
            return Err(LedgerError::InvalidDeposit);
        }
        if deposit / u64::from(count) < self.config.min_share {
            return Err(LedgerError::ShareTooSmall {
                deposit,
                count,
                min_share: self.config.min_share,
            });
        }
        let len = message.chars().count();
        if len > self.config.max_message_len {
            return Err(LedgerError::MessageTooLong {
                len,
                max: self.config.max_message_len,
            });
        }

        let now = self.clock.now_unix();
        let mut packets = self.packets.write().unwrap();
        let id = PacketId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = PacketRecord::new(
            id,
            owner.clone(),
            message.clone(),
            deposit,
            count,
            is_even,
            now,
        );
        packets.insert(id, Arc::new(Mutex::new(record)));
        // Emitted before the map lock drops so no claim on this packet can
        // reach the log ahead of its creation.
        self.events.append(
            PacketEvent::PacketCreated {
                packet_id: id,
                owner: owner.clone(),
                message,
                total_amount: deposit,
                total_count: count,
                is_even,
            },
            now,
        );
        drop(packets);

        info!(packet_id = id.value(), %owner, deposit, count, is_even, "packet created");
        Ok(id)
    }

    /// Claim a share from a packet
    pub fn claim(&self, packet_id: PacketId, claimer: AccountId) -> Result<ClaimOutcome, LedgerError> {
        let entry = self.entry(packet_id)?;
        let mut packet = entry.lock().unwrap();
        let now = self.clock.now_unix();

        // The duplicate check comes first so a repeat claimer always sees
        // AlreadyClaimed, even once the packet is full or withdrawn.
        if packet.has_claimed(&claimer) {
            self.events.append(
                PacketEvent::AlreadyClaimed {
                    packet_id,
                    claimer: claimer.clone(),
                },
                now,
            );
            debug!(packet_id = packet_id.value(), %claimer, "duplicate claim attempt");
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        if packet.is_withdrawn() {
            return Err(LedgerError::PacketWithdrawn(packet_id));
        }
        if packet.remaining_slots() == 0 {
            return Err(LedgerError::PacketFullyClaimed(packet_id));
        }

        // The root rng lock is held only long enough to seed a per-claim
        // fork; the draw itself runs under this packet's lock alone, so
        // claims on distinct packets never contend on the allocator.
        let mut rng = {
            let mut root = self.rng.lock().unwrap();
            StdRng::seed_from_u64(root.gen())
        };
        let amount = self.allocator.next(
            packet.total_amount(),
            packet.total_count(),
            packet.balance(),
            packet.remaining_slots(),
            packet.is_even(),
            &mut rng,
        );
        packet.apply_claim(Claim::new(packet_id, claimer.clone(), amount, now));
        self.events.append(
            PacketEvent::PacketClaimed {
                packet_id,
                claimer: claimer.clone(),
                amount,
            },
            now,
        );
        if packet.remaining_slots() == 0 {
            self.events
                .append(PacketEvent::PacketEmpty { packet_id }, now);
        }

        info!(
            packet_id = packet_id.value(),
            %claimer,
            amount,
            remaining = packet.balance(),
            "claim applied"
        );
        Ok(ClaimOutcome::Claimed(amount))
    }

    /// Reclaim the undistributed remainder after the lock window
    pub fn withdraw(&self, packet_id: PacketId, caller: AccountId) -> Result<Amount, LedgerError> {
        let entry = self.entry(packet_id)?;
        let mut packet = entry.lock().unwrap();

        if *packet.owner() != caller {
            return Err(LedgerError::NotOwner(packet_id));
        }
        if packet.is_withdrawn() {
            return Err(LedgerError::AlreadyWithdrawn(packet_id));
        }
        if packet.balance() == 0 {
            return Err(LedgerError::NothingToWithdraw(packet_id));
        }
        let now = self.clock.now_unix();
        let elapsed = now.saturating_sub(packet.creation_time());
        if elapsed < self.config.lock_window_secs {
            return Err(LedgerError::LockWindowNotElapsed {
                packet_id,
                remaining: self.config.lock_window_secs - elapsed,
            });
        }

        let amount = packet.apply_withdraw();
        self.events.append(
            PacketEvent::FundsWithdrawn {
                packet_id,
                owner: caller.clone(),
                amount,
            },
            now,
        );

        info!(packet_id = packet_id.value(), owner = %caller, amount, "funds withdrawn");
        Ok(amount)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Get a point-in-time view of a packet
    pub fn get_packet(&self, packet_id: PacketId) -> Result<PacketSnapshot, LedgerError> {
        let entry = self.entry(packet_id)?;
        let packet = entry.lock().unwrap();
        Ok(packet.snapshot())
    }

    /// Check whether an account has claimed from a packet
    ///
    /// Unknown packets report `false`, matching the map-lookup semantics
    /// callers expect from this query.
    pub fn has_claimed(&self, packet_id: PacketId, account: &AccountId) -> bool {
        match self.entry(packet_id) {
            Ok(entry) => entry.lock().unwrap().has_claimed(account),
            Err(_) => false,
        }
    }

    /// Get the claims recorded against a packet, in claim order
    pub fn claims(&self, packet_id: PacketId) -> Result<Vec<Claim>, LedgerError> {
        let entry = self.entry(packet_id)?;
        let packet = entry.lock().unwrap();
        Ok(packet.claims().to_vec())
    }

    /// Number of packets ever created
    pub fn packet_count(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    fn entry(&self, packet_id: PacketId) -> Result<Arc<Mutex<PacketRecord>>, LedgerError> {
        self.packets
            .read()
            .unwrap()
            .get(&packet_id)
            .cloned()
            .ok_or(LedgerError::PacketNotFound(packet_id))
    }

    // ========================================================================
    // STATE EXPORT/IMPORT
    // ========================================================================

    /// Export the ledger state for persistence
    pub fn export_state(&self) -> LedgerState {
        let packets = self.packets.read().unwrap();
        let mut records: Vec<PacketRecord> = packets
            .values()
            .map(|entry| entry.lock().unwrap().clone())
            .collect();
        records.sort_by_key(|r| r.id());
        LedgerState {
            next_id: self.next_id.load(Ordering::SeqCst),
            packets: records,
        }
    }

    /// Import previously exported state, replacing the current contents
    pub fn import_state(&self, state: LedgerState) {
        let mut packets = self.packets.write().unwrap();
        packets.clear();
        for record in state.packets {
            packets.insert(record.id(), Arc::new(Mutex::new(record)));
        }
        self.next_id.store(state.next_id, Ordering::SeqCst);
    }
}
