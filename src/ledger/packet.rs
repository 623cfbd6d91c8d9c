// Packet data model - packets, claims, and the per-packet state machine

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Amount in the smallest currency unit (fixed-point integer)
pub type Amount = u64;

/// Unique identifier for a packet, assigned monotonically by the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PacketId(u64);

impl PacketId {
    /// Create a packet ID from a raw value
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque caller identity
///
/// The ledger assumes callers are already authenticated by an external
/// session layer; an account is equality and hashing only, no key material.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account ID from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single account's one-time withdrawal of a share from a packet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    packet_id: PacketId,
    claimer: AccountId,
    amount: Amount,
    timestamp: u64,
}

impl Claim {
    /// Create a new claim record
    pub fn new(packet_id: PacketId, claimer: AccountId, amount: Amount, timestamp: u64) -> Self {
        Self {
            packet_id,
            claimer,
            amount,
            timestamp,
        }
    }

    /// Get the packet this claim belongs to
    pub fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    /// Get the claiming account
    pub fn claimer(&self) -> &AccountId {
        &self.claimer
    }

    /// Get the claimed amount
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Get when the claim was applied (Unix timestamp)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Lifecycle state of a packet
///
/// `Full` and `Withdrawn` are terminal: no transition exists between
/// them or back to `Open`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketState {
    /// Slots remain and funds are still locked
    Open,
    /// Every slot has been claimed
    Full,
    /// The owner reclaimed the undistributed remainder
    Withdrawn,
}

/// The authoritative record for one packet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacketRecord {
    id: PacketId,
    owner: AccountId,
    message: String,
    total_amount: Amount,
    balance: Amount,
    total_count: u32,
    claimed_count: u32,
    is_even: bool,
    creation_time: u64,
    withdrawn: bool,
    withdrawn_amount: Amount,
    claims: Vec<Claim>,
    claimers: HashSet<AccountId>,
}

impl PacketRecord {
    /// Create a freshly funded packet with no claims
    pub fn new(
        id: PacketId,
        owner: AccountId,
        message: String,
        deposit: Amount,
        total_count: u32,
        is_even: bool,
        creation_time: u64,
    ) -> Self {
        Self {
            id,
            owner,
            message,
            total_amount: deposit,
            balance: deposit,
            total_count,
            claimed_count: 0,
            is_even,
            creation_time,
            withdrawn: false,
            withdrawn_amount: 0,
            claims: Vec::new(),
            claimers: HashSet::new(),
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn claimed_count(&self) -> u32 {
        self.claimed_count
    }

    pub fn is_even(&self) -> bool {
        self.is_even
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }

    pub fn withdrawn_amount(&self) -> Amount {
        self.withdrawn_amount
    }

    /// Get the claims recorded so far, in claim order
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Number of slots still unclaimed
    pub fn remaining_slots(&self) -> u32 {
        self.total_count - self.claimed_count
    }

    /// Check whether an account has already claimed from this packet
    pub fn has_claimed(&self, account: &AccountId) -> bool {
        self.claimers.contains(account)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PacketState {
        if self.withdrawn {
            PacketState::Withdrawn
        } else if self.claimed_count == self.total_count {
            PacketState::Full
        } else {
            PacketState::Open
        }
    }

    /// Apply a claim: append the record, decrement balance, bump the count
    ///
    /// Caller is responsible for the precondition checks; this only
    /// mutates. Invariant: amount never exceeds the remaining balance.
    pub(crate) fn apply_claim(&mut self, claim: Claim) {
        debug_assert!(claim.amount <= self.balance);
        self.balance -= claim.amount;
        self.claimed_count += 1;
        self.claimers.insert(claim.claimer.clone());
        self.claims.push(claim);
    }

    /// Apply a withdrawal: zero the balance, mark terminal
    pub(crate) fn apply_withdraw(&mut self) -> Amount {
        let amount = self.balance;
        self.balance = 0;
        self.withdrawn = true;
        self.withdrawn_amount = amount;
        amount
    }

    /// Point-in-time view of all public fields
    pub fn snapshot(&self) -> PacketSnapshot {
        PacketSnapshot {
            id: self.id,
            owner: self.owner.clone(),
            message: self.message.clone(),
            total_amount: self.total_amount,
            balance: self.balance,
            total_count: self.total_count,
            claimed_count: self.claimed_count,
            is_even: self.is_even,
            creation_time: self.creation_time,
            withdrawn: self.withdrawn,
            withdrawn_amount: self.withdrawn_amount,
            state: self.state(),
        }
    }
}

/// Read-only view of a packet returned by ledger queries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacketSnapshot {
    pub id: PacketId,
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
    pub state: PacketState,
}
