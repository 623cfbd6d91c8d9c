// redpacket - lock a pool of funds into a shareable packet and distribute
// it to multiple claimants under a fairness algorithm, with a time-gated
// recovery path for unclaimed funds.

pub mod events;
pub mod indexer;
pub mod ledger;
pub mod storage;

pub use events::{EventEnvelope, EventLog, PacketEvent};
pub use indexer::{PacketIndex, PAGE_SIZE};
pub use ledger::{
    AccountId, Amount, Claim, ClaimOutcome, LedgerConfig, LedgerError, PacketId, PacketLedger,
    PacketSnapshot, PacketState,
};
pub use storage::{PacketStore, StoreError};
