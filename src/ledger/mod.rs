// Ledger module - THE ACCOUNTING CORE
// Handles packet records, claim application, and the split algorithm

mod allocator;
mod clock;
mod config;
mod packet;
mod state;

pub use allocator::SplitAllocator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use packet::{
    AccountId, Amount, Claim, PacketId, PacketRecord, PacketSnapshot, PacketState,
};
pub use state::{ClaimOutcome, LedgerError, LedgerState, PacketLedger};
