// Ledger configuration constants

use crate::ledger::packet::Amount;
use serde::{Deserialize, Serialize};

/// Tunable constants for the packet ledger
///
/// The lock window is deliberately injectable: observed deployments of
/// this scheme disagree on its duration (minutes to a day), so nothing
/// in the ledger or its tests hardcodes one.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Smallest currency amount considered a valid claim
    pub min_share: Amount,
    /// Minimum elapsed seconds before the owner may reclaim funds
    pub lock_window_secs: u64,
    /// Maximum number of slots per packet
    pub max_count: u32,
    /// Maximum packet message length in characters
    pub max_message_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_share: 1,
            lock_window_secs: 24 * 60 * 60,
            max_count: 100,
            max_message_len: 200,
        }
    }
}

impl LedgerConfig {
    /// Override the lock window
    pub fn with_lock_window_secs(mut self, secs: u64) -> Self {
        self.lock_window_secs = secs;
        self
    }

    /// Override the minimum share
    pub fn with_min_share(mut self, min_share: Amount) -> Self {
        self.min_share = min_share;
        self
    }
}
