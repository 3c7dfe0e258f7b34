//! Minimum balance a record must hold to stay alive

use serde::{Deserialize, Serialize};

/// Reserve schedule
///
/// A record with `n` data bytes must hold at least
/// `(account_overhead_bytes + n) * lamports_per_byte` lamports. Program-owned
/// records can never be debited below that amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rent {
    /// Lamports charged per stored byte
    pub lamports_per_byte: u64,

    /// Fixed per-record overhead counted as stored bytes
    pub account_overhead_bytes: u64,
}

impl Default for Rent {
    fn default() -> Self {
        Self {
            lamports_per_byte: 6_960,
            account_overhead_bytes: 128,
        }
    }
}

impl Rent {
    /// Minimum reserve for a record of `data_len` bytes
    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        (self.account_overhead_bytes.saturating_add(data_len as u64))
            .saturating_mul(self.lamports_per_byte)
    }

    /// True if `lamports` covers the reserve for `data_len` bytes
    pub fn is_exempt(&self, lamports: u64, data_len: usize) -> bool {
        lamports >= self.minimum_balance(data_len)
    }
}
