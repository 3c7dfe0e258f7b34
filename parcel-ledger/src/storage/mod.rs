//! Account storage
//!
//! # Layout
//!
//! - `accounts` - Account records (key: address)
//! - `journal` - Append-only journal entries (key: slot, big-endian)
//! - `signatures` - Processed transaction signatures (replay guard)
//!
//! Every mutation reaches storage through [`AccountStore::commit`], which
//! writes the account set, the journal entry and the signature in one atomic
//! unit. A failed commit leaves nothing behind.

use crate::{
    config::{Config, StorageBackend},
    error::{Error, Result},
    types::{Account, Address, JournalEntry, Signature},
};
use std::sync::Arc;

mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;

/// One atomic write
#[derive(Debug, Clone)]
pub struct Commit {
    /// Accounts to overwrite
    pub accounts: Vec<(Address, Account)>,

    /// Journal entry to append
    pub entry: JournalEntry,

    /// Signature to mark as processed
    pub signature: Option<Signature>,
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of accounts
    pub total_accounts: u64,
    /// Number of journal entries
    pub total_entries: u64,
    /// Number of processed signatures
    pub total_signatures: u64,
}

/// Account store backend
pub trait AccountStore: Send + Sync {
    /// Get account by address
    fn get_account(&self, address: &Address) -> Result<Option<Account>>;

    /// All accounts owned by `owner`, ordered by address
    fn accounts_owned_by(&self, owner: &Address) -> Result<Vec<(Address, Account)>>;

    /// True if the signature has already been committed
    fn contains_signature(&self, signature: &Signature) -> Result<bool>;

    /// Journal entry at `slot`
    fn get_entry(&self, slot: u64) -> Result<JournalEntry>;

    /// Most recent journal entry
    fn latest_entry(&self) -> Result<Option<JournalEntry>>;

    /// Apply a commit atomically
    fn commit(&self, commit: Commit) -> Result<()>;

    /// Get storage statistics
    fn stats(&self) -> Result<StorageStats>;
}

/// Open the backend named in the config
pub fn open_store(config: &Config) -> Result<Arc<dyn AccountStore>> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => Ok(Arc::new(RocksStore::open(config)?)),
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => Err(Error::Config(
            "rocksdb backend requires the `rocksdb` feature".to_string(),
        )),
    }
}
