//! In-memory account store

use super::{AccountStore, Commit, StorageStats};
use crate::{
    error::{Error, Result},
    types::{Account, Address, JournalEntry, Signature},
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: BTreeMap<Address, Account>,
    journal: Vec<JournalEntry>,
    signatures: HashSet<Signature>,
}

/// Process-local store; a commit is one write-lock critical section
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryStore {
    fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        Ok(self.state.read().accounts.get(address).cloned())
    }

    fn accounts_owned_by(&self, owner: &Address) -> Result<Vec<(Address, Account)>> {
        Ok(self
            .state
            .read()
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *owner)
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }

    fn contains_signature(&self, signature: &Signature) -> Result<bool> {
        Ok(self.state.read().signatures.contains(signature))
    }

    fn get_entry(&self, slot: u64) -> Result<JournalEntry> {
        let state = self.state.read();
        usize::try_from(slot)
            .ok()
            .and_then(|index| state.journal.get(index))
            .cloned()
            .ok_or(Error::EntryNotFound(slot))
    }

    fn latest_entry(&self) -> Result<Option<JournalEntry>> {
        Ok(self.state.read().journal.last().cloned())
    }

    fn commit(&self, commit: Commit) -> Result<()> {
        let mut state = self.state.write();

        // Validate before touching anything
        let next_slot = state.journal.len() as u64;
        if commit.entry.slot != next_slot {
            return Err(Error::InvariantViolation(format!(
                "journal slot {} does not follow {}",
                commit.entry.slot,
                next_slot.wrapping_sub(1)
            )));
        }
        if let Some(ref signature) = commit.signature {
            if state.signatures.contains(signature) {
                return Err(Error::DuplicateTransaction(signature.to_string()));
            }
        }

        for (address, account) in commit.accounts {
            state.accounts.insert(address, account);
        }
        if let Some(signature) = commit.signature {
            state.signatures.insert(signature);
        }

        tracing::debug!(slot = commit.entry.slot, "Journal entry committed");
        state.journal.push(commit.entry);

        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        let state = self.state.read();
        Ok(StorageStats {
            total_accounts: state.accounts.len() as u64,
            total_entries: state.journal.len() as u64,
            total_signatures: state.signatures.len() as u64,
        })
    }
}
