//! Transaction executor
//!
//! The ledger ties together storage, signature checks and the hosted
//! program. One call to [`Ledger::process_transaction`] either commits the
//! whole transaction (account writes, journal entry, replay marker) or
//! nothing at all.
//!
//! # Example
//!
//! ```no_run
//! use parcel_ledger::{Config, Ledger, Program, InvokeContext, Address};
//!
//! struct Noop;
//!
//! impl Program for Noop {
//!     fn program_id(&self) -> Address {
//!         Address::new([7u8; 32])
//!     }
//!
//!     fn process(&self, _ctx: &mut InvokeContext<'_>, _data: &[u8]) -> parcel_ledger::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> parcel_ledger::Result<()> {
//!     let ledger = Ledger::open(&Config::default(), Noop)?;
//!     assert_eq!(ledger.verify_journal()?, 0);
//!     Ok(())
//! }
//! ```

use crate::{
    clock::{Clock, SystemClock},
    context::InvokeContext,
    metrics::Metrics,
    program::Program,
    rent::Rent,
    storage::{open_store, AccountStore, Commit, StorageStats},
    types::{Account, Address, EntryKind, JournalEntry, Transaction, TransactionReceipt},
    Config, Error, Result,
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Single-writer transaction executor
pub struct Ledger {
    store: Arc<dyn AccountStore>,
    program: Box<dyn Program>,
    clock: Arc<dyn Clock>,
    rent: Rent,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("program_id", &self.program.program_id())
            .field("rent", &self.rent)
            .finish()
    }
}

impl Ledger {
    /// Open the configured store and host `program` on it
    pub fn open(config: &Config, program: impl Program) -> Result<Self> {
        let store = open_store(config)?;
        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            backend = ?config.storage,
            "Ledger opened"
        );
        Ok(Self::with_store(store, program, config.rent))
    }

    /// Host `program` on an existing store
    pub fn with_store(store: Arc<dyn AccountStore>, program: impl Program, rent: Rent) -> Self {
        Self {
            store,
            program: Box::new(program),
            clock: Arc::new(SystemClock),
            rent,
            metrics: None,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Hosted program address
    pub fn program_id(&self) -> Address {
        self.program.program_id()
    }

    /// Reserve schedule in force
    pub fn rent(&self) -> Rent {
        self.rent
    }

    /// Shared handle to the underlying store, for concurrent reads
    pub fn store(&self) -> Arc<dyn AccountStore> {
        Arc::clone(&self.store)
    }

    /// Verify, execute and commit a signed transaction
    pub fn process_transaction(&mut self, tx: &Transaction) -> Result<TransactionReceipt> {
        let started = Instant::now();
        let result = self.execute(tx);

        match &result {
            Ok((receipt, lamports_moved)) => {
                tracing::info!(
                    slot = receipt.slot,
                    signature = %receipt.signature,
                    signer = %tx.message.signer,
                    "Transaction committed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_commit(
                        receipt.slot,
                        *lamports_moved,
                        started.elapsed().as_secs_f64(),
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    signature = %tx.signature,
                    signer = %tx.message.signer,
                    error = %e,
                    "Transaction rejected"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection();
                }
            }
        }

        result.map(|(receipt, _)| receipt)
    }

    fn execute(&mut self, tx: &Transaction) -> Result<(TransactionReceipt, u64)> {
        let program_id = self.program.program_id();
        if tx.message.program_id != program_id {
            return Err(Error::InvalidTransaction(format!(
                "no program at {}",
                tx.message.program_id
            )));
        }

        tx.verify()?;

        if self.store.contains_signature(&tx.signature)? {
            return Err(Error::DuplicateTransaction(tx.signature.to_string()));
        }

        let (slot, previous_hash) = self.next_slot()?;
        let timestamp = self.clock.unix_timestamp();

        let mut ctx = InvokeContext::new(
            self.store.as_ref(),
            program_id,
            tx.message.signer,
            slot,
            timestamp,
            self.rent,
        );
        self.program.process(&mut ctx, &tx.message.data)?;
        let outcome = ctx.finish()?;

        let mut entry = JournalEntry {
            entry_id: Uuid::now_v7(),
            slot,
            timestamp,
            kind: EntryKind::Transaction {
                signature: tx.signature.clone(),
                signer: tx.message.signer,
            },
            touched: outcome.writes.iter().map(|(address, _)| *address).collect(),
            events: outcome.events.clone(),
            previous_hash,
            hash: [0u8; 32],
        };
        entry.hash = entry.compute_hash()?;
        let entry_hash = entry.hash;

        self.store.commit(Commit {
            accounts: outcome.writes,
            entry,
            signature: Some(tx.signature.clone()),
        })?;

        let receipt = TransactionReceipt {
            signature: tx.signature.clone(),
            slot,
            entry_hash,
            events: outcome.events,
            logs: outcome.logs,
        };
        Ok((receipt, outcome.lamports_moved))
    }

    /// Mint lamports into a wallet
    ///
    /// Only for bootstrapping test and demo networks. Returns the journal
    /// slot of the credit.
    pub fn credit_genesis(&mut self, address: Address, lamports: u64) -> Result<u64> {
        let mut account = self
            .store
            .get_account(&address)?
            .unwrap_or_else(|| Account::wallet(0));
        if account.owner != Address::SYSTEM {
            return Err(Error::IllegalOwner(address));
        }
        account.lamports = account
            .lamports
            .checked_add(lamports)
            .ok_or_else(|| Error::Overflow(format!("genesis credit to {}", address)))?;

        let (slot, previous_hash) = self.next_slot()?;
        let mut entry = JournalEntry {
            entry_id: Uuid::now_v7(),
            slot,
            timestamp: self.clock.unix_timestamp(),
            kind: EntryKind::GenesisCredit { address, lamports },
            touched: vec![address],
            events: Vec::new(),
            previous_hash,
            hash: [0u8; 32],
        };
        entry.hash = entry.compute_hash()?;

        self.store.commit(Commit {
            accounts: vec![(address, account)],
            entry,
            signature: None,
        })?;

        tracing::debug!(%address, lamports, slot, "Genesis credit");
        if let Some(metrics) = &self.metrics {
            metrics.journal_height.set(slot as i64);
        }
        Ok(slot)
    }

    fn next_slot(&self) -> Result<(u64, [u8; 32])> {
        match self.store.latest_entry()? {
            Some(latest) => {
                let slot = latest
                    .slot
                    .checked_add(1)
                    .ok_or_else(|| Error::Overflow("journal slot".to_string()))?;
                Ok((slot, latest.hash))
            }
            None => Ok((0, [0u8; 32])),
        }
    }

    /// Get account by address
    pub fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        self.store.get_account(address)
    }

    /// All accounts owned by `owner`
    pub fn accounts_owned_by(&self, owner: &Address) -> Result<Vec<(Address, Account)>> {
        self.store.accounts_owned_by(owner)
    }

    /// Journal entry at `slot`
    pub fn get_entry(&self, slot: u64) -> Result<JournalEntry> {
        self.store.get_entry(slot)
    }

    /// Most recent journal entry
    pub fn latest_entry(&self) -> Result<Option<JournalEntry>> {
        self.store.latest_entry()
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.store.stats()
    }

    /// Walk the journal and check the hash chain
    pub fn verify_journal(&self) -> Result<u64> {
        verify_journal(self.store.as_ref())
    }
}

/// Check every journal entry's hash and link to its predecessor
///
/// Returns the number of entries checked.
pub fn verify_journal(store: &dyn AccountStore) -> Result<u64> {
    let Some(latest) = store.latest_entry()? else {
        return Ok(0);
    };

    let mut previous_hash = [0u8; 32];
    for slot in 0..=latest.slot {
        let entry = store.get_entry(slot)?;
        if entry.slot != slot {
            return Err(Error::InvariantViolation(format!(
                "entry stored at slot {} claims slot {}",
                slot, entry.slot
            )));
        }
        if entry.previous_hash != previous_hash {
            return Err(Error::InvariantViolation(format!(
                "broken chain at slot {}",
                slot
            )));
        }
        if entry.compute_hash()? != entry.hash {
            return Err(Error::InvariantViolation(format!(
                "hash mismatch at slot {}",
                slot
            )));
        }
        previous_hash = entry.hash;
    }

    Ok(latest.slot + 1)
}
