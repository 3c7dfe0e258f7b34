//! Execution context handed to a program for one transaction
//!
//! The context stages every read and write in an overlay. Nothing reaches
//! storage until the ledger commits the overlay after the program returns
//! `Ok`; an error simply drops the context. Each mutation checks all of its
//! preconditions before changing the overlay, so a failed call never leaves
//! a half-applied transfer behind even inside the same transaction.

use crate::{
    rent::Rent,
    storage::AccountStore,
    types::{Account, Address},
    Error, Result,
};
use serde::Serialize;
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

/// Staged result of a successful execution
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Accounts to persist
    pub writes: Vec<(Address, Account)>,
    /// JSON-encoded events
    pub events: Vec<String>,
    /// Log lines
    pub logs: Vec<String>,
    /// Total lamports moved by transfers
    pub lamports_moved: u64,
}

/// Per-transaction view over the account store
pub struct InvokeContext<'a> {
    store: &'a dyn AccountStore,
    program_id: Address,
    signer: Address,
    slot: u64,
    unix_timestamp: i64,
    rent: Rent,
    accounts: BTreeMap<Address, Option<Account>>,
    pre_lamports: BTreeMap<Address, u64>,
    dirty: BTreeSet<Address>,
    events: Vec<String>,
    logs: Vec<String>,
    lamports_moved: u64,
}

impl std::fmt::Debug for InvokeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeContext")
            .field("program_id", &self.program_id)
            .field("signer", &self.signer)
            .field("slot", &self.slot)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<'a> InvokeContext<'a> {
    /// Create a context for one transaction
    pub fn new(
        store: &'a dyn AccountStore,
        program_id: Address,
        signer: Address,
        slot: u64,
        unix_timestamp: i64,
        rent: Rent,
    ) -> Self {
        Self {
            store,
            program_id,
            signer,
            slot,
            unix_timestamp,
            rent,
            accounts: BTreeMap::new(),
            pre_lamports: BTreeMap::new(),
            dirty: BTreeSet::new(),
            events: Vec::new(),
            logs: Vec::new(),
            lamports_moved: 0,
        }
    }

    /// Program being invoked
    pub fn program_id(&self) -> Address {
        self.program_id
    }

    /// Wallet that signed the transaction
    pub fn signer(&self) -> Address {
        self.signer
    }

    /// Journal slot this transaction will occupy
    pub fn slot(&self) -> u64 {
        self.slot
    }

    /// Unix timestamp stamped on the transaction
    pub fn unix_timestamp(&self) -> i64 {
        self.unix_timestamp
    }

    /// Reserve schedule
    pub fn rent(&self) -> Rent {
        self.rent
    }

    fn load(&mut self, address: &Address) -> Result<&mut Option<Account>> {
        match self.accounts.entry(*address) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let account = self.store.get_account(address)?;
                self.pre_lamports
                    .insert(*address, account.as_ref().map_or(0, |a| a.lamports));
                Ok(slot.insert(account))
            }
        }
    }

    /// Current (staged) account at `address`
    pub fn account(&mut self, address: &Address) -> Result<Option<Account>> {
        Ok(self.load(address)?.clone())
    }

    /// Current (staged) balance, zero for missing accounts
    pub fn lamports(&mut self, address: &Address) -> Result<u64> {
        Ok(self.load(address)?.as_ref().map_or(0, |a| a.lamports))
    }

    /// True if a record (not just a wallet balance) lives at `address`
    pub fn is_allocated(&mut self, address: &Address) -> Result<bool> {
        Ok(self.load(address)?.as_ref().is_some_and(|a| !a.is_vacant()))
    }

    /// Record bytes at `address`
    pub fn data(&mut self, address: &Address) -> Result<Vec<u8>> {
        self.load(address)?
            .as_ref()
            .map(|a| a.data.clone())
            .ok_or(Error::AccountNotFound(*address))
    }

    /// Allocate a zeroed record of `space` bytes at `address`, owned by the
    /// invoked program, with `payer` funding its minimum reserve
    pub fn create_account(&mut self, payer: &Address, address: &Address, space: usize) -> Result<()> {
        if *payer != self.signer {
            return Err(Error::MissingSignature(*payer));
        }
        if self.is_allocated(address)? {
            return Err(Error::AccountAlreadyExists(*address));
        }

        let reserve = self.rent.minimum_balance(space);
        let held = self.lamports(address)?;
        let shortfall = reserve.saturating_sub(held);
        if shortfall > 0 {
            self.transfer(payer, address, shortfall)?;
        }

        let program_id = self.program_id;
        let slot = self.load(address)?;
        let account = slot.get_or_insert_with(|| Account::wallet(0));
        account.owner = program_id;
        account.data = vec![0u8; space];
        self.dirty.insert(*address);

        tracing::debug!(%address, space, reserve, "Record allocated");
        Ok(())
    }

    /// Replace the record bytes at `address`
    ///
    /// The record must be owned by the invoked program and its balance must
    /// cover the reserve for the new length.
    pub fn write_data(&mut self, address: &Address, data: Vec<u8>) -> Result<()> {
        let program_id = self.program_id;
        let rent = self.rent;

        let account = self
            .load(address)?
            .as_mut()
            .ok_or(Error::AccountNotFound(*address))?;
        if account.owner != program_id {
            return Err(Error::IllegalOwner(*address));
        }
        let minimum = rent.minimum_balance(data.len());
        if account.lamports < minimum {
            return Err(Error::ReserveViolation {
                address: *address,
                balance: account.lamports,
                minimum,
            });
        }

        account.data = data;
        self.dirty.insert(*address);
        Ok(())
    }

    /// Move lamports between accounts
    ///
    /// Wallets may only be debited when they signed the transaction. Records
    /// may only be debited by their owning program and never below their
    /// reserve.
    pub fn transfer(&mut self, from: &Address, to: &Address, lamports: u64) -> Result<()> {
        if lamports == 0 || from == to {
            return Ok(());
        }

        let (owner, balance, data_len) = {
            let source = self
                .load(from)?
                .as_ref()
                .ok_or(Error::AccountNotFound(*from))?;
            (source.owner, source.lamports, source.data.len())
        };

        if owner == Address::SYSTEM {
            if *from != self.signer {
                return Err(Error::MissingSignature(*from));
            }
        } else if owner != self.program_id {
            return Err(Error::IllegalOwner(*from));
        }

        let remaining = balance
            .checked_sub(lamports)
            .ok_or(Error::InsufficientFunds {
                address: *from,
                needed: lamports,
                available: balance,
            })?;

        if owner != Address::SYSTEM {
            let minimum = self.rent.minimum_balance(data_len);
            if remaining < minimum {
                return Err(Error::ReserveViolation {
                    address: *from,
                    balance: remaining,
                    minimum,
                });
            }
        }

        let credited = self
            .lamports(to)?
            .checked_add(lamports)
            .ok_or_else(|| Error::Overflow(format!("credit to {}", to)))?;
        let moved = self
            .lamports_moved
            .checked_add(lamports)
            .ok_or_else(|| Error::Overflow("lamports moved".to_string()))?;

        // All checks passed, apply both sides
        if let Some(source) = self.load(from)?.as_mut() {
            source.lamports = remaining;
        }
        self.load(to)?
            .get_or_insert_with(|| Account::wallet(0))
            .lamports = credited;
        self.dirty.insert(*from);
        self.dirty.insert(*to);
        self.lamports_moved = moved;

        Ok(())
    }

    /// Record a typed event
    pub fn emit<E: Serialize>(&mut self, event: &E) -> Result<()> {
        self.events.push(serde_json::to_string(event)?);
        Ok(())
    }

    /// Append a log line
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Close the context, checking lamport conservation
    pub fn finish(mut self) -> Result<ExecutionOutcome> {
        let mut before: u128 = 0;
        let mut after: u128 = 0;
        for (address, pre) in &self.pre_lamports {
            before += u128::from(*pre);
            after += self
                .accounts
                .get(address)
                .and_then(|a| a.as_ref())
                .map_or(0, |a| u128::from(a.lamports));
        }
        if before != after {
            return Err(Error::InvariantViolation(format!(
                "lamports not conserved: {} before, {} after",
                before, after
            )));
        }

        let writes = std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|address| {
                self.accounts
                    .remove(&address)
                    .flatten()
                    .map(|account| (address, account))
            })
            .collect();

        Ok(ExecutionOutcome {
            writes,
            events: self.events,
            logs: self.logs,
            lamports_moved: self.lamports_moved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Commit, MemoryStore};
    use crate::types::{EntryKind, JournalEntry};
    use uuid::Uuid;

    const PROGRAM: Address = Address::new([0xAA; 32]);
    const ALICE: Address = Address::new([0x01; 32]);
    const BOB: Address = Address::new([0x02; 32]);
    const RECORD: Address = Address::new([0x03; 32]);

    fn store_with(accounts: Vec<(Address, Account)>) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .commit(Commit {
                accounts,
                entry: JournalEntry {
                    entry_id: Uuid::now_v7(),
                    slot: 0,
                    timestamp: 0,
                    kind: EntryKind::GenesisCredit {
                        address: ALICE,
                        lamports: 0,
                    },
                    touched: vec![],
                    events: vec![],
                    previous_hash: [0u8; 32],
                    hash: [0u8; 32],
                },
                signature: None,
            })
            .unwrap();
        store
    }

    fn rent() -> Rent {
        Rent {
            lamports_per_byte: 10,
            account_overhead_bytes: 0,
        }
    }

    #[test]
    fn test_transfer_between_wallets() {
        let store = store_with(vec![(ALICE, Account::wallet(1_000))]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());

        ctx.transfer(&ALICE, &BOB, 400).unwrap();
        assert_eq!(ctx.lamports(&ALICE).unwrap(), 600);
        assert_eq!(ctx.lamports(&BOB).unwrap(), 400);

        let outcome = ctx.finish().unwrap();
        assert_eq!(outcome.writes.len(), 2);
        assert_eq!(outcome.lamports_moved, 400);

        // Store untouched until the ledger commits
        assert_eq!(store.get_account(&BOB).unwrap(), None);
    }

    #[test]
    fn test_unsigned_wallet_cannot_be_debited() {
        let store = store_with(vec![(ALICE, Account::wallet(1_000))]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, BOB, 1, 0, rent());

        let err = ctx.transfer(&ALICE, &BOB, 1).unwrap_err();
        assert!(matches!(err, Error::MissingSignature(a) if a == ALICE));
    }

    #[test]
    fn test_insufficient_funds_leaves_balances() {
        let store = store_with(vec![(ALICE, Account::wallet(10))]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());

        let err = ctx.transfer(&ALICE, &BOB, 11).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { needed: 11, available: 10, .. }));
        assert_eq!(ctx.lamports(&ALICE).unwrap(), 10);
        assert_eq!(ctx.lamports(&BOB).unwrap(), 0);
    }

    #[test]
    fn test_create_account_charges_reserve() {
        let store = store_with(vec![(ALICE, Account::wallet(1_000))]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());

        ctx.create_account(&ALICE, &RECORD, 8).unwrap();
        let record = ctx.account(&RECORD).unwrap().unwrap();
        assert_eq!(record.owner, PROGRAM);
        assert_eq!(record.lamports, 80);
        assert_eq!(record.data, vec![0u8; 8]);
        assert_eq!(ctx.lamports(&ALICE).unwrap(), 920);

        let err = ctx.create_account(&ALICE, &RECORD, 8).unwrap_err();
        assert!(matches!(err, Error::AccountAlreadyExists(a) if a == RECORD));
    }

    #[test]
    fn test_record_reserve_is_protected() {
        let record = Account {
            lamports: 150,
            owner: PROGRAM,
            data: vec![0u8; 10],
        };
        let store = store_with(vec![(RECORD, record)]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());

        // Reserve is 100, so 50 is free
        ctx.transfer(&RECORD, &BOB, 50).unwrap();
        let err = ctx.transfer(&RECORD, &BOB, 1).unwrap_err();
        assert!(matches!(err, Error::ReserveViolation { balance: 99, minimum: 100, .. }));
    }

    #[test]
    fn test_foreign_record_is_read_only() {
        let record = Account {
            lamports: 500,
            owner: Address::new([0xBB; 32]),
            data: vec![1, 2, 3],
        };
        let store = store_with(vec![(RECORD, record)]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());

        assert_eq!(ctx.data(&RECORD).unwrap(), vec![1, 2, 3]);
        assert!(matches!(ctx.transfer(&RECORD, &BOB, 1), Err(Error::IllegalOwner(_))));
        assert!(matches!(ctx.write_data(&RECORD, vec![9]), Err(Error::IllegalOwner(_))));
    }

    #[test]
    fn test_write_data_respects_reserve() {
        let store = store_with(vec![(ALICE, Account::wallet(1_000))]);
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());
        ctx.create_account(&ALICE, &RECORD, 4).unwrap();

        ctx.write_data(&RECORD, vec![1, 2, 3, 4]).unwrap();
        let err = ctx.write_data(&RECORD, vec![0u8; 5]).unwrap_err();
        assert!(matches!(err, Error::ReserveViolation { .. }));
    }

    #[test]
    fn test_emit_encodes_json() {
        #[derive(Serialize)]
        struct Ping {
            value: u8,
        }

        let store = MemoryStore::new();
        let mut ctx = InvokeContext::new(&store, PROGRAM, ALICE, 1, 0, rent());
        ctx.emit(&Ping { value: 7 }).unwrap();
        ctx.log("hello");

        let outcome = ctx.finish().unwrap();
        assert_eq!(outcome.events, vec![r#"{"value":7}"#.to_string()]);
        assert_eq!(outcome.logs, vec!["hello".to_string()]);
        assert!(outcome.writes.is_empty());
    }
}
