//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the [`Ledger`] and applies transactions in arrival order
//! - Async message passing with a bounded mailbox for backpressure
//! - Reads go straight to the store, which only ever exposes committed state
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Clients (marketplace facade, tools)          │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │   writes → mailbox          reads → AccountStore      │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │       Ledger::process_transaction → commit            │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    ledger::{verify_journal, Ledger},
    storage::{AccountStore, StorageStats},
    types::{Account, Address, JournalEntry, Transaction, TransactionReceipt},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Execute a signed transaction
    ProcessTransaction {
        transaction: Box<Transaction>,
        response: oneshot::Sender<Result<TransactionReceipt>>,
    },

    /// Mint lamports into a wallet
    CreditGenesis {
        address: Address,
        lamports: u64,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the ledger
#[derive(Debug)]
pub struct LedgerActor {
    /// Transaction executor
    ledger: Ledger,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Ledger, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::ProcessTransaction {
                    transaction,
                    response,
                } => {
                    let result = self.ledger.process_transaction(&transaction);
                    let _ = response.send(result);
                }

                LedgerMessage::CreditGenesis {
                    address,
                    lamports,
                    response,
                } => {
                    let result = self.ledger.credit_genesis(address, lamports);
                    if let Err(e) = &result {
                        tracing::error!(%address, error = %e, "Genesis credit failed");
                    }
                    let _ = response.send(result);
                }

                LedgerMessage::Shutdown => break,
            }
        }

        tracing::info!("Ledger actor stopped");
    }
}

/// Handle for talking to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    store: Arc<dyn AccountStore>,
    program_id: Address,
}

impl std::fmt::Debug for LedgerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHandle")
            .field("program_id", &self.program_id)
            .finish()
    }
}

impl LedgerHandle {
    /// Program hosted by the ledger behind this handle
    pub fn program_id(&self) -> Address {
        self.program_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Submit a signed transaction and wait for its outcome
    pub async fn process_transaction(&self, transaction: Transaction) -> Result<TransactionReceipt> {
        self.request(|response| LedgerMessage::ProcessTransaction {
            transaction: Box::new(transaction),
            response,
        })
        .await
    }

    /// Mint lamports into a wallet (test and demo setup only)
    pub async fn credit_genesis(&self, address: Address, lamports: u64) -> Result<u64> {
        self.request(|response| LedgerMessage::CreditGenesis {
            address,
            lamports,
            response,
        })
        .await
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

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
///
/// Must be called from within a Tokio runtime.
pub fn spawn_ledger_actor(ledger: Ledger, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let store = ledger.store();
    let program_id = ledger.program_id();
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle {
        sender: tx,
        store,
        program_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::ledger::tests::{signed, TestInstruction, TestProgram};
    use crate::rent::Rent;
    use crate::storage::MemoryStore;

    fn spawn_test_actor() -> LedgerHandle {
        let ledger = Ledger::with_store(Arc::new(MemoryStore::new()), TestProgram, Rent::default());
        spawn_ledger_actor(ledger, 16)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let handle = spawn_test_actor();
        handle.shutdown().await.unwrap();

        // Mailbox is closed once the actor has stopped
        tokio::task::yield_now().await;
        let err = handle.credit_genesis(Address::new([1u8; 32]), 1).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_actor_processes_transaction() {
        let handle = spawn_test_actor();
        let alice = KeyPair::from_seed(&[1u8; 32]);
        let bob = KeyPair::from_seed(&[2u8; 32]).address();

        handle.credit_genesis(alice.address(), 500).await.unwrap();
        let receipt = handle
            .process_transaction(signed(&alice, 1, &TestInstruction::Transfer { to: bob, lamports: 200 }))
            .await
            .unwrap();

        assert_eq!(receipt.slot, 1);
        assert_eq!(handle.get_account(&bob).unwrap().unwrap().lamports, 200);
        assert_eq!(handle.latest_entry().unwrap().unwrap().hash, receipt.entry_hash);
        assert_eq!(handle.verify_journal().unwrap(), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_serialized() {
        let handle = spawn_test_actor();
        let alice = KeyPair::from_seed(&[1u8; 32]);
        let bob = KeyPair::from_seed(&[2u8; 32]).address();
        handle.credit_genesis(alice.address(), 1_000).await.unwrap();

        let mut tasks = Vec::new();
        for nonce in 0..20u64 {
            let handle = handle.clone();
            let tx = signed(&alice, nonce, &TestInstruction::Transfer { to: bob, lamports: 10 });
            tasks.push(tokio::spawn(async move { handle.process_transaction(tx).await }));
        }

        let mut slots = Vec::new();
        for task in tasks {
            slots.push(task.await.unwrap().unwrap().slot);
        }
        slots.sort_unstable();

        assert_eq!(slots, (1..=20).collect::<Vec<_>>());
        assert_eq!(handle.get_account(&bob).unwrap().unwrap().lamports, 200);
        assert_eq!(handle.stats().unwrap().total_signatures, 20);

        handle.shutdown().await.unwrap();
    }
}
