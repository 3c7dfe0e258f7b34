//! ParcelChain Ledger
//!
//! Account ledger that hosts one on-chain program, with signed transactions
//! and a hash-chained journal.
//!
//! # Architecture
//!
//! - **Accounts**: Lamport balances plus opaque record bytes owned by a program
//! - **Derived Addresses**: Record addresses hashed from seeds, never on the curve
//! - **Single Writer**: One actor task applies transactions in order
//! - **Atomic Commit**: Account writes, journal entry and replay marker land together
//!
//! # Invariants
//!
//! - Lamport conservation: a transaction never creates or destroys lamports
//! - Replay protection: a signature commits at most once
//! - Append-only: journal entries are never modified or deleted
//! - Reserve: program records never drop below their minimum balance

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod address;
pub mod clock;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod program;
pub mod rent;
pub mod storage;
pub mod types;

// Re-exports
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use address::{create_derived_address, find_derived_address};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, StorageBackend};
pub use context::InvokeContext;
pub use crypto::KeyPair;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use program::Program;
pub use rent::Rent;
pub use storage::{open_store, AccountStore, MemoryStore};
pub use types::{
    Account, Address, JournalEntry, Message, Signature, Transaction, TransactionReceipt,
    LAMPORTS_PER_UNIT,
};
