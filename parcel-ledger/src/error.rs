//! Error types for the ledger

use crate::types::Address;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB or in-memory backend)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Binary serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Event encoding error
    #[error("Event encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed transaction (unknown program, empty payload, ...)
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Address string could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// No account exists at the address
    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    /// An account already exists at the address
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(Address),

    /// Account cannot cover a debit
    #[error("Insufficient funds in {address}: needed {needed}, available {available}")]
    InsufficientFunds {
        /// Debited account
        address: Address,
        /// Lamports requested
        needed: u64,
        /// Lamports held
        available: u64,
    },

    /// Debit would leave a program-owned account below its minimum reserve
    #[error("Reserve violation in {address}: balance {balance} below minimum {minimum}")]
    ReserveViolation {
        /// Debited account
        address: Address,
        /// Balance after the debit
        balance: u64,
        /// Minimum reserve for the account's data length
        minimum: u64,
    },

    /// Account is owned by a different program
    #[error("Illegal owner for {0}")]
    IllegalOwner(Address),

    /// Debit from a wallet that did not sign the transaction
    #[error("Missing signature for {0}")]
    MissingSignature(Address),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Transaction signature has already been processed
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Lamport arithmetic overflowed
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Invariant violation (lamport conservation, journal chain, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// No off-curve address exists for the seeds
    #[error("Address derivation failed: {0}")]
    AddressDerivation(String),

    /// Program rejected the instruction with a custom code
    #[error("Program error {code}: {message}")]
    Program {
        /// Program-defined error code
        code: u32,
        /// Human readable message
        message: String,
    },

    /// Journal entry not found
    #[error("Journal entry not found: {0}")]
    EntryNotFound(u64),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
