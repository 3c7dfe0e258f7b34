//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer lamports, checked at every step)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lamports in one whole unit of the ledger's native currency
pub const LAMPORTS_PER_UNIT: u64 = 1_000_000_000;

/// 32-byte account address
///
/// Wallet addresses are ed25519 public keys. Program record addresses are
/// derived (see [`crate::address`]) and are never valid curve points.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// Owner of plain wallet accounts
    pub const SYSTEM: Address = Address([0u8; 32]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Copy out bytes
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// True when the bytes decode to an ed25519 point, i.e. the address
    /// could belong to a signing key
    pub fn is_on_curve(&self) -> bool {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| crate::Error::InvalidAddress(format!("{}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| crate::Error::InvalidAddress(format!("{}: expected 32 bytes", s)))?;
        Ok(Self(bytes))
    }
}

// Base58 text for human-readable formats (event JSON, config), raw bytes
// for bincode.
impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

/// Account record held by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Balance in lamports
    pub lamports: u64,

    /// Program allowed to mutate `data` and debit `lamports`
    pub owner: Address,

    /// Opaque record bytes
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Account {
    /// Wallet account holding only lamports
    pub fn wallet(lamports: u64) -> Self {
        Self {
            lamports,
            owner: Address::SYSTEM,
            data: Vec::new(),
        }
    }

    /// True for accounts that hold nothing and can be (re)allocated
    pub fn is_vacant(&self) -> bool {
        self.owner == Address::SYSTEM && self.data.is_empty()
    }
}

/// Digital signature (Ed25519)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Verify signature against a wallet address
    pub fn verify(&self, message: &[u8], signer: &Address) -> bool {
        use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

        let signature = DalekSignature::from_bytes(&self.bytes);

        let verifying_key = match VerifyingKey::from_bytes(signer.as_bytes()) {
            Ok(key) => key,
            Err(_) => return false,
        };

        verifying_key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.bytes).into_string())
    }
}

/// Unsigned transaction payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Wallet that signs and pays
    pub signer: Address,

    /// Program the payload is addressed to
    pub program_id: Address,

    /// Caller-chosen value that keeps otherwise identical messages distinct
    pub nonce: u64,

    /// Program-specific instruction bytes
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Message {
    /// Create canonical bytes for signing
    pub fn canonical_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

/// Signed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Signed payload
    pub message: Message,

    /// Signature of `message.signer` over the canonical message bytes
    pub signature: Signature,
}

impl Transaction {
    /// Sign a message with the signer's key pair
    pub fn new_signed(
        keypair: &crate::crypto::KeyPair,
        program_id: Address,
        nonce: u64,
        data: Vec<u8>,
    ) -> crate::Result<Self> {
        let message = Message {
            signer: keypair.address(),
            program_id,
            nonce,
            data,
        };
        let signature = keypair.sign(&message.canonical_bytes()?);
        Ok(Self { message, signature })
    }

    /// Verify the signature against the message signer
    pub fn verify(&self) -> crate::Result<()> {
        let bytes = self.message.canonical_bytes()?;
        if self.signature.verify(&bytes, &self.message.signer) {
            Ok(())
        } else {
            Err(crate::Error::SignatureError(format!(
                "signature does not match signer {}",
                self.message.signer
            )))
        }
    }
}

/// What a journal entry records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A committed program transaction
    Transaction {
        /// Transaction signature
        signature: Signature,
        /// Signing wallet
        signer: Address,
    },
    /// Lamports minted into a wallet at genesis (test and demo setup only)
    GenesisCredit {
        /// Credited wallet
        address: Address,
        /// Amount minted
        lamports: u64,
    },
}

/// Append-only journal entry, hash-chained to its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub entry_id: Uuid,

    /// Sequential position in the journal, starting at 0
    pub slot: u64,

    /// Unix timestamp (seconds) at execution
    pub timestamp: i64,

    /// Entry payload
    pub kind: EntryKind,

    /// Accounts written by this entry
    pub touched: Vec<Address>,

    /// JSON-encoded program events
    pub events: Vec<String>,

    /// Hash of the previous entry (zeroes for slot 0)
    pub previous_hash: [u8; 32],

    /// Hash of this entry's contents
    pub hash: [u8; 32],
}

impl JournalEntry {
    /// Compute entry hash (excludes `hash` itself)
    pub fn compute_hash(&self) -> crate::Result<[u8; 32]> {
        let body = bincode::serialize(&(
            &self.entry_id,
            self.slot,
            self.timestamp,
            &self.kind,
            &self.touched,
            &self.events,
        ))?;
        Ok(crate::crypto::chain_hash(&self.previous_hash, &body))
    }
}

/// Result of a committed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction signature
    pub signature: Signature,

    /// Journal slot the transaction landed in
    pub slot: u64,

    /// Hash of the journal entry
    pub entry_hash: [u8; 32],

    /// JSON-encoded program events
    pub events: Vec<String>,

    /// Program log lines
    pub logs: Vec<String>,
}
