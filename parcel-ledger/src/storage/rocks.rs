//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Account records (key: address)
//! - `journal` - Journal entries (key: slot, big-endian so iteration is ordered)
//! - `signatures` - Processed signatures (key: signature bytes)

use super::{AccountStore, Commit, StorageStats};
use crate::{
    error::{Error, Result},
    types::{Account, Address, JournalEntry, Signature},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_JOURNAL: &str = "journal";
const CF_SIGNATURES: &str = "signatures";

/// Storage wrapper for RocksDB
///
/// Commits are validated then written as one `WriteBatch`. Validation reads
/// and the batch write are not isolated from other writers, so a store must
/// have a single writer (the ledger actor).
pub struct RocksStore {
    db: DB,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_JOURNAL, Self::cf_options_journal()),
            ColumnFamilyDescriptor::new(CF_SIGNATURES, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB account store");

        Ok(Self { db })
    }

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Records are read on every transaction, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_journal() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn count(&self, name: &str) -> Result<u64> {
        let cf = self.cf_handle(name)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

impl AccountStore for RocksStore {
    fn get_account(&self, address: &Address) -> Result<Option<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, address.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn accounts_owned_by(&self, owner: &Address) -> Result<Vec<(Address, Account)>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let mut owned = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let account: Account = bincode::deserialize(&value)?;
            if account.owner != *owner {
                continue;
            }
            let bytes: [u8; 32] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("malformed account key".to_string()))?;
            owned.push((Address::new(bytes), account));
        }

        Ok(owned)
    }

    fn contains_signature(&self, signature: &Signature) -> Result<bool> {
        let cf = self.cf_handle(CF_SIGNATURES)?;
        Ok(self.db.get_cf(cf, signature.as_bytes())?.is_some())
    }

    fn get_entry(&self, slot: u64) -> Result<JournalEntry> {
        let cf = self.cf_handle(CF_JOURNAL)?;
        let value = self
            .db
            .get_cf(cf, slot.to_be_bytes())?
            .ok_or(Error::EntryNotFound(slot))?;
        Ok(bincode::deserialize(&value)?)
    }

    fn latest_entry(&self) -> Result<Option<JournalEntry>> {
        let cf = self.cf_handle(CF_JOURNAL)?;

        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (_, value) = item?;
                Ok(Some(bincode::deserialize(&value)?))
            }
            None => Ok(None),
        }
    }

    fn commit(&self, commit: Commit) -> Result<()> {
        let next_slot = match self.latest_entry()? {
            Some(entry) => entry
                .slot
                .checked_add(1)
                .ok_or_else(|| Error::Overflow("journal slot".to_string()))?,
            None => 0,
        };
        if commit.entry.slot != next_slot {
            return Err(Error::InvariantViolation(format!(
                "journal slot {} does not follow {}",
                commit.entry.slot,
                next_slot.wrapping_sub(1)
            )));
        }
        if let Some(ref signature) = commit.signature {
            if self.contains_signature(signature)? {
                return Err(Error::DuplicateTransaction(signature.to_string()));
            }
        }

        let mut batch = WriteBatch::default();

        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        for (address, account) in &commit.accounts {
            batch.put_cf(cf_accounts, address.as_bytes(), bincode::serialize(account)?);
        }

        let cf_journal = self.cf_handle(CF_JOURNAL)?;
        batch.put_cf(
            cf_journal,
            commit.entry.slot.to_be_bytes(),
            bincode::serialize(&commit.entry)?,
        );

        if let Some(ref signature) = commit.signature {
            let cf_signatures = self.cf_handle(CF_SIGNATURES)?;
            batch.put_cf(cf_signatures, signature.as_bytes(), b"");
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            slot = commit.entry.slot,
            accounts = commit.accounts.len(),
            "Journal entry committed"
        );

        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_accounts: self.count(CF_ACCOUNTS)?,
            total_entries: self.count(CF_JOURNAL)?,
            total_signatures: self.count(CF_SIGNATURES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn entry(slot: u64) -> JournalEntry {
        JournalEntry {
            entry_id: Uuid::now_v7(),
            slot,
            timestamp: 1_700_000_000,
            kind: EntryKind::GenesisCredit {
                address: Address::new([1u8; 32]),
                lamports: 10,
            },
            touched: vec![Address::new([1u8; 32])],
            events: vec![],
            previous_hash: [0u8; 32],
            hash: [0u8; 32],
        }
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let store = RocksStore::open(&config).unwrap();
        assert!(store.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(store.db.cf_handle(CF_JOURNAL).is_some());
        assert_eq!(store.stats().unwrap(), StorageStats::default());
    }

    #[test]
    fn test_commit_survives_reopen() {
        let (config, _temp) = test_config();
        let address = Address::new([1u8; 32]);
        let signature = Signature::from_bytes([3u8; 64]);

        {
            let store = RocksStore::open(&config).unwrap();
            store
                .commit(Commit {
                    accounts: vec![(address, Account::wallet(10))],
                    entry: entry(0),
                    signature: Some(signature.clone()),
                })
                .unwrap();
        }

        let store = RocksStore::open(&config).unwrap();
        assert_eq!(store.get_account(&address).unwrap(), Some(Account::wallet(10)));
        assert_eq!(store.latest_entry().unwrap().unwrap().slot, 0);
        assert!(store.contains_signature(&signature).unwrap());
    }

    #[test]
    fn test_latest_entry_orders_by_slot() {
        let (config, _temp) = test_config();
        let store = RocksStore::open(&config).unwrap();

        for slot in 0..300 {
            store
                .commit(Commit {
                    accounts: vec![],
                    entry: entry(slot),
                    signature: None,
                })
                .unwrap();
        }

        assert_eq!(store.latest_entry().unwrap().unwrap().slot, 299);
        assert_eq!(store.get_entry(256).unwrap().slot, 256);
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let (config, _temp) = test_config();
        let store = RocksStore::open(&config).unwrap();
        let signature = Signature::from_bytes([3u8; 64]);

        store
            .commit(Commit {
                accounts: vec![],
                entry: entry(0),
                signature: Some(signature.clone()),
            })
            .unwrap();

        let result = store.commit(Commit {
            accounts: vec![],
            entry: entry(1),
            signature: Some(signature),
        });
        assert!(matches!(result, Err(Error::DuplicateTransaction(_))));
    }

    #[test]
    fn test_commit_after_last_slot_overflows() {
        let (config, _temp) = test_config();
        let store = RocksStore::open(&config).unwrap();

        let cf_journal = store.cf_handle(CF_JOURNAL).unwrap();
        store
            .db
            .put_cf(
                cf_journal,
                u64::MAX.to_be_bytes(),
                bincode::serialize(&entry(u64::MAX)).unwrap(),
            )
            .unwrap();

        let result = store.commit(Commit {
            accounts: vec![],
            entry: entry(0),
            signature: None,
        });
        assert!(matches!(result, Err(Error::Overflow(_))));
        assert_eq!(store.stats().unwrap().total_entries, 1);
    }
}
