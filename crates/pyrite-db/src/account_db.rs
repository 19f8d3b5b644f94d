//! Account state: balances, nonces, code and storage over a journaled trie

use crate::account::{Account, BLANK_ROOT_HASH, EMPTY_CODE_HASH};
use crate::batch::BatchDb;
use crate::cache::CacheDb;
use crate::error::DbResult;
use crate::journal::{CheckpointId, JournalDb};
use crate::traits::{KeyValueRead, KeyValueStore, KeyValueWrite};
use crate::trie::SecureTrie;
use pyrite_crypto::keccak256;
use pyrite_primitives::{u256_to_be_bytes, Address, ValidationError, H256, U256};
use serde::Deserialize;
use std::num::NonZeroUsize;

/// AccountDb tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountDbConfig {
    /// Number of account records kept in the LRU read cache
    pub account_cache_size: usize,
}

impl Default for AccountDbConfig {
    fn default() -> Self {
        Self {
            account_cache_size: 2048,
        }
    }
}

/// Signed change to an account balance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceDelta {
    /// Increase by the amount
    Credit(U256),
    /// Decrease by the amount
    Debit(U256),
}

/// Snapshot handle: the checkpoint of the flat key-value journal and of the trie journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangesetId {
    db: CheckpointId,
    trie: CheckpointId,
}

/// State access used by the VM.
///
/// Snapshots must be resolved in LIFO order; resolving an ancestor resolves its descendants.
pub trait AccountState {
    /// Account balance
    fn get_balance(&self, address: &Address) -> DbResult<U256>;
    /// Overwrite account balance
    fn set_balance(&mut self, address: &Address, balance: U256) -> DbResult<()>;
    /// Apply a signed change to the balance; leaving the uint256 range is a validation error
    fn delta_balance(&mut self, address: &Address, delta: BalanceDelta) -> DbResult<()>;

    /// Account nonce
    fn get_nonce(&self, address: &Address) -> DbResult<u64>;
    /// Overwrite account nonce
    fn set_nonce(&mut self, address: &Address, nonce: u64) -> DbResult<()>;
    /// Bump the nonce by one
    fn increment_nonce(&mut self, address: &Address) -> DbResult<()>;

    /// Account code, empty when none
    fn get_code(&self, address: &Address) -> DbResult<Vec<u8>>;
    /// Store code and point the account at it
    fn set_code(&mut self, address: &Address, code: &[u8]) -> DbResult<()>;
    /// keccak256 of the account code
    fn get_code_hash(&self, address: &Address) -> DbResult<H256>;
    /// Reset the code hash to the empty-code hash
    fn delete_code(&mut self, address: &Address) -> DbResult<()>;

    /// Storage slot value, zero when unset
    fn get_storage(&self, address: &Address, slot: U256) -> DbResult<U256>;
    /// Write a storage slot; zero deletes it
    fn set_storage(&mut self, address: &Address, slot: U256, value: U256) -> DbResult<()>;
    /// Reset the storage root to the empty trie
    fn delete_storage(&mut self, address: &Address) -> DbResult<()>;

    /// Whether an account record exists
    fn account_exists(&self, address: &Address) -> DbResult<bool>;
    /// Write the account record even if it holds only defaults
    fn touch_account(&mut self, address: &Address) -> DbResult<()>;
    /// No code, zero nonce and zero balance
    fn account_is_empty(&self, address: &Address) -> DbResult<bool>;
    /// Nonzero nonce or non-empty code
    fn account_has_code_or_nonce(&self, address: &Address) -> DbResult<bool>;
    /// Remove the account record
    fn delete_account(&mut self, address: &Address) -> DbResult<()>;

    /// Open a snapshot
    fn record(&mut self) -> ChangesetId;
    /// Revert everything written since `changeset` was opened
    fn discard(&mut self, changeset: ChangesetId) -> DbResult<()>;
    /// Keep everything written since `changeset` was opened
    fn commit(&mut self, changeset: ChangesetId) -> DbResult<()>;

    /// Flush journaled writes into the trie layers and return the state root
    fn make_state_root(&mut self) -> DbResult<H256>;
}

type AccountTrie<D> = JournalDb<CacheDb<SecureTrie<BatchDb<D>>>>;

/// Journaled account database.
///
/// Layering over the base store `D`:
/// - accounts: `JournalDb` over an LRU `CacheDb` over a `SecureTrie` whose nodes go to a `BatchDb`
/// - code and storage-trie nodes: `JournalDb` over a second `BatchDb`
///
/// Both journals are snapshotted, discarded and committed together.
pub struct AccountDb<D> {
    journal_trie: AccountTrie<D>,
    journal_db: JournalDb<BatchDb<D>>,
}

impl<D: KeyValueStore + Clone> AccountDb<D> {
    /// Open the state at `state_root` with default settings
    pub fn new(db: D, state_root: H256) -> Self {
        Self::with_config(db, state_root, &AccountDbConfig::default())
    }

    /// Open the state at `state_root`
    pub fn with_config(db: D, state_root: H256, config: &AccountDbConfig) -> Self {
        let capacity = NonZeroUsize::new(config.account_cache_size).unwrap_or(NonZeroUsize::MIN);
        let trie = SecureTrie::new(BatchDb::new(db.clone()), state_root);
        Self {
            journal_trie: JournalDb::new(CacheDb::new(trie, capacity)),
            journal_db: JournalDb::new(BatchDb::new(db)),
        }
    }
}

impl<D: KeyValueStore> AccountDb<D> {
    /// Root of the account trie as of the last flush
    pub fn state_root(&self) -> H256 {
        self.journal_trie.wrapped().wrapped().root_hash()
    }

    /// Point the account trie at another root; the account cache is reset
    pub fn set_state_root(&mut self, root: H256) {
        tracing::debug!(%root, "state root replaced");
        let cache = self.journal_trie.wrapped_mut();
        cache.reset_cache();
        cache.wrapped_mut().set_root_hash(root);
    }

    /// Whether `root` can be opened from the buffered or durable node store
    pub fn has_root(&self, root: &H256) -> DbResult<bool> {
        if *root == BLANK_ROOT_HASH {
            return Ok(true);
        }
        self.journal_trie
            .wrapped()
            .wrapped()
            .trie()
            .db()
            .exists(root.as_bytes())
    }

    /// Compute the state root and write trie nodes, code and storage into the base store
    pub fn persist(&mut self) -> DbResult<H256> {
        let root = self.make_state_root()?;
        self.journal_trie
            .wrapped_mut()
            .wrapped_mut()
            .trie_mut()
            .db_mut()
            .commit(false)?;
        self.journal_db.wrapped_mut().commit(true)?;
        tracing::debug!(%root, "state persisted");
        Ok(root)
    }

    fn get_account(&self, address: &Address) -> DbResult<Account> {
        match self.journal_trie.get(address.as_bytes())? {
            Some(raw) if !raw.is_empty() => Ok(Account::from_rlp(&raw)?),
            _ => Ok(Account::default()),
        }
    }

    fn set_account(&mut self, address: &Address, account: &Account) -> DbResult<()> {
        tracing::trace!(
            %address,
            nonce = account.nonce,
            balance = %account.balance,
            "account written"
        );
        self.journal_trie.set(address.as_bytes(), account.to_rlp())
    }

    fn update_account<F>(&mut self, address: &Address, update: F) -> DbResult<()>
    where
        F: FnOnce(&mut Account) -> Result<(), ValidationError>,
    {
        let mut account = self.get_account(address)?;
        update(&mut account)?;
        self.set_account(address, &account)
    }
}

fn storage_key(slot: U256) -> [u8; 32] {
    u256_to_be_bytes(&slot)
}

impl<D: KeyValueStore> AccountState for AccountDb<D> {
    fn get_balance(&self, address: &Address) -> DbResult<U256> {
        Ok(self.get_account(address)?.balance)
    }

    fn set_balance(&mut self, address: &Address, balance: U256) -> DbResult<()> {
        self.update_account(address, |account| {
            account.balance = balance;
            Ok(())
        })
    }

    fn delta_balance(&mut self, address: &Address, delta: BalanceDelta) -> DbResult<()> {
        self.update_account(address, |account| {
            let updated = match delta {
                BalanceDelta::Credit(amount) => account.balance.checked_add(amount),
                BalanceDelta::Debit(amount) => account.balance.checked_sub(amount),
            };
            account.balance = updated.ok_or_else(|| ValidationError::OutOfRange {
                what: "balance",
                value: format!("{} {:?}", account.balance, delta),
            })?;
            Ok(())
        })
    }

    fn get_nonce(&self, address: &Address) -> DbResult<u64> {
        Ok(self.get_account(address)?.nonce)
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) -> DbResult<()> {
        self.update_account(address, |account| {
            account.nonce = nonce;
            Ok(())
        })
    }

    fn increment_nonce(&mut self, address: &Address) -> DbResult<()> {
        self.update_account(address, |account| {
            account.nonce = account.nonce.checked_add(1).ok_or(ValidationError::OutOfRange {
                what: "nonce",
                value: account.nonce.to_string(),
            })?;
            Ok(())
        })
    }

    fn get_code(&self, address: &Address) -> DbResult<Vec<u8>> {
        let code_hash = self.get_code_hash(address)?;
        if code_hash == EMPTY_CODE_HASH {
            return Ok(Vec::new());
        }
        Ok(self.journal_db.get(code_hash.as_bytes())?.unwrap_or_default())
    }

    fn set_code(&mut self, address: &Address, code: &[u8]) -> DbResult<()> {
        let code_hash = keccak256(code);
        self.journal_db.set(code_hash.as_bytes(), code.to_vec())?;
        self.update_account(address, |account| {
            account.code_hash = code_hash;
            Ok(())
        })
    }

    fn get_code_hash(&self, address: &Address) -> DbResult<H256> {
        Ok(self.get_account(address)?.code_hash)
    }

    fn delete_code(&mut self, address: &Address) -> DbResult<()> {
        self.update_account(address, |account| {
            account.code_hash = EMPTY_CODE_HASH;
            Ok(())
        })
    }

    fn get_storage(&self, address: &Address, slot: U256) -> DbResult<U256> {
        let account = self.get_account(address)?;
        let storage = SecureTrie::new(&self.journal_db, account.storage_root);
        match storage.get(&storage_key(slot))? {
            Some(raw) => Ok(rlp::decode(&raw)?),
            None => Ok(U256::zero()),
        }
    }

    fn set_storage(&mut self, address: &Address, slot: U256, value: U256) -> DbResult<()> {
        let mut account = self.get_account(address)?;
        let mut storage = SecureTrie::new(&mut self.journal_db, account.storage_root);
        if value.is_zero() {
            storage.delete(&storage_key(slot))?;
        } else {
            storage.set(&storage_key(slot), rlp::encode(&value).to_vec())?;
        }
        account.storage_root = storage.root_hash();
        tracing::trace!(%address, %slot, %value, "storage written");
        self.set_account(address, &account)
    }

    fn delete_storage(&mut self, address: &Address) -> DbResult<()> {
        self.update_account(address, |account| {
            account.storage_root = BLANK_ROOT_HASH;
            Ok(())
        })
    }

    fn account_exists(&self, address: &Address) -> DbResult<bool> {
        Ok(self
            .journal_trie
            .get(address.as_bytes())?
            .is_some_and(|raw| !raw.is_empty()))
    }

    fn touch_account(&mut self, address: &Address) -> DbResult<()> {
        let account = self.get_account(address)?;
        self.set_account(address, &account)
    }

    fn account_is_empty(&self, address: &Address) -> DbResult<bool> {
        Ok(!self.account_has_code_or_nonce(address)? && self.get_balance(address)?.is_zero())
    }

    fn account_has_code_or_nonce(&self, address: &Address) -> DbResult<bool> {
        let account = self.get_account(address)?;
        Ok(account.nonce != 0 || account.code_hash != EMPTY_CODE_HASH)
    }

    fn delete_account(&mut self, address: &Address) -> DbResult<()> {
        tracing::trace!(%address, "account deleted");
        self.journal_trie.delete(address.as_bytes())
    }

    fn record(&mut self) -> ChangesetId {
        let changeset = ChangesetId {
            db: self.journal_db.record(),
            trie: self.journal_trie.record(),
        };
        tracing::debug!(db = %changeset.db, trie = %changeset.trie, "state snapshot");
        changeset
    }

    fn discard(&mut self, changeset: ChangesetId) -> DbResult<()> {
        if !self.journal_db.has_changeset(changeset.db)
            || !self.journal_trie.has_changeset(changeset.trie)
        {
            return Err(ValidationError::invalid(format!("unknown changeset {changeset:?}")).into());
        }
        self.journal_db.discard(changeset.db)?;
        self.journal_trie.discard(changeset.trie)?;
        tracing::debug!(db = %changeset.db, trie = %changeset.trie, "state reverted");
        Ok(())
    }

    fn commit(&mut self, changeset: ChangesetId) -> DbResult<()> {
        if !self.journal_db.has_changeset(changeset.db)
            || !self.journal_trie.has_changeset(changeset.trie)
        {
            return Err(ValidationError::invalid(format!("unknown changeset {changeset:?}")).into());
        }
        self.journal_db.commit(changeset.db)?;
        self.journal_trie.commit(changeset.trie)?;
        tracing::debug!(db = %changeset.db, trie = %changeset.trie, "state committed");
        Ok(())
    }

    fn make_state_root(&mut self) -> DbResult<H256> {
        self.journal_db.flush()?;
        self.journal_trie.flush()?;
        Ok(self.state_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDb;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn fresh() -> AccountDb<MemoryDb> {
        AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH)
    }

    #[test]
    fn test_unwritten_account_reads_default() {
        let db = fresh();
        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::zero());
        assert_eq!(db.get_nonce(&addr(1)).unwrap(), 0);
        assert_eq!(db.get_code(&addr(1)).unwrap(), Vec::<u8>::new());
        assert_eq!(db.get_code_hash(&addr(1)).unwrap(), EMPTY_CODE_HASH);
        assert!(!db.account_exists(&addr(1)).unwrap());
        assert!(db.account_is_empty(&addr(1)).unwrap());
    }

    #[test]
    fn test_balance_and_nonce() {
        let mut db = fresh();
        db.set_balance(&addr(1), U256::from(10u64)).unwrap();
        db.delta_balance(&addr(1), BalanceDelta::Credit(U256::from(5u64))).unwrap();
        db.delta_balance(&addr(1), BalanceDelta::Debit(U256::from(3u64))).unwrap();
        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::from(12u64));

        db.increment_nonce(&addr(1)).unwrap();
        db.increment_nonce(&addr(1)).unwrap();
        assert_eq!(db.get_nonce(&addr(1)).unwrap(), 2);
        assert!(db.account_exists(&addr(1)).unwrap());
        assert!(!db.account_is_empty(&addr(1)).unwrap());
    }

    #[test]
    fn test_debit_below_zero_rejected() {
        let mut db = fresh();
        db.set_balance(&addr(1), U256::from(1u64)).unwrap();
        let err = db
            .delta_balance(&addr(1), BalanceDelta::Debit(U256::from(2u64)))
            .unwrap_err();
        assert!(matches!(err, crate::DbError::Validation(_)));
        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::one());
    }

    #[test]
    fn test_code_roundtrip_and_delete() {
        let mut db = fresh();
        db.set_code(&addr(2), &[0x60, 0x00]).unwrap();
        assert_eq!(db.get_code(&addr(2)).unwrap(), vec![0x60, 0x00]);
        assert_eq!(db.get_code_hash(&addr(2)).unwrap(), keccak256(&[0x60, 0x00]));
        assert!(db.account_has_code_or_nonce(&addr(2)).unwrap());

        db.delete_code(&addr(2)).unwrap();
        assert_eq!(db.get_code(&addr(2)).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_storage_zero_deletes_slot() {
        let mut db = fresh();
        db.set_storage(&addr(3), U256::one(), U256::from(42u64)).unwrap();
        assert_eq!(db.get_storage(&addr(3), U256::one()).unwrap(), U256::from(42u64));
        assert_ne!(db.get_account(&addr(3)).unwrap().storage_root, BLANK_ROOT_HASH);

        db.set_storage(&addr(3), U256::one(), U256::zero()).unwrap();
        assert_eq!(db.get_storage(&addr(3), U256::one()).unwrap(), U256::zero());
        assert_eq!(db.get_account(&addr(3)).unwrap().storage_root, BLANK_ROOT_HASH);
    }

    #[test]
    fn test_delete_storage_resets_root() {
        let mut db = fresh();
        db.set_storage(&addr(3), U256::from(7u64), U256::from(1u64)).unwrap();
        db.delete_storage(&addr(3)).unwrap();
        assert_eq!(db.get_storage(&addr(3), U256::from(7u64)).unwrap(), U256::zero());
    }

    #[test]
    fn test_touch_and_delete_account() {
        let mut db = fresh();
        db.touch_account(&addr(4)).unwrap();
        assert!(db.account_exists(&addr(4)).unwrap());
        assert!(db.account_is_empty(&addr(4)).unwrap());

        db.delete_account(&addr(4)).unwrap();
        assert!(!db.account_exists(&addr(4)).unwrap());
    }

    #[test]
    fn test_snapshot_discard_restores_everything() {
        let mut db = fresh();
        db.set_balance(&addr(1), U256::from(100u64)).unwrap();

        let snapshot = db.record();
        db.set_balance(&addr(1), U256::from(200u64)).unwrap();
        db.set_code(&addr(1), &[0xfe]).unwrap();
        db.set_storage(&addr(1), U256::one(), U256::one()).unwrap();
        db.discard(snapshot).unwrap();

        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::from(100u64));
        assert_eq!(db.get_code(&addr(1)).unwrap(), Vec::<u8>::new());
        assert_eq!(db.get_storage(&addr(1), U256::one()).unwrap(), U256::zero());
    }

    #[test]
    fn test_nested_commit_then_outer_discard() {
        let mut db = fresh();
        let outer = db.record();
        db.set_balance(&addr(1), U256::from(1u64)).unwrap();
        let inner = db.record();
        db.set_balance(&addr(2), U256::from(2u64)).unwrap();
        db.commit(inner).unwrap();
        assert_eq!(db.get_balance(&addr(2)).unwrap(), U256::from(2u64));

        db.discard(outer).unwrap();
        assert!(!db.account_exists(&addr(1)).unwrap());
        assert!(!db.account_exists(&addr(2)).unwrap());
    }

    #[test]
    fn test_resolved_changeset_rejected() {
        let mut db = fresh();
        let snapshot = db.record();
        db.commit(snapshot).unwrap();
        assert!(db.commit(snapshot).is_err());
        assert!(db.discard(snapshot).is_err());
    }

    #[test]
    fn test_make_state_root_rejects_live_snapshot() {
        let mut db = fresh();
        let snapshot = db.record();
        db.set_balance(&addr(1), U256::one()).unwrap();
        assert!(db.make_state_root().is_err());
        db.commit(snapshot).unwrap();
        assert_ne!(db.make_state_root().unwrap(), BLANK_ROOT_HASH);
    }

    #[test]
    fn test_persist_and_reopen() {
        let base = MemoryDb::new();
        let mut db = AccountDb::new(base.clone(), BLANK_ROOT_HASH);
        db.set_balance(&addr(1), U256::from(5u64)).unwrap();
        db.set_code(&addr(1), &[0x00]).unwrap();
        db.set_storage(&addr(1), U256::from(9u64), U256::from(8u64)).unwrap();

        let root = db.make_state_root().unwrap();
        assert!(db.has_root(&root).unwrap());
        assert!(base.get(root.as_bytes()).unwrap().is_none());

        assert_eq!(db.persist().unwrap(), root);
        assert!(base.get(root.as_bytes()).unwrap().is_some());

        let reopened = AccountDb::new(base, root);
        assert_eq!(reopened.get_balance(&addr(1)).unwrap(), U256::from(5u64));
        assert_eq!(reopened.get_code(&addr(1)).unwrap(), vec![0x00]);
        assert_eq!(
            reopened.get_storage(&addr(1), U256::from(9u64)).unwrap(),
            U256::from(8u64)
        );
    }

    #[test]
    fn test_set_state_root_switches_view() {
        let mut db = fresh();
        db.set_balance(&addr(1), U256::from(1u64)).unwrap();
        let first = db.make_state_root().unwrap();
        db.set_balance(&addr(1), U256::from(2u64)).unwrap();
        db.make_state_root().unwrap();
        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::from(2u64));

        db.set_state_root(first);
        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::from(1u64));
        assert!(!db.has_root(&H256::from_bytes([1u8; 32])).unwrap());
    }

    #[test]
    fn test_config_from_json() {
        let config: AccountDbConfig = serde_json::from_str(r#"{"account_cache_size": 16}"#).unwrap();
        assert_eq!(config.account_cache_size, 16);
        let config: AccountDbConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AccountDbConfig::default());
    }
}
