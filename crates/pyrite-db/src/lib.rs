//! # pyrite-db
//!
//! Journaled account state over a Merkle-Patricia trie.
//!
//! Layers, bottom up:
//! - [`MemoryDb`]: shared in-memory base key-value store
//! - [`BatchDb`]: buffers writes until `commit`
//! - [`HexaryTrie`] / [`SecureTrie`]: state root over a node store
//! - [`CacheDb`]: LRU read cache keyed by raw key
//! - [`JournalDb`]: nested checkpoints with discard/commit
//! - [`AccountDb`]: the account/storage/code API the VM runs against

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod account_db;
mod batch;
mod cache;
mod error;
mod journal;
mod memory;
mod traits;
mod trie;

pub use account::{Account, BLANK_ROOT_HASH, EMPTY_CODE_HASH};
pub use account_db::{AccountDb, AccountDbConfig, AccountState, BalanceDelta, ChangesetId};
pub use batch::BatchDb;
pub use cache::CacheDb;
pub use error::{DbError, DbResult};
pub use journal::{CheckpointId, Journal, JournalDb, Slot};
pub use memory::MemoryDb;
pub use traits::{KeyValueRead, KeyValueStore, KeyValueWrite};
pub use trie::{HexaryTrie, SecureTrie};
