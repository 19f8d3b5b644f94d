//! LRU read cache

use crate::error::DbResult;
use crate::traits::{KeyValueRead, KeyValueWrite};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;

/// Write-through store with an LRU cache of recently read values.
///
/// The cache must be reset whenever the wrapped view changes underneath it
/// (for a trie, whenever its root is replaced).
pub struct CacheDb<D> {
    wrapped: D,
    cache: RefCell<LruCache<Vec<u8>, Vec<u8>>>,
}

impl<D> CacheDb<D> {
    /// Wrap `db` with a cache holding up to `capacity` entries
    pub fn new(wrapped: D, capacity: NonZeroUsize) -> Self {
        Self {
            wrapped,
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Forget every cached value
    pub fn reset_cache(&mut self) {
        self.cache.get_mut().clear();
    }

    /// Number of cached entries
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// The wrapped store
    pub fn wrapped(&self) -> &D {
        &self.wrapped
    }

    /// The wrapped store, mutably. Callers that change what it returns must reset the cache.
    pub fn wrapped_mut(&mut self) -> &mut D {
        &mut self.wrapped
    }
}

impl<D: KeyValueRead> KeyValueRead for CacheDb<D> {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        if let Some(value) = self.cache.borrow_mut().get(key) {
            return Ok(Some(value.clone()));
        }
        let value = self.wrapped.get(key)?;
        if let Some(value) = &value {
            self.cache.borrow_mut().put(key.to_vec(), value.clone());
        }
        Ok(value)
    }
}

impl<D: KeyValueWrite> KeyValueWrite for CacheDb<D> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.wrapped.set(key, value.clone())?;
        self.cache.get_mut().put(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.wrapped.delete(key)?;
        self.cache.get_mut().pop(key);
        Ok(())
    }
}
