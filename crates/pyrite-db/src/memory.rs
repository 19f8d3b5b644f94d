//! In-memory base store

use crate::error::DbResult;
use crate::traits::{KeyValueRead, KeyValueWrite};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared in-memory key-value store.
///
/// Clones are handles onto the same map, so several layers can sit on one base store.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryDb {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDb").field("keys", &self.len()).finish()
    }
}

impl KeyValueRead for MemoryDb {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn exists(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.inner.read().contains_key(key))
    }
}

impl KeyValueWrite for MemoryDb {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.inner.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.inner.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut db = MemoryDb::new();
        assert!(db.is_empty());

        db.set(b"key", b"value".to_vec()).unwrap();
        assert_eq!(db.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert!(db.exists(b"key").unwrap());

        db.delete(b"key").unwrap();
        assert_eq!(db.get(b"key").unwrap(), None);
        db.delete(b"missing").unwrap();
    }

    #[test]
    fn test_clones_share_storage() {
        let mut a = MemoryDb::new();
        let b = a.clone();
        a.set(b"k", vec![1]).unwrap();
        assert_eq!(b.get(b"k").unwrap(), Some(vec![1]));
        assert_eq!(b.len(), 1);
    }
}
