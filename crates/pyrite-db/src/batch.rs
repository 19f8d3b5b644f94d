//! Write-buffering layer

use crate::error::DbResult;
use crate::journal::Slot;
use crate::traits::{KeyValueRead, KeyValueWrite};
use std::collections::HashMap;

/// Buffers writes and deletes in memory until [`BatchDb::commit`].
#[derive(Debug)]
pub struct BatchDb<D> {
    wrapped: D,
    pending: HashMap<Vec<u8>, Slot>,
}

impl<D> BatchDb<D> {
    /// Wrap `db`
    pub fn new(wrapped: D) -> Self {
        Self {
            wrapped,
            pending: HashMap::new(),
        }
    }

    /// Drop every buffered change
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of buffered changes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The wrapped store
    pub fn wrapped(&self) -> &D {
        &self.wrapped
    }
}

impl<D: KeyValueWrite> BatchDb<D> {
    /// Write buffered changes into the wrapped store.
    ///
    /// With `apply_deletes` false, buffered deletions are dropped instead of applied.
    pub fn commit(&mut self, apply_deletes: bool) -> DbResult<()> {
        let mut written = 0usize;
        for (key, slot) in self.pending.drain() {
            match slot {
                Some(value) => {
                    self.wrapped.set(&key, value)?;
                    written += 1;
                }
                None if apply_deletes => self.wrapped.delete(&key)?,
                None => {}
            }
        }
        tracing::trace!(written, apply_deletes, "batch committed");
        Ok(())
    }
}

impl<D: KeyValueRead> KeyValueRead for BatchDb<D> {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(slot) => Ok(slot.clone()),
            None => self.wrapped.get(key),
        }
    }
}

impl<D> KeyValueWrite for BatchDb<D> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.pending.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }
}
