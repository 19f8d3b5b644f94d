//! Checkpointed undo log and the journaled key-value layer built on it

use crate::error::DbResult;
use crate::traits::{KeyValueRead, KeyValueWrite};
use pyrite_primitives::ValidationError;
use std::collections::HashMap;
use std::fmt;

/// Pending value of a key; `None` marks a deletion
pub type Slot = Option<Vec<u8>>;

/// Identifier of a live checkpoint. Never reused within one journal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointId(u64);

impl fmt::Debug for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CheckpointId({})", self.0)
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Undo log over keys with nested checkpoints.
///
/// Each checkpoint remembers, for every key first touched while it was the newest,
/// the value that key held before the touch.
#[derive(Debug)]
pub struct Journal<V> {
    checkpoints: Vec<(CheckpointId, HashMap<Vec<u8>, V>)>,
    next_id: u64,
}

impl<V> Default for Journal<V> {
    fn default() -> Self {
        Self {
            checkpoints: Vec::new(),
            next_id: 0,
        }
    }
}

impl<V> Journal<V> {
    /// Create a journal with no checkpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new, empty checkpoint on top of the stack
    pub fn create_checkpoint(&mut self) -> CheckpointId {
        let id = CheckpointId(self.next_id);
        self.next_id += 1;
        self.checkpoints.push((id, HashMap::new()));
        id
    }

    /// Record the original value of `key` under the newest checkpoint.
    ///
    /// No-op without live checkpoints, and for keys already recorded in the newest one.
    /// `original` is only evaluated when the value is actually recorded.
    pub fn record<F>(&mut self, key: &[u8], original: F)
    where
        F: FnOnce() -> V,
    {
        if let Some((_, originals)) = self.checkpoints.last_mut() {
            if !originals.contains_key(key) {
                originals.insert(key.to_vec(), original());
            }
        }
    }

    /// Whether `id` is a live checkpoint
    pub fn has_checkpoint(&self, id: CheckpointId) -> bool {
        self.position(id).is_some()
    }

    /// Number of live checkpoints
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether any checkpoint is live
    pub fn has_checkpoints(&self) -> bool {
        !self.checkpoints.is_empty()
    }

    /// Pop `id` and every newer checkpoint, returning the originals to restore.
    ///
    /// When several popped checkpoints recorded the same key, the oldest record wins.
    pub fn discard(&mut self, id: CheckpointId) -> Result<HashMap<Vec<u8>, V>, ValidationError> {
        let merged = self.pop_through(id)?;
        tracing::trace!(checkpoint = %id, keys = merged.len(), "journal checkpoint discarded");
        Ok(merged)
    }

    /// Pop `id` and every newer checkpoint, folding their originals into the next older
    /// checkpoint. Entries the older checkpoint already holds are kept.
    pub fn commit(&mut self, id: CheckpointId) -> Result<(), ValidationError> {
        let merged = self.pop_through(id)?;
        if let Some((_, parent)) = self.checkpoints.last_mut() {
            for (key, original) in merged {
                parent.entry(key).or_insert(original);
            }
        }
        tracing::trace!(checkpoint = %id, "journal checkpoint committed");
        Ok(())
    }

    /// Drop every checkpoint without restoring anything
    pub fn clear(&mut self) {
        self.checkpoints.clear();
    }

    fn position(&self, id: CheckpointId) -> Option<usize> {
        self.checkpoints.iter().rposition(|(cp, _)| *cp == id)
    }

    fn pop_through(&mut self, id: CheckpointId) -> Result<HashMap<Vec<u8>, V>, ValidationError> {
        let index = self
            .position(id)
            .ok_or_else(|| ValidationError::invalid(format!("unknown checkpoint {id}")))?;
        let mut merged = HashMap::new();
        // Newest first, so older originals overwrite newer ones.
        while self.checkpoints.len() > index {
            if let Some((_, originals)) = self.checkpoints.pop() {
                merged.extend(originals);
            }
        }
        Ok(merged)
    }
}

/// Key-value layer whose writes can be discarded or committed per checkpoint.
///
/// Writes land in a pending map; [`JournalDb::flush`] moves them into the wrapped store.
#[derive(Debug)]
pub struct JournalDb<D> {
    wrapped: D,
    pending: HashMap<Vec<u8>, Slot>,
    // Original pending entry per key; `None` means the key had no pending entry.
    journal: Journal<Option<Slot>>,
}

impl<D> JournalDb<D> {
    /// Wrap `db`
    pub fn new(wrapped: D) -> Self {
        Self {
            wrapped,
            pending: HashMap::new(),
            journal: Journal::new(),
        }
    }

    /// Open a checkpoint
    pub fn record(&mut self) -> CheckpointId {
        self.journal.create_checkpoint()
    }

    /// Undo every write made since `id` was opened
    pub fn discard(&mut self, id: CheckpointId) -> DbResult<()> {
        let originals = self.journal.discard(id)?;
        for (key, original) in originals {
            match original {
                Some(slot) => {
                    self.pending.insert(key, slot);
                }
                None => {
                    self.pending.remove(&key);
                }
            }
        }
        Ok(())
    }

    /// Keep every write made since `id` was opened, merging it into the enclosing checkpoint
    pub fn commit(&mut self, id: CheckpointId) -> DbResult<()> {
        self.journal.commit(id)?;
        Ok(())
    }

    /// Whether `id` is a live checkpoint
    pub fn has_changeset(&self, id: CheckpointId) -> bool {
        self.journal.has_checkpoint(id)
    }

    /// Whether any checkpoint is live
    pub fn has_checkpoints(&self) -> bool {
        self.journal.has_checkpoints()
    }

    /// Whether no pending writes remain
    pub fn is_flushed(&self) -> bool {
        self.pending.is_empty()
    }

    /// The wrapped store
    pub fn wrapped(&self) -> &D {
        &self.wrapped
    }

    /// The wrapped store, mutably
    pub fn wrapped_mut(&mut self) -> &mut D {
        &mut self.wrapped
    }

    fn write_slot(&mut self, key: &[u8], slot: Slot) {
        let pending = &self.pending;
        self.journal.record(key, || pending.get(key).cloned());
        self.pending.insert(key.to_vec(), slot);
    }
}

impl<D: KeyValueWrite> JournalDb<D> {
    /// Write all pending changes into the wrapped store.
    ///
    /// Fails while checkpoints are live, since their writes could still be discarded.
    pub fn flush(&mut self) -> DbResult<()> {
        if self.journal.has_checkpoints() {
            return Err(ValidationError::invalid(format!(
                "cannot flush journal with {} live checkpoint(s)",
                self.journal.depth()
            ))
            .into());
        }
        let count = self.pending.len();
        let mut pending: Vec<_> = self.pending.drain().collect();
        // Deterministic application order keeps trie node writes reproducible.
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, slot) in pending {
            match slot {
                Some(value) => self.wrapped.set(&key, value)?,
                None => self.wrapped.delete(&key)?,
            }
        }
        tracing::trace!(count, "journal flushed");
        Ok(())
    }
}

impl<D: KeyValueRead> KeyValueRead for JournalDb<D> {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(slot) => Ok(slot.clone()),
            None => self.wrapped.get(key),
        }
    }
}

impl<D> KeyValueWrite for JournalDb<D> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.write_slot(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.write_slot(key, None);
        Ok(())
    }
}
