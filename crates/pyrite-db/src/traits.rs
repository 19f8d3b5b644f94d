//! Key-value store traits shared by every layer

use crate::error::DbResult;

/// Read side of a key-value store
pub trait KeyValueRead {
    /// Get the value stored under `key`
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Check whether `key` holds a value
    fn exists(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Write side of a key-value store
pub trait KeyValueWrite {
    /// Store `value` under `key`
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()>;

    /// Remove `key`; removing an absent key is a no-op
    fn delete(&mut self, key: &[u8]) -> DbResult<()>;
}

/// Combined read/write store
pub trait KeyValueStore: KeyValueRead + KeyValueWrite {}

impl<T: KeyValueRead + KeyValueWrite> KeyValueStore for T {}

impl<T: KeyValueRead + ?Sized> KeyValueRead for &T {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn exists(&self, key: &[u8]) -> DbResult<bool> {
        (**self).exists(key)
    }
}

impl<T: KeyValueRead + ?Sized> KeyValueRead for &mut T {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn exists(&self, key: &[u8]) -> DbResult<bool> {
        (**self).exists(key)
    }
}

impl<T: KeyValueWrite + ?Sized> KeyValueWrite for &mut T {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        (**self).delete(key)
    }
}
