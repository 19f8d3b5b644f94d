//! EVM memory implementation

use pyrite_primitives::ValidationError;

/// EVM memory (byte-addressable, zero-initialized, grows in 32-byte words)
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Get current memory size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been touched yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow to cover `offset..offset + size`, rounded up to a word boundary.
    ///
    /// Never shrinks and never touches existing bytes; `size == 0` is a no-op.
    pub fn extend(&mut self, offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        let new_size = offset.saturating_add(size);
        if new_size <= self.data.len() {
            return;
        }
        let aligned = new_size.div_ceil(32).saturating_mul(32);
        self.data.resize(aligned, 0);
    }

    /// Write exactly `size` bytes at `offset`; the region must already be extended.
    pub fn write(&mut self, offset: usize, size: usize, value: &[u8]) -> Result<(), ValidationError> {
        if value.len() != size {
            return Err(ValidationError::InvalidLength {
                what: "memory write",
                expected: size,
                got: value.len(),
            });
        }
        if size == 0 {
            return Ok(());
        }
        let end = self.checked_end(offset, size)?;
        self.data[offset..end].copy_from_slice(value);
        Ok(())
    }

    /// Read exactly `size` bytes at `offset`; the region must already be extended.
    pub fn read(&self, offset: usize, size: usize) -> Result<&[u8], ValidationError> {
        if size == 0 {
            return Ok(&[]);
        }
        let end = self.checked_end(offset, size)?;
        Ok(&self.data[offset..end])
    }

    fn checked_end(&self, offset: usize, size: usize) -> Result<usize, ValidationError> {
        offset
            .checked_add(size)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| ValidationError::OutOfRange {
                what: "memory region",
                value: format!("{offset}+{size} over {} bytes", self.data.len()),
            })
    }

    /// Get raw data slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}
