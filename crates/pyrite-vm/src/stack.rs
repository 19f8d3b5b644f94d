//! EVM stack implementation

use crate::error::{Interrupt, VmError};
use crate::gas::cost::MAX_STACK_SIZE;
use pyrite_primitives::{u256_to_minimal_bytes, Address, ValidationError, U256};

/// One stack slot, kept in the form it was pushed in.
///
/// Integer and byte-string views are converted lazily when popped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackItem {
    /// 256-bit word
    Uint(U256),
    /// Big-endian byte string of at most 32 bytes
    Bytes(Vec<u8>),
}

impl StackItem {
    /// Integer view; bytes are read big-endian
    pub fn into_uint(self) -> U256 {
        match self {
            StackItem::Uint(value) => value,
            StackItem::Bytes(bytes) => U256::from_big_endian(&bytes),
        }
    }

    /// Byte view; integers use their minimal big-endian form (zero is `[0x00]`)
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            StackItem::Uint(value) => u256_to_minimal_bytes(&value),
            StackItem::Bytes(bytes) => bytes,
        }
    }
}

/// EVM stack (max 1024 items)
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<StackItem>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(MAX_STACK_SIZE),
        }
    }

    fn push_item(&mut self, item: StackItem) -> Result<(), VmError> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(VmError::FullStack);
        }
        self.data.push(item);
        Ok(())
    }

    /// Push a word
    pub fn push_uint(&mut self, value: U256) -> Result<(), VmError> {
        self.push_item(StackItem::Uint(value))
    }

    /// Push a byte string; more than 32 bytes is a validation error
    pub fn push_bytes(&mut self, value: Vec<u8>) -> Result<(), Interrupt> {
        if value.len() > 32 {
            return Err(ValidationError::InvalidLength {
                what: "stack item",
                expected: 32,
                got: value.len(),
            }
            .into());
        }
        Ok(self.push_item(StackItem::Bytes(value))?)
    }

    /// Push an address as its 20 raw bytes
    pub fn push_address(&mut self, address: &Address) -> Result<(), VmError> {
        self.push_item(StackItem::Bytes(address.as_bytes().to_vec()))
    }

    /// Pop `count` items uncoerced, top first
    pub fn pop_any(&mut self, count: usize) -> Result<Vec<StackItem>, VmError> {
        if count > self.data.len() {
            return Err(VmError::InsufficientStack);
        }
        let split = self.data.len() - count;
        let mut items = self.data.split_off(split);
        items.reverse();
        Ok(items)
    }

    /// Pop one item as a word
    pub fn pop1_uint(&mut self) -> Result<U256, VmError> {
        self.data
            .pop()
            .map(StackItem::into_uint)
            .ok_or(VmError::InsufficientStack)
    }

    /// Pop `N` items as words, top first
    pub fn pop_uints<const N: usize>(&mut self) -> Result<[U256; N], VmError> {
        if N > self.data.len() {
            return Err(VmError::InsufficientStack);
        }
        let mut values = [U256::zero(); N];
        for value in values.iter_mut() {
            *value = self.pop1_uint()?;
        }
        Ok(values)
    }

    /// Pop one item as bytes
    pub fn pop1_bytes(&mut self) -> Result<Vec<u8>, VmError> {
        self.data
            .pop()
            .map(StackItem::into_bytes)
            .ok_or(VmError::InsufficientStack)
    }

    /// Pop one item as an address: left-padded to 32 bytes, then the low 20
    pub fn pop1_address(&mut self) -> Result<Address, VmError> {
        let bytes = self.pop1_bytes()?;
        Ok(Address::from_padded(&bytes))
    }

    /// Swap the top with the item `depth` below it (1 = second item)
    pub fn swap(&mut self, depth: usize) -> Result<(), VmError> {
        let len = self.data.len();
        if depth == 0 || depth >= len {
            return Err(VmError::InsufficientStack);
        }
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Duplicate the item at `depth` onto the top (1 = dup top)
    pub fn dup(&mut self, depth: usize) -> Result<(), VmError> {
        if depth == 0 || depth > self.data.len() {
            return Err(VmError::InsufficientStack);
        }
        let value = self.data[self.data.len() - depth].clone();
        self.push_item(value)
    }

    /// Item at `depth` below the top (0 = top)
    pub fn peek_at(&self, depth: usize) -> Option<&StackItem> {
        self.data.len().checked_sub(depth + 1).map(|idx| &self.data[idx])
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Items bottom first, as words
    pub fn to_uints(&self) -> Vec<U256> {
        self.data.iter().cloned().map(StackItem::into_uint).collect()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
