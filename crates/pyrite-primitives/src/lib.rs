//! # pyrite-primitives
//!
//! Primitive types shared by every Pyrite crate.
//!
//! - [`Address`]: 20-byte account address
//! - [`H256`]: 32-byte hash
//! - [`U256`]: the native 256-bit machine word
//! - [`ValidationError`]: malformed input to an API (always a caller bug)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::Address;
pub use error::ValidationError;
pub use hash::H256;

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Gas type
pub type Gas = u64;

/// Account nonce type
pub type Nonce = u64;

/// Big-endian 32-byte encoding of a word.
pub fn u256_to_be_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Minimal big-endian encoding of a word; zero encodes as a single `0x00` byte.
pub fn u256_to_minimal_bytes(value: &U256) -> Vec<u8> {
    let full = u256_to_be_bytes(value);
    let first = full.iter().position(|b| *b != 0).unwrap_or(31);
    full[first..].to_vec()
}

/// Left-pad `data` with zeros to 32 bytes, keeping the last 32 bytes if longer.
pub fn pad32(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let take = data.len().min(32);
    out[32 - take..].copy_from_slice(&data[data.len() - take..]);
    out
}

/// Round `value` up to the next multiple of 32.
pub fn ceil32(value: u64) -> u64 {
    match value % 32 {
        0 => value,
        rem => value + (32 - rem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_basic() {
        let a = U256::from(100u64);
        let b = U256::from(200u64);
        assert_eq!(a + b, U256::from(300u64));
    }

    #[test]
    fn test_minimal_bytes() {
        assert_eq!(u256_to_minimal_bytes(&U256::zero()), vec![0u8]);
        assert_eq!(u256_to_minimal_bytes(&U256::from(0x0102u64)), vec![1u8, 2]);
        assert_eq!(u256_to_minimal_bytes(&U256::MAX), vec![0xffu8; 32]);
    }

    #[test]
    fn test_pad32() {
        let padded = pad32(&[1, 2]);
        assert_eq!(padded[30..], [1, 2]);
        assert!(padded[..30].iter().all(|b| *b == 0));
        let long = [7u8; 40];
        assert_eq!(pad32(&long), [7u8; 32]);
    }

    #[test]
    fn test_ceil32() {
        assert_eq!(ceil32(0), 0);
        assert_eq!(ceil32(1), 32);
        assert_eq!(ceil32(32), 32);
        assert_eq!(ceil32(33), 64);
    }
}
