//! # pyrite-crypto
//!
//! Cryptographic primitives consumed as black boxes by the VM.
//!
//! - Keccak-256, SHA-256 and RIPEMD-160 hashing
//! - secp256k1 public key recovery
//! - Address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::{keccak256, ripemd160, sha256, KECCAK_EMPTY};
pub use signature::{ecrecover, public_key_to_address, recover_public_key, PublicKey};
