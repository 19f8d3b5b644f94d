//! secp256k1 public key recovery

use crate::{keccak256, CryptoError};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use pyrite_primitives::{Address, H256};

/// Recovered public key
pub type PublicKey = VerifyingKey;

/// Recover public key from a prehashed message and the `(r, s, recovery_id)` triple.
///
/// `recovery_id` is the raw parity bit (0 or 1), not the Ethereum `v` of 27/28.
pub fn recover_public_key(
    message_hash: &H256,
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: u8,
) -> Result<PublicKey, CryptoError> {
    let r: k256::FieldBytes = (*r).into();
    let s: k256::FieldBytes = (*s).into();
    let mut signature = K256Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    if recovery_id > 1 {
        return Err(CryptoError::InvalidRecoveryId(recovery_id));
    }

    // k256 only verifies low-s signatures
    let mut parity = recovery_id;
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        parity ^= 1;
    }
    let recovery_id =
        RecoveryId::try_from(parity).map_err(|_| CryptoError::InvalidRecoveryId(parity))?;

    VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &signature, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Derive Ethereum address from public key
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    // Uncompressed point is 0x04 || x || y
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_padded(&hash.as_bytes()[12..])
}

/// Recover the signing address; `recovery_id` is 0 or 1.
pub fn ecrecover(
    message_hash: &H256,
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: u8,
) -> Result<Address, CryptoError> {
    let public_key = recover_public_key(message_hash, r, s, recovery_id)?;
    Ok(public_key_to_address(&public_key))
}
