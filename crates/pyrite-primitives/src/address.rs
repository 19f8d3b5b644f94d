//! Ethereum-compatible address type (20 bytes)

use crate::error::ValidationError;
use primitive_types::U256;
use std::fmt;

/// Ethereum-compatible 20-byte address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// Size of address in bytes
    pub const LEN: usize = 20;

    /// Zero address (0x0000...0000)
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create address from bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Create address from slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, ValidationError> {
        if slice.len() != Self::LEN {
            return Err(ValidationError::InvalidLength {
                what: "address",
                expected: Self::LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(slice);
        Ok(Address(bytes))
    }

    /// Parse address from hex string (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ValidationError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Low 20 bytes of a stack word.
    pub fn from_word(word: &U256) -> Self {
        let mut full = [0u8; 32];
        word.to_big_endian(&mut full);
        Self::from_padded(&full)
    }

    /// Address from an arbitrary byte string: left-padded when short, last 20 bytes when long.
    pub fn from_padded(bytes: &[u8]) -> Self {
        let mut out = [0u8; 20];
        let take = bytes.len().min(20);
        out[20 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
        Address(out)
    }

    /// Address as a stack word.
    pub fn to_word(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Get as byte slice
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// RLP implementation (behind feature flag)
#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::*;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for Address {
        fn rlp_append(&self, s: &mut RlpStream) {
            s.encoder().encode_value(&self.0);
        }
    }

    impl Decodable for Address {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            rlp.decoder().decode_value(|bytes| {
                if bytes.len() != 20 {
                    return Err(DecoderError::RlpInvalidLength);
                }
                let mut arr = [0u8; 20];
                arr.copy_from_slice(bytes);
                Ok(Address(arr))
            })
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Address {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Address {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_hex() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert!(!addr.is_zero());

        let addr2 = Address::from_hex("742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert_eq!(addr, addr2);
    }

    #[test]
    fn test_zero_address() {
        let zero = Address::ZERO;
        assert!(zero.is_zero());
        assert_eq!(zero.to_hex(), "0x0000000000000000000000000000000000000000");
    }

    #[test]
    fn test_address_from_slice_wrong_length() {
        let err = Address::from_slice(&[1u8; 19]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidLength {
                what: "address",
                expected: 20,
                got: 19
            }
        );
    }

    #[test]
    fn test_address_from_hex_invalid_chars() {
        let result = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aGGG");
        assert!(matches!(result, Err(ValidationError::InvalidHex(_))));
    }

    #[test]
    fn test_address_word_roundtrip() {
        let addr = Address::from_hex("0x742d35cc6634c0532925a3b844bc9e7595f0ab3d").unwrap();
        assert_eq!(Address::from_word(&addr.to_word()), addr);
    }

    #[test]
    fn test_address_from_word_truncates_high_bytes() {
        let word = U256::MAX;
        assert_eq!(Address::from_word(&word), Address::from_bytes([0xff; 20]));
    }

    #[test]
    fn test_address_from_padded() {
        assert_eq!(Address::from_padded(&[0x01]).as_bytes()[19], 0x01);
        assert_eq!(Address::from_padded(&[]), Address::ZERO);
        let long: Vec<u8> = (0u8..32).collect();
        assert_eq!(Address::from_padded(&long).as_bytes()[0], 12);
    }

    #[test]
    fn test_address_display() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert_eq!(
            format!("{}", addr),
            "0x742d35cc6634c0532925a3b844bc9e7595f0ab3d"
        );
    }

    #[cfg(feature = "rlp")]
    #[test]
    fn test_address_rlp() {
        let addr = Address::from_bytes([0xab; 20]);
        let encoded = rlp::encode(&addr);
        assert_eq!(encoded[0], 0x80 + 20);
        let decoded: Address = rlp::decode(&encoded).unwrap();
        assert_eq!(decoded, addr);
    }
}
