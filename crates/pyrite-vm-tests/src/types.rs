//! Type definitions for the VMTests JSON format

use pyrite_primitives::{Address, H256, U256};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

fn hex_digits<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(s.strip_prefix("0x").unwrap_or(&s).to_string())
}

/// Hex-encoded bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_digits(deserializer)?;
        hex::decode(s).map(HexBytes).map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded word; odd digit counts and leading zeros allowed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct HexU256(pub U256);

impl<'de> Deserialize<'de> for HexU256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_digits(deserializer)?;
        if s.is_empty() {
            return Ok(HexU256(U256::zero()));
        }
        let digits = s.trim_start_matches('0');
        if digits.len() > 64 {
            return Err(serde::de::Error::custom(format!("word too large: 0x{s}")));
        }
        U256::from_str_radix(if digits.is_empty() { "0" } else { digits }, 16)
            .map(HexU256)
            .map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded u64
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HexU64(pub u64);

impl<'de> Deserialize<'de> for HexU64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_digits(deserializer)?;
        if s.is_empty() {
            return Ok(HexU64(0));
        }
        u64::from_str_radix(&s, 16)
            .map(HexU64)
            .map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded address (20 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexAddress(pub Address);

impl<'de> Deserialize<'de> for HexAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_digits(deserializer)?;
        Address::from_hex(&s)
            .map(HexAddress)
            .map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded H256 (32 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HexH256(pub H256);

impl<'de> Deserialize<'de> for HexH256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_digits(deserializer)?;
        H256::from_hex(&s)
            .map(HexH256)
            .map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// VM Test Types
// =============================================================================

/// VM test file structure (map of test name -> test case)
pub type VmTestFile = BTreeMap<String, VmTestCase>;

/// Single VM test case
#[derive(Debug, Deserialize)]
pub struct VmTestCase {
    /// Environment info
    pub env: VmEnv,
    /// Execution parameters
    pub exec: VmExec,
    /// Expected gas remaining (None if test should fail)
    pub gas: Option<HexU64>,
    /// Expected logs hash: keccak of the RLP list of `[address, topics, data]`
    pub logs: Option<HexH256>,
    /// Expected output
    pub out: Option<HexBytes>,
    /// Pre-execution state
    pub pre: BTreeMap<HexAddress, AccountFixture>,
    /// Post-execution state (None if test should fail)
    pub post: Option<BTreeMap<HexAddress, AccountFixture>>,
}

impl VmTestCase {
    /// Whether the fixture expects the computation to succeed
    pub fn expects_success(&self) -> bool {
        self.gas.is_some() || self.post.is_some()
    }
}

/// VM test environment
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmEnv {
    /// Current coinbase
    pub current_coinbase: HexAddress,
    /// Current difficulty
    pub current_difficulty: HexU256,
    /// Current gas limit
    pub current_gas_limit: HexU64,
    /// Current block number
    pub current_number: HexU64,
    /// Current timestamp
    pub current_timestamp: HexU64,
}

/// VM test execution parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmExec {
    /// Address of the executing account
    pub address: HexAddress,
    /// Caller address
    pub caller: HexAddress,
    /// Code to execute
    pub code: HexBytes,
    /// Input data
    pub data: HexBytes,
    /// Gas provided
    pub gas: HexU64,
    /// Gas price
    pub gas_price: HexU256,
    /// Origin address
    pub origin: HexAddress,
    /// Value transferred
    pub value: HexU256,
}

/// Account state in `pre` or `post`
#[derive(Debug, Deserialize)]
pub struct AccountFixture {
    /// Balance
    pub balance: HexU256,
    /// Code
    pub code: HexBytes,
    /// Nonce
    pub nonce: HexU64,
    /// Storage
    #[serde(default)]
    pub storage: BTreeMap<HexU256, HexU256>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes_deserialize() {
        let bytes: HexBytes = serde_json::from_str(r#""0x1234""#).unwrap();
        assert_eq!(bytes.0, vec![0x12, 0x34]);

        let empty: HexBytes = serde_json::from_str(r#""0x""#).unwrap();
        assert!(empty.0.is_empty());
    }

    #[test]
    fn test_hex_u256_deserialize() {
        let value: HexU256 = serde_json::from_str(r#""0x1""#).unwrap();
        assert_eq!(value.0, U256::one());

        let padded: HexU256 = serde_json::from_str(
            r#""0x00000000000000000000000000000000000000000000000000000000000000000000ff""#,
        )
        .unwrap();
        assert_eq!(padded.0, U256::from(0xff));

        assert!(serde_json::from_str::<HexU256>(&format!("\"0x1{}\"", "0".repeat(64))).is_err());
    }

    #[test]
    fn test_hex_address_deserialize() {
        let addr: HexAddress =
            serde_json::from_str(r#""0x0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6""#).unwrap();
        assert_eq!(addr.0.as_bytes()[0], 0x0f);
        assert_eq!(addr.0.as_bytes()[19], 0xc6);
        assert!(serde_json::from_str::<HexAddress>(r#""0x1234""#).is_err());
    }

    #[test]
    fn test_hex_u64_deserialize() {
        let value: HexU64 = serde_json::from_str(r#""0x100""#).unwrap();
        assert_eq!(value.0, 256);
    }

    #[test]
    fn test_storage_keys_as_map_keys() {
        let account: AccountFixture = serde_json::from_str(
            r#"{"balance": "0x0", "code": "0x", "nonce": "0x0", "storage": {"0x01": "0x2a"}}"#,
        )
        .unwrap();
        assert_eq!(account.storage[&HexU256(U256::one())], HexU256(U256::from(42)));
    }
}
