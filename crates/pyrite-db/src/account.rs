//! Account record

use pyrite_crypto::KECCAK_EMPTY;
use pyrite_primitives::{H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Empty code hash (keccak256 of empty bytes)
pub const EMPTY_CODE_HASH: H256 = KECCAK_EMPTY;

/// Root of an empty trie (keccak256 of the RLP empty string)
pub const BLANK_ROOT_HASH: H256 = H256::from_bytes([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6,
    0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0,
    0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// Account data as stored in the state trie.
///
/// Encoded as the RLP list `[nonce, balance, storage_root, code_hash]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account nonce
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// Root of this account's storage trie
    pub storage_root: H256,
    /// keccak256 of the code, or [`EMPTY_CODE_HASH`]
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root: BLANK_ROOT_HASH,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// Check if account is empty (no code, zero nonce, zero balance)
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }

    /// RLP encoding
    pub fn to_rlp(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_rlp(bytes: &[u8]) -> Result<Self, DecoderError> {
        rlp::decode(bytes)
    }
}

impl Encodable for Account {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.nonce);
        s.append(&self.balance);
        s.append(&self.storage_root);
        s.append(&self.code_hash);
    }
}

impl Decodable for Account {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            nonce: rlp.val_at(0)?,
            balance: rlp.val_at(1)?,
            storage_root: rlp.val_at(2)?,
            code_hash: rlp.val_at(3)?,
        })
    }
}
